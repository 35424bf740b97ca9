//! # RedUnix HTTP - Demo
//! src/main.rs
//!
//! Binario de demostración: embebe la librería igual que lo haría una
//! aplicación anfitriona. Registra un handler exacto, uno regex y uno
//! JSON, y sirve el docroot como archivos estáticos para todo lo demás.

use redunix_http::config::ServerConfig;
use redunix_http::http::Method;
use redunix_http::server::Server;
use serde::Serialize;

/// Respuesta del handler /status
#[derive(Serialize)]
struct ServerStatus {
    status: &'static str,
    version: &'static str,
    server: &'static str,
}

fn main() {
    println!("=================================");
    println!("  RedUnix HTTP/1.1 Server");
    println!("=================================\n");

    // Crear configuración desde CLI/env
    let config = ServerConfig::new();
    if let Err(e) = config.validate() {
        eprintln!("💥 Configuración inválida: {}", e);
        std::process::exit(1);
    }
    config.print_summary();

    let mut server = Server::new(config);

    // Handler de path exacto
    server.add_exact_handler(Method::GET | Method::POST, "/helloworld", |req, res| {
        res.add_header("content-type", "text/html")
            .map_err(|e| e.to_string())?;
        res.set_body_text(&format!(
            "<html><p>Hello, world! from URL: {}</p><p>{}</p><p>{}</p></html>",
            req.uri(),
            req.path(),
            req.query()
        ));
        Ok(())
    });

    // Handler regex: el índice 0 de args es el match completo
    if let Err(e) = server.add_regex_handler(Method::GET, "^/echo/([^/]*)$", |req, res, args| {
        let mut body = format!(
            "<html><p>Hello, Regex world! from URL: {}</p>",
            req.uri()
        );
        for (i, arg) in args.iter().enumerate() {
            body.push_str(&format!("<p>arg {}: {}</p>", i, arg));
        }
        body.push_str("</html>");
        res.add_header("content-type", "text/html")
            .map_err(|e| e.to_string())?;
        res.set_body_text(&body);
        Ok(())
    }) {
        eprintln!("💥 Regex inválida: {}", e);
        std::process::exit(1);
    }

    // Estado del servidor en JSON
    server.add_exact_handler(Method::GET, "/status", |_req, res| {
        let status = ServerStatus {
            status: "running",
            version: "0.1.0",
            server: "redunix-http",
        };
        let body = serde_json::to_string(&status).map_err(|e| e.to_string())?;
        res.add_header("content-type", "application/json")
            .map_err(|e| e.to_string())?;
        res.set_body_text(&body);
        Ok(())
    });

    // Iniciar el servidor (esto bloquea el thread)
    if let Err(e) = server.run() {
        eprintln!("💥 Error fatal: {}", e);
        std::process::exit(1);
    }
}
