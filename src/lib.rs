//! # RedUnix HTTP
//! src/lib.rs
//!
//! Librería de servidor HTTP/1.1 embebible: la aplicación anfitriona
//! registra handlers de rutas y la librería acepta conexiones, parsea
//! los requests, despacha al handler que corresponda y transmite las
//! respuestas (contenido generado o archivos estáticos).
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: protocolo HTTP/1.1 (request, response, headers, cookies)
//! - `config`: configuración por CLI y variables de entorno
//! - `router`: registro de rutas (exactas y regex) y dispatch
//! - `server`: socket TCP, threads de conexión y archivos estáticos
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use redunix_http::config::ServerConfig;
//! use redunix_http::http::Method;
//! use redunix_http::server::Server;
//!
//! let mut server = Server::new(ServerConfig::default());
//! server.add_exact_handler(Method::GET, "/hello", |_req, res| {
//!     res.set_body_text("hi");
//!     Ok(())
//! });
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod config;
pub mod http;
pub mod router;
pub mod server;
