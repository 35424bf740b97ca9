//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Implementación del servidor TCP que maneja múltiples conexiones
//! simultáneas usando threads: el acceptor solo acepta y lanza un
//! thread desacoplado por conexión. Cada conexión corre su propia
//! máquina de estados: recibir → rutear → responder, en loop mientras
//! el keep-alive se sostenga.
//!
//! El único estado compartido entre conexiones es el registro de rutas,
//! protegido por un RwLock: el dispatch (y el handler que matcheó)
//! corre con el lock de lectura tomado, así que un handler no debe
//! registrar rutas ni bloquearse indefinidamente.

use crate::config::ServerConfig;
use crate::http::request::ReceiveError;
use crate::http::{MethodSet, Request, Response, StatusCode};
use crate::router::{Dispatch, HandlerResult, Router};
use super::files;
use super::path;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Valor del header `server`
const SERVER_NAME: &str = "redunix-http";

/// Estado del ciclo de vida del servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Creado pero sin aceptar conexiones; la configuración se puede tocar
    Off,

    /// Aceptando conexiones; la configuración queda congelada
    Running,
}

/// Servidor HTTP/1.1 embebible
///
/// La aplicación anfitriona lo crea con una configuración, registra
/// handlers y lo arranca con `run()` (bloqueante) o `start()` (en su
/// propio thread).
pub struct Server {
    config: ServerConfig,
    router: Arc<RwLock<Router>>,
    listener: Option<TcpListener>,
    state: ServerState,
    stop_requested: Arc<AtomicBool>,
    acceptor: Option<JoinHandle<()>>,
}

impl Server {
    /// Crea un servidor con la configuración dada y sin rutas
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            router: Arc::new(RwLock::new(Router::new())),
            listener: None,
            state: ServerState::Off,
            stop_requested: Arc::new(AtomicBool::new(false)),
            acceptor: None,
        }
    }

    /// Estado actual del ciclo de vida
    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Configuración vigente
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Acceso mutable a la configuración, solo con el servidor apagado
    pub fn config_mut(&mut self) -> Result<&mut ServerConfig, String> {
        if self.state != ServerState::Off {
            return Err("Cannot change configuration while the server is running".to_string());
        }
        Ok(&mut self.config)
    }

    /// Registra una ruta de path exacto (acceso exclusivo al registro)
    ///
    /// No debe llamarse desde un handler: el dispatch tiene tomado el
    /// lock de lectura y el registro quedaría esperando para siempre.
    pub fn add_exact_handler<F>(&self, methods: impl Into<MethodSet>, route_path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.router
            .write()
            .unwrap()
            .register_exact(methods, route_path, handler);
    }

    /// Registra una ruta regex; falla si el patrón no compila
    pub fn add_regex_handler<F>(
        &self,
        methods: impl Into<MethodSet>,
        pattern: &str,
        handler: F,
    ) -> Result<(), regex::Error>
    where
        F: Fn(&Request, &mut Response, &[String]) -> HandlerResult + Send + Sync + 'static,
    {
        self.router
            .write()
            .unwrap()
            .register_regex(methods, pattern, handler)
    }

    /// Crea el socket de escucha con el backlog configurado
    ///
    /// Es idempotente: si ya está escuchando no hace nada.
    pub fn bind(&mut self) -> io::Result<()> {
        if self.listener.is_some() {
            return Ok(());
        }
        let listener = listen_with_backlog(&self.config.address(), self.config.backlog)?;
        println!("[+] Servidor escuchando en {}", listener.local_addr()?);
        self.listener = Some(listener);
        Ok(())
    }

    /// Dirección local real del socket de escucha (útil con puerto 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Corre el accept loop bloqueando el thread que llama
    ///
    /// Retorna cuando se pide `stop()` desde otro lado o cuando falla
    /// la creación de un thread de conexión (eso detiene el servidor).
    pub fn run(&mut self) -> io::Result<()> {
        self.bind()?;
        let listener = match self.listener.as_ref() {
            Some(l) => l.try_clone()?,
            None => return Err(io::Error::new(io::ErrorKind::NotConnected, "not bound")),
        };
        self.stop_requested.store(false, Ordering::SeqCst);
        self.state = ServerState::Running;
        println!("[*] Modo concurrente: un thread por conexion\n");
        let result = accept_loop(
            listener,
            Arc::clone(&self.router),
            Arc::new(self.config.clone()),
            Arc::clone(&self.stop_requested),
        );
        self.state = ServerState::Off;
        result
    }

    /// Arranca el accept loop en un thread dedicado y retorna
    pub fn start(&mut self) -> io::Result<()> {
        if self.state == ServerState::Running {
            return Ok(());
        }
        self.bind()?;
        let listener = match self.listener.as_ref() {
            Some(l) => l.try_clone()?,
            None => return Err(io::Error::new(io::ErrorKind::NotConnected, "not bound")),
        };
        self.stop_requested.store(false, Ordering::SeqCst);
        let router = Arc::clone(&self.router);
        let config = Arc::new(self.config.clone());
        let stop = Arc::clone(&self.stop_requested);
        self.acceptor = Some(thread::spawn(move || {
            if let Err(e) = accept_loop(listener, router, config, stop) {
                eprintln!("   ❌ Error fatal en el accept loop: {}", e);
            }
        }));
        self.state = ServerState::Running;
        Ok(())
    }

    /// Detiene el accept loop
    ///
    /// No drena las conexiones en curso: cada una termina por su cuenta
    /// cuando su keep-alive se corta.
    pub fn stop(&mut self) {
        if self.state != ServerState::Running {
            return;
        }
        self.stop_requested.store(true, Ordering::SeqCst);
        /* despertar el accept() bloqueado con una conexión propia */
        if let Some(addr) = self.local_addr() {
            let _ = TcpStream::connect(addr);
        }
        if let Some(handle) = self.acceptor.take() {
            let _ = handle.join();
        }
        self.state = ServerState::Off;
    }
}

/// Loop principal: aceptar → lanzar thread → repetir
///
/// Un error al aceptar una conexión puntual se loguea y se sigue; un
/// fallo al crear el thread corta el loop y detiene el servidor.
fn accept_loop(
    listener: TcpListener,
    router: Arc<RwLock<Router>>,
    config: Arc<ServerConfig>,
    stop: Arc<AtomicBool>,
) -> io::Result<()> {
    for connection in listener.incoming() {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        match connection {
            Ok(stream) => {
                let ip = stream
                    .peer_addr()
                    .map(|addr| addr.ip().to_string())
                    .unwrap_or_else(|_| "unknown".to_string());
                let router = Arc::clone(&router);
                let config = Arc::clone(&config);
                if let Err(e) = thread::Builder::new()
                    .spawn(move || handle_connection(stream, ip, router, config))
                {
                    eprintln!("   ❌ No se pudo crear el thread para la conexión: {}", e);
                    return Err(e);
                }
            }
            Err(e) => {
                eprintln!("   ❌ Error al aceptar conexión: {}", e);
                continue;
            }
        }
    }
    Ok(())
}

/// Máquina de estados de una conexión: recibir → rutear → responder
///
/// Corre en su propio thread. Cada iteración arma un request nuevo y lo
/// libera antes de la siguiente; el socket se cierra al salir.
fn handle_connection(
    mut stream: TcpStream,
    ip: String,
    router: Arc<RwLock<Router>>,
    config: Arc<ServerConfig>,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(config.read_timeout_secs)));

    loop {
        /* RECEIVING: leer y parsear un request completo */
        let request = match Request::receive(&mut stream, &ip) {
            Ok(request) => request,
            Err(e) => {
                /* transporte o protocolo rotos: no se intenta responder */
                match e {
                    ReceiveError::Closed => {}
                    _ => eprintln!("   ❌ [{}] {}", ip, e),
                }
                break;
            }
        };
        println!(
            "   ✅ [{}] {} {}",
            ip,
            request.method().map(|m| m.as_str()).unwrap_or("?"),
            request.path()
        );

        let mut response = Response::new();
        let sent: io::Result<()> = if request.method().is_none() {
            /* método no soportado: 501 y la conexión sigue */
            send_empty_status(
                &mut stream,
                &mut response,
                &request,
                StatusCode::NotImplemented,
            )
        } else {
            /* ROUTING: el lock de lectura cubre búsqueda + handler */
            let outcome = {
                let registry = router.read().unwrap();
                registry.dispatch(&request, &mut response)
            };
            /* RESPONDING */
            match outcome {
                Dispatch::Ok => write_response(&config, &request, &mut response, &mut stream),
                Dispatch::HandlerError => send_empty_status(
                    &mut stream,
                    &mut response,
                    &request,
                    StatusCode::InternalServerError,
                ),
                Dispatch::NoMatch => {
                    add_common_headers(&mut response, &request);
                    send_404(&mut stream, &mut response)
                }
            }
        };

        if let Err(e) = sent {
            eprintln!("   ❌ [{}] Error enviando la respuesta: {}", ip, e);
            break;
        }
        if !request.keep_alive() {
            break;
        }
        /* request y response se liberan acá, antes de la próxima vuelta */
    }
    /* el socket se cierra al salir del scope */
}

/// Headers que llevan todas las respuestas del servidor
fn add_common_headers(response: &mut Response, request: &Request) {
    response.push_header("server", SERVER_NAME);
    if request.keep_alive() {
        response.push_header("connection", "keep-alive");
    }
}

/// Respuesta de solo headers con body vacío (500, 501)
fn send_empty_status(
    stream: &mut TcpStream,
    response: &mut Response,
    request: &Request,
    status: StatusCode,
) -> io::Result<()> {
    response.set_status(status);
    add_common_headers(response, request);
    response.push_header("content-length", "0");
    stream.write_all(&response.header_block())
}

/// 404 con body HTML generado y content-length exacto
fn send_404(stream: &mut TcpStream, response: &mut Response) -> io::Result<()> {
    response.set_status(StatusCode::NotFound);
    let body = format!("<html><p>{}: 404 - NOT FOUND</p></html>", SERVER_NAME);
    response.push_header("content-type", "text/html");
    response.push_header("content-length", &body.len().to_string());
    stream.write_all(&response.header_block())?;
    stream.write_all(body.as_bytes())
}

/// Transmite la respuesta que armó el handler según su estrategia de body
fn write_response(
    config: &ServerConfig,
    request: &Request,
    response: &mut Response,
    stream: &mut TcpStream,
) -> io::Result<()> {
    use crate::http::Body;

    add_common_headers(response, request);

    match response.take_body() {
        Body::Empty => {
            response.push_header("content-length", "0");
            stream.write_all(&response.header_block())
        }
        Body::Text(bytes) => {
            /* content-type por defecto si el handler no lo puso */
            if response.header("content-type").is_none() {
                response.push_header("content-type", "text/plain");
            }
            /* content-length en bytes, no en caracteres */
            response.push_header("content-length", &bytes.len().to_string());
            stream.write_all(&response.header_block())?;
            // TODO: responder HEAD sin body
            stream.write_all(&bytes)
        }
        Body::FileRel(rel) => {
            /* docroot + path sanitizado; el orden importa: el docroot se
             * antepone al resultado del sanitizador, nunca al revés */
            let full_path = format!("{}{}", config.docroot, path::sanitize(&rel));
            send_file_response(config, response, stream, full_path)
        }
        Body::FileAbs(abs) => send_file_response(config, response, stream, abs),
    }
}

/// Resuelve el archivo y lo transmite, o responde 404
fn send_file_response(
    config: &ServerConfig,
    response: &mut Response,
    stream: &mut TcpStream,
    mut full_path: String,
) -> io::Result<()> {
    let mut stats = files::file_stats(&full_path);

    /* directorio: un único reintento con el archivo por defecto */
    if stats.found && stats.is_dir {
        full_path.push('/');
        full_path.push_str(&config.default_file);
        stats = files::file_stats(&full_path);
    }

    if stats.found && !stats.is_dir {
        response.push_header("content-type", files::mime_for_path(&full_path));
        response.push_header("content-length", &stats.size.to_string());
        stream.write_all(&response.header_block())?;
        files::send_file(stream, &full_path, stats.size, config.use_sendfile)
    } else {
        send_404(stream, response)
    }
}

/// Crea el socket de escucha con SO_REUSEADDR y el backlog configurado
fn listen_with_backlog(address: &str, backlog: i32) -> io::Result<TcpListener> {
    let addrs: Vec<SocketAddr> = address.to_socket_addrs()?.collect();
    let mut last_err = io::Error::new(io::ErrorKind::AddrNotAvailable, "No addresses to bind");
    for addr in addrs {
        match bind_addr(addr, backlog) {
            Ok(listener) => return Ok(listener),
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}

#[cfg(unix)]
fn bind_addr(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    use std::mem;
    use std::os::unix::io::FromRawFd;

    unsafe {
        let family = match addr {
            SocketAddr::V4(_) => libc::AF_INET,
            SocketAddr::V6(_) => libc::AF_INET6,
        };
        let fd = libc::socket(family, libc::SOCK_STREAM, 0);
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        let yes: libc::c_int = 1;
        if libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &yes as *const libc::c_int as *const libc::c_void,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        ) < 0
        {
            let e = io::Error::last_os_error();
            libc::close(fd);
            return Err(e);
        }
        let bound = match addr {
            SocketAddr::V4(v4) => {
                let mut sa: libc::sockaddr_in = mem::zeroed();
                sa.sin_family = libc::AF_INET as libc::sa_family_t;
                sa.sin_port = v4.port().to_be();
                sa.sin_addr = libc::in_addr {
                    s_addr: u32::from_ne_bytes(v4.ip().octets()),
                };
                libc::bind(
                    fd,
                    &sa as *const libc::sockaddr_in as *const libc::sockaddr,
                    mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
                )
            }
            SocketAddr::V6(v6) => {
                let mut sa: libc::sockaddr_in6 = mem::zeroed();
                sa.sin6_family = libc::AF_INET6 as libc::sa_family_t;
                sa.sin6_port = v6.port().to_be();
                sa.sin6_addr = libc::in6_addr {
                    s6_addr: v6.ip().octets(),
                };
                libc::bind(
                    fd,
                    &sa as *const libc::sockaddr_in6 as *const libc::sockaddr,
                    mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t,
                )
            }
        };
        if bound < 0 || libc::listen(fd, backlog) < 0 {
            let e = io::Error::last_os_error();
            libc::close(fd);
            return Err(e);
        }
        Ok(TcpListener::from_raw_fd(fd))
    }
}

/* fuera de unix el backlog queda en el valor por defecto del sistema */
#[cfg(not(unix))]
fn bind_addr(addr: SocketAddr, _backlog: i32) -> io::Result<TcpListener> {
    TcpListener::bind(addr)
}
