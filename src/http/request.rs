//! # Parsing de Requests HTTP/1.1
//! src/http/request.rs
//!
//! Construcción incremental de un request a partir de los bytes que van
//! llegando por el socket. El tokenizado byte a byte lo hace `httparse`;
//! este módulo implementa lo que va encima:
//!
//! 1. Acumular bytes hasta tener el bloque de headers completo
//! 2. Pasar los nombres de campo a minúsculas
//! 3. Descomponer la URL en path y query decodificados (`+` → espacio,
//!    escapes `%XX`)
//! 4. Determinar la intención de keep-alive y el método
//! 5. Juntar el body según `content-length`
//!
//! ## Formato de un Request HTTP/1.1
//!
//! ```text
//! GET /path?param1=value1 HTTP/1.1\r\n
//! host: localhost:8080\r\n
//! user-agent: curl/7.68.0\r\n
//! \r\n
//! ```

use std::io::{ErrorKind, Read};
use std::net::TcpStream;

use super::cookie::{self, CookieEntry, CookieError};
use super::headers::HeaderList;
use super::method::Method;

/// Cantidad máxima de headers que acepta el tokenizador
const MAX_HEADERS: usize = 64;

/// Tamaño del buffer de lectura por iteración
const RECV_BUF_SIZE: usize = 1024;

/// Errores de protocolo durante el parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// El tokenizador rechazó los bytes recibidos
    BadRequest(String),

    /// La request line no contiene un path utilizable
    InvalidUrl,

    /// Escape %XX inválido en la URL
    InvalidEscape,

    /// Path o query decodificados con bytes que no son UTF-8 válido
    InvalidEncoding,

    /// Header content-length ilegible
    InvalidContentLength,

    /// Transfer-encoding chunked (no soportado)
    UnsupportedTransferEncoding,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::BadRequest(e) => write!(f, "Invalid HTTP request: {}", e),
            ParseError::InvalidUrl => write!(f, "Invalid request URL"),
            ParseError::InvalidEscape => write!(f, "Invalid %XX escape in URL"),
            ParseError::InvalidEncoding => write!(f, "URL decodes to invalid UTF-8"),
            ParseError::InvalidContentLength => write!(f, "Invalid content-length header"),
            ParseError::UnsupportedTransferEncoding => {
                write!(f, "Chunked transfer-encoding is not supported")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Errores al recibir un request desde el socket
///
/// Cualquiera de estos es fatal para la conexión: no se intenta
/// responder porque el estado del peer ya no es confiable.
#[derive(Debug)]
pub enum ReceiveError {
    /// El peer cerró la conexión antes de completar el request
    Closed,

    /// Venció el timeout de una espera de lectura
    Timeout,

    /// Error de transporte
    Io(std::io::Error),

    /// Error de protocolo
    Parse(ParseError),
}

impl std::fmt::Display for ReceiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReceiveError::Closed => write!(f, "Peer closed the connection"),
            ReceiveError::Timeout => write!(f, "Read timeout expired"),
            ReceiveError::Io(e) => write!(f, "Read error: {}", e),
            ReceiveError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ReceiveError {}

impl From<ParseError> for ReceiveError {
    fn from(e: ParseError) -> Self {
        ReceiveError::Parse(e)
    }
}

/// Representa un request HTTP/1.1, poblado incrementalmente por `feed`
#[derive(Debug)]
pub struct Request {
    /// Método del request; `None` si no está soportado (se responde 501)
    method: Option<Method>,

    /// URI cruda tal como llegó en la request line
    uri: String,

    /// Path decodificado (ej: "/static/logo.png")
    path: String,

    /// Query string decodificada (ej: "num=10&fast=true")
    query: String,

    /// Headers en orden de llegada, campos en minúsculas
    headers: HeaderList,

    /// Body del request (vacío si no hay content-length)
    body: Vec<u8>,

    /// Si el peer espera otro request en la misma conexión
    keep_alive: bool,

    /// El mensaje está completo
    done: bool,

    /// Dirección del cliente
    ip: String,

    // === Estado interno del parser ===
    buf: Vec<u8>,
    header_len: usize,
    content_length: usize,
    headers_done: bool,
}

impl Request {
    /// Crea un request vacío listo para alimentar con bytes
    pub fn new(ip: &str) -> Self {
        Self {
            method: None,
            uri: String::new(),
            path: String::new(),
            query: String::new(),
            headers: HeaderList::new(),
            body: Vec::new(),
            keep_alive: false,
            done: false,
            ip: ip.to_string(),
            buf: Vec::new(),
            header_len: 0,
            content_length: 0,
            headers_done: false,
        }
    }

    /// Lee un request completo desde el socket
    ///
    /// Cada lectura espera como máximo el timeout configurado en el
    /// stream. Corta al completar el mensaje, al vencer un timeout, al
    /// cierre del peer o al primer error del tokenizador.
    pub fn receive(stream: &mut TcpStream, ip: &str) -> Result<Request, ReceiveError> {
        let mut request = Request::new(ip);
        let mut buf = [0u8; RECV_BUF_SIZE];
        loop {
            let n = match stream.read(&mut buf) {
                Ok(0) => return Err(ReceiveError::Closed),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                    return Err(ReceiveError::Timeout)
                }
                Err(e) => return Err(ReceiveError::Io(e)),
            };
            if request.feed(&buf[..n])? {
                break;
            }
        }
        Ok(request)
    }

    /// Alimenta el parser con bytes recién leídos
    ///
    /// Retorna `true` cuando el mensaje está completo. Se puede llamar
    /// con cualquier fragmentación: el parser acumula lo que falta.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<bool, ParseError> {
        if self.done {
            return Ok(true);
        }
        self.buf.extend_from_slice(bytes);

        if !self.headers_done {
            let offset;
            let method_token;
            let uri;
            let version;
            let raw_headers: Vec<(String, String)>;
            {
                let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
                let mut parsed = httparse::Request::new(&mut headers);
                match parsed.parse(&self.buf) {
                    Ok(httparse::Status::Complete(n)) => {
                        offset = n;
                        method_token = parsed.method.unwrap_or("").to_string();
                        uri = parsed.path.unwrap_or("").to_string();
                        version = parsed.version.unwrap_or(1);
                        raw_headers = parsed
                            .headers
                            .iter()
                            .map(|h| {
                                (
                                    h.name.to_ascii_lowercase(),
                                    String::from_utf8_lossy(h.value).into_owned(),
                                )
                            })
                            .collect();
                    }
                    Ok(httparse::Status::Partial) => return Ok(false),
                    Err(e) => return Err(ParseError::BadRequest(e.to_string())),
                }
            }

            self.headers_done = true;
            self.header_len = offset;
            for (field, value) in raw_headers {
                self.headers.push(field, value);
            }
            self.method = Method::from_token(&method_token);
            self.uri = uri;
            self.split_uri()?;
            self.detect_keep_alive(version);
            self.read_body_length()?;
        }

        /* body: lo que haya después del bloque de headers, hasta
         * completar el content-length anunciado */
        let have = self.buf.len() - self.header_len;
        if have >= self.content_length {
            let end = self.header_len + self.content_length;
            self.body = self.buf[self.header_len..end].to_vec();
            self.done = true;
        }
        Ok(self.done)
    }

    /// Descompone la URI en path y query, ambos decodificados
    fn split_uri(&mut self) -> Result<(), ParseError> {
        if self.uri.is_empty() {
            return Err(ParseError::InvalidUrl);
        }
        let (raw_path, raw_query) = match self.uri.find('?') {
            Some(pos) => (self.uri[..pos].to_string(), self.uri[pos + 1..].to_string()),
            None => (self.uri.clone(), String::new()),
        };
        if raw_path.is_empty() {
            return Err(ParseError::InvalidUrl);
        }
        self.path = url_decode(&raw_path)?;
        self.query = url_decode(&raw_query)?;
        Ok(())
    }

    /// Determina la intención de keep-alive
    ///
    /// HTTP/1.1 mantiene la conexión salvo `connection: close`;
    /// HTTP/1.0 la cierra salvo `connection: keep-alive`.
    fn detect_keep_alive(&mut self, version: u8) {
        let connection = self.headers.get("connection");
        self.keep_alive = if version >= 1 {
            !matches!(connection, Some(v) if v.eq_ignore_ascii_case("close"))
        } else {
            matches!(connection, Some(v) if v.eq_ignore_ascii_case("keep-alive"))
        };
    }

    /// Lee el largo del body anunciado en los headers
    fn read_body_length(&mut self) -> Result<(), ParseError> {
        if let Some(te) = self.headers.get("transfer-encoding") {
            if te.to_ascii_lowercase().contains("chunked") {
                return Err(ParseError::UnsupportedTransferEncoding);
            }
        }
        self.content_length = match self.headers.get("content-length") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .map_err(|_| ParseError::InvalidContentLength)?,
            None => 0,
        };
        Ok(())
    }

    // === Métodos públicos para acceder a los campos ===

    /// Método del request; `None` si no está soportado
    pub fn method(&self) -> Option<Method> {
        self.method
    }

    /// URI cruda de la request line
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Path decodificado
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query string decodificada (vacía si no hay `?`)
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Headers en orden de llegada (campos en minúsculas)
    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    /// Busca el primer header con ese nombre (case-insensitive)
    pub fn header(&self, field: &str) -> Option<&str> {
        self.headers.get(field)
    }

    /// Cookies del header `cookie`, parseadas bajo demanda
    ///
    /// Retorna una lista vacía si el request no trae cookies.
    pub fn cookies(&self) -> Result<Vec<CookieEntry>, CookieError> {
        match self.headers.get("cookie") {
            Some(value) => cookie::parse_cookie_header(value),
            None => Ok(Vec::new()),
        }
    }

    /// Body del request
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Si el peer espera otro request en la misma conexión
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// El mensaje está completo
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Dirección del cliente
    pub fn client_ip(&self) -> &str {
        &self.ip
    }
}

/// Decodifica una URL: `+` pasa a espacio y los escapes `%XX` a su byte
pub fn url_decode(s: &str) -> Result<String, ParseError> {
    let bytes = s.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                if i + 2 >= bytes.len() {
                    return Err(ParseError::InvalidEscape);
                }
                let hi = unhex(bytes[i + 1]).ok_or(ParseError::InvalidEscape)?;
                let lo = unhex(bytes[i + 2]).ok_or(ParseError::InvalidEscape)?;
                out.push((hi << 4) | lo);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| ParseError::InvalidEncoding)
}

fn unhex(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
