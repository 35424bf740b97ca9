//! # Construcción de Respuestas HTTP
//!
//! Este módulo proporciona la API con la que un handler arma la
//! respuesta. El body admite tres estrategias: vacío, texto/bytes en
//! memoria, o un archivo (relativo al docroot o absoluto) que el
//! servidor transfiere al transmitir.
//!
//! ## Formato del bloque de headers
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! content-type: text/plain\r\n
//! set-cookie: session=abc\r\n
//! \r\n
//! ```
//!
//! `content-type` y `content-length` los completa el servidor al
//! transmitir según la estrategia de body; el handler solo los setea si
//! quiere otro valor.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use redunix_http::http::{Response, StatusCode};
//!
//! let mut response = Response::new();
//! response.set_status(StatusCode::Ok);
//! response.add_header("content-type", "application/json").unwrap();
//! response.set_body_text(r#"{"message": "Hello"}"#);
//! ```

use super::cookie::CookieEntry;
use super::headers::{HeaderError, HeaderList};
use super::status::StatusCode;

/// Estrategia de body de una respuesta
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Sin body: se envían solo los headers
    Empty,

    /// Contenido en memoria (texto o bytes)
    Text(Vec<u8>),

    /// Archivo relativo al docroot; el path pasa por el sanitizador
    /// antes de tocar el filesystem
    FileRel(String),

    /// Archivo con path absoluto; no se sanitiza (el handler que lo usa
    /// es de confianza)
    FileAbs(String),
}

/// Representa una respuesta HTTP/1.1 completa
///
/// La puebla el handler que matcheó el request; el servidor la
/// serializa, la transmite y la descarta.
#[derive(Debug)]
pub struct Response {
    /// Código de estado HTTP (200, 404, etc.)
    status: StatusCode,

    /// Headers en orden de inserción
    headers: HeaderList,

    /// Cookies a emitir como `set-cookie`, en orden de inserción
    cookies: Vec<CookieEntry>,

    /// Estrategia y contenido del body
    body: Body,
}

impl Response {
    /// Crea una respuesta vacía con estado 200 OK
    pub fn new() -> Self {
        Self {
            status: StatusCode::Ok,
            headers: HeaderList::new(),
            cookies: Vec::new(),
            body: Body::Empty,
        }
    }

    /// Cambia el código de estado
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Obtiene el código de estado
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Agrega un header validando el nombre del campo
    ///
    /// # Errores
    ///
    /// Un nombre con caracteres prohibidos (control, espacio,
    /// separadores HTTP) se rechaza con `HeaderError::InvalidName`;
    /// nunca se escapa ni se descarta en silencio.
    pub fn add_header(&mut self, field: &str, value: &str) -> Result<(), HeaderError> {
        self.headers.add(field, value)
    }

    /// Agrega un header propio del servidor (nombres ya conocidos)
    pub(crate) fn push_header(&mut self, field: &str, value: &str) {
        self.headers.push(field.to_string(), value.to_string());
    }

    /// Busca el primer header con ese nombre (case-insensitive)
    pub fn header(&self, field: &str) -> Option<&str> {
        self.headers.get(field)
    }

    /// Obtiene una referencia a los headers
    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    /// Agrega una cookie que se emitirá como `set-cookie: campo=valor`
    pub fn add_cookie(&mut self, field: &str, value: &str) {
        self.cookies.push(CookieEntry::new(field, value));
    }

    /// Cookies a emitir, en orden de inserción
    pub fn cookies(&self) -> &[CookieEntry] {
        &self.cookies
    }

    /// Establece un body de texto
    ///
    /// Si el handler no agrega `content-type`, el servidor usa
    /// `text/plain` al transmitir.
    pub fn set_body_text(&mut self, text: &str) {
        self.body = Body::Text(text.as_bytes().to_vec());
    }

    /// Establece un body de bytes (imágenes, binarios, etc.)
    pub fn set_body_bytes(&mut self, bytes: Vec<u8>) {
        self.body = Body::Text(bytes);
    }

    /// Establece como body un archivo relativo al docroot
    pub fn set_body_file_rel(&mut self, path: &str) {
        self.body = Body::FileRel(path.to_string());
    }

    /// Establece como body un archivo con path absoluto
    pub fn set_body_file_abs(&mut self, path: &str) {
        self.body = Body::FileAbs(path.to_string());
    }

    /// Obtiene la estrategia de body actual
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Extrae el body dejando la respuesta vacía (uso del transmisor)
    pub(crate) fn take_body(&mut self) -> Body {
        std::mem::replace(&mut self.body, Body::Empty)
    }

    /// Serializa el bloque de headers listo para enviar por el socket
    ///
    /// Status line, headers en orden de inserción, una línea
    /// `set-cookie` por cookie, y la línea vacía final.
    pub fn header_block(&self) -> Vec<u8> {
        let mut result = Vec::new();

        // 1. Status line
        let status_line = format!("HTTP/1.1 {}\r\n", self.status);
        result.extend_from_slice(status_line.as_bytes());

        // 2. Headers en orden de inserción
        for header in self.headers.iter() {
            let line = format!("{}: {}\r\n", header.field, header.value);
            result.extend_from_slice(line.as_bytes());
        }

        // 3. Cookies
        for cookie in &self.cookies {
            let line = format!("set-cookie: {}={}\r\n", cookie.field, cookie.value);
            result.extend_from_slice(line.as_bytes());
        }

        // 4. Línea vacía que cierra el bloque
        result.extend_from_slice(b"\r\n");
        result
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_response() {
        let response = Response::new();
        assert_eq!(response.status(), StatusCode::Ok);
        assert!(response.headers().is_empty());
        assert_eq!(response.body(), &Body::Empty);
    }

    #[test]
    fn test_add_header_and_lookup() {
        let mut response = Response::new();
        response.add_header("content-type", "text/html").unwrap();
        response.add_header("x-custom", "value").unwrap();

        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.header("X-Custom"), Some("value"));
    }

    #[test]
    fn test_invalid_header_name_is_rejected() {
        let mut response = Response::new();
        let result = response.add_header("bad name", "x");
        assert!(result.is_err());
        assert!(response.headers().is_empty());
    }

    #[test]
    fn test_body_setters() {
        let mut response = Response::new();
        response.set_body_text("hola");
        assert_eq!(response.body(), &Body::Text(b"hola".to_vec()));

        response.set_body_file_rel("/static/logo.png");
        assert_eq!(response.body(), &Body::FileRel("/static/logo.png".to_string()));

        response.set_body_file_abs("/var/www/logo.png");
        assert_eq!(response.body(), &Body::FileAbs("/var/www/logo.png".to_string()));
    }

    #[test]
    fn test_header_block_format() {
        let mut response = Response::new();
        response.add_header("content-type", "text/plain").unwrap();
        response.add_header("content-length", "4").unwrap();

        let text = String::from_utf8(response.header_block()).unwrap();
        assert_eq!(
            text,
            "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 4\r\n\r\n"
        );
    }

    #[test]
    fn test_header_block_preserves_insertion_order() {
        let mut response = Response::new();
        response.add_header("b-segundo", "2").unwrap();
        response.add_header("a-primero", "1").unwrap();

        let text = String::from_utf8(response.header_block()).unwrap();
        let b_pos = text.find("b-segundo").unwrap();
        let a_pos = text.find("a-primero").unwrap();
        assert!(b_pos < a_pos);
    }

    #[test]
    fn test_header_block_includes_cookies_in_order() {
        let mut response = Response::new();
        response.set_status(StatusCode::NotFound);
        response.add_cookie("session", "abc");
        response.add_cookie("theme", "dark");

        let text = String::from_utf8(response.header_block()).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("set-cookie: session=abc\r\n"));
        assert!(text.contains("set-cookie: theme=dark\r\n"));
        assert!(text.find("session").unwrap() < text.find("theme").unwrap());
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_take_body_leaves_empty() {
        let mut response = Response::new();
        response.set_body_text("algo");
        assert_eq!(response.take_body(), Body::Text(b"algo".to_vec()));
        assert_eq!(response.body(), &Body::Empty);
    }
}
