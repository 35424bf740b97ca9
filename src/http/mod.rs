//! # Módulo HTTP
//!
//! Este módulo implementa la capa de protocolo HTTP/1.1 del servidor:
//!
//! - Parsing incremental de requests (sobre el tokenizador `httparse`)
//! - Construcción de responses con tres estrategias de body
//! - Lista ordenada de headers con validación de nombres
//! - Parser de cookies (máquina de estados explícita)
//! - Métodos y códigos de estado
//!
//! ### Formato de Request
//!
//! ```text
//! GET /path?query=value HTTP/1.1\r\n
//! header-name: Header-Value\r\n
//! \r\n
//! ```
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! content-type: application/json\r\n
//! content-length: 13\r\n
//! \r\n
//! {"ok": true}
//! ```

// Submódulos del módulo HTTP
pub mod cookie;
pub mod headers;
pub mod method;
pub mod request;
pub mod response;
pub mod status;

// Re-exportamos los tipos principales para facilitar su uso
// Esto permite usar `http::Request` en vez de `http::request::Request`
pub use cookie::{CookieEntry, CookieError};
pub use headers::{Header, HeaderError, HeaderList};
pub use method::{Method, MethodSet};
pub use request::{ParseError, ReceiveError, Request};
pub use response::{Body, Response};
pub use status::StatusCode;
