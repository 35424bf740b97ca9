//! # Registro de Handlers y Dispatch
//! src/router/mod.rs
//!
//! Este módulo implementa el registro de rutas y el dispatch de
//! requests a handlers.
//!
//! ## Arquitectura
//!
//! ```text
//! Request → Router → Handler → Response
//! ```
//!
//! Hay dos tipos de ruta: de path exacto y de patrón regex. Ambas
//! llevan una máscara de métodos: una ruta solo se considera si el bit
//! del método del request está encendido. Las rutas se prueban en orden
//! de registro y gana la primera que matchea; ese orden es parte del
//! contrato observable.
//!
//! Si ninguna ruta matchea y el método es GET o HEAD, el request cae al
//! handler por defecto que sirve el path como archivo bajo el docroot.

use crate::http::{Method, MethodSet, Request, Response, StatusCode};
use regex::Regex;

/// Máxima cantidad de grupos de captura que se exponen a un handler regex
const MAX_REGEX_MATCHES: usize = 10;

/// Resultado que retorna un handler
///
/// Un `Err` hace que el servidor responda 500; la conexión continúa.
pub type HandlerResult = Result<(), String>;

/// Handler de ruta exacta
pub type SimpleHandler = Box<dyn Fn(&Request, &mut Response) -> HandlerResult + Send + Sync>;

/// Handler de ruta regex
///
/// Recibe además los grupos capturados: el índice 0 es el match
/// completo y siguen las capturas de izquierda a derecha.
pub type RegexHandler =
    Box<dyn Fn(&Request, &mut Response, &[String]) -> HandlerResult + Send + Sync>;

/// Patrón de una ruta junto con su callback
enum RouteKind {
    Exact {
        path: String,
        handler: SimpleHandler,
    },
    Regex {
        pattern: Regex,
        handler: RegexHandler,
    },
}

/// Una ruta registrada: métodos aceptados + patrón + callback
///
/// El patrón es inmutable después del registro.
struct Route {
    methods: MethodSet,
    kind: RouteKind,
}

/// Resultado del dispatch de un request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Un handler atendió el request y pobló la respuesta
    Ok,

    /// El handler que matcheó reportó un error (el servidor responde 500)
    HandlerError,

    /// Ningún handler matcheó y el método no permite servir archivos
    /// (el servidor responde 404)
    NoMatch,
}

/// Router que mapea paths a handlers en orden de registro
///
/// El registro requiere acceso exclusivo; el dispatch corre bajo acceso
/// compartido (el servidor lo envuelve en un RwLock).
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Crea un router vacío
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registra una ruta de path exacto
    ///
    /// El path se compara por igualdad de bytes contra el path
    /// decodificado del request.
    ///
    /// # Ejemplo
    /// ```
    /// use redunix_http::router::Router;
    /// use redunix_http::http::Method;
    ///
    /// let mut router = Router::new();
    /// router.register_exact(Method::GET, "/hello", |_req, res| {
    ///     res.set_body_text("hi");
    ///     Ok(())
    /// });
    /// ```
    pub fn register_exact<F>(&mut self, methods: impl Into<MethodSet>, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.routes.push(Route {
            methods: methods.into(),
            kind: RouteKind::Exact {
                path: path.to_string(),
                handler: Box::new(handler),
            },
        });
    }

    /// Registra una ruta regex
    ///
    /// El patrón se compila acá: si no compila, el registro falla
    /// completo y el router queda como estaba.
    ///
    /// # Ejemplo
    /// ```
    /// use redunix_http::router::Router;
    /// use redunix_http::http::Method;
    ///
    /// let mut router = Router::new();
    /// router
    ///     .register_regex(Method::GET, "^/user/([0-9]+)$", |_req, res, args| {
    ///         res.set_body_text(&format!("user {}", args[1]));
    ///         Ok(())
    ///     })
    ///     .unwrap();
    /// ```
    pub fn register_regex<F>(
        &mut self,
        methods: impl Into<MethodSet>,
        pattern: &str,
        handler: F,
    ) -> Result<(), regex::Error>
    where
        F: Fn(&Request, &mut Response, &[String]) -> HandlerResult + Send + Sync + 'static,
    {
        let compiled = Regex::new(pattern)?;
        self.routes.push(Route {
            methods: methods.into(),
            kind: RouteKind::Regex {
                pattern: compiled,
                handler: Box::new(handler),
            },
        });
        Ok(())
    }

    /// Cantidad de rutas registradas
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Verifica si no hay rutas registradas
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Busca y ejecuta el handler apropiado para un request completo
    ///
    /// Recorre las rutas en orden de registro, saltea las que excluyen
    /// el método del request, y ejecuta la primera que matchea. Sin
    /// match, un GET/HEAD cae al handler de archivos por defecto y
    /// cualquier otro método reporta `NoMatch`.
    pub fn dispatch(&self, request: &Request, response: &mut Response) -> Dispatch {
        let method = match request.method() {
            Some(m) => m,
            None => return Dispatch::NoMatch,
        };

        for route in &self.routes {
            if !route.methods.contains(method) {
                continue;
            }
            match &route.kind {
                RouteKind::Exact { path, handler } => {
                    if path == request.path() {
                        return run_handler(|| handler(request, response));
                    }
                }
                RouteKind::Regex { pattern, handler } => {
                    if let Some(captures) = pattern.captures(request.path()) {
                        let args = collect_captures(&captures);
                        return run_handler(|| handler(request, response, &args));
                    }
                }
            }
        }

        /* sin ruta: GET/HEAD intentan servir un archivo del docroot */
        if method == Method::GET || method == Method::HEAD {
            return run_handler(|| default_file_handler(request, response));
        }
        Dispatch::NoMatch
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn run_handler(f: impl FnOnce() -> HandlerResult) -> Dispatch {
    match f() {
        Ok(()) => Dispatch::Ok,
        Err(e) => {
            eprintln!("   ❌ Handler error: {}", e);
            Dispatch::HandlerError
        }
    }
}

/// Arma la lista ordenada de capturas: índice 0 = match completo
///
/// Se corta en el primer grupo sin match y a las `MAX_REGEX_MATCHES`
/// entradas.
fn collect_captures(captures: &regex::Captures) -> Vec<String> {
    captures
        .iter()
        .take(MAX_REGEX_MATCHES)
        .map_while(|m| m.map(|m| m.as_str().to_string()))
        .collect()
}

/// Handler por defecto: sirve el path del request como archivo relativo
/// al docroot
pub fn default_file_handler(request: &Request, response: &mut Response) -> HandlerResult {
    response.set_status(StatusCode::Ok);
    response.set_body_file_rel(request.path());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Body;

    fn make_request(raw: &[u8]) -> Request {
        let mut request = Request::new("test");
        assert!(request.feed(raw).unwrap());
        request
    }

    #[test]
    fn test_router_creation() {
        let router = Router::new();
        assert!(router.is_empty());
    }

    #[test]
    fn test_exact_route_found() {
        let mut router = Router::new();
        router.register_exact(Method::GET, "/test", |_req, res| {
            res.set_body_text("ok");
            Ok(())
        });

        let request = make_request(b"GET /test HTTP/1.1\r\n\r\n");
        let mut response = Response::new();
        assert_eq!(router.dispatch(&request, &mut response), Dispatch::Ok);
        assert_eq!(response.body(), &Body::Text(b"ok".to_vec()));
    }

    #[test]
    fn test_method_mask_excludes_route() {
        let mut router = Router::new();
        router.register_exact(Method::GET, "/solo-get", |_req, res| {
            res.set_body_text("get");
            Ok(())
        });

        // un POST al mismo path literal no matchea la ruta GET, y POST
        // tampoco cae al servidor de archivos
        let request = make_request(b"POST /solo-get HTTP/1.1\r\ncontent-length: 0\r\n\r\n");
        let mut response = Response::new();
        assert_eq!(router.dispatch(&request, &mut response), Dispatch::NoMatch);
    }

    #[test]
    fn test_first_registered_route_wins() {
        let mut router = Router::new();
        router
            .register_regex(Method::GET, "^/r/.*$", |_req, res, _args| {
                res.set_body_text("primera");
                Ok(())
            })
            .unwrap();
        router
            .register_regex(Method::GET, "^/r/x$", |_req, res, _args| {
                res.set_body_text("segunda");
                Ok(())
            })
            .unwrap();

        let request = make_request(b"GET /r/x HTTP/1.1\r\n\r\n");
        let mut response = Response::new();
        assert_eq!(router.dispatch(&request, &mut response), Dispatch::Ok);
        assert_eq!(response.body(), &Body::Text(b"primera".to_vec()));
    }

    #[test]
    fn test_regex_captures_with_whole_match_first() {
        let mut router = Router::new();
        router
            .register_regex(Method::GET, "^/echo/([^/]*)/([^/]*)$", |_req, res, args| {
                res.set_body_text(&args.join("|"));
                Ok(())
            })
            .unwrap();

        let request = make_request(b"GET /echo/abc/def HTTP/1.1\r\n\r\n");
        let mut response = Response::new();
        assert_eq!(router.dispatch(&request, &mut response), Dispatch::Ok);
        assert_eq!(
            response.body(),
            &Body::Text(b"/echo/abc/def|abc|def".to_vec())
        );
    }

    #[test]
    fn test_invalid_regex_fails_registration_atomically() {
        let mut router = Router::new();
        let result = router.register_regex(Method::GET, "^/([a-z$", |_req, _res, _args| Ok(()));
        assert!(result.is_err());
        assert!(router.is_empty());
    }

    #[test]
    fn test_handler_error_is_distinct_from_no_match() {
        let mut router = Router::new();
        router.register_exact(Method::GET, "/roto", |_req, _res| {
            Err("algo falló".to_string())
        });

        let request = make_request(b"GET /roto HTTP/1.1\r\n\r\n");
        let mut response = Response::new();
        assert_eq!(
            router.dispatch(&request, &mut response),
            Dispatch::HandlerError
        );
    }

    #[test]
    fn test_get_without_route_falls_back_to_file() {
        let router = Router::new();
        let request = make_request(b"GET /archivo.html HTTP/1.1\r\n\r\n");
        let mut response = Response::new();

        assert_eq!(router.dispatch(&request, &mut response), Dispatch::Ok);
        assert_eq!(
            response.body(),
            &Body::FileRel("/archivo.html".to_string())
        );
        assert_eq!(response.status(), StatusCode::Ok);
    }

    #[test]
    fn test_post_without_route_is_no_match() {
        let router = Router::new();
        let request = make_request(b"POST /nada HTTP/1.1\r\ncontent-length: 0\r\n\r\n");
        let mut response = Response::new();
        assert_eq!(router.dispatch(&request, &mut response), Dispatch::NoMatch);
    }

    #[test]
    fn test_regex_route_respects_method_mask() {
        let mut router = Router::new();
        router
            .register_regex(Method::PUT | Method::DELETE, "^/item/([0-9]+)$", |_req, res, args| {
                res.set_body_text(&format!("item {}", args[1]));
                Ok(())
            })
            .unwrap();

        let put = make_request(b"PUT /item/7 HTTP/1.1\r\ncontent-length: 0\r\n\r\n");
        let mut response = Response::new();
        assert_eq!(router.dispatch(&put, &mut response), Dispatch::Ok);
        assert_eq!(response.body(), &Body::Text(b"item 7".to_vec()));

        // GET no está en la máscara: cae al servidor de archivos
        let get = make_request(b"GET /item/7 HTTP/1.1\r\n\r\n");
        let mut response = Response::new();
        assert_eq!(router.dispatch(&get, &mut response), Dispatch::Ok);
        assert_eq!(response.body(), &Body::FileRel("/item/7".to_string()));
    }
}
