//! # Configuración del Servidor
//! src/config.rs
//!
//! Este módulo define la configuración del servidor HTTP con soporte
//! para argumentos CLI y variables de entorno.
//!
//! La configuración queda inmutable una vez que el servidor arranca;
//! los threads de conexión la comparten en modo solo-lectura.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./redunix_http --port 8080 \
//!   --docroot ./www \
//!   --default-file index.html \
//!   --sendfile
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 HTTP_DOCROOT=/srv/www ./redunix_http
//! ```

use clap::Parser;

/// Configuración del servidor HTTP/1.1
#[derive(Debug, Clone, Parser)]
#[command(name = "redunix_http")]
#[command(about = "Servidor HTTP/1.1 embebible con rutas y archivos estáticos")]
#[command(version = "0.1.0")]
pub struct ServerConfig {
    /// Puerto en el que escucha el servidor (0 = puerto efímero)
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Directorio raíz del que se sirven los archivos estáticos
    #[arg(long, default_value = "./www", env = "HTTP_DOCROOT")]
    pub docroot: String,

    /// Archivo que se sirve cuando el path resuelve a un directorio
    #[arg(long = "default-file", default_value = "index.html", env = "HTTP_DEFAULT_FILE")]
    pub default_file: String,

    /// Backlog del socket de escucha
    #[arg(long, default_value = "10", env = "HTTP_BACKLOG")]
    pub backlog: i32,

    /// Usar sendfile() del kernel para transferir archivos
    #[arg(long = "sendfile", env = "HTTP_SENDFILE")]
    pub use_sendfile: bool,

    /// Timeout de cada espera de lectura del socket, en segundos
    #[arg(long = "read-timeout", default_value = "5", env = "HTTP_READ_TIMEOUT")]
    pub read_timeout_secs: u64,
}

impl ServerConfig {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        ServerConfig::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use redunix_http::config::ServerConfig;
    ///
    /// let config = ServerConfig::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("Host must not be empty".to_string());
        }
        if self.docroot.is_empty() {
            return Err("Docroot must not be empty".to_string());
        }
        if self.default_file.is_empty() {
            return Err("Default file must not be empty".to_string());
        }
        if self.backlog < 1 {
            return Err("Backlog must be >= 1".to_string());
        }
        if self.read_timeout_secs == 0 {
            return Err("Read timeout must be > 0".to_string());
        }
        Ok(())
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════╗");
        println!("║        RedUnix HTTP/1.1 Configuration        ║");
        println!("╚══════════════════════════════════════════════╝");
        println!();
        println!("🌐 Network:");
        println!("   Address:       {}", self.address());
        println!("   Backlog:       {}", self.backlog);
        println!("   Read timeout:  {} s", self.read_timeout_secs);
        println!();
        println!("📁 Static files:");
        println!("   Docroot:       {}", self.docroot);
        println!("   Default file:  {}", self.default_file);
        if self.use_sendfile {
            println!("   Transfer:      sendfile (zero-copy)");
        } else {
            println!("   Transfer:      buffered read/send");
        }
        println!();
        println!("════════════════════════════════════════════════");
        println!();
    }
}

impl Default for ServerConfig {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            docroot: "./www".to_string(),
            default_file: "index.html".to_string(),
            backlog: 10,
            use_sendfile: false,
            read_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.docroot, "./www");
        assert_eq!(config.default_file, "index.html");
        assert_eq!(config.backlog, 10);
        assert!(!config.use_sendfile);
        assert_eq!(config.read_timeout_secs, 5);
    }

    #[test]
    fn test_address() {
        let config = ServerConfig::default();
        assert_eq!(config.address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_address_custom() {
        let mut config = ServerConfig::default();
        config.host = "0.0.0.0".to_string();
        config.port = 3000;
        assert_eq!(config.address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_validate_success() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
    }

    // ==================== Network Validation ====================

    #[test]
    fn test_validate_empty_host() {
        let mut config = ServerConfig::default();
        config.host = String::new();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Host"));
    }

    #[test]
    fn test_validate_invalid_backlog() {
        let mut config = ServerConfig::default();
        config.backlog = 0;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Backlog"));
    }

    #[test]
    fn test_validate_invalid_timeout() {
        let mut config = ServerConfig::default();
        config.read_timeout_secs = 0;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Read timeout"));
    }

    // ==================== Files Validation ====================

    #[test]
    fn test_validate_empty_docroot() {
        let mut config = ServerConfig::default();
        config.docroot = String::new();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Docroot"));
    }

    #[test]
    fn test_validate_empty_default_file() {
        let mut config = ServerConfig::default();
        config.default_file = String::new();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Default file"));
    }

    // ==================== Custom Values ====================

    #[test]
    fn test_config_custom_values() {
        let mut config = ServerConfig::default();
        config.port = 3000;
        config.host = "0.0.0.0".to_string();
        config.docroot = "/srv/www".to_string();
        config.backlog = 128;
        config.use_sendfile = true;

        assert_eq!(config.port, 3000);
        assert_eq!(config.docroot, "/srv/www");
        assert!(config.use_sendfile);
        assert!(config.validate().is_ok());
    }

    // ==================== Print Summary ====================

    #[test]
    fn test_config_print_summary() {
        let config = ServerConfig::default();
        // Should not panic
        config.print_summary();
    }

    #[test]
    fn test_config_print_summary_with_sendfile() {
        let mut config = ServerConfig::default();
        config.use_sendfile = true;
        // Should not panic
        config.print_summary();
    }
}
