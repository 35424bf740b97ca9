//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa la capa de red y archivos del servidor:
//!
//! 1. Escucha en host:port con backlog configurable
//! 2. Acepta conexiones y lanza un thread por cada una
//! 3. Corre la máquina de estados de cada conexión (recibir → rutear →
//!    responder, con keep-alive)
//! 4. Sirve archivos estáticos bajo el docroot, con el path siempre
//!    sanitizado antes de tocar el filesystem

pub mod files;
pub mod path;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use tcp::{Server, ServerState};
