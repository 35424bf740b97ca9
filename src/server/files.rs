//! # Archivos Estáticos
//! src/server/files.rs
//!
//! Resolución de archivos bajo el docroot y transferencia al socket.
//! La transferencia usa `sendfile()` del kernel cuando está configurado
//! (copia archivo→socket sin pasar por espacio de usuario), o un loop de
//! lectura/envío con buffer acotado.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::Path;

/// Tamaño del buffer del loop de envío
const SEND_BUFFER_SIZE: usize = 4096;

/// Información básica de un archivo resuelto
///
/// Se calcula por request, nunca se cachea.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStats {
    /// El path existe y es un archivo regular o un directorio
    pub found: bool,

    /// El path es un directorio
    pub is_dir: bool,

    /// Tamaño en bytes (solo para archivos regulares)
    pub size: u64,
}

/// Consulta qué hay en `path`
///
/// Cualquier cosa que no sea archivo regular ni directorio (sockets,
/// fifos, etc.) se reporta como no encontrada.
pub fn file_stats(path: &str) -> FileStats {
    match fs::metadata(path) {
        Ok(md) if md.is_dir() => FileStats {
            found: true,
            is_dir: true,
            size: 0,
        },
        Ok(md) if md.is_file() => FileStats {
            found: true,
            is_dir: false,
            size: md.len(),
        },
        _ => FileStats::default(),
    }
}

/// Content-Type a partir de la extensión del archivo
pub fn mime_for_path(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some(ext) => mime_guess::from_ext(ext)
            .first_raw()
            .unwrap_or("application/octet-stream"),
        None => "application/octet-stream",
    }
}

/// Envía el contenido completo del archivo por el socket
///
/// Itera sobre envíos parciales hasta cubrir los `size` bytes
/// anunciados en `content-length`. Cualquier error es fatal para la
/// conexión: el que llama cierra el socket, no hay reintentos.
pub fn send_file(
    stream: &mut TcpStream,
    path: &str,
    size: u64,
    use_sendfile: bool,
) -> io::Result<()> {
    if use_sendfile {
        sendfile_loop(stream, path, size)
    } else {
        buffered_loop(stream, path, size)
    }
}

/// Loop de lectura/envío con buffer acotado
fn buffered_loop(stream: &mut TcpStream, path: &str, size: u64) -> io::Result<()> {
    let mut file = File::open(path)?;
    let mut buf = [0u8; SEND_BUFFER_SIZE];
    let mut sent: u64 = 0;
    while sent < size {
        let n = file.read(&mut buf)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "File shorter than the announced content-length",
            ));
        }
        stream.write_all(&buf[..n])?;
        sent += n as u64;
    }
    Ok(())
}

/// Transferencia archivo→socket dentro del kernel
#[cfg(target_os = "linux")]
fn sendfile_loop(stream: &mut TcpStream, path: &str, size: u64) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let file = File::open(path)?;
    let mut offset: libc::off_t = 0;
    let mut sent: u64 = 0;
    while sent < size {
        let remaining = (size - sent) as usize;
        let n = unsafe {
            libc::sendfile(stream.as_raw_fd(), file.as_raw_fd(), &mut offset, remaining)
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "File shorter than the announced content-length",
            ));
        }
        sent += n as u64;
    }
    Ok(())
}

/* fuera de linux no hay sendfile(): siempre el loop con buffer */
#[cfg(not(target_os = "linux"))]
fn sendfile_loop(stream: &mut TcpStream, path: &str, size: u64) -> io::Result<()> {
    buffered_loop(stream, path, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir(name: &str) -> String {
        let dir = std::env::temp_dir().join(format!(
            "redunix_files_{}_{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir.to_string_lossy().into_owned()
    }

    #[test]
    fn test_file_stats_regular_file() {
        let dir = temp_dir("regular");
        let path = format!("{}/data.txt", dir);
        fs::write(&path, b"contenido").unwrap();

        let stats = file_stats(&path);
        assert!(stats.found);
        assert!(!stats.is_dir);
        assert_eq!(stats.size, 9);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_file_stats_directory() {
        let dir = temp_dir("dir");
        let stats = file_stats(&dir);
        assert!(stats.found);
        assert!(stats.is_dir);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_file_stats_missing() {
        let stats = file_stats("/no/existe/en/ningun/lado");
        assert!(!stats.found);
        assert!(!stats.is_dir);
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path("/www/index.html"), "text/html");
        assert_eq!(mime_for_path("/www/style.css"), "text/css");
        assert_eq!(mime_for_path("/www/foto.png"), "image/png");
        assert_eq!(mime_for_path("/www/archivo.xyzdesconocido"), "application/octet-stream");
        assert_eq!(mime_for_path("/www/sin_extension"), "application/octet-stream");
    }
}
