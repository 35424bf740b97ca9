//! # Sanitizador de Paths
//! src/server/path.rs
//!
//! Canonicaliza un path controlado por el cliente de forma puramente
//! léxica, sin tocar el filesystem: resuelve `.`, `..` y separadores
//! repetidos en una sola pasada de izquierda a derecha.
//!
//! El invariante de seguridad es que el resultado nunca contiene `..`
//! como componente. Por eso el servidor siempre antepone el docroot al
//! resultado (y nunca al revés): un path craftedo no puede escapar del
//! docroot.
//!
//! ## Ejemplos
//!
//! ```text
//! /a/../b   →  /b
//! /a/./b    →  /a/b
//! //a///b   →  /a/b
//! /a/..     →  /
//! ```

/// Canonicaliza `path` resolviendo `.`, `..` y separadores repetidos
///
/// Los espacios iniciales se saltean antes de procesar. Un `..` rebobina
/// hasta antes del componente anterior, nunca más atrás del inicio (la
/// raíz es el piso). Un separador final se conserva. La función es
/// idempotente.
///
/// # Ejemplo
/// ```
/// use redunix_http::server::path::sanitize;
///
/// assert_eq!(sanitize("/a/../b"), "/b");
/// assert_eq!(sanitize("/a/.."), "/");
/// ```
pub fn sanitize(path: &str) -> String {
    let bytes = path.as_bytes();
    let len = bytes.len();

    /* saltear espacios iniciales */
    let mut start = 0;
    while start < len && bytes[start] == b' ' {
        start += 1;
    }
    /* "./" y "../" al comienzo se descartan de entrada */
    if start < len && bytes[start] == b'.' {
        if start + 1 >= len || bytes[start + 1] == b'/' {
            start += 1;
        } else if bytes[start + 1] == b'.' && (start + 2 >= len || bytes[start + 2] == b'/') {
            start += 2;
        }
    }

    /* buffer de salida con cursor explícito: el rebobinado de ".."
     * necesita conservar bytes ya escritos más allá del cursor */
    let mut buf = vec![0u8; len + 1];
    let mut out = 0usize; // cursor de escritura
    let mut slash = 0usize; // inicio del componente en curso

    let mut pre1 = 0u8;
    let mut pre2;
    let mut walk = start;
    let mut c = if walk < len { bytes[walk] } else { 0 };
    walk += 1;

    while c != 0 {
        pre2 = pre1;
        pre1 = c;
        c = if walk < len { bytes[walk] } else { 0 };
        buf[out] = pre1;
        out += 1;
        walk += 1;

        if c == b'/' || c == 0 {
            let toklen = out - slash;
            if toklen == 3 && pre2 == b'.' && pre1 == b'.' && buf[slash] == b'/' {
                /* "/../": rebobinar hasta antes del componente anterior,
                 * sin pasar el inicio */
                out = slash;
                if out > 0 {
                    out -= 1;
                    while out > 0 && buf[out] != b'/' {
                        out -= 1;
                    }
                }
                /* conservar el separador final al cierre del path */
                if c == 0 {
                    out += 1;
                }
            } else if toklen == 1 || (pre2 == b'/' && pre1 == b'.') {
                /* "//" o "/./": el componente colapsa a nada */
                out = slash;
                if c == 0 {
                    out += 1;
                }
            }
            slash = out;
        }
    }

    String::from_utf8_lossy(&buf[..out]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotdot_removes_previous_component() {
        assert_eq!(sanitize("/a/../b"), "/b");
        assert_eq!(sanitize("/blah/../foo"), "/foo");
    }

    #[test]
    fn test_single_dot_collapses() {
        assert_eq!(sanitize("/a/./b"), "/a/b");
        assert_eq!(sanitize("/abc/./xyz"), "/abc/xyz");
    }

    #[test]
    fn test_repeated_separators_collapse() {
        assert_eq!(sanitize("//a///b"), "/a/b");
        assert_eq!(sanitize("/abc//xyz"), "/abc/xyz");
    }

    #[test]
    fn test_trailing_dotdot_floors_at_root() {
        assert_eq!(sanitize("/a/.."), "/");
        assert_eq!(sanitize("/blah/.."), "/");
        assert_eq!(sanitize("/a/b/../.."), "/");
        assert_eq!(sanitize("/a/../../.."), "/");
    }

    #[test]
    fn test_empty_string_stays_empty() {
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_leading_spaces_are_skipped() {
        assert_eq!(sanitize("   /a/b"), "/a/b");
    }

    #[test]
    fn test_trailing_separator_preserved() {
        assert_eq!(sanitize("/a/b/"), "/a/b/");
        assert_eq!(sanitize("/a/./"), "/a/");
    }

    #[test]
    fn test_leading_dot_segments_are_stripped() {
        assert_eq!(sanitize("./a"), "/a");
        assert_eq!(sanitize("../a"), "/a");
    }

    #[test]
    fn test_result_never_contains_dotdot_component() {
        let nasty = [
            "/../../../../etc/passwd",
            "/a/../../b/../../c",
            "/..%2f..", // ya decodificado esto sería otra cosa; acá es literal
            "/a/b/../../../..",
            "/....//a",
            "/. ./a",
            "/..a/b",
            "a/../..",
            "/./../x",
        ];
        for input in nasty {
            let clean = sanitize(input);
            assert!(
                !clean.split('/').any(|seg| seg == ".."),
                "sanitize({:?}) = {:?} contiene '..'",
                input,
                clean
            );
        }
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "/a/../b",
            "/a/./b",
            "//a///b",
            "/a/..",
            "/a/b/",
            "",
            "   /x/../y",
            "/..a/b",
            "/a.b/c",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "no idempotente para {:?}", input);
        }
    }

    #[test]
    fn test_dots_inside_names_survive() {
        assert_eq!(sanitize("/archivo.tar.gz"), "/archivo.tar.gz");
        assert_eq!(sanitize("/..a/b"), "/..a/b");
        assert_eq!(sanitize("/a../b"), "/a../b");
    }

    #[test]
    fn test_utf8_components_survive() {
        assert_eq!(sanitize("/ñandú/./página"), "/ñandú/página");
    }
}
