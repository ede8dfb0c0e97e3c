// Binary image loading. Grounded on original_source/main.c's file-size
// validation and fopen-failure handling (no interpretation of the bytes,
// just a verbatim copy into the front of memory).

use std::fmt;
use std::fs;

use crate::machine::IO_PORT_ADDRESS;

#[derive(Debug)]
pub enum LoadError {
    Unreadable(String),
    TooLarge { path: String, size: usize },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Unreadable(path) => write!(f, "Error: could not read file \"{}\".", path),
            LoadError::TooLarge { path, size } => write!(
                f,
                "Error: file \"{}\" is {} bytes, which exceeds the maximum program size of {} bytes.",
                path, size, IO_PORT_ADDRESS
            ),
        }
    }
}

/// Reads `path` and returns its bytes, verified to fit in `memory[0..IO_PORT_ADDRESS]`.
pub fn load_program(path: &str) -> Result<Vec<u8>, LoadError> {
    let bytes = fs::read(path).map_err(|_| LoadError::Unreadable(path.to_string()))?;
    if bytes.len() > IO_PORT_ADDRESS as usize {
        return Err(LoadError::TooLarge {
            path: path.to_string(),
            size: bytes.len(),
        });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_small_program() {
        let path = std::env::temp_dir().join("w16sim-loader-small.bin");
        fs::write(&path, [0x00, 0xA0]).unwrap();
        let bytes = load_program(path.to_str().unwrap()).unwrap();
        assert_eq!(bytes, vec![0x00, 0xA0]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn rejects_oversized_program() {
        let path = std::env::temp_dir().join("w16sim-loader-large.bin");
        fs::write(&path, vec![0u8; IO_PORT_ADDRESS as usize + 1]).unwrap();
        let err = load_program(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, LoadError::TooLarge { .. }));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn rejects_missing_file() {
        let err = load_program("/nonexistent/path/should/not/exist.bin").unwrap_err();
        assert!(matches!(err, LoadError::Unreadable(_)));
    }
}
