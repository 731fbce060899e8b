//! Output resolution.
//!
//! A completed run's output file can be taken three ways: as the filesystem
//! path, as an open readable handle, or as the raw bytes. The modes are a
//! tagged enum with exhaustive dispatch; the string form survives only at
//! the configuration boundary.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the caller wants the run's output back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnMode {
    /// The output file's path; the caller owns deletion.
    #[default]
    Path,
    /// An open binary-read handle; the caller owns closing it and, by
    /// convention, leaves the path in place while the handle is open.
    Handle,
    /// The raw bytes; the underlying file is deleted after reading. The
    /// only mode that eagerly reclaims the temporary file.
    Contents,
}

impl FromStr for ReturnMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "path" => Ok(ReturnMode::Path),
            "handle" => Ok(ReturnMode::Handle),
            "contents" => Ok(ReturnMode::Contents),
            other => Err(Error::InvalidReturnMode(other.to_string())),
        }
    }
}

/// Resolved output, one variant per [`ReturnMode`].
#[derive(Debug)]
pub enum Output {
    Path(PathBuf),
    Handle(File),
    Contents(Vec<u8>),
}

/// Resolve an output file according to `mode`.
pub fn resolve(path: &Path, mode: ReturnMode) -> Result<Output> {
    match mode {
        ReturnMode::Path => Ok(Output::Path(path.to_path_buf())),
        ReturnMode::Handle => Ok(Output::Handle(File::open(path)?)),
        ReturnMode::Contents => {
            let bytes = std::fs::read(path)?;
            std::fs::remove_file(path)?;
            Ok(Output::Contents(bytes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn output_file(contents: &[u8]) -> tempfile::TempPath {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), contents).unwrap();
        file.into_temp_path()
    }

    #[test]
    fn test_path_mode_returns_path_with_contents_intact() {
        let path = output_file(b"output");

        let resolved = resolve(&path, ReturnMode::Path).unwrap();
        let Output::Path(returned) = resolved else {
            panic!("expected Output::Path");
        };

        assert_eq!(returned, path.to_path_buf());
        assert_eq!(std::fs::read(&returned).unwrap(), b"output");
    }

    #[test]
    fn test_handle_mode_returns_open_readable_handle() {
        let path = output_file(b"output");

        let resolved = resolve(&path, ReturnMode::Handle).unwrap();
        let Output::Handle(mut handle) = resolved else {
            panic!("expected Output::Handle");
        };

        let mut contents = Vec::new();
        handle.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"output");
        // The path is untouched in handle mode.
        assert!(path.exists());
    }

    #[test]
    fn test_contents_mode_returns_bytes_and_deletes_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"output").unwrap();
        // Detach so the assertion below observes resolve's deletion, not
        // the temp file's own cleanup.
        let path = file.into_temp_path().keep().unwrap();

        let resolved = resolve(&path, ReturnMode::Contents).unwrap();
        let Output::Contents(contents) = resolved else {
            panic!("expected Output::Contents");
        };

        assert_eq!(contents, b"output");
        assert!(!path.exists());
    }

    #[test]
    fn test_unknown_mode_string_is_invalid() {
        let err = "invalid".parse::<ReturnMode>().unwrap_err();
        assert!(matches!(err, Error::InvalidReturnMode(ref v) if v == "invalid"));
        let message = err.to_string();
        assert!(message.contains("'path'"));
        assert!(message.contains("'handle'"));
        assert!(message.contains("'contents'"));
    }

    #[test]
    fn test_mode_strings_round_trip() {
        for (text, mode) in [
            ("path", ReturnMode::Path),
            ("handle", ReturnMode::Handle),
            ("contents", ReturnMode::Contents),
        ] {
            assert_eq!(text.parse::<ReturnMode>().unwrap(), mode);
        }
    }
}
