//! Error types shared by the score model, the builders and the MusicXML converters.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotationError {
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A builder was asked to build while it was already building.
    #[error("cyclic build dependency: {0}")]
    CyclicBuildDependency(String),

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("parsing {} failed: {message}", display_path(.path))]
    Parse {
        message: String,
        path: Option<PathBuf>,
    },

    #[error("i/o error on {}: {source}", display_path(.path))]
    Io {
        #[source]
        source: std::io::Error,
        path: Option<PathBuf>,
    },
}

impl NotationError {
    pub fn parse(message: impl Into<String>) -> Self {
        NotationError::Parse {
            message: message.into(),
            path: None,
        }
    }

    /// Attaches `path` to parse and i/o failures that do not carry one yet.
    pub fn with_path(self, path: impl Into<PathBuf>) -> Self {
        match self {
            NotationError::Parse { message, path: None } => NotationError::Parse {
                message,
                path: Some(path.into()),
            },
            NotationError::Io { source, path: None } => NotationError::Io {
                source,
                path: Some(path.into()),
            },
            other => other,
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            NotationError::Parse { path, .. } | NotationError::Io { path, .. } => path.as_ref(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NotationError {
    fn from(source: std::io::Error) -> Self {
        NotationError::Io { source, path: None }
    }
}

impl From<quick_xml::Error> for NotationError {
    fn from(e: quick_xml::Error) -> Self {
        NotationError::parse(format!("xml error: {}", e))
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => p.display().to_string(),
        None => "<input>".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, NotationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message_includes_path() {
        let err = NotationError::parse("unexpected end of document").with_path("scores/test.musicxml");
        let message = err.to_string();
        assert!(message.contains("scores/test.musicxml"), "got: {}", message);
        assert!(message.contains("unexpected end of document"));
        assert_eq!(err.path(), Some(&PathBuf::from("scores/test.musicxml")));
    }

    #[test]
    fn test_parse_error_without_path() {
        let err = NotationError::parse("bad root");
        assert_eq!(err.to_string(), "parsing <input> failed: bad root");
        assert!(err.path().is_none());
    }

    #[test]
    fn test_with_path_keeps_existing_path() {
        let err = NotationError::parse("x").with_path("a.xml").with_path("b.xml");
        assert_eq!(err.path(), Some(&PathBuf::from("a.xml")));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: NotationError = io.into();
        assert!(matches!(err, NotationError::Io { .. }));
    }
}
