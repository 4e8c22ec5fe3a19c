use std::path::PathBuf;

/// Failure category reported by an engine binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    NotFound,
    InvalidPath,
    Corruption,
    Io,
    Other,
}

/// Raw engine failure, before the session classifies it
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Structured kind first; message text only as a fallback for bindings
    /// that report corruption as a generic error
    pub fn is_corruption(&self) -> bool {
        self.kind == EngineErrorKind::Corruption
            || self.message.to_lowercase().contains("corrupt")
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => EngineErrorKind::NotFound,
            _ => EngineErrorKind::Io,
        };
        Self::new(kind, err.to_string())
    }
}

/// Why a store could not be opened
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpenError {
    #[error("Database not found")]
    NotFound { path: PathBuf },

    #[error("Not a database directory ({reason})")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("Corruption: {message}")]
    Corruption { path: PathBuf, message: String },

    #[error("{message}")]
    Other { path: PathBuf, message: String },
}

impl OpenError {
    /// Convert an engine failure into the session's taxonomy
    pub fn classify(path: PathBuf, err: EngineError) -> Self {
        if err.is_corruption() {
            return OpenError::Corruption {
                path,
                message: err.message,
            };
        }

        match err.kind {
            EngineErrorKind::NotFound => OpenError::NotFound { path },
            EngineErrorKind::InvalidPath => OpenError::InvalidPath {
                path,
                reason: err.message,
            },
            EngineErrorKind::Corruption | EngineErrorKind::Io | EngineErrorKind::Other => {
                OpenError::Other {
                    path,
                    message: err.message,
                }
            }
        }
    }

    pub fn is_corruption(&self) -> bool {
        matches!(self, OpenError::Corruption { .. })
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            OpenError::NotFound { path }
            | OpenError::InvalidPath { path, .. }
            | OpenError::Corruption { path, .. }
            | OpenError::Other { path, .. } => path,
        }
    }
}

/// The repair procedure itself failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Repair failed: {message}")]
pub struct RepairError {
    pub path: PathBuf,
    pub message: String,
}
