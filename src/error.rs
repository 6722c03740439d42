use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    Serialize(serde_json::Error),
    Io(std::io::Error),
    PersistFailed(String),
    EmptyPath,
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use StoreError::*;
        match self {
            Serialize(e) => Some(e),
            Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use StoreError::*;
        match self {
            Serialize(e) => write!(f, "Serialize: {}", e),
            Io(e) => write!(f, "Io: {}", e),
            PersistFailed(s) => write!(f, "PersistFailed: {}", s),
            EmptyPath => write!(f, "EmptyPath"),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialize(error)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        StoreError::Io(error)
    }
}
