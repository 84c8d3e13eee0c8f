use std::fmt::{self, Display};

/// Errors produced by model parsers and constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    InvalidDimensions(String),
    UnknownExportFormat(String),
    UnknownProvider(String),
    UnknownArtworkKind(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidDimensions(raw) => {
                write!(f, "invalid dimensions '{raw}' (expected WxH)")
            }
            ModelError::UnknownExportFormat(raw) => {
                write!(f, "unknown export format '{raw}'")
            }
            ModelError::UnknownProvider(raw) => {
                write!(f, "unknown artwork provider '{raw}'")
            }
            ModelError::UnknownArtworkKind(raw) => {
                write!(f, "unknown artwork kind '{raw}'")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
