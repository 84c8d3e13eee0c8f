use std::fmt::{self, Display};
use std::str::FromStr;

use crate::error::ModelError;

/// Encoding used for every file written into the iiSU output tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub enum ExportFormat {
    #[default]
    Jpeg,
    Png,
}

impl ExportFormat {
    /// File extension without the dot. `JPG` and `JPEG` both map to `jpg`.
    pub const fn extension(self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Png => "png",
        }
    }

    pub const fn supports_alpha(self) -> bool {
        matches!(self, ExportFormat::Png)
    }
}

impl Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Jpeg => f.write_str("JPEG"),
            ExportFormat::Png => f.write_str("PNG"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "JPG" | "JPEG" => Ok(ExportFormat::Jpeg),
            "PNG" => Ok(ExportFormat::Png),
            _ => Err(ModelError::UnknownExportFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for ExportFormat {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExportFormat> for String {
    fn from(value: ExportFormat) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpg_and_jpeg_share_extension() {
        assert_eq!("JPG".parse::<ExportFormat>().unwrap().extension(), "jpg");
        assert_eq!("jpeg".parse::<ExportFormat>().unwrap().extension(), "jpg");
        assert_eq!("png".parse::<ExportFormat>().unwrap().extension(), "png");
        assert!("tiff".parse::<ExportFormat>().is_err());
    }
}
