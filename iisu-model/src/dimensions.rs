use std::fmt::{self, Display};
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::error::ModelError;

/// Non-zero pixel dimensions of a piece of artwork.
///
/// Providers report dimensions as `"WxH"` strings (SteamGridDB filters on
/// them), so parsing and formatting round-trip through that shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageDimensions {
    pub width: NonZeroU32,
    pub height: NonZeroU32,
}

impl ImageDimensions {
    pub const fn new(width: NonZeroU32, height: NonZeroU32) -> Self {
        Self { width, height }
    }

    /// Build from raw values, rejecting zero on either axis.
    pub fn from_u32(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            width: NonZeroU32::new(width)?,
            height: NonZeroU32::new(height)?,
        })
    }

    pub const fn width_u32(self) -> u32 {
        self.width.get()
    }

    pub const fn height_u32(self) -> u32 {
        self.height.get()
    }

    pub const fn is_square(self) -> bool {
        self.width.get() == self.height.get()
    }

    /// Square dimensions of `side` pixels.
    pub fn square(side: NonZeroU32) -> Self {
        Self::new(side, side)
    }
}

impl Display for ImageDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ImageDimensions {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidDimensions(s.to_string());
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
        Self::from_u32(width, height).ok_or_else(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wxh() {
        let dims: ImageDimensions = "1024x1024".parse().expect("parse");
        assert!(dims.is_square());
        assert_eq!(dims.to_string(), "1024x1024");

        let hero: ImageDimensions = "1920X620".parse().expect("parse");
        assert_eq!(hero.width_u32(), 1920);
        assert_eq!(hero.height_u32(), 620);
        assert!(!hero.is_square());
    }

    #[test]
    fn rejects_zero_and_garbage() {
        assert!("0x512".parse::<ImageDimensions>().is_err());
        assert!("512".parse::<ImageDimensions>().is_err());
        assert!("axb".parse::<ImageDimensions>().is_err());
    }
}
