//! Value types shared across the iiSU artwork crates.
#![allow(missing_docs)]

pub mod artwork;
pub mod dimensions;
pub mod error;
pub mod events;
pub mod export;
pub mod platform;
pub mod region;
pub mod review;

pub use artwork::{ArtworkKind, ArtworkOption, ProviderId, Selection, SourceTag};
pub use dimensions::ImageDimensions;
pub use error::{ModelError, Result as ModelResult};
pub use events::{JobEvent, JobSummary, LogLevel};
pub use export::ExportFormat;
pub use platform::{
    ARCHIVE_EXTENSIONS, PlatformKey, all_rom_extensions,
};
pub use region::Region;
pub use review::{ReviewKind, ReviewRecord};
