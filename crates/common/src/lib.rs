//! `vp-common` — Shared types and errors for the VideoProbe metadata engine.
//!
//! This crate defines the value records the parsers produce and the error
//! taxonomy they report:
//!
//! - **Color**: `VideoColorInfo` and the ITU-T H.273 enumerations
//! - **Records**: `VideoTrackMetadata`, `ParsedVideoMetadata`, `VideoInfoResult`
//! - **Tags**: `Container`, `Orientation`, `NaturalOrientation`, `GeoLocation`
//! - **Errors**: `ProbeError`, `ProbeResult` (thiserror-based)

pub mod color;
pub mod error;
pub mod types;

// Re-export commonly used items at crate root
pub use color::{ColorPrimaries, MatrixCoefficients, TransferCharacteristics, VideoColorInfo};
pub use error::{ProbeError, ProbeResult};
pub use types::{
    Container, GeoLocation, NaturalOrientation, Orientation, ParsedVideoMetadata,
    VideoInfoResult, VideoTrackMetadata,
};
