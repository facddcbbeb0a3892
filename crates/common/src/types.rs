//! Value records produced by the probe engine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::color::VideoColorInfo;

/// Container format tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Container {
    /// ISO BMFF (MP4, M4V).
    Mp4,
    /// QuickTime (MOV).
    Mov,
    /// WebM (Matroska subset).
    WebM,
    /// Matroska (MKV).
    Mkv,
    /// RIFF AVI.
    Avi,
    /// MPEG-2 Transport Stream.
    Ts,
    Unknown,
}

impl Container {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::WebM => "webm",
            Self::Mkv => "mkv",
            Self::Avi => "avi",
            Self::Ts => "ts",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orientation implied by pixel dimensions alone.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NaturalOrientation {
    Portrait,
    Landscape,
}

impl NaturalOrientation {
    /// Height strictly greater than width reads as portrait.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if height > width {
            Self::Portrait
        } else {
            Self::Landscape
        }
    }
}

/// Display orientation after applying container rotation metadata.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Portrait,
    PortraitUpsideDown,
    Landscape,
    LandscapeRight,
    LandscapeLeft,
}

impl Orientation {
    /// Derive the display orientation from a rotation in degrees and the
    /// natural orientation of the coded frame.
    ///
    /// Rotations outside {0, 90, 180, 270} are treated as 0.
    pub fn derive(rotation: u16, natural: NaturalOrientation) -> Self {
        match (rotation, natural) {
            (90, _) => Self::Portrait,
            (180, NaturalOrientation::Landscape) => Self::LandscapeLeft,
            (180, NaturalOrientation::Portrait) => Self::PortraitUpsideDown,
            (270, _) => Self::PortraitUpsideDown,
            (_, NaturalOrientation::Landscape) => Self::LandscapeRight,
            (_, NaturalOrientation::Portrait) => Self::Portrait,
        }
    }
}

/// Recording location, from an ISO 6709 tag.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

impl GeoLocation {
    /// Parse an ISO 6709 point string of the form `+LAT+LON[+ALT]/`.
    ///
    /// Leading `+` signs separate the components; `-` marks southern and
    /// western hemispheres and stays part of the number. The trailing `/`
    /// and any CRS suffix after it are ignored.
    pub fn from_iso6709(tag: &str) -> Option<Self> {
        let body = tag.trim().split('/').next()?;

        let mut parts: Vec<String> = Vec::new();
        for ch in body.chars() {
            match ch {
                '+' => parts.push(String::new()),
                '-' => {
                    parts.push(String::from("-"));
                }
                _ => parts.last_mut()?.push(ch),
            }
        }

        if parts.len() < 2 {
            return None;
        }

        let latitude: f64 = parts[0].parse().ok()?;
        let longitude: f64 = parts[1].parse().ok()?;
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        let altitude = parts.get(2).and_then(|p| p.parse::<f64>().ok());

        Some(Self {
            latitude,
            longitude,
            altitude,
        })
    }
}

/// Per-track intermediate produced by the video parsers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoTrackMetadata {
    /// Coded frame width in pixels.
    pub width: u32,
    /// Coded frame height in pixels.
    pub height: u32,
    /// Rotation in degrees, one of {0, 90, 180, 270}.
    pub rotation: u16,
    /// Display aspect width (post pixel-aspect / crop adjustments).
    pub display_aspect_width: u32,
    /// Display aspect height.
    pub display_aspect_height: u32,
    /// Codec short string ("avc1.6428", "vp9", "av01", ...).
    pub codec: String,
    /// Frames per second, when derivable.
    pub fps: Option<f64>,
    /// Color description.
    pub color: VideoColorInfo,
    /// Explicit per-track video bitrate in bits/s, when signaled.
    pub video_bitrate: Option<u64>,
    /// Explicit per-track audio bitrate in bits/s, when signaled.
    pub audio_bitrate: Option<u64>,
}

/// Container-level parse result, before final assembly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParsedVideoMetadata {
    pub container: Container,
    pub video: VideoTrackMetadata,
    pub has_audio: bool,
    pub audio_channels: u16,
    pub audio_sample_rate: u32,
    /// Audio codec short string ("aac", "opus", ...); empty when unknown.
    pub audio_codec: String,
    /// Duration in seconds, finite and non-negative.
    pub duration: f64,
    /// Input size in bytes.
    pub file_size: u64,
    /// Overall bitrate in bits/s, when derivable.
    pub bitrate: Option<u64>,
    /// Recording location, when the container exposes one.
    pub location: Option<GeoLocation>,
}

impl ParsedVideoMetadata {
    pub fn new(container: Container) -> Self {
        Self {
            container,
            video: VideoTrackMetadata::default(),
            has_audio: false,
            audio_channels: 0,
            audio_sample_rate: 0,
            audio_codec: String::new(),
            duration: 0.0,
            file_size: 0,
            bitrate: None,
            location: None,
        }
    }
}

/// The public result record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoInfoResult {
    /// Duration in seconds.
    pub duration: f64,
    pub has_audio: bool,
    /// Absent when the container carries no color information (AVI, TS).
    pub is_hdr: Option<bool>,
    pub width: u32,
    pub height: u32,
    /// Frames per second; 0 when indeterminable.
    pub fps: f64,
    /// Overall bitrate in bits/s; 0 when indeterminable.
    pub bit_rate: u64,
    /// Input size in bytes; 0 for unknown/remote sources.
    pub file_size: u64,
    pub codec: String,
    pub orientation: Orientation,
    pub natural_orientation: NaturalOrientation,
    pub aspect_ratio: f64,
    pub is_16_9: bool,
    pub audio_sample_rate: u32,
    pub audio_channels: u16,
    pub audio_codec: String,
    pub location: Option<GeoLocation>,
}
