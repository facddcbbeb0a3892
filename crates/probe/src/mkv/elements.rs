//! Matroska/WebM element IDs and parsed track structures.
//!
//! Only the metadata subset is listed: header, segment information, and
//! track settings. Cluster-level elements are out of scope for a prober
//! that never touches frame data.

// ─── EBML Header ─────────────────────────────────────────────────────

/// EBML Header element (container).
pub const EBML_HEADER: u32 = 0x1A45DFA3;
/// Document type string (e.g., "matroska", "webm").
pub const DOC_TYPE: u32 = 0x4282;

// ─── Segment ─────────────────────────────────────────────────────────

/// Segment (top-level container for all data).
pub const SEGMENT: u32 = 0x18538067;
/// SeekHead: position hints for top-level elements.
pub const SEEK_HEAD: u32 = 0x114D9B74;
/// Cluster element; reaching one ends the metadata scan.
pub const CLUSTER: u32 = 0x1F43B675;
/// Cues (seek index); skipped.
pub const CUES: u32 = 0x1C53BB6B;

// ─── Segment Information ─────────────────────────────────────────────

/// Info element (segment information).
pub const INFO: u32 = 0x1549A966;
/// TimecodeScale: nanoseconds per timecode tick (default 1_000_000 = 1ms).
pub const TIMECODE_SCALE: u32 = 0x2AD7B1;
/// Duration: total segment duration in TimecodeScale units (float).
pub const DURATION: u32 = 0x4489;

// ─── Track Information ───────────────────────────────────────────────

/// Tracks element (container for all track entries).
pub const TRACKS: u32 = 0x1654AE6B;
/// A single track entry.
pub const TRACK_ENTRY: u32 = 0xAE;
/// Track number.
pub const TRACK_NUMBER: u32 = 0xD7;
/// Track type (1=video, 2=audio, 17=subtitle).
pub const TRACK_TYPE: u32 = 0x83;
/// Codec ID string (e.g., "V_MPEG4/ISO/AVC").
pub const CODEC_ID: u32 = 0x86;
/// Codec-private data (decoder configuration records, Vorbis headers).
pub const CODEC_PRIVATE: u32 = 0x63A2;
/// Default duration of a frame in nanoseconds.
pub const DEFAULT_DURATION: u32 = 0x23E383;

// ─── Video Settings ──────────────────────────────────────────────────

/// Video settings sub-element within a TrackEntry.
pub const VIDEO: u32 = 0xE0;
/// Pixel width.
pub const PIXEL_WIDTH: u32 = 0xB0;
/// Pixel height.
pub const PIXEL_HEIGHT: u32 = 0xBA;
/// Display width (for DAR calculation; optional).
pub const DISPLAY_WIDTH: u32 = 0x54B0;
/// Display height (for DAR calculation; optional).
pub const DISPLAY_HEIGHT: u32 = 0x54BA;
/// Pixel crop: rows/columns to remove from each edge.
pub const PIXEL_CROP_BOTTOM: u32 = 0x54AA;
pub const PIXEL_CROP_TOP: u32 = 0x54BB;
pub const PIXEL_CROP_LEFT: u32 = 0x54CC;
pub const PIXEL_CROP_RIGHT: u32 = 0x54DD;
/// How DisplayWidth/DisplayHeight are to be interpreted.
pub const ASPECT_RATIO_TYPE: u32 = 0x54B3;
/// Stereo-3D layout of the track.
pub const STEREO_MODE: u32 = 0x53B8;
/// Colour description sub-element.
pub const COLOUR: u32 = 0x55B0;

// ─── Audio Settings ──────────────────────────────────────────────────

/// Audio settings sub-element within a TrackEntry.
pub const AUDIO: u32 = 0xE1;
/// Sampling frequency in Hz (float).
pub const SAMPLING_FREQUENCY: u32 = 0xB5;
/// Output sampling frequency (for SBR; optional).
pub const OUTPUT_SAMPLING_FREQUENCY: u32 = 0x78B5;
/// Number of audio channels.
pub const CHANNELS: u32 = 0x9F;
/// Bit depth per sample (optional).
pub const BIT_DEPTH: u32 = 0x6264;

// ─── Parsed Structures ──────────────────────────────────────────────

/// The type of a Matroska track.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MkvTrackType {
    Video,
    Audio,
    Subtitle,
    Unknown(u64),
}

impl MkvTrackType {
    /// Parse from the TrackType element value.
    pub fn from_value(val: u64) -> Self {
        match val {
            1 => Self::Video,
            2 => Self::Audio,
            17 => Self::Subtitle,
            other => Self::Unknown(other),
        }
    }
}

/// Video-specific settings from an MKV TrackEntry.
#[derive(Clone, Debug, Default)]
pub struct MkvVideoInfo {
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub display_width: Option<u32>,
    pub display_height: Option<u32>,
    pub crop_top: u32,
    pub crop_bottom: u32,
    pub crop_left: u32,
    pub crop_right: u32,
    pub aspect_ratio_type: Option<u64>,
    pub stereo_mode: Option<u64>,
    /// Raw Colour element payload, decoded by the color detector.
    pub colour: Option<Vec<u8>>,
}

/// Audio-specific settings from an MKV TrackEntry.
#[derive(Clone, Debug, Default)]
pub struct MkvAudioInfo {
    pub sampling_frequency: Option<f64>,
    pub output_sampling_frequency: Option<f64>,
    pub channels: Option<u64>,
    pub bit_depth: Option<u64>,
}

/// One parsed Matroska TrackEntry.
#[derive(Clone, Debug, Default)]
pub struct MkvTrackInfo {
    pub track_number: u64,
    pub track_type: Option<MkvTrackType>,
    pub codec_id: String,
    pub codec_private: Option<Vec<u8>>,
    /// Default frame duration in nanoseconds, when specified.
    pub default_duration_ns: Option<u64>,
    pub video: Option<MkvVideoInfo>,
    pub audio: Option<MkvAudioInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_id_constants() {
        assert_eq!(EBML_HEADER, 0x1A45DFA3);
        assert_eq!(SEGMENT, 0x18538067);
        assert_eq!(TRACKS, 0x1654AE6B);
        assert_eq!(INFO, 0x1549A966);
        assert_eq!(TIMECODE_SCALE, 0x2AD7B1);
        assert_eq!(COLOUR, 0x55B0);
        assert_eq!(PIXEL_CROP_BOTTOM, 0x54AA);
    }

    #[test]
    fn track_type_from_value() {
        assert_eq!(MkvTrackType::from_value(1), MkvTrackType::Video);
        assert_eq!(MkvTrackType::from_value(2), MkvTrackType::Audio);
        assert_eq!(MkvTrackType::from_value(17), MkvTrackType::Subtitle);
        assert_eq!(MkvTrackType::from_value(99), MkvTrackType::Unknown(99));
    }
}
