//! `vp-probe` — Container demuxing and metadata extraction for video files.
//!
//! Pure byte-level parsers for MP4/MOV (ISO BMFF), WebM/MKV (EBML),
//! MPEG-2 Transport Stream, and RIFF AVI, plus the HDR/color and
//! frame-rate analyzers they share. No media payload is ever decoded; the
//! whole engine is synchronous over an in-memory buffer.
//!
//! ```no_run
//! use vp_probe::{parse_video_metadata, ParseOptions};
//!
//! let data = std::fs::read("clip.mp4").unwrap();
//! let info = parse_video_metadata(&data, &ParseOptions::default()).unwrap();
//! println!("{}x{} {:?}", info.width, info.height, info.codec);
//! ```

pub mod avi;
pub mod color;
pub mod fps;
pub mod mkv;
pub mod mp4;
pub mod nal;
pub mod reader;
pub mod sniff;
pub mod ts;

use std::collections::HashMap;

use vp_common::{
    Container, NaturalOrientation, Orientation, ParsedVideoMetadata, ProbeError, ProbeResult,
    VideoInfoResult,
};

pub use vp_common as common;

/// Options accepted by [`parse_video_metadata`].
#[derive(Clone, Debug, Default)]
pub struct ParseOptions {
    /// Request headers for callers that need to re-fetch the input from a
    /// remote source. The core itself never performs I/O and ignores them.
    pub headers: Option<HashMap<String, String>>,
}

/// Sniff the container of `data`, run the matching parser, and assemble
/// the public result record.
///
/// Errors are typed: an unrecognized signature is
/// [`ProbeError::UnsupportedContainer`]; a broken top-level structure is
/// [`ProbeError::TruncatedInput`] or [`ProbeError::MalformedStructure`];
/// AVI and TS inputs without a video stream are
/// [`ProbeError::NoVideoTrack`]. Malformed *optional* elements never fail
/// the parse — their fields simply stay absent.
pub fn parse_video_metadata(
    data: &[u8],
    options: &ParseOptions,
) -> ProbeResult<VideoInfoResult> {
    let _ = &options.headers; // acquisition-layer concern only

    let parsed = match sniff::detect(data) {
        Container::Mp4 => mp4::Mp4Parser::new().parse(data)?,
        Container::Mov => mp4::Mp4Parser::quicktime().parse(data)?,
        Container::WebM | Container::Mkv => mkv::parse_matroska(data)?,
        Container::Ts => ts::parse_transport_stream(data)?,
        Container::Avi => avi::parse_avi(data)?,
        Container::Unknown => return Err(ProbeError::UnsupportedContainer),
    };

    Ok(assemble_result(parsed))
}

/// Derive the public record from a container-level parse.
pub fn assemble_result(meta: ParsedVideoMetadata) -> VideoInfoResult {
    let width = meta.video.width;
    let height = meta.video.height;

    let natural_orientation = NaturalOrientation::from_dimensions(width, height);
    let orientation = Orientation::derive(meta.video.rotation, natural_orientation);

    let aspect_ratio = if width > 0 && height > 0 {
        width as f64 / height as f64
    } else {
        0.0
    };
    let is_16_9 = (aspect_ratio - 16.0 / 9.0).abs() < 0.01;

    // Explicit per-track bitrate wins; otherwise derive the container-level
    // value from size and duration; otherwise 0.
    let bit_rate = meta
        .bitrate
        .or_else(|| {
            if meta.duration > 0.0 && meta.file_size > 0 {
                Some((meta.file_size as f64 * 8.0 / meta.duration).round() as u64)
            } else {
                None
            }
        })
        .unwrap_or(0);

    let is_hdr = if meta.video.color.is_empty() {
        None
    } else {
        Some(meta.video.color.is_hdr())
    };

    VideoInfoResult {
        duration: meta.duration,
        has_audio: meta.has_audio,
        is_hdr,
        width,
        height,
        fps: meta.video.fps.unwrap_or(0.0),
        bit_rate,
        file_size: meta.file_size,
        codec: meta.video.codec,
        orientation,
        natural_orientation,
        aspect_ratio,
        is_16_9,
        audio_sample_rate: meta.audio_sample_rate,
        audio_channels: meta.audio_channels,
        audio_codec: meta.audio_codec,
        location: meta.location,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vp_common::VideoColorInfo;

    fn base_meta() -> ParsedVideoMetadata {
        let mut meta = ParsedVideoMetadata::new(Container::Mp4);
        meta.video.width = 1920;
        meta.video.height = 1080;
        meta.duration = 10.0;
        meta.file_size = 12_500_000;
        meta
    }

    #[test]
    fn orientation_and_aspect() {
        let result = assemble_result(base_meta());
        assert_eq!(result.natural_orientation, NaturalOrientation::Landscape);
        assert_eq!(result.orientation, Orientation::LandscapeRight);
        assert!((result.aspect_ratio - 1920.0 / 1080.0).abs() < 1e-12);
        assert!(result.is_16_9);
    }

    #[test]
    fn rotated_portrait() {
        let mut meta = base_meta();
        meta.video.rotation = 90;
        let result = assemble_result(meta);
        assert_eq!(result.orientation, Orientation::Portrait);
        assert_eq!(result.natural_orientation, NaturalOrientation::Landscape);
    }

    #[test]
    fn bitrate_precedence() {
        // Explicit track bitrate wins.
        let mut meta = base_meta();
        meta.bitrate = Some(5_000_000);
        assert_eq!(assemble_result(meta).bit_rate, 5_000_000);

        // Else size * 8 / duration.
        let meta = base_meta();
        assert_eq!(assemble_result(meta).bit_rate, 10_000_000);

        // Else zero.
        let mut meta = base_meta();
        meta.duration = 0.0;
        assert_eq!(assemble_result(meta).bit_rate, 0);
    }

    #[test]
    fn is_hdr_tri_state() {
        let meta = base_meta();
        assert_eq!(assemble_result(meta).is_hdr, None);

        let mut meta = base_meta();
        meta.video.color = VideoColorInfo::bt709();
        assert_eq!(assemble_result(meta).is_hdr, Some(false));

        let mut meta = base_meta();
        meta.video.color = VideoColorInfo::hdr10();
        assert_eq!(assemble_result(meta).is_hdr, Some(true));
    }

    #[test]
    fn not_16_9() {
        let mut meta = base_meta();
        meta.video.width = 640;
        meta.video.height = 480;
        let result = assemble_result(meta);
        assert!(!result.is_16_9);
        assert!((result.aspect_ratio - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn zero_dims_have_zero_aspect() {
        let mut meta = base_meta();
        meta.video.width = 0;
        meta.video.height = 0;
        let result = assemble_result(meta);
        assert_eq!(result.aspect_ratio, 0.0);
        assert!(!result.is_16_9);
        assert_eq!(result.natural_orientation, NaturalOrientation::Landscape);
    }

    #[test]
    fn unknown_container_is_an_error() {
        let err = parse_video_metadata(&[0u8; 64], &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ProbeError::UnsupportedContainer));
    }

    #[test]
    fn headers_are_ignored() {
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), "Bearer x".to_string());
        let options = ParseOptions {
            headers: Some(headers),
        };
        // Same outcome with and without headers.
        let a = parse_video_metadata(&[0u8; 64], &options).unwrap_err();
        let b = parse_video_metadata(&[0u8; 64], &ParseOptions::default()).unwrap_err();
        assert!(matches!(a, ProbeError::UnsupportedContainer));
        assert!(matches!(b, ProbeError::UnsupportedContainer));
    }
}
