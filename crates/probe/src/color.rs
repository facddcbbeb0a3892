//! HDR/color detection from codec-configuration and color-description records.
//!
//! Two entry points, one per container family: [`parse_mp4_color_info`] for
//! ISO BMFF color boxes and decoder configuration records, and
//! [`parse_webm_color_info`] for the Matroska `Colour` element. Both are
//! total: any malformed input yields the default (all-absent) record.

use tracing::debug;
use vp_common::{
    ColorPrimaries, MatrixCoefficients, TransferCharacteristics, VideoColorInfo,
};

use crate::reader::ByteReader;

/// Mastering-display max luminance (0.0001 cd/m² units) above which the
/// content reads as HDR: 1000 nits.
const MDCV_HDR_THRESHOLD: u32 = 1_000_000;

/// maxCLL (cd/m²) above which content-light-level metadata reads as HDR.
const CLLI_HDR_THRESHOLD: u16 = 1000;

/// Bound on Colour-element child scans.
const MAX_COLOUR_CHILDREN: u32 = 100;

/// Interpret an MP4 color payload: either a decoder configuration record
/// (recognized by its leading bytes) or a tagged color box payload with the
/// 4-byte type prepended (`nclx`, `nclc`, `mdcv`, `clli`, `dovi`, ...).
pub fn parse_mp4_color_info(data: &[u8]) -> VideoColorInfo {
    try_parse_mp4(data).unwrap_or_default()
}

fn try_parse_mp4(data: &[u8]) -> Option<VideoColorInfo> {
    if data.len() < 2 {
        return None;
    }

    // Codec configuration records carry no ASCII tag; dispatch on the
    // configurationVersion / marker prefix.
    match (data[0], data[1]) {
        (1, 0x22) => return Some(hevc_config_color(data)),
        (1, _) => return Some(avc_config_color(data)),
        (0x81, _) => return Some(av1_config_color(data)),
        (0x91, _) => return Some(vp9_config_color(data)),
        _ => {}
    }

    if data.len() < 4 {
        return None;
    }
    match &data[0..4] {
        b"nclx" => nclx_color(data, true),
        b"nclc" => nclx_color(data, false),
        b"mdcv" => mastering_display_color(data),
        b"clli" => content_light_color(data),
        b"dovi" | b"dvcC" | b"dvvC" => Some(VideoColorInfo::dolby_vision()),
        // ICC profiles: full-range RGB with unknown transfer/primaries.
        b"rICC" | b"prof" => Some(VideoColorInfo {
            matrix_coefficients: Some(MatrixCoefficients::Rgb),
            full_range: Some(true),
            ..Default::default()
        }),
        _ => None,
    }
}

/// The standard `colr` payload: three 16-bit H.273 fields, and for `nclx`
/// one trailing byte whose top bit is the full-range flag.
fn nclx_color(data: &[u8], has_range_byte: bool) -> Option<VideoColorInfo> {
    let mut r = ByteReader::new(data);
    r.skip(4).ok()?;
    let primaries = r.read_u16().ok()?;
    let transfer = r.read_u16().ok()?;
    let matrix = r.read_u16().ok()?;

    let full_range = if has_range_byte {
        r.read_u8().ok().map(|b| b & 0x80 != 0)
    } else {
        None
    };

    Some(VideoColorInfo {
        primaries: h273_tag(primaries).and_then(ColorPrimaries::from_tag),
        transfer_characteristics: h273_tag(transfer)
            .and_then(TransferCharacteristics::from_tag),
        matrix_coefficients: h273_tag(matrix).and_then(MatrixCoefficients::from_tag),
        full_range,
    })
}

/// SMPTE ST 2086 mastering display metadata: 24 bytes of display
/// primaries, an 8-byte white point, then max/min luminance in
/// 0.0001 cd/m² units. Classified as HDR10 above 1000 nits.
fn mastering_display_color(data: &[u8]) -> Option<VideoColorInfo> {
    let mut r = ByteReader::new(data);
    r.skip(4 + 24 + 8).ok()?;
    let max_luminance = r.read_u32().ok()?;
    let _min_luminance = r.read_u32().ok();

    debug!("mdcv: max luminance {} (0.0001 cd/m²)", max_luminance);
    if max_luminance > MDCV_HDR_THRESHOLD {
        Some(VideoColorInfo::hdr10())
    } else {
        Some(VideoColorInfo::default())
    }
}

/// Content light level: 16-bit maxCLL then 16-bit maxFALL.
fn content_light_color(data: &[u8]) -> Option<VideoColorInfo> {
    let mut r = ByteReader::new(data);
    r.skip(4).ok()?;
    let max_cll = r.read_u16().ok()?;
    let _max_fall = r.read_u16().ok();

    debug!("clli: maxCLL {} cd/m²", max_cll);
    if max_cll > CLLI_HDR_THRESHOLD {
        Some(VideoColorInfo::hdr10())
    } else {
        Some(VideoColorInfo::default())
    }
}

/// AVCDecoderConfigurationRecord: byte 1 is profile_idc. High-bit-depth
/// profiles imply HDR10 signaling; the common distribution profiles map to
/// their usual SDR color systems.
fn avc_config_color(data: &[u8]) -> VideoColorInfo {
    match data[1] {
        110 | 122 => VideoColorInfo::hdr10(),
        100 | 118 | 44 => VideoColorInfo::bt709(),
        66 | 77 | 82 | 88 => VideoColorInfo::bt601(),
        _ => VideoColorInfo::default(),
    }
}

/// HEVCDecoderConfigurationRecord: Main 10 (profile_idc 2, or its
/// compatibility flag) implies HDR10 signaling.
fn hevc_config_color(data: &[u8]) -> VideoColorInfo {
    let profile_idc = data[1] & 0x1F;
    let main10_compat = data.len() >= 6 && {
        let flags = u32::from_be_bytes([data[2], data[3], data[4], data[5]]);
        flags & (1 << 29) != 0
    };
    if profile_idc == 2 || main10_compat {
        VideoColorInfo::hdr10()
    } else {
        VideoColorInfo::default()
    }
}

/// AV1 configuration record: the HDR flag bit, or a professional profile
/// with high bit depth, implies HDR10 signaling.
fn av1_config_color(data: &[u8]) -> VideoColorInfo {
    if data.len() < 3 {
        return VideoColorInfo::default();
    }
    let seq_profile = data[1] >> 5;
    let flags = data[2];
    let high_bitdepth = flags & 0x40 != 0;
    if flags & 0x04 != 0 || (seq_profile >= 2 && high_bitdepth) {
        VideoColorInfo::hdr10()
    } else {
        VideoColorInfo::default()
    }
}

/// VP9 configuration record: profile 2/3 with a 10+ bit depth implies
/// HDR10; otherwise the trailing H.273 color triple is mapped directly.
fn vp9_config_color(data: &[u8]) -> VideoColorInfo {
    if data.len() < 3 {
        return VideoColorInfo::default();
    }
    let profile = data[1];
    let bit_depth = data[2] >> 4;
    if profile >= 2 && bit_depth >= 10 {
        return VideoColorInfo::hdr10();
    }

    if data.len() >= 6 {
        let full_range = data[2] & 0x01 != 0;
        return VideoColorInfo {
            primaries: ColorPrimaries::from_tag(data[3]),
            transfer_characteristics: TransferCharacteristics::from_tag(data[4]),
            matrix_coefficients: MatrixCoefficients::from_tag(data[5]),
            full_range: Some(full_range),
        };
    }
    VideoColorInfo::default()
}

fn h273_tag(value: u16) -> Option<u8> {
    u8::try_from(value).ok()
}

/// Scan a Matroska `Colour` element's children by VINT id.
///
/// Recognized children: 0x55B1 MatrixCoefficients, 0x55B9
/// TransferCharacteristics, 0x55BA Primaries, and 0x55B2 as a
/// range/bits-per-channel hint where a value of 0 marks full range.
pub fn parse_webm_color_info(data: &[u8]) -> VideoColorInfo {
    let mut color = VideoColorInfo::default();
    let mut r = ByteReader::new(data);

    let mut iterations = 0;
    while r.remaining() > 0 && iterations < MAX_COLOUR_CHILDREN {
        iterations += 1;

        let (id, size) = match (r.read_vint_id(), r.read_vint_size()) {
            (Ok(id), Ok(size)) => (id, size),
            _ => break,
        };
        if size == u64::MAX || size as usize > r.remaining() {
            break;
        }
        let value_bytes = match r.read_bytes(size as usize) {
            Ok(b) => b,
            Err(_) => break,
        };
        let value = value_bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);

        match id {
            0x55B1 => {
                color.matrix_coefficients =
                    u8::try_from(value).ok().and_then(MatrixCoefficients::from_tag);
            }
            0x55B9 => {
                color.transfer_characteristics = u8::try_from(value)
                    .ok()
                    .and_then(TransferCharacteristics::from_tag);
            }
            0x55BA => {
                color.primaries = u8::try_from(value).ok().and_then(ColorPrimaries::from_tag);
            }
            0x55B2 => {
                if value == 0 {
                    color.full_range = Some(true);
                }
            }
            _ => {}
        }
    }

    color
}
