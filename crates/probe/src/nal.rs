//! Annex-B NAL unit handling and SPS decoding.
//!
//! The transport-stream parser only needs enough of the H.264/HEVC syntax
//! to recover coded dimensions and profile/level: split the elementary
//! stream on start codes, find an SPS, and Exp-Golomb-decode it.

use bitreader::BitReader;

/// H.264 NAL unit type for a sequence parameter set.
pub const H264_NAL_SPS: u8 = 7;
/// HEVC NAL unit type for a sequence parameter set.
pub const HEVC_NAL_SPS: u8 = 33;

/// H.264 profiles whose SPS carries the chroma/bit-depth block.
const H264_HIGH_PROFILES: [u8; 13] = [100, 110, 122, 244, 44, 83, 86, 118, 128, 138, 139, 134, 135];

/// Dimensions and identification recovered from a sequence parameter set.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpsInfo {
    pub width: u32,
    pub height: u32,
    pub profile_idc: u8,
    pub level_idc: u8,
}

/// NAL unit type from the first payload byte (H.264: low 5 bits).
pub fn h264_nal_type(first_byte: u8) -> u8 {
    first_byte & 0x1F
}

/// NAL unit type from the first payload byte (HEVC: bits 1-6).
pub fn hevc_nal_type(first_byte: u8) -> u8 {
    (first_byte >> 1) & 0x3F
}

/// Split an Annex-B byte stream on 3-byte start codes into NAL payloads.
///
/// A 4-byte start code is a 3-byte one preceded by a zero; trailing zero
/// bytes are trimmed from each unit so the distinction does not matter.
pub fn split_annexb(data: &[u8]) -> Vec<&[u8]> {
    let mut nals = Vec::new();
    let mut start: Option<usize> = None;
    let mut i = 0;

    while i + 3 <= data.len() {
        if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
            if let Some(s) = start {
                push_trimmed(&data[s..i], &mut nals);
            }
            i += 3;
            start = Some(i);
        } else {
            i += 1;
        }
    }

    if let Some(s) = start {
        push_trimmed(&data[s..], &mut nals);
    }
    nals
}

fn push_trimmed<'a>(nal: &'a [u8], out: &mut Vec<&'a [u8]>) {
    let end = nal
        .iter()
        .rposition(|&b| b != 0)
        .map(|p| p + 1)
        .unwrap_or(0);
    if end > 0 {
        out.push(&nal[..end]);
    }
}

/// Strip emulation-prevention bytes: `00 00 03` becomes `00 00`.
fn unescape_rbsp(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut zeros = 0u32;
    for &b in data {
        if zeros >= 2 && b == 3 {
            zeros = 0;
            continue;
        }
        zeros = if b == 0 { zeros + 1 } else { 0 };
        out.push(b);
    }
    out
}

/// Decode an H.264 SPS NAL unit (including its 1-byte header).
pub fn parse_h264_sps(nal: &[u8]) -> Option<SpsInfo> {
    if nal.is_empty() || h264_nal_type(nal[0]) != H264_NAL_SPS {
        return None;
    }
    let rbsp = unescape_rbsp(&nal[1..]);
    let mut r = BitReader::new(&rbsp);

    let profile_idc = r.read_u8(8).ok()?;
    let _constraint_flags = r.read_u8(8).ok()?;
    let level_idc = r.read_u8(8).ok()?;
    let _sps_id = read_ue(&mut r)?;

    let mut chroma_format_idc = 1u32;
    if H264_HIGH_PROFILES.contains(&profile_idc) {
        chroma_format_idc = read_ue(&mut r)?;
        if chroma_format_idc == 3 {
            let _separate_colour_plane = r.read_bool().ok()?;
        }
        let _bit_depth_luma = read_ue(&mut r)?;
        let _bit_depth_chroma = read_ue(&mut r)?;
        let _qpprime_y_zero = r.read_bool().ok()?;
        if r.read_bool().ok()? {
            // seq_scaling_matrix_present
            let list_count = if chroma_format_idc != 3 { 8 } else { 12 };
            for i in 0..list_count {
                if r.read_bool().ok()? {
                    skip_scaling_list(&mut r, if i < 6 { 16 } else { 64 })?;
                }
            }
        }
    }

    let _log2_max_frame_num = read_ue(&mut r)?;
    let pic_order_cnt_type = read_ue(&mut r)?;
    if pic_order_cnt_type == 0 {
        let _log2_max_poc_lsb = read_ue(&mut r)?;
    } else if pic_order_cnt_type == 1 {
        let _delta_pic_order_always_zero = r.read_bool().ok()?;
        let _offset_for_non_ref = read_se(&mut r)?;
        let _offset_for_top_to_bottom = read_se(&mut r)?;
        let cycle_len = read_ue(&mut r)?;
        for _ in 0..cycle_len.min(256) {
            let _offset = read_se(&mut r)?;
        }
    }
    let _max_num_ref_frames = read_ue(&mut r)?;
    let _gaps_allowed = r.read_bool().ok()?;

    let pic_width_in_mbs = read_ue(&mut r)? + 1;
    let pic_height_in_map_units = read_ue(&mut r)? + 1;
    let frame_mbs_only = r.read_bool().ok()?;
    if !frame_mbs_only {
        let _mb_adaptive = r.read_bool().ok()?;
    }
    let _direct_8x8 = r.read_bool().ok()?;

    let field_factor = if frame_mbs_only { 1 } else { 2 };
    let mut width = pic_width_in_mbs.checked_mul(16)?;
    let mut height = pic_height_in_map_units
        .checked_mul(16)?
        .checked_mul(field_factor)?;

    if r.read_bool().ok()? {
        // frame_cropping
        let left = read_ue(&mut r)?;
        let right = read_ue(&mut r)?;
        let top = read_ue(&mut r)?;
        let bottom = read_ue(&mut r)?;
        let (sub_w, sub_h) = chroma_crop_units(chroma_format_idc);
        width = width.saturating_sub((left + right).saturating_mul(sub_w));
        height =
            height.saturating_sub((top + bottom).saturating_mul(sub_h * field_factor));
    }

    Some(SpsInfo {
        width,
        height,
        profile_idc,
        level_idc,
    })
}

/// Decode an HEVC SPS NAL unit (including its 2-byte header).
pub fn parse_hevc_sps(nal: &[u8]) -> Option<SpsInfo> {
    if nal.len() < 2 || hevc_nal_type(nal[0]) != HEVC_NAL_SPS {
        return None;
    }
    let rbsp = unescape_rbsp(&nal[2..]);
    let mut r = BitReader::new(&rbsp);

    let _vps_id = r.read_u8(4).ok()?;
    let max_sub_layers_minus1 = r.read_u8(3).ok()? as usize;
    let _temporal_id_nesting = r.read_bool().ok()?;

    // profile_tier_level: general profile space/tier/idc, 32 compatibility
    // bits, 48 constraint bits, 8-bit level.
    let _profile_space_tier = r.read_u8(3).ok()?;
    let profile_idc = r.read_u8(5).ok()?;
    r.skip(32).ok()?;
    r.skip(48).ok()?;
    let level_idc = r.read_u8(8).ok()?;

    let mut profile_present = [false; 8];
    let mut level_present = [false; 8];
    for i in 0..max_sub_layers_minus1.min(8) {
        profile_present[i] = r.read_bool().ok()?;
        level_present[i] = r.read_bool().ok()?;
    }
    if max_sub_layers_minus1 > 0 {
        r.skip(2 * (8 - max_sub_layers_minus1.min(8)) as u64).ok()?;
    }
    for i in 0..max_sub_layers_minus1.min(8) {
        if profile_present[i] {
            r.skip(88).ok()?;
        }
        if level_present[i] {
            r.skip(8).ok()?;
        }
    }

    let _sps_id = read_ue(&mut r)?;
    let chroma_format_idc = read_ue(&mut r)?;
    if chroma_format_idc == 3 {
        let _separate_colour_plane = r.read_bool().ok()?;
    }
    let mut width = read_ue(&mut r)?;
    let mut height = read_ue(&mut r)?;

    if r.read_bool().ok()? {
        // conformance_window
        let left = read_ue(&mut r)?;
        let right = read_ue(&mut r)?;
        let top = read_ue(&mut r)?;
        let bottom = read_ue(&mut r)?;
        let (sub_w, sub_h) = chroma_crop_units(chroma_format_idc);
        width = width.saturating_sub((left + right).saturating_mul(sub_w));
        height = height.saturating_sub((top + bottom).saturating_mul(sub_h));
    }

    Some(SpsInfo {
        width,
        height,
        profile_idc,
        level_idc,
    })
}

fn chroma_crop_units(chroma_format_idc: u32) -> (u32, u32) {
    match chroma_format_idc {
        1 => (2, 2),
        2 => (2, 1),
        _ => (1, 1),
    }
}

/// Exp-Golomb unsigned: count leading zeros, then read that many bits.
fn read_ue(r: &mut BitReader) -> Option<u32> {
    let mut zeros: u8 = 0;
    while !r.read_bool().ok()? {
        zeros += 1;
        if zeros > 31 {
            return None;
        }
    }
    if zeros == 0 {
        return Some(0);
    }
    let suffix = r.read_u32(zeros).ok()?;
    Some((1u32 << zeros) - 1 + suffix)
}

/// Exp-Golomb signed mapping of [`read_ue`].
fn read_se(r: &mut BitReader) -> Option<i32> {
    let k = read_ue(r)?;
    let magnitude = ((k + 1) / 2) as i32;
    Some(if k % 2 == 0 { -magnitude } else { magnitude })
}

fn skip_scaling_list(r: &mut BitReader, size: u32) -> Option<()> {
    let mut last: i32 = 8;
    let mut next: i32 = 8;
    for _ in 0..size {
        if next != 0 {
            let delta = read_se(r)?;
            next = (last + delta).rem_euclid(256);
        }
        if next != 0 {
            last = next;
        }
    }
    Some(())
}
