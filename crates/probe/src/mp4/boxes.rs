//! ISO BMFF box (atom) leaf parsers.
//!
//! Box headers, track/media headers, sample entries, and the small boxes
//! that decorate them. The tree walk lives in the parent module; everything
//! here parses one box payload from a [`ByteReader`] positioned at its
//! content start.
//!
//! Reference: ISO 14496-12 (ISO Base Media File Format).

use tracing::{debug, trace};
use vp_common::{ProbeError, ProbeResult};

use crate::reader::ByteReader;

// ─── Box FourCC constants ────────────────────────────────────────────

/// Convert 4 ASCII bytes to a u32 FourCC code.
pub const fn fourcc(a: u8, b: u8, c: u8, d: u8) -> u32 {
    ((a as u32) << 24) | ((b as u32) << 16) | ((c as u32) << 8) | (d as u32)
}

pub const FTYP: u32 = fourcc(b'f', b't', b'y', b'p');
pub const MOOV: u32 = fourcc(b'm', b'o', b'o', b'v');
pub const MVHD: u32 = fourcc(b'm', b'v', b'h', b'd');
pub const TRAK: u32 = fourcc(b't', b'r', b'a', b'k');
pub const TKHD: u32 = fourcc(b't', b'k', b'h', b'd');
pub const MDIA: u32 = fourcc(b'm', b'd', b'i', b'a');
pub const MDHD: u32 = fourcc(b'm', b'd', b'h', b'd');
pub const HDLR: u32 = fourcc(b'h', b'd', b'l', b'r');
pub const MINF: u32 = fourcc(b'm', b'i', b'n', b'f');
pub const STBL: u32 = fourcc(b's', b't', b'b', b'l');
pub const STSD: u32 = fourcc(b's', b't', b's', b'd');
pub const STTS: u32 = fourcc(b's', b't', b't', b's');
pub const MVEX: u32 = fourcc(b'm', b'v', b'e', b'x');
pub const TREX: u32 = fourcc(b't', b'r', b'e', b'x');
pub const MOOF: u32 = fourcc(b'm', b'o', b'o', b'f');
pub const TRAF: u32 = fourcc(b't', b'r', b'a', b'f');
pub const TFHD: u32 = fourcc(b't', b'f', b'h', b'd');
pub const TRUN: u32 = fourcc(b't', b'r', b'u', b'n');
pub const UDTA: u32 = fourcc(b'u', b'd', b't', b'a');
pub const META: u32 = fourcc(b'm', b'e', b't', b'a');
pub const KEYS: u32 = fourcc(b'k', b'e', b'y', b's');
pub const ILST: u32 = fourcc(b'i', b'l', b's', b't');
pub const DATA: u32 = fourcc(b'd', b'a', b't', b'a');
/// The classic QuickTime `©xyz` location atom.
pub const CXYZ: u32 = fourcc(0xA9, b'x', b'y', b'z');

// Video sample entries
pub const AVC1: u32 = fourcc(b'a', b'v', b'c', b'1');
pub const AVC3: u32 = fourcc(b'a', b'v', b'c', b'3');
pub const HEV1: u32 = fourcc(b'h', b'e', b'v', b'1');
pub const HVC1: u32 = fourcc(b'h', b'v', b'c', b'1');
pub const MP4V: u32 = fourcc(b'm', b'p', b'4', b'v');
pub const VP08: u32 = fourcc(b'v', b'p', b'0', b'8');
pub const VP09: u32 = fourcc(b'v', b'p', b'0', b'9');
pub const AV01: u32 = fourcc(b'a', b'v', b'0', b'1');

// Audio sample entries
pub const MP4A: u32 = fourcc(b'm', b'p', b'4', b'a');
pub const OPUS: u32 = fourcc(b'O', b'p', b'u', b's');
pub const AC3: u32 = fourcc(b'a', b'c', b'-', b'3');
pub const EC3: u32 = fourcc(b'e', b'c', b'-', b'3');
pub const FLAC: u32 = fourcc(b'f', b'L', b'a', b'C');
pub const ALAC: u32 = fourcc(b'a', b'l', b'a', b'c');

// Sample-entry children
pub const AVCC: u32 = fourcc(b'a', b'v', b'c', b'C');
pub const HVCC: u32 = fourcc(b'h', b'v', b'c', b'C');
pub const AV1C: u32 = fourcc(b'a', b'v', b'1', b'C');
pub const VPCC: u32 = fourcc(b'v', b'p', b'c', b'C');
pub const ESDS: u32 = fourcc(b'e', b's', b'd', b's');
pub const BTRT: u32 = fourcc(b'b', b't', b'r', b't');
pub const PASP: u32 = fourcc(b'p', b'a', b's', b'p');
pub const COLR: u32 = fourcc(b'c', b'o', b'l', b'r');
pub const MDCV: u32 = fourcc(b'm', b'd', b'c', b'v');
/// VP9-style mastering display (SMPTE ST 2086 payload).
pub const SMDM: u32 = fourcc(b'S', b'm', b'D', b'm');
pub const CLLI: u32 = fourcc(b'c', b'l', b'l', b'i');
pub const DOVI: u32 = fourcc(b'd', b'o', b'v', b'i');
pub const DVCC: u32 = fourcc(b'd', b'v', b'c', b'C');
pub const DVVC: u32 = fourcc(b'd', b'v', b'v', b'C');
pub const CLAP: u32 = fourcc(b'c', b'l', b'a', b'p');
pub const TAPT: u32 = fourcc(b't', b'a', b'p', b't');
pub const CLEF: u32 = fourcc(b'c', b'l', b'e', b'f');
pub const WAVE: u32 = fourcc(b'w', b'a', b'v', b'e');

// Handler types
pub const VIDE: u32 = fourcc(b'v', b'i', b'd', b'e');
pub const SOUN: u32 = fourcc(b's', b'o', b'u', b'n');

/// Convert a FourCC u32 to a readable string for logging and codec names.
pub fn fourcc_to_string(cc: u32) -> String {
    cc.to_be_bytes()
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            }
        })
        .collect()
}

// ─── Box header ──────────────────────────────────────────────────────

/// A parsed ISO BMFF box header.
#[derive(Clone, Copy, Debug)]
pub struct BoxHeader {
    /// FourCC type code.
    pub box_type: u32,
    /// Total box size including the header. A wire size of 0 ("extends to
    /// EOF") is resolved against the buffer length at read time.
    pub size: u64,
    /// Offset of the box start in the buffer.
    pub offset: u64,
    /// Size of the header itself (8, or 16 with an extended size).
    pub header_size: u8,
}

impl BoxHeader {
    /// Byte offset where the payload starts.
    pub fn content_offset(&self) -> u64 {
        self.offset + self.header_size as u64
    }

    /// Payload size, excluding the header.
    pub fn content_size(&self) -> u64 {
        self.size - self.header_size as u64
    }

    /// Byte offset of the first byte after this box.
    pub fn end_offset(&self) -> u64 {
        self.offset + self.size
    }
}

/// Read a box header at the cursor. Returns `None` at a clean end of the
/// walk (fewer than 8 bytes left).
pub fn read_box_header(r: &mut ByteReader) -> ProbeResult<Option<BoxHeader>> {
    if !r.can_read(8) {
        return Ok(None);
    }
    let offset = r.position();
    let size32 = r.read_u32()?;
    let box_type = r.read_u32()?;

    let (size, header_size) = match size32 {
        // Box extends to end of file.
        0 => (r.len() as u64 - offset, 8u8),
        // 64-bit extended size follows.
        1 => {
            if !r.can_read(8) {
                return Err(ProbeError::TruncatedInput {
                    context: "extended box size",
                    offset,
                });
            }
            (r.read_u64()?, 16u8)
        }
        s => (s as u64, 8u8),
    };

    if size < header_size as u64 {
        return Err(ProbeError::MalformedStructure {
            offset,
            reason: format!(
                "box '{}' has size {} smaller than its header",
                fourcc_to_string(box_type),
                size
            ),
        });
    }

    trace!(
        "box '{}' at {}, size {}",
        fourcc_to_string(box_type),
        offset,
        size
    );

    Ok(Some(BoxHeader {
        box_type,
        size,
        offset,
        header_size,
    }))
}

/// Seek past the current box.
pub fn skip_box(r: &mut ByteReader, header: &BoxHeader) -> ProbeResult<()> {
    let end = header.end_offset().min(r.len() as u64);
    r.seek(end)
}

// ─── tkhd ────────────────────────────────────────────────────────────

/// Track header: id, duration, display dimensions, rotation.
#[derive(Clone, Copy, Debug)]
pub struct TkhdInfo {
    pub track_id: u32,
    pub duration: u64,
    pub width: u32,
    pub height: u32,
    /// Degrees derived from the transformation matrix: 0, 90, 180, or 270.
    pub rotation: u16,
}

/// 16.16 fixed-point one, as the matrix encodes it.
const FIXED_ONE: i32 = 0x0001_0000;

/// Parse a tkhd box. Cursor must be at content start.
pub fn parse_tkhd(r: &mut ByteReader) -> ProbeResult<TkhdInfo> {
    let version = r.read_u8()?;
    r.skip(3)?; // flags

    let (track_id, duration) = if version == 1 {
        r.skip(16)?; // creation + modification times
        let id = r.read_u32()?;
        r.skip(4)?; // reserved
        (id, r.read_u64()?)
    } else {
        r.skip(8)?;
        let id = r.read_u32()?;
        r.skip(4)?;
        (id, r.read_u32()? as u64)
    };

    r.skip(8)?; // reserved
    r.skip(4)?; // layer + alternate_group
    r.skip(4)?; // volume + reserved

    let mut matrix = [0i32; 9];
    for m in &mut matrix {
        *m = r.read_i32()?;
    }

    let width = fixed_16_16_round(r.read_u32()?);
    let height = fixed_16_16_round(r.read_u32()?);

    // The matrix is | a b u |  with 16.16 entries; only the four
    //               | c d v |  quarter-turn combinations are recognized.
    //               | x y w |
    let (a, b, c, d) = (matrix[0], matrix[1], matrix[3], matrix[4]);
    let rotation = if a == 0 && d == 0 && b == FIXED_ONE && c == -FIXED_ONE {
        90
    } else if a == 0 && d == 0 && b == -FIXED_ONE && c == FIXED_ONE {
        270
    } else if a == -FIXED_ONE && d == -FIXED_ONE {
        180
    } else {
        0
    };

    debug!(
        "tkhd: track {}, {}x{}, rotation {}",
        track_id, width, height, rotation
    );

    Ok(TkhdInfo {
        track_id,
        duration,
        width,
        height,
        rotation,
    })
}

/// Round a 16.16 fixed-point value to the nearest integer.
pub fn fixed_16_16_round(fp: u32) -> u32 {
    ((fp as u64 + 0x8000) >> 16) as u32
}

// ─── mdhd ────────────────────────────────────────────────────────────

/// Media header: per-track timescale and duration, kept as exact ticks.
#[derive(Clone, Copy, Debug)]
pub struct MdhdInfo {
    pub timescale: u32,
    pub duration: u64,
}

/// Parse an mdhd box. Cursor must be at content start.
pub fn parse_mdhd(r: &mut ByteReader) -> ProbeResult<MdhdInfo> {
    let version = r.read_u8()?;
    r.skip(3)?; // flags

    let (timescale, duration) = if version == 1 {
        r.skip(16)?;
        let ts = r.read_u32()?;
        (ts, r.read_u64()?)
    } else {
        r.skip(8)?;
        let ts = r.read_u32()?;
        (ts, r.read_u32()? as u64)
    };

    debug!("mdhd: timescale {}, duration {}", timescale, duration);
    Ok(MdhdInfo {
        timescale,
        duration,
    })
}

/// Parse an mvhd box for the movie-level timescale and duration.
pub fn parse_mvhd(r: &mut ByteReader) -> ProbeResult<MdhdInfo> {
    // Identical front layout to mdhd for the fields we need.
    parse_mdhd(r)
}

// ─── hdlr ────────────────────────────────────────────────────────────

/// Parse an hdlr box and return the handler type FourCC.
pub fn parse_hdlr(r: &mut ByteReader) -> ProbeResult<u32> {
    r.skip(4)?; // version + flags
    r.skip(4)?; // pre_defined
    let handler_type = r.read_u32()?;
    trace!("hdlr: '{}'", fourcc_to_string(handler_type));
    Ok(handler_type)
}

// ─── trex / tfhd / trun (fragmented files) ──────────────────────────

/// Movie-extends defaults for one track.
#[derive(Clone, Copy, Debug)]
pub struct TrexInfo {
    pub track_id: u32,
    pub default_sample_duration: u32,
}

/// Parse a trex box. Cursor must be at content start.
pub fn parse_trex(r: &mut ByteReader) -> ProbeResult<TrexInfo> {
    r.skip(4)?; // version + flags
    let track_id = r.read_u32()?;
    r.skip(4)?; // default_sample_description_index
    let default_sample_duration = r.read_u32()?;
    Ok(TrexInfo {
        track_id,
        default_sample_duration,
    })
}

/// tfhd fields relevant to duration reconstruction.
#[derive(Clone, Copy, Debug, Default)]
pub struct TfhdInfo {
    pub track_id: u32,
    pub default_sample_duration: Option<u32>,
}

/// Parse a tfhd box. Cursor must be at content start.
pub fn parse_tfhd(r: &mut ByteReader) -> ProbeResult<TfhdInfo> {
    r.read_u8()?; // version
    let flags = {
        let b = r.read_bytes(3)?;
        u32::from(b[0]) << 16 | u32::from(b[1]) << 8 | u32::from(b[2])
    };
    let track_id = r.read_u32()?;

    if flags & 0x01 != 0 {
        r.skip(8)?; // base_data_offset
    }
    if flags & 0x02 != 0 {
        r.skip(4)?; // sample_description_index
    }
    let default_sample_duration = if flags & 0x08 != 0 {
        Some(r.read_u32()?)
    } else {
        None
    };

    Ok(TfhdInfo {
        track_id,
        default_sample_duration,
    })
}

/// Accumulated sample timing of one trun box.
#[derive(Clone, Copy, Debug)]
pub struct TrunInfo {
    pub sample_count: u32,
    /// Sum of per-sample durations when the trun carries them.
    pub total_duration: Option<u64>,
}

/// Parse a trun box. Cursor must be at content start.
pub fn parse_trun(r: &mut ByteReader) -> ProbeResult<TrunInfo> {
    r.read_u8()?; // version
    let flags = {
        let b = r.read_bytes(3)?;
        u32::from(b[0]) << 16 | u32::from(b[1]) << 8 | u32::from(b[2])
    };
    let sample_count = r.read_u32()?;

    if flags & 0x01 != 0 {
        r.skip(4)?; // data_offset
    }
    if flags & 0x04 != 0 {
        r.skip(4)?; // first_sample_flags
    }

    let has_duration = flags & 0x100 != 0;
    let has_size = flags & 0x200 != 0;
    let has_flags = flags & 0x400 != 0;
    let has_cts = flags & 0x800 != 0;

    let mut total_duration = None;
    if has_duration || has_size || has_flags || has_cts {
        let mut sum: u64 = 0;
        for _ in 0..sample_count {
            if has_duration {
                sum += r.read_u32()? as u64;
            }
            if has_size {
                r.skip(4)?;
            }
            if has_flags {
                r.skip(4)?;
            }
            if has_cts {
                r.skip(4)?;
            }
        }
        if has_duration {
            total_duration = Some(sum);
        }
    }

    Ok(TrunInfo {
        sample_count,
        total_duration,
    })
}

// ─── Sample-entry decorations ────────────────────────────────────────

/// Codec string from an AVCDecoderConfigurationRecord: `avc1.PPLL` in hex.
pub fn avc_codec_string(config: &[u8]) -> Option<String> {
    if config.len() < 4 || config[0] != 1 {
        return None;
    }
    Some(format!("avc1.{:02x}{:02x}", config[1], config[3]))
}

/// Codec string from an HEVCDecoderConfigurationRecord, keeping the sample
/// entry's own FourCC (`hev1` or `hvc1`).
pub fn hevc_codec_string(entry_fourcc: u32, config: &[u8]) -> Option<String> {
    if config.len() < 13 || config[0] != 1 {
        return None;
    }
    let profile = config[1] & 0x1F;
    let level = config[12];
    Some(format!(
        "{}.{:x}{:x}",
        fourcc_to_string(entry_fourcc).to_lowercase(),
        profile,
        level
    ))
}

/// Parse a btrt box: bufferSizeDB, maxBitrate, avgBitrate. Returns the
/// average bitrate, or the max when no average is recorded.
pub fn parse_btrt(r: &mut ByteReader) -> ProbeResult<Option<u64>> {
    r.skip(4)?; // bufferSizeDB
    let max_bitrate = r.read_u32()?;
    let avg_bitrate = r.read_u32()?;
    Ok(match (avg_bitrate, max_bitrate) {
        (0, 0) => None,
        (0, max) => Some(max as u64),
        (avg, _) => Some(avg as u64),
    })
}

/// Parse a pasp box: pixel aspect ratio as hSpacing/vSpacing.
pub fn parse_pasp(r: &mut ByteReader) -> ProbeResult<Option<(u32, u32)>> {
    let h_spacing = r.read_u32()?;
    let v_spacing = r.read_u32()?;
    if h_spacing == 0 || v_spacing == 0 {
        return Ok(None);
    }
    Ok(Some((h_spacing, v_spacing)))
}

/// Parse a clap box: clean aperture width/height as rational pairs.
pub fn parse_clap(r: &mut ByteReader) -> ProbeResult<Option<(u32, u32)>> {
    let width_n = r.read_u32()?;
    let width_d = r.read_u32()?;
    let height_n = r.read_u32()?;
    let height_d = r.read_u32()?;
    if width_d == 0 || height_d == 0 {
        return Ok(None);
    }
    let width = (width_n as f64 / width_d as f64).round() as u32;
    let height = (height_n as f64 / height_d as f64).round() as u32;
    if width == 0 || height == 0 {
        return Ok(None);
    }
    Ok(Some((width, height)))
}

/// Parse a clef box (inside tapt): clean-aperture display dimensions as
/// 16.16 fixed point.
pub fn parse_clef(r: &mut ByteReader) -> ProbeResult<Option<(u32, u32)>> {
    r.skip(4)?; // version + flags
    let width = fixed_16_16_round(r.read_u32()?);
    let height = fixed_16_16_round(r.read_u32()?);
    if width == 0 || height == 0 {
        return Ok(None);
    }
    Ok(Some((width, height)))
}

// ─── esds ────────────────────────────────────────────────────────────

/// Audio information recovered from an esds descriptor chain.
#[derive(Clone, Debug, Default)]
pub struct EsdsInfo {
    /// Codec short string from the object-type indication; empty when the
    /// OTI is unknown.
    pub codec: String,
    /// Average bitrate in bits/s, when recorded.
    pub avg_bitrate: Option<u64>,
}

/// Parse an esds box payload (after version+flags) for the object type
/// indication and average bitrate.
pub fn parse_esds(r: &mut ByteReader, content_end: u64) -> ProbeResult<EsdsInfo> {
    r.skip(4)?; // version + flags

    let mut info = EsdsInfo::default();
    // Descriptor chain: ES_Descriptor(0x03) > DecoderConfigDescriptor(0x04).
    while r.position() < content_end && r.can_read(2) {
        let tag = r.read_u8()?;
        let len = read_descriptor_length(r)?;
        match tag {
            0x03 => {
                // ES_ID + stream priority / dependency flags
                r.skip(2)?;
                let flags = r.read_u8()?;
                if flags & 0x80 != 0 {
                    r.skip(2)?; // dependsOn_ES_ID
                }
                if flags & 0x40 != 0 {
                    let url_len = r.read_u8()? as usize;
                    r.skip(url_len)?;
                }
                if flags & 0x20 != 0 {
                    r.skip(2)?; // OCR_ES_ID
                }
                // Children follow inline.
            }
            0x04 => {
                let oti = r.read_u8()?;
                r.skip(1)?; // streamType
                r.skip(3)?; // bufferSizeDB
                r.skip(4)?; // maxBitrate
                let avg = r.read_u32()?;
                info.codec = audio_object_type_name(oti).to_string();
                if avg > 0 {
                    info.avg_bitrate = Some(avg as u64);
                }
                debug!("esds: OTI 0x{:02X} -> '{}'", oti, info.codec);
                return Ok(info);
            }
            _ => {
                r.skip(len.min(r.remaining()))?;
            }
        }
    }
    Ok(info)
}

/// Variable-length descriptor size: 7 bits per byte, bit 7 continues.
fn read_descriptor_length(r: &mut ByteReader) -> ProbeResult<usize> {
    let mut len: usize = 0;
    for _ in 0..4 {
        let b = r.read_u8()?;
        len = (len << 7) | (b & 0x7F) as usize;
        if b & 0x80 == 0 {
            break;
        }
    }
    Ok(len)
}

/// Map an MPEG-4 object-type indication to a codec short string.
pub fn audio_object_type_name(oti: u8) -> &'static str {
    match oti {
        0x40 | 0x41 | 0x42 => "aac",
        0x45 | 0x46 | 0x47 => "aac-he",
        0x6D => "aac-he-v2",
        0x6B => "mp3",
        0x67 | 0x68 | 0xA5 => "ac3",
        0xA6 => "e-ac3",
        0xA9 => "dts",
        0xAA => "dts-hd",
        0xAB => "dts-hd-ma",
        0xAC => "truehd",
        0xAD => "flac",
        0xAE => "alac",
        0xAF => "opus",
        0xDD => "vorbis",
        0xE1 => "pcm",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: build a box from fourcc + payload.
    fn make_box(cc: u32, payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&((payload.len() + 8) as u32).to_be_bytes());
        buf.extend_from_slice(&cc.to_be_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn box_header_basic() {
        let data = make_box(FTYP, &[0u8; 12]);
        let mut r = ByteReader::new(&data);
        let header = read_box_header(&mut r).unwrap().unwrap();
        assert_eq!(header.box_type, FTYP);
        assert_eq!(header.size, 20);
        assert_eq!(header.header_size, 8);
        assert_eq!(header.content_offset(), 8);
        assert_eq!(header.content_size(), 12);
        assert_eq!(header.end_offset(), 20);
    }

    #[test]
    fn box_header_extended_size() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(&MOOV.to_be_bytes());
        data.extend_from_slice(&48u64.to_be_bytes());
        data.extend_from_slice(&[0u8; 32]);

        let mut r = ByteReader::new(&data);
        let header = read_box_header(&mut r).unwrap().unwrap();
        assert_eq!(header.box_type, MOOV);
        assert_eq!(header.size, 48);
        assert_eq!(header.header_size, 16);
        assert_eq!(header.content_size(), 32);
    }

    #[test]
    fn box_header_to_eof() {
        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&fourcc(b'm', b'd', b'a', b't').to_be_bytes());
        data.extend_from_slice(&[0u8; 100]);

        let mut r = ByteReader::new(&data);
        let header = read_box_header(&mut r).unwrap().unwrap();
        assert_eq!(header.size, 108);
        assert_eq!(header.end_offset(), 108);
    }

    #[test]
    fn box_header_short_tail_ends_walk() {
        let mut r = ByteReader::new(&[0x00, 0x00, 0x00]);
        assert!(read_box_header(&mut r).unwrap().is_none());
    }

    #[test]
    fn box_header_undersized_is_malformed() {
        let mut data = Vec::new();
        data.extend_from_slice(&4u32.to_be_bytes());
        data.extend_from_slice(&FTYP.to_be_bytes());
        let mut r = ByteReader::new(&data);
        assert!(matches!(
            read_box_header(&mut r),
            Err(ProbeError::MalformedStructure { .. })
        ));
    }

    fn tkhd_payload(matrix: [i32; 9], width: u32, height: u32) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&[0u8; 4]); // version 0 + flags
        p.extend_from_slice(&[0u8; 8]); // times
        p.extend_from_slice(&1u32.to_be_bytes()); // track id
        p.extend_from_slice(&[0u8; 4]); // reserved
        p.extend_from_slice(&3000u32.to_be_bytes()); // duration
        p.extend_from_slice(&[0u8; 8]); // reserved
        p.extend_from_slice(&[0u8; 4]); // layer + alt group
        p.extend_from_slice(&[0u8; 4]); // volume + reserved
        for m in matrix {
            p.extend_from_slice(&m.to_be_bytes());
        }
        p.extend_from_slice(&(width << 16).to_be_bytes());
        p.extend_from_slice(&(height << 16).to_be_bytes());
        p
    }

    const IDENTITY: [i32; 9] = [FIXED_ONE, 0, 0, 0, FIXED_ONE, 0, 0, 0, 0x4000_0000];

    #[test]
    fn tkhd_identity_matrix() {
        let payload = tkhd_payload(IDENTITY, 1920, 1080);
        let info = parse_tkhd(&mut ByteReader::new(&payload)).unwrap();
        assert_eq!(info.track_id, 1);
        assert_eq!(info.duration, 3000);
        assert_eq!((info.width, info.height), (1920, 1080));
        assert_eq!(info.rotation, 0);
    }

    #[test]
    fn tkhd_rotation_90() {
        let matrix = [0, FIXED_ONE, 0, -FIXED_ONE, 0, 0, 0, 0, 0x4000_0000];
        let payload = tkhd_payload(matrix, 3840, 2160);
        let info = parse_tkhd(&mut ByteReader::new(&payload)).unwrap();
        assert_eq!(info.rotation, 90);
    }

    #[test]
    fn tkhd_rotation_270() {
        let matrix = [0, -FIXED_ONE, 0, FIXED_ONE, 0, 0, 0, 0, 0x4000_0000];
        let payload = tkhd_payload(matrix, 1920, 1080);
        let info = parse_tkhd(&mut ByteReader::new(&payload)).unwrap();
        assert_eq!(info.rotation, 270);
    }

    #[test]
    fn tkhd_rotation_180() {
        let matrix = [-FIXED_ONE, 0, 0, 0, -FIXED_ONE, 0, 0, 0, 0x4000_0000];
        let payload = tkhd_payload(matrix, 1920, 1080);
        let info = parse_tkhd(&mut ByteReader::new(&payload)).unwrap();
        assert_eq!(info.rotation, 180);
    }

    #[test]
    fn mdhd_versions() {
        // Version 0: 32-bit fields.
        let mut p = vec![0u8; 4];
        p.extend_from_slice(&[0u8; 8]);
        p.extend_from_slice(&30_000u32.to_be_bytes());
        p.extend_from_slice(&300_000u32.to_be_bytes());
        let info = parse_mdhd(&mut ByteReader::new(&p)).unwrap();
        assert_eq!(info.timescale, 30_000);
        assert_eq!(info.duration, 300_000);

        // Version 1: 64-bit times and duration.
        let mut p = vec![1u8, 0, 0, 0];
        p.extend_from_slice(&[0u8; 16]);
        p.extend_from_slice(&600u32.to_be_bytes());
        p.extend_from_slice(&6000u64.to_be_bytes());
        let info = parse_mdhd(&mut ByteReader::new(&p)).unwrap();
        assert_eq!(info.timescale, 600);
        assert_eq!(info.duration, 6000);
    }

    #[test]
    fn hdlr_handler_type() {
        let mut p = vec![0u8; 4];
        p.extend_from_slice(&[0u8; 4]);
        p.extend_from_slice(&VIDE.to_be_bytes());
        p.extend_from_slice(&[0u8; 12]);
        assert_eq!(parse_hdlr(&mut ByteReader::new(&p)).unwrap(), VIDE);
    }

    #[test]
    fn codec_strings() {
        let avcc = [1u8, 0x64, 0x00, 0x28, 0xFF];
        assert_eq!(avc_codec_string(&avcc).unwrap(), "avc1.6428");

        let mut hvcc = vec![1u8, 0x22];
        hvcc.extend_from_slice(&[0u8; 10]);
        hvcc.push(153);
        assert_eq!(hevc_codec_string(HEV1, &hvcc).unwrap(), "hev1.299");
        assert_eq!(hevc_codec_string(HVC1, &hvcc).unwrap(), "hvc1.299");
    }

    #[test]
    fn codec_strings_reject_bad_config() {
        assert!(avc_codec_string(&[2, 0x64, 0, 0x28]).is_none());
        assert!(avc_codec_string(&[1, 0x64]).is_none());
        assert!(hevc_codec_string(HEV1, &[1, 2, 3]).is_none());
    }

    #[test]
    fn btrt_prefers_average() {
        let mut p = Vec::new();
        p.extend_from_slice(&0u32.to_be_bytes());
        p.extend_from_slice(&8_000_000u32.to_be_bytes());
        p.extend_from_slice(&5_000_000u32.to_be_bytes());
        assert_eq!(
            parse_btrt(&mut ByteReader::new(&p)).unwrap(),
            Some(5_000_000)
        );

        let mut p = Vec::new();
        p.extend_from_slice(&0u32.to_be_bytes());
        p.extend_from_slice(&8_000_000u32.to_be_bytes());
        p.extend_from_slice(&0u32.to_be_bytes());
        assert_eq!(
            parse_btrt(&mut ByteReader::new(&p)).unwrap(),
            Some(8_000_000)
        );
    }

    #[test]
    fn pasp_anamorphic() {
        let mut p = Vec::new();
        p.extend_from_slice(&4u32.to_be_bytes());
        p.extend_from_slice(&3u32.to_be_bytes());
        assert_eq!(parse_pasp(&mut ByteReader::new(&p)).unwrap(), Some((4, 3)));

        let mut p = Vec::new();
        p.extend_from_slice(&4u32.to_be_bytes());
        p.extend_from_slice(&0u32.to_be_bytes());
        assert_eq!(parse_pasp(&mut ByteReader::new(&p)).unwrap(), None);
    }

    #[test]
    fn clap_rational_dims() {
        let mut p = Vec::new();
        for v in [1440u32, 1, 1080, 1, 0, 1, 0, 1] {
            p.extend_from_slice(&v.to_be_bytes());
        }
        assert_eq!(
            parse_clap(&mut ByteReader::new(&p)).unwrap(),
            Some((1440, 1080))
        );
    }

    #[test]
    fn clef_fixed_point_dims() {
        let mut p = vec![0u8; 4];
        p.extend_from_slice(&(1440u32 << 16).to_be_bytes());
        p.extend_from_slice(&(1080u32 << 16).to_be_bytes());
        assert_eq!(
            parse_clef(&mut ByteReader::new(&p)).unwrap(),
            Some((1440, 1080))
        );
    }

    fn esds_payload(oti: u8, avg_bitrate: u32) -> Vec<u8> {
        let mut p = vec![0u8; 4]; // version + flags
        // ES_Descriptor
        p.push(0x03);
        p.push(3 + 2 + 13 + 2); // length
        p.extend_from_slice(&1u16.to_be_bytes()); // ES_ID
        p.push(0); // flags + priority
        // DecoderConfigDescriptor
        p.push(0x04);
        p.push(13);
        p.push(oti);
        p.push(0x15); // streamType audio
        p.extend_from_slice(&[0u8; 3]); // bufferSizeDB
        p.extend_from_slice(&256_000u32.to_be_bytes()); // maxBitrate
        p.extend_from_slice(&avg_bitrate.to_be_bytes());
        p
    }

    #[test]
    fn esds_aac_with_bitrate() {
        let p = esds_payload(0x40, 128_000);
        let mut r = ByteReader::new(&p);
        let end = p.len() as u64;
        let info = parse_esds(&mut r, end).unwrap();
        assert_eq!(info.codec, "aac");
        assert_eq!(info.avg_bitrate, Some(128_000));
    }

    #[test]
    fn esds_object_type_table() {
        for (oti, name) in [
            (0x6Bu8, "mp3"),
            (0xA6, "e-ac3"),
            (0xAF, "opus"),
            (0xDD, "vorbis"),
            (0xE1, "pcm"),
            (0x45, "aac-he"),
            (0x6D, "aac-he-v2"),
        ] {
            let p = esds_payload(oti, 0);
            let mut r = ByteReader::new(&p);
            let info = parse_esds(&mut r, p.len() as u64).unwrap();
            assert_eq!(info.codec, name, "OTI 0x{oti:02X}");
            assert_eq!(info.avg_bitrate, None);
        }
        assert_eq!(audio_object_type_name(0x00), "");
    }

    #[test]
    fn trun_sums_explicit_durations() {
        let mut p = Vec::new();
        p.push(0); // version
        p.extend_from_slice(&[0x00, 0x01, 0x00]); // flags: sample durations
        p.extend_from_slice(&3u32.to_be_bytes());
        for d in [1000u32, 1000, 1500] {
            p.extend_from_slice(&d.to_be_bytes());
        }
        let info = parse_trun(&mut ByteReader::new(&p)).unwrap();
        assert_eq!(info.sample_count, 3);
        assert_eq!(info.total_duration, Some(3500));
    }

    #[test]
    fn trun_without_durations() {
        let mut p = Vec::new();
        p.push(0);
        p.extend_from_slice(&[0x00, 0x02, 0x01]); // flags: sizes + data offset
        p.extend_from_slice(&10u32.to_be_bytes());
        p.extend_from_slice(&0i32.to_be_bytes()); // data offset
        for _ in 0..10 {
            p.extend_from_slice(&100u32.to_be_bytes());
        }
        let info = parse_trun(&mut ByteReader::new(&p)).unwrap();
        assert_eq!(info.sample_count, 10);
        assert_eq!(info.total_duration, None);
    }
}
