//! MPEG-2 Transport Stream metadata parser.
//!
//! PSI-guided: PAT picks the program, the PMT lists the elementary
//! streams, and the first video stream's type identifies the codec. Pixel
//! dimensions come from an SPS found in the video PES payload; duration
//! from the spread between the first and last PCR, with a bit-rate-based
//! estimate when the stream carries no PCR at all.

use tracing::{debug, trace};
use vp_common::{Container, ParsedVideoMetadata, ProbeError, ProbeResult};

use crate::nal;

/// Fixed packet length.
const TS_PACKET_SIZE: usize = 188;
/// Packet sync byte.
const TS_SYNC: u8 = 0x47;
/// PCR base clock in Hz.
const PCR_CLOCK: f64 = 90_000.0;
/// Assumed stream bit rate for the no-PCR duration estimate.
const FALLBACK_BITRATE: f64 = 10_000_000.0;
/// Bound on packets scanned while hunting for an SPS.
const MAX_SPS_SCAN_PACKETS: usize = 5_000;
/// Cap on accumulated video payload during the SPS hunt.
const MAX_SPS_SCAN_BYTES: usize = 256 * 1024;

/// One elementary stream from the PMT.
#[derive(Copy, Clone, Debug)]
struct PmtStream {
    stream_type: u8,
    pid: u16,
}

/// Parse a transport-stream buffer into a container-level metadata record.
pub fn parse_transport_stream(data: &[u8]) -> ProbeResult<ParsedVideoMetadata> {
    if data.len() < 3 * TS_PACKET_SIZE
        || data[0] != TS_SYNC
        || data[TS_PACKET_SIZE] != TS_SYNC
        || data[2 * TS_PACKET_SIZE] != TS_SYNC
    {
        return Err(ProbeError::UnsupportedContainer);
    }

    // PAT -> first program -> PMT.
    let pmt_pid = find_pat_program(data).ok_or_else(|| ProbeError::MalformedStructure {
        offset: 0,
        reason: "no program association table found".into(),
    })?;
    debug!("PAT: PMT at PID {pmt_pid}");

    let (pcr_pid, streams) =
        find_pmt(data, pmt_pid).ok_or_else(|| ProbeError::MalformedStructure {
            offset: 0,
            reason: format!("no program map table on PID {pmt_pid}"),
        })?;

    let video = streams
        .iter()
        .copied()
        .find(|s| video_codec_for_stream_type(s.stream_type).is_some())
        .ok_or(ProbeError::NoVideoTrack)?;
    let audio = streams
        .iter()
        .copied()
        .find(|s| audio_codec_for_stream_type(s.stream_type).is_some());

    let mut meta = ParsedVideoMetadata::new(Container::Ts);
    meta.file_size = data.len() as u64;
    meta.video.codec = video_codec_for_stream_type(video.stream_type)
        .unwrap_or_default()
        .to_string();

    // Dimensions and profile/level from the first SPS in the video PES.
    let is_hevc = video.stream_type == 0x24;
    if let Some(sps) = scan_for_sps(data, video.pid, is_hevc) {
        meta.video.width = sps.width;
        meta.video.height = sps.height;
        meta.video.display_aspect_width = sps.width;
        meta.video.display_aspect_height = sps.height;
        meta.video.codec = if is_hevc {
            format!("hev1.{:x}{:x}", sps.profile_idc, sps.level_idc)
        } else {
            format!("avc1.{:02x}{:02x}", sps.profile_idc, sps.level_idc)
        };
    }

    // Duration: PCR spread, else a constant-bit-rate estimate.
    let first_pcr = scan_pcr(data, pcr_pid, false);
    let last_pcr = scan_pcr(data, pcr_pid, true);
    meta.duration = match (first_pcr, last_pcr) {
        (Some(first), Some(last)) if last > first => (last - first) as f64 / PCR_CLOCK,
        _ => data.len() as f64 * 8.0 / FALLBACK_BITRATE,
    };

    if let Some(a) = audio {
        meta.has_audio = true;
        meta.audio_codec = audio_codec_for_stream_type(a.stream_type)
            .unwrap_or_default()
            .to_string();
        // TS carries no channel/rate metadata at this level.
        meta.audio_sample_rate = 48_000;
        meta.audio_channels = 2;
    }

    Ok(meta)
}

fn video_codec_for_stream_type(stream_type: u8) -> Option<&'static str> {
    match stream_type {
        0x01 => Some("mp1v"),
        0x02 => Some("mp2v"),
        0x10 => Some("mp4v"),
        0x1B => Some("avc1"),
        0x24 => Some("hev1"),
        _ => None,
    }
}

fn audio_codec_for_stream_type(stream_type: u8) -> Option<&'static str> {
    match stream_type {
        0x03 | 0x04 => Some("mp3"),
        0x0F | 0x11 => Some("aac"),
        _ => None,
    }
}

/// Iterate aligned packets, yielding (pid, payload_unit_start, payload).
fn packets(data: &[u8]) -> impl Iterator<Item = (u16, bool, &[u8])> + '_ {
    data.chunks_exact(TS_PACKET_SIZE).filter_map(|chunk| {
        if chunk[0] != TS_SYNC {
            return None;
        }
        let pusi = chunk[1] & 0x40 != 0;
        let pid = ((chunk[1] & 0x1F) as u16) << 8 | chunk[2] as u16;
        let adaptation_field_control = (chunk[3] >> 4) & 0x3;

        let mut offset = 4;
        if adaptation_field_control & 0x2 != 0 {
            offset += 1 + chunk[4] as usize;
        }
        if adaptation_field_control & 0x1 == 0 || offset >= TS_PACKET_SIZE {
            return Some((pid, pusi, &chunk[0..0]));
        }
        Some((pid, pusi, &chunk[offset..]))
    })
}

/// Extract a PSI section with the given table id from a packet payload.
fn psi_section(payload: &[u8], pusi: bool, table_id: u8) -> Option<&[u8]> {
    let mut section = payload;
    if pusi {
        let pointer = *section.first()? as usize;
        section = section.get(1 + pointer..)?;
    }
    if *section.first()? != table_id {
        return None;
    }
    let section_length = ((*section.get(1)? & 0x0F) as usize) << 8 | *section.get(2)? as usize;
    let total = 3 + section_length;
    Some(section.get(..total).unwrap_or(section))
}

/// Scan the PAT (PID 0) for the first non-zero program's PMT PID.
fn find_pat_program(data: &[u8]) -> Option<u16> {
    for (pid, pusi, payload) in packets(data) {
        if pid != 0 {
            continue;
        }
        let Some(section) = psi_section(payload, pusi, 0x00) else {
            continue;
        };
        let end = section.len().saturating_sub(4); // strip CRC
        let mut pos = 8;
        while pos + 4 <= end {
            let program = u16::from_be_bytes([section[pos], section[pos + 1]]);
            let entry_pid =
                ((section[pos + 2] & 0x1F) as u16) << 8 | section[pos + 3] as u16;
            if program != 0 {
                return Some(entry_pid);
            }
            pos += 4;
        }
    }
    None
}

/// Scan for the PMT on the given PID; returns (pcr_pid, streams).
fn find_pmt(data: &[u8], pmt_pid: u16) -> Option<(u16, Vec<PmtStream>)> {
    for (pid, pusi, payload) in packets(data) {
        if pid != pmt_pid {
            continue;
        }
        let Some(section) = psi_section(payload, pusi, 0x02) else {
            continue;
        };
        if section.len() < 12 {
            continue;
        }

        let pcr_pid = ((section[8] & 0x1F) as u16) << 8 | section[9] as u16;
        let program_info_length =
            ((section[10] & 0x0F) as usize) << 8 | section[11] as usize;

        let mut streams = Vec::new();
        let mut pos = 12 + program_info_length;
        let end = section.len().saturating_sub(4);
        while pos + 5 <= end {
            let stream_type = section[pos];
            let es_pid = ((section[pos + 1] & 0x1F) as u16) << 8 | section[pos + 2] as u16;
            let es_info_length =
                ((section[pos + 3] & 0x0F) as usize) << 8 | section[pos + 4] as usize;
            trace!("PMT: stream_type 0x{stream_type:02X} on PID {es_pid}");
            streams.push(PmtStream {
                stream_type,
                pid: es_pid,
            });
            pos += 5 + es_info_length;
        }
        return Some((pcr_pid, streams));
    }
    None
}

/// Accumulate video-PID payload and look for a decodable SPS.
fn scan_for_sps(data: &[u8], video_pid: u16, is_hevc: bool) -> Option<nal::SpsInfo> {
    let mut es: Vec<u8> = Vec::new();
    let mut scanned = 0usize;

    for (pid, _pusi, payload) in packets(data) {
        scanned += 1;
        if scanned > MAX_SPS_SCAN_PACKETS || es.len() > MAX_SPS_SCAN_BYTES {
            break;
        }
        if pid != video_pid || payload.is_empty() {
            continue;
        }
        es.extend_from_slice(payload);

        for unit in nal::split_annexb(&es) {
            let parsed = if is_hevc {
                nal::parse_hevc_sps(unit)
            } else {
                nal::parse_h264_sps(unit)
            };
            if let Some(sps) = parsed {
                debug!("SPS: {}x{}", sps.width, sps.height);
                return Some(sps);
            }
        }
    }
    None
}

/// PCR base (90 kHz units) from one packet's adaptation field, if flagged.
fn packet_pcr(chunk: &[u8], pcr_pid: u16) -> Option<u64> {
    if chunk.len() < TS_PACKET_SIZE || chunk[0] != TS_SYNC {
        return None;
    }
    let pid = ((chunk[1] & 0x1F) as u16) << 8 | chunk[2] as u16;
    if pcr_pid != 0x1FFF && pid != pcr_pid {
        return None;
    }
    let adaptation_field_control = (chunk[3] >> 4) & 0x3;
    if adaptation_field_control & 0x2 == 0 {
        return None;
    }
    let adaptation_length = chunk[4] as usize;
    if adaptation_length < 7 || chunk[5] & 0x10 == 0 {
        return None;
    }
    let b = &chunk[6..12];
    Some(
        (b[0] as u64) << 25
            | (b[1] as u64) << 17
            | (b[2] as u64) << 9
            | (b[3] as u64) << 1
            | (b[4] as u64) >> 7,
    )
}

/// Find the first (or, scanning backward, the last) PCR on the PCR PID.
fn scan_pcr(data: &[u8], pcr_pid: u16, backward: bool) -> Option<u64> {
    let packet_count = data.len() / TS_PACKET_SIZE;
    let indices: Box<dyn Iterator<Item = usize>> = if backward {
        Box::new((0..packet_count).rev())
    } else {
        Box::new(0..packet_count)
    };
    for i in indices {
        let chunk = &data[i * TS_PACKET_SIZE..(i + 1) * TS_PACKET_SIZE];
        if let Some(pcr) = packet_pcr(chunk, pcr_pid) {
            return Some(pcr);
        }
    }
    None
}
