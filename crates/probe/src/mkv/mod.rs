//! WebM/MKV (Matroska) metadata parser.
//!
//! Walks the EBML tree for segment information and track settings; never
//! enters a Cluster. WebM and MKV share the wire format and this parser —
//! the DocType decides the container tag, and the MKV-only adjustments
//! (pixel crop, aspect-ratio type, stereo mode) are gated on it.

pub mod ebml;
pub mod elements;

use tracing::{debug, warn};
use vp_common::{Container, ParsedVideoMetadata, ProbeError, ProbeResult};

use crate::color::parse_webm_color_info;
use crate::fps::snap_fps;
use crate::reader::ByteReader;
use ebml::{read_binary, read_element, read_float, read_string, read_uint, skip_element};
use elements::*;

/// Scan window for locating the Segment element after the EBML header.
const SEGMENT_SCAN_WINDOW: u64 = 1024;
/// Bound on element-search iterations at any one nesting level.
const MAX_ELEMENT_SEARCH: u32 = 100;
/// Bound on iterations across a Tracks walk.
const MAX_TRACK_ITERATIONS: u32 = 10_000;

/// Nanoseconds per second, the reference for TimecodeScale and
/// DefaultDuration.
const NS_PER_SECOND: f64 = 1_000_000_000.0;

/// Parse a Matroska/WebM buffer into a container-level metadata record.
pub fn parse_matroska(data: &[u8]) -> ProbeResult<ParsedVideoMetadata> {
    let mut r = ByteReader::new(data);

    let doc_type = verify_ebml_header(&mut r)?;
    let container = if doc_type == "matroska" {
        Container::Mkv
    } else {
        Container::WebM
    };

    let segment = find_segment(&mut r)?;
    let segment_end = segment
        .end_offset()
        .unwrap_or(data.len() as u64)
        .min(data.len() as u64);

    let mut timecode_scale: u64 = 1_000_000; // default: 1 ms ticks
    let mut raw_duration: Option<f64> = None;
    let mut tracks: Vec<MkvTrackInfo> = Vec::new();

    let mut iterations = 0;
    while r.position() + 2 <= segment_end && iterations < MAX_ELEMENT_SEARCH {
        iterations += 1;
        let elem = match read_element(&mut r) {
            Ok(e) => e,
            Err(e) => {
                debug!("segment walk stopped: {e}");
                break;
            }
        };

        match elem.id {
            INFO => {
                if let Err(e) =
                    parse_info(&mut r, &elem, &mut timecode_scale, &mut raw_duration)
                {
                    debug!("info skipped: {e}");
                }
            }
            TRACKS => match parse_tracks(&mut r, &elem) {
                Ok(t) => tracks = t,
                Err(e) => debug!("tracks skipped: {e}"),
            },
            CLUSTER => break,
            _ => {}
        }

        match elem.end_offset() {
            Some(end) => {
                if r.seek(end.min(segment_end)).is_err() {
                    break;
                }
            }
            None => break,
        }
    }

    assemble(data, container, timecode_scale, raw_duration, &tracks)
}

/// Verify the EBML header and return the DocType (default "webm").
fn verify_ebml_header(r: &mut ByteReader) -> ProbeResult<String> {
    let header = read_element(r)?;
    if header.id != EBML_HEADER {
        return Err(ProbeError::UnsupportedContainer);
    }
    let header_end = header.end_offset().ok_or(ProbeError::MalformedStructure {
        offset: header.position,
        reason: "EBML header with unknown size".into(),
    })?;
    if header_end > r.len() as u64 {
        return Err(ProbeError::TruncatedInput {
            context: "EBML header",
            offset: header.position,
        });
    }

    let mut doc_type: Option<String> = None;
    let mut iterations = 0;
    while r.position() + 2 <= header_end && iterations < MAX_ELEMENT_SEARCH {
        iterations += 1;
        let child = read_element(r)?;
        if child.id == DOC_TYPE {
            let raw = r.read_bytes(child.size.min(64) as usize)?;
            let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            let parsed = std::str::from_utf8(&raw[..end]).map_err(|_| {
                ProbeError::MalformedStructure {
                    offset: child.position,
                    reason: "DocType is not UTF-8".into(),
                }
            })?;
            doc_type = Some(parsed.to_owned());
        }
        match child.end_offset() {
            Some(end) => skip_to(r, end.min(header_end))?,
            None => break,
        }
    }

    skip_to(r, header_end)?;
    Ok(doc_type.unwrap_or_else(|| "webm".to_string()))
}

/// Locate the Segment element, scanning at most 1 KiB past the header.
fn find_segment(r: &mut ByteReader) -> ProbeResult<ebml::EbmlElement> {
    let scan_end = (r.position() + SEGMENT_SCAN_WINDOW).min(r.len() as u64);
    while r.position() + 4 <= scan_end {
        let elem = read_element(r)?;
        if elem.id == SEGMENT {
            return Ok(elem);
        }
        match elem.end_offset() {
            Some(end) => skip_to(r, end)?,
            None => break,
        }
    }
    Err(ProbeError::MalformedStructure {
        offset: r.position(),
        reason: "Segment element not found within scan window".into(),
    })
}

/// Parse the Info element for TimecodeScale and Duration.
fn parse_info(
    r: &mut ByteReader,
    info: &ebml::EbmlElement,
    timecode_scale: &mut u64,
    raw_duration: &mut Option<f64>,
) -> ProbeResult<()> {
    let end = match info.end_offset() {
        Some(e) => e.min(r.len() as u64),
        None => return Ok(()),
    };
    r.seek(info.data_offset())?;

    let mut iterations = 0;
    while r.position() + 2 <= end && iterations < MAX_ELEMENT_SEARCH {
        iterations += 1;
        let child = read_element(r)?;

        match child.id {
            TIMECODE_SCALE => {
                *timecode_scale = read_uint(r, child.size)?;
                debug!("TimecodeScale: {}", *timecode_scale);
            }
            DURATION => {
                // 4 bytes reads as f32, 8 as f64, anything else falls back
                // to an integer interpretation.
                let value = match child.size {
                    4 | 8 => read_float(r, child.size)?,
                    s if (1..=8).contains(&s) => read_uint(r, s)? as f64,
                    _ => {
                        skip_element(r, child.size)?;
                        continue;
                    }
                };
                if value.is_finite() && value > 0.0 {
                    *raw_duration = Some(value);
                } else {
                    warn!("rejecting non-finite or non-positive Duration {value}");
                }
            }
            _ => skip_element(r, child.size)?,
        }
    }
    Ok(())
}

/// Parse the Tracks element into a list of track entries.
fn parse_tracks(
    r: &mut ByteReader,
    tracks_elem: &ebml::EbmlElement,
) -> ProbeResult<Vec<MkvTrackInfo>> {
    let end = match tracks_elem.end_offset() {
        Some(e) => e.min(r.len() as u64),
        None => return Ok(Vec::new()),
    };
    r.seek(tracks_elem.data_offset())?;

    let mut tracks = Vec::new();
    let mut iterations = 0;
    while r.position() + 2 <= end && iterations < MAX_TRACK_ITERATIONS {
        iterations += 1;
        let child = read_element(r)?;

        if child.id == TRACK_ENTRY {
            match parse_track_entry(r, &child) {
                Ok(track) => {
                    debug!(
                        "track #{}: type {:?}, codec {}",
                        track.track_number, track.track_type, track.codec_id
                    );
                    tracks.push(track);
                }
                Err(e) => debug!("track entry skipped: {e}"),
            }
            if let Some(entry_end) = child.end_offset() {
                skip_to(r, entry_end.min(end))?;
            } else {
                break;
            }
        } else {
            match child.end_offset() {
                Some(child_end) => skip_to(r, child_end.min(end))?,
                None => break,
            }
        }
    }
    Ok(tracks)
}

/// Parse a single TrackEntry element.
fn parse_track_entry(
    r: &mut ByteReader,
    entry: &ebml::EbmlElement,
) -> ProbeResult<MkvTrackInfo> {
    let end = entry
        .end_offset()
        .ok_or(ProbeError::MalformedStructure {
            offset: entry.position,
            reason: "TrackEntry with unknown size".into(),
        })?
        .min(r.len() as u64);

    let mut track = MkvTrackInfo::default();
    let mut iterations = 0;
    while r.position() + 2 <= end && iterations < MAX_ELEMENT_SEARCH {
        iterations += 1;
        let child = read_element(r)?;

        match child.id {
            TRACK_NUMBER => track.track_number = read_uint(r, child.size)?,
            TRACK_TYPE => {
                track.track_type = Some(MkvTrackType::from_value(read_uint(r, child.size)?));
            }
            CODEC_ID => track.codec_id = read_string(r, child.size)?,
            CODEC_PRIVATE => track.codec_private = Some(read_binary(r, child.size)?),
            DEFAULT_DURATION => {
                track.default_duration_ns = Some(read_uint(r, child.size)?);
            }
            VIDEO => {
                track.video = Some(parse_video_settings(r, &child)?);
                if let Some(child_end) = child.end_offset() {
                    skip_to(r, child_end.min(end))?;
                }
            }
            AUDIO => {
                track.audio = Some(parse_audio_settings(r, &child)?);
                if let Some(child_end) = child.end_offset() {
                    skip_to(r, child_end.min(end))?;
                }
            }
            _ => skip_element(r, child.size)?,
        }
    }

    Ok(track)
}

/// Parse a Video settings sub-element.
fn parse_video_settings(
    r: &mut ByteReader,
    video_elem: &ebml::EbmlElement,
) -> ProbeResult<MkvVideoInfo> {
    let end = video_elem
        .end_offset()
        .unwrap_or(r.len() as u64)
        .min(r.len() as u64);

    let mut video = MkvVideoInfo::default();
    let mut iterations = 0;
    while r.position() + 2 <= end && iterations < MAX_ELEMENT_SEARCH {
        iterations += 1;
        let child = read_element(r)?;

        match child.id {
            PIXEL_WIDTH => video.pixel_width = read_uint(r, child.size)? as u32,
            PIXEL_HEIGHT => video.pixel_height = read_uint(r, child.size)? as u32,
            DISPLAY_WIDTH => video.display_width = Some(read_uint(r, child.size)? as u32),
            DISPLAY_HEIGHT => video.display_height = Some(read_uint(r, child.size)? as u32),
            PIXEL_CROP_TOP => video.crop_top = read_uint(r, child.size)? as u32,
            PIXEL_CROP_BOTTOM => video.crop_bottom = read_uint(r, child.size)? as u32,
            PIXEL_CROP_LEFT => video.crop_left = read_uint(r, child.size)? as u32,
            PIXEL_CROP_RIGHT => video.crop_right = read_uint(r, child.size)? as u32,
            ASPECT_RATIO_TYPE => video.aspect_ratio_type = Some(read_uint(r, child.size)?),
            STEREO_MODE => video.stereo_mode = Some(read_uint(r, child.size)?),
            COLOUR => video.colour = Some(read_binary(r, child.size)?),
            _ => skip_element(r, child.size)?,
        }
    }
    Ok(video)
}

/// Parse an Audio settings sub-element.
fn parse_audio_settings(
    r: &mut ByteReader,
    audio_elem: &ebml::EbmlElement,
) -> ProbeResult<MkvAudioInfo> {
    let end = audio_elem
        .end_offset()
        .unwrap_or(r.len() as u64)
        .min(r.len() as u64);

    let mut audio = MkvAudioInfo::default();
    let mut iterations = 0;
    while r.position() + 2 <= end && iterations < MAX_ELEMENT_SEARCH {
        iterations += 1;
        let child = read_element(r)?;

        match child.id {
            SAMPLING_FREQUENCY => {
                audio.sampling_frequency = Some(read_float(r, child.size)?);
            }
            OUTPUT_SAMPLING_FREQUENCY => {
                audio.output_sampling_frequency = Some(read_float(r, child.size)?);
            }
            CHANNELS => audio.channels = Some(read_uint(r, child.size)?),
            BIT_DEPTH => audio.bit_depth = Some(read_uint(r, child.size)?),
            _ => skip_element(r, child.size)?,
        }
    }
    Ok(audio)
}

// ─── Assembly ────────────────────────────────────────────────────────

fn assemble(
    data: &[u8],
    container: Container,
    timecode_scale: u64,
    raw_duration: Option<f64>,
    tracks: &[MkvTrackInfo],
) -> ProbeResult<ParsedVideoMetadata> {
    let mut meta = ParsedVideoMetadata::new(container);
    meta.file_size = data.len() as u64;

    if let Some(d) = raw_duration {
        meta.duration = d * timecode_scale as f64 / NS_PER_SECOND;
    }

    let video_track = tracks
        .iter()
        .find(|t| t.track_type == Some(MkvTrackType::Video));
    let audio_track = tracks
        .iter()
        .find(|t| t.track_type == Some(MkvTrackType::Audio));

    if let Some(track) = video_track {
        let settings = track.video.clone().unwrap_or_default();
        meta.video.width = settings.pixel_width;
        meta.video.height = settings.pixel_height;

        // Display dimensions default to pixel dimensions.
        let mut display_w = settings.display_width.unwrap_or(settings.pixel_width);
        let mut display_h = settings.display_height.unwrap_or(settings.pixel_height);

        if container == Container::Mkv {
            // Crop values carve the display rectangle out of the coded one;
            // explicit display dimensions win over the computed ones.
            let has_crop = (settings.crop_top
                | settings.crop_bottom
                | settings.crop_left
                | settings.crop_right)
                > 0;
            if has_crop {
                if settings.display_width.is_none() {
                    display_w = settings
                        .pixel_width
                        .saturating_sub(settings.crop_left + settings.crop_right);
                }
                if settings.display_height.is_none() {
                    display_h = settings
                        .pixel_height
                        .saturating_sub(settings.crop_top + settings.crop_bottom);
                }
            }

            if settings.aspect_ratio_type == Some(1) && display_w > 0 && display_h > 0 {
                let g = gcd(display_w, display_h);
                display_w /= g;
                display_h /= g;
            }

            match settings.stereo_mode {
                Some(1) => display_w /= 2,
                Some(2) | Some(3) => display_h /= 2,
                _ => {}
            }
        }
        meta.video.display_aspect_width = display_w;
        meta.video.display_aspect_height = display_h;

        meta.video.codec = video_codec_string(&track.codec_id, track.codec_private.as_deref());

        if let Some(dd) = track.default_duration_ns.filter(|&dd| dd > 0) {
            meta.video.fps = snap_fps(NS_PER_SECOND / dd as f64);
        }

        if let Some(colour) = &settings.colour {
            meta.video.color = parse_webm_color_info(colour);
        }
    }

    if let Some(track) = audio_track {
        meta.has_audio = true;
        meta.audio_codec = audio_codec_string(&track.codec_id);

        let settings = track.audio.clone().unwrap_or_default();
        let mut channels = settings
            .channels
            .filter(|&c| (1..=8).contains(&c))
            .map(|c| c as u16);
        let mut sample_rate = settings
            .sampling_frequency
            .filter(|f| f.is_finite() && (8000.0..=192_000.0).contains(f))
            .map(|f| f as u32);

        // Vorbis tracks often omit the Audio element fields; the
        // identification header inside CodecPrivate carries them.
        if channels.is_none() || sample_rate.is_none() {
            if let Some((ch, rate)) =
                track.codec_private.as_deref().and_then(vorbis_id_header)
            {
                channels = channels.or(Some(ch));
                sample_rate = sample_rate.or(Some(rate));
            }
        }

        meta.audio_channels = channels.unwrap_or(2);
        meta.audio_sample_rate = sample_rate.unwrap_or(44_100);
    }

    Ok(meta)
}

/// Map a Matroska codec ID to the codec short string, enriched with
/// profile/level from CodecPrivate for AVC and HEVC.
fn video_codec_string(codec_id: &str, codec_private: Option<&[u8]>) -> String {
    match codec_id {
        "V_VP8" => "vp8".to_string(),
        "V_VP9" => "vp9".to_string(),
        "V_AV1" => "av01".to_string(),
        "V_MPEG4/ISO/AVC" => codec_private
            .and_then(crate::mp4::boxes::avc_codec_string)
            .unwrap_or_else(|| "avc1".to_string()),
        "V_MPEGH/ISO/HEVC" => hevc_private_codec_string(codec_private)
            .unwrap_or_else(|| "hevc".to_string()),
        other => other.to_lowercase(),
    }
}

/// HEVC profile/level from an HVCC-format CodecPrivate blob.
fn hevc_private_codec_string(codec_private: Option<&[u8]>) -> Option<String> {
    let cp = codec_private?;
    if cp.len() < 13 || cp[0] != 1 {
        return None;
    }
    let profile = cp[1] & 0x1F;
    let level = cp[12];
    Some(format!("hevc.{profile:x}{level:x}"))
}

/// Map a Matroska audio codec ID to the codec short string.
fn audio_codec_string(codec_id: &str) -> String {
    match codec_id {
        "A_OPUS" => "opus".to_string(),
        "A_VORBIS" => "vorbis".to_string(),
        "A_FLAC" => "flac".to_string(),
        "A_MPEG/L3" => "mp3".to_string(),
        "A_MPEG/L2" => "mp2".to_string(),
        "A_AC3" => "ac3".to_string(),
        "A_EAC3" => "e-ac3".to_string(),
        "A_DTS" => "dts".to_string(),
        "A_TRUEHD" => "truehd".to_string(),
        id if id.starts_with("A_AAC") => "aac".to_string(),
        id if id.starts_with("A_PCM") => "pcm".to_string(),
        other => other.to_lowercase(),
    }
}

/// Channels and sample rate from a Vorbis identification header inside a
/// Xiph-laced CodecPrivate blob.
fn vorbis_id_header(codec_private: &[u8]) -> Option<(u16, u32)> {
    if codec_private.len() < 2 {
        return None;
    }
    let packet_count = codec_private[0] as usize;
    if packet_count == 0 {
        return None;
    }

    // Xiph lacing: each of the first packetCount-1 lengths is a run of
    // 0xFF bytes plus a terminator byte.
    let mut pos = 1usize;
    for _ in 0..packet_count - 1 {
        loop {
            let b = *codec_private.get(pos)?;
            pos += 1;
            if b != 0xFF {
                break;
            }
        }
    }

    let packet = codec_private.get(pos..)?;
    if packet.len() < 16 || packet[0] != 0x01 || &packet[1..7] != b"vorbis" {
        return None;
    }
    let channels = packet[11] as u16;
    let sample_rate = u32::from_le_bytes([packet[12], packet[13], packet[14], packet[15]]);
    if channels == 0 || sample_rate == 0 {
        return None;
    }
    Some((channels, sample_rate))
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a.max(1)
}

/// Seek helper: forward-only skip to an absolute offset.
fn skip_to(r: &mut ByteReader, offset: u64) -> ProbeResult<()> {
    r.seek(offset.min(r.len() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vp_common::TransferCharacteristics;

    // ── EBML builders ──

    fn id_bytes(id: u32) -> Vec<u8> {
        let b = id.to_be_bytes();
        let skip = b.iter().take_while(|&&x| x == 0).count();
        b[skip..].to_vec()
    }

    fn size_bytes(len: usize) -> Vec<u8> {
        if len < 0x7F {
            vec![0x80 | len as u8]
        } else {
            vec![0x40 | (len >> 8) as u8, (len & 0xFF) as u8]
        }
    }

    fn el(id: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = id_bytes(id);
        out.extend_from_slice(&size_bytes(payload.len()));
        out.extend_from_slice(payload);
        out
    }

    fn uint_el(id: u32, value: u64) -> Vec<u8> {
        let b = value.to_be_bytes();
        let skip = b.iter().take_while(|&&x| x == 0).count().min(7);
        el(id, &b[skip..])
    }

    fn float4_el(id: u32, value: f32) -> Vec<u8> {
        el(id, &value.to_be_bytes())
    }

    fn float8_el(id: u32, value: f64) -> Vec<u8> {
        el(id, &value.to_be_bytes())
    }

    fn str_el(id: u32, value: &str) -> Vec<u8> {
        el(id, value.as_bytes())
    }

    fn ebml_header(doc_type: &str) -> Vec<u8> {
        el(EBML_HEADER, &str_el(DOC_TYPE, doc_type))
    }

    fn webm_file(doc_type: &str, segment_children: &[u8]) -> Vec<u8> {
        let mut data = ebml_header(doc_type);
        data.extend_from_slice(&el(SEGMENT, segment_children));
        data
    }

    fn vp9_video_track() -> Vec<u8> {
        let video = [
            uint_el(PIXEL_WIDTH, 1280),
            uint_el(PIXEL_HEIGHT, 720),
        ]
        .concat();
        el(
            TRACK_ENTRY,
            &[
                uint_el(TRACK_NUMBER, 1),
                uint_el(TRACK_TYPE, 1),
                str_el(CODEC_ID, "V_VP9"),
                uint_el(DEFAULT_DURATION, 33_333_333),
                el(VIDEO, &video),
            ]
            .concat(),
        )
    }

    fn opus_audio_track() -> Vec<u8> {
        let audio = [
            float8_el(SAMPLING_FREQUENCY, 48_000.0),
            uint_el(CHANNELS, 2),
        ]
        .concat();
        el(
            TRACK_ENTRY,
            &[
                uint_el(TRACK_NUMBER, 2),
                uint_el(TRACK_TYPE, 2),
                str_el(CODEC_ID, "A_OPUS"),
                el(AUDIO, &audio),
            ]
            .concat(),
        )
    }

    #[test]
    fn webm_vp9_opus() {
        let info = [
            uint_el(TIMECODE_SCALE, 1_000_000),
            float4_el(DURATION, 10_000.0),
        ]
        .concat();
        let tracks = [vp9_video_track(), opus_audio_track()].concat();
        let segment = [el(INFO, &info), el(TRACKS, &tracks)].concat();
        let data = webm_file("webm", &segment);

        let meta = parse_matroska(&data).unwrap();
        assert_eq!(meta.container, Container::WebM);
        assert_eq!(meta.video.width, 1280);
        assert_eq!(meta.video.height, 720);
        assert_eq!(meta.video.display_aspect_width, 1280);
        assert_eq!(meta.video.display_aspect_height, 720);
        assert_eq!(meta.video.codec, "vp9");
        assert_eq!(meta.video.fps, Some(30.0));
        assert!((meta.duration - 10.0).abs() < 1e-9);
        assert!(meta.has_audio);
        assert_eq!(meta.audio_channels, 2);
        assert_eq!(meta.audio_sample_rate, 48_000);
        assert_eq!(meta.audio_codec, "opus");
        assert!(meta.video.color.is_empty());
    }

    #[test]
    fn mkv_crop_adjusts_display_dims() {
        let video = [
            uint_el(PIXEL_WIDTH, 1920),
            uint_el(PIXEL_HEIGHT, 1088),
            uint_el(PIXEL_CROP_BOTTOM, 8),
        ]
        .concat();
        let track = el(
            TRACK_ENTRY,
            &[
                uint_el(TRACK_NUMBER, 1),
                uint_el(TRACK_TYPE, 1),
                str_el(CODEC_ID, "V_MPEG4/ISO/AVC"),
                el(VIDEO, &video),
            ]
            .concat(),
        );
        let segment = el(TRACKS, &track);
        let data = webm_file("matroska", &segment);

        let meta = parse_matroska(&data).unwrap();
        assert_eq!(meta.container, Container::Mkv);
        assert_eq!(meta.video.width, 1920);
        assert_eq!(meta.video.height, 1088);
        assert_eq!(meta.video.display_aspect_width, 1920);
        assert_eq!(meta.video.display_aspect_height, 1080);
        assert_eq!(meta.video.codec, "avc1");
    }

    #[test]
    fn webm_ignores_crop() {
        let video = [
            uint_el(PIXEL_WIDTH, 1920),
            uint_el(PIXEL_HEIGHT, 1088),
            uint_el(PIXEL_CROP_BOTTOM, 8),
        ]
        .concat();
        let track = el(
            TRACK_ENTRY,
            &[uint_el(TRACK_TYPE, 1), el(VIDEO, &video)].concat(),
        );
        let data = webm_file("webm", &el(TRACKS, &track));

        let meta = parse_matroska(&data).unwrap();
        assert_eq!(meta.video.display_aspect_height, 1088);
    }

    #[test]
    fn mkv_stereo_and_aspect_type() {
        // Side-by-side stereo halves the display width.
        let video = [
            uint_el(PIXEL_WIDTH, 3840),
            uint_el(PIXEL_HEIGHT, 1080),
            uint_el(STEREO_MODE, 1),
        ]
        .concat();
        let track = el(
            TRACK_ENTRY,
            &[uint_el(TRACK_TYPE, 1), el(VIDEO, &video)].concat(),
        );
        let meta = parse_matroska(&webm_file("matroska", &el(TRACKS, &track))).unwrap();
        assert_eq!(meta.video.display_aspect_width, 1920);

        // AspectRatioType 1 reduces by gcd.
        let video = [
            uint_el(PIXEL_WIDTH, 1920),
            uint_el(PIXEL_HEIGHT, 1080),
            uint_el(ASPECT_RATIO_TYPE, 1),
        ]
        .concat();
        let track = el(
            TRACK_ENTRY,
            &[uint_el(TRACK_TYPE, 1), el(VIDEO, &video)].concat(),
        );
        let meta = parse_matroska(&webm_file("matroska", &el(TRACKS, &track))).unwrap();
        assert_eq!(meta.video.display_aspect_width, 16);
        assert_eq!(meta.video.display_aspect_height, 9);
    }

    #[test]
    fn avc_codec_enriched_from_private() {
        let avcc = [1u8, 0x64, 0x00, 0x28, 0xFF, 0xE1, 0x00, 0x00];
        let track = el(
            TRACK_ENTRY,
            &[
                uint_el(TRACK_TYPE, 1),
                str_el(CODEC_ID, "V_MPEG4/ISO/AVC"),
                el(CODEC_PRIVATE, &avcc),
                el(VIDEO, &[uint_el(PIXEL_WIDTH, 640), uint_el(PIXEL_HEIGHT, 480)].concat()),
            ]
            .concat(),
        );
        let meta = parse_matroska(&webm_file("matroska", &el(TRACKS, &track))).unwrap();
        assert_eq!(meta.video.codec, "avc1.6428");
    }

    #[test]
    fn colour_element_detects_hdr() {
        let colour = [
            uint_el(0x55BA, 9),  // primaries: bt2020
            uint_el(0x55B9, 16), // transfer: smpte2084
            uint_el(0x55B1, 9),  // matrix: bt2020nc
        ]
        .concat();
        let video = [
            uint_el(PIXEL_WIDTH, 3840),
            uint_el(PIXEL_HEIGHT, 2160),
            el(COLOUR, &colour),
        ]
        .concat();
        let track = el(
            TRACK_ENTRY,
            &[uint_el(TRACK_TYPE, 1), str_el(CODEC_ID, "V_VP9"), el(VIDEO, &video)].concat(),
        );
        let meta = parse_matroska(&webm_file("webm", &el(TRACKS, &track))).unwrap();
        assert!(meta.video.color.is_hdr());
        assert_eq!(
            meta.video.color.transfer_characteristics,
            Some(TransferCharacteristics::Smpte2084)
        );
    }

    #[test]
    fn audio_only_is_not_an_error() {
        let data = webm_file("webm", &el(TRACKS, &opus_audio_track()));
        let meta = parse_matroska(&data).unwrap();
        assert!(meta.has_audio);
        assert_eq!(meta.video.width, 0);
        assert_eq!(meta.video.codec, "");
    }

    #[test]
    fn invalid_audio_fields_fall_back_to_defaults() {
        let audio = [
            float8_el(SAMPLING_FREQUENCY, 1_000_000.0), // out of range
            uint_el(CHANNELS, 99),                      // out of range
        ]
        .concat();
        let track = el(
            TRACK_ENTRY,
            &[uint_el(TRACK_TYPE, 2), str_el(CODEC_ID, "A_OPUS"), el(AUDIO, &audio)].concat(),
        );
        let meta = parse_matroska(&webm_file("webm", &el(TRACKS, &track))).unwrap();
        assert_eq!(meta.audio_channels, 2);
        assert_eq!(meta.audio_sample_rate, 44_100);
    }

    #[test]
    fn vorbis_private_fallback() {
        // Xiph lacing: 3 packets, two lengths, then the id header.
        let mut private = vec![3u8, 30, 40];
        private.push(0x01);
        private.extend_from_slice(b"vorbis");
        private.extend_from_slice(&0u32.to_le_bytes()); // version
        private.push(6); // channels
        private.extend_from_slice(&44_100u32.to_le_bytes());

        let track = el(
            TRACK_ENTRY,
            &[
                uint_el(TRACK_TYPE, 2),
                str_el(CODEC_ID, "A_VORBIS"),
                el(CODEC_PRIVATE, &private),
            ]
            .concat(),
        );
        let meta = parse_matroska(&webm_file("webm", &el(TRACKS, &track))).unwrap();
        assert_eq!(meta.audio_codec, "vorbis");
        assert_eq!(meta.audio_channels, 6);
        assert_eq!(meta.audio_sample_rate, 44_100);
    }

    #[test]
    fn duration_integer_fallback() {
        // A 2-byte Duration payload cannot be a float; it reads as an int.
        let info = [
            uint_el(TIMECODE_SCALE, 1_000_000),
            el(DURATION, &5000u16.to_be_bytes()),
        ]
        .concat();
        let data = webm_file("webm", &el(INFO, &info));
        let meta = parse_matroska(&data).unwrap();
        assert!((meta.duration - 5.0).abs() < 1e-9);
    }

    #[test]
    fn negative_duration_rejected() {
        let info = [
            uint_el(TIMECODE_SCALE, 1_000_000),
            float4_el(DURATION, -5.0),
        ]
        .concat();
        let meta = parse_matroska(&webm_file("webm", &el(INFO, &info))).unwrap();
        assert_eq!(meta.duration, 0.0);
    }

    #[test]
    fn non_ebml_input_is_unsupported() {
        let err = parse_matroska(b"RIFF....AVI LIST").unwrap_err();
        assert!(matches!(
            err,
            ProbeError::UnsupportedContainer | ProbeError::MalformedStructure { .. }
        ));
    }

    #[test]
    fn missing_segment_is_malformed() {
        let data = ebml_header("webm");
        assert!(matches!(
            parse_matroska(&data),
            Err(ProbeError::MalformedStructure { .. })
        ));
    }
}
