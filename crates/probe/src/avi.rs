//! RIFF/AVI metadata parser.
//!
//! Reads the main header (`avih`), then each stream list's `strh`/`strf`
//! pair: BITMAPINFOHEADER for the video stream, WAVEFORMATEX for audio.
//! All values are little-endian. AVI carries no HDR or color metadata.

use tracing::debug;
use vp_common::{Container, ParsedVideoMetadata, ProbeError, ProbeResult};

use crate::fps::snap_fps;
use crate::reader::ByteReader;

const RIFF: &[u8; 4] = b"RIFF";
const AVI_FORM: &[u8; 4] = b"AVI ";
const LIST: &[u8; 4] = b"LIST";

/// MainAVIHeader fields the prober uses.
#[derive(Clone, Copy, Debug, Default)]
struct MainHeader {
    micro_sec_per_frame: u32,
    total_frames: u32,
    width: u32,
    height: u32,
}

#[derive(Clone, Debug, Default)]
struct VideoStream {
    handler: [u8; 4],
    compression: [u8; 4],
    width: u32,
    height: u32,
}

#[derive(Clone, Copy, Debug, Default)]
struct AudioStream {
    format_tag: u16,
    channels: u16,
    samples_per_sec: u32,
}

#[derive(Clone, Debug, Default)]
struct AviData {
    main: Option<MainHeader>,
    video: Option<VideoStream>,
    audio: Option<AudioStream>,
}

/// Parse an AVI buffer into a container-level metadata record.
pub fn parse_avi(data: &[u8]) -> ProbeResult<ParsedVideoMetadata> {
    let mut r = ByteReader::new(data);

    let magic = r.read_fourcc()?;
    if &magic != RIFF {
        return Err(ProbeError::UnsupportedContainer);
    }
    let riff_size = r.read_u32_le()? as u64;
    let form = r.read_fourcc()?;
    if &form != AVI_FORM {
        return Err(ProbeError::UnsupportedContainer);
    }

    let end = (8 + riff_size).min(data.len() as u64);
    let mut avi = AviData::default();
    walk_chunks(&mut r, end, &mut avi)?;

    let main = avi.main.ok_or_else(|| ProbeError::MalformedStructure {
        offset: 12,
        reason: "missing avih main header".into(),
    })?;
    let video = avi.video.ok_or(ProbeError::NoVideoTrack)?;

    let mut meta = ParsedVideoMetadata::new(Container::Avi);
    meta.file_size = data.len() as u64;

    // BITMAPINFOHEADER dimensions override the main header's.
    let width = if video.width > 0 {
        video.width
    } else {
        main.width
    };
    let height = if video.height > 0 {
        video.height
    } else {
        main.height
    };
    meta.video.width = width;
    meta.video.height = height;
    meta.video.display_aspect_width = width;
    meta.video.display_aspect_height = height;

    // biCompression supplies the codec; the strh handler is the fallback.
    let codec_fourcc = if video.compression != [0u8; 4] {
        video.compression
    } else {
        video.handler
    };
    meta.video.codec = map_avi_codec(codec_fourcc);

    if main.micro_sec_per_frame > 0 {
        let raw = 1_000_000.0 / main.micro_sec_per_frame as f64;
        meta.video.fps = Some(snap_fps(raw).unwrap_or(raw));
        meta.duration =
            main.total_frames as f64 * main.micro_sec_per_frame as f64 / 1_000_000.0;
    }

    if let Some(audio) = avi.audio {
        meta.has_audio = true;
        meta.audio_channels = audio.channels;
        meta.audio_sample_rate = audio.samples_per_sec;
        meta.audio_codec = wave_format_name(audio.format_tag).to_string();
    }

    Ok(meta)
}

/// Walk sibling chunks up to `end`, descending into hdrl/strl lists.
fn walk_chunks(r: &mut ByteReader, end: u64, avi: &mut AviData) -> ProbeResult<()> {
    while r.position() + 8 <= end {
        let chunk_id = r.read_fourcc()?;
        let chunk_size = r.read_u32_le()? as u64;
        let content_start = r.position();
        // Chunk payloads are word-aligned.
        let next = content_start + chunk_size + (chunk_size & 1);

        if &chunk_id == LIST {
            let list_type = r.read_fourcc()?;
            match &list_type {
                b"hdrl" => walk_chunks(r, (content_start + chunk_size).min(end), avi)?,
                b"strl" => parse_stream_list(r, (content_start + chunk_size).min(end), avi)?,
                _ => {}
            }
        } else if &chunk_id == b"avih" {
            match parse_avih(r) {
                Ok(h) => avi.main = Some(h),
                Err(e) => debug!("avih skipped: {e}"),
            }
        }

        if next > end {
            break;
        }
        r.seek(next)?;
    }
    Ok(())
}

/// Parse one stream list: strh decides the stream kind, strf details it.
fn parse_stream_list(r: &mut ByteReader, end: u64, avi: &mut AviData) -> ProbeResult<()> {
    let mut stream_kind = [0u8; 4];
    let mut handler = [0u8; 4];

    while r.position() + 8 <= end {
        let chunk_id = r.read_fourcc()?;
        let chunk_size = r.read_u32_le()? as u64;
        let content_start = r.position();
        let next = content_start + chunk_size + (chunk_size & 1);

        match &chunk_id {
            b"strh" => {
                stream_kind = r.read_fourcc()?;
                handler = r.read_fourcc()?;
            }
            b"strf" if &stream_kind == b"vids" && avi.video.is_none() => {
                match parse_bitmap_info(r) {
                    Ok(mut v) => {
                        v.handler = handler;
                        avi.video = Some(v);
                    }
                    Err(e) => debug!("video strf skipped: {e}"),
                }
            }
            b"strf" if &stream_kind == b"auds" && avi.audio.is_none() => {
                match parse_wave_format(r) {
                    Ok(a) => avi.audio = Some(a),
                    Err(e) => debug!("audio strf skipped: {e}"),
                }
            }
            _ => {}
        }

        if next > end {
            break;
        }
        r.seek(next)?;
    }
    Ok(())
}

/// MainAVIHeader: frame interval, counts, and nominal dimensions.
fn parse_avih(r: &mut ByteReader) -> ProbeResult<MainHeader> {
    let micro_sec_per_frame = r.read_u32_le()?;
    r.skip(4)?; // maxBytesPerSec
    r.skip(4)?; // paddingGranularity
    r.skip(4)?; // flags
    let total_frames = r.read_u32_le()?;
    r.skip(4)?; // initialFrames
    r.skip(4)?; // streams
    r.skip(4)?; // suggestedBufferSize
    let width = r.read_u32_le()?;
    let height = r.read_u32_le()?;

    debug!(
        "avih: {}x{}, {} frames, {} us/frame",
        width, height, total_frames, micro_sec_per_frame
    );

    Ok(MainHeader {
        micro_sec_per_frame,
        total_frames,
        width,
        height,
    })
}

/// BITMAPINFOHEADER: signed dimensions (negative height flips the image)
/// and the biCompression codec FourCC.
fn parse_bitmap_info(r: &mut ByteReader) -> ProbeResult<VideoStream> {
    r.skip(4)?; // biSize
    let width = r.read_i32_le()?.unsigned_abs();
    let height = r.read_i32_le()?.unsigned_abs();
    r.skip(2)?; // planes
    r.skip(2)?; // bitCount
    let compression = r.read_fourcc()?;

    Ok(VideoStream {
        handler: [0u8; 4],
        compression,
        width,
        height,
    })
}

/// WAVEFORMATEX prefix: format tag, channels, sample rate.
fn parse_wave_format(r: &mut ByteReader) -> ProbeResult<AudioStream> {
    let format_tag = r.read_u16_le()?;
    let channels = r.read_u16_le()?;
    let samples_per_sec = r.read_u32_le()?;

    Ok(AudioStream {
        format_tag,
        channels,
        samples_per_sec,
    })
}

/// Lowercase an AVI codec FourCC, mapping the well-known vendor codes.
fn map_avi_codec(cc: [u8; 4]) -> String {
    let upper: String = cc
        .iter()
        .map(|&b| (b as char).to_ascii_uppercase())
        .collect();
    match upper.as_str() {
        "DIV3" => "divx3".to_string(),
        "DIVX" => "divx".to_string(),
        "DX50" => "divx5".to_string(),
        "XVID" => "xvid".to_string(),
        "H264" | "X264" | "DAVC" => "avc1".to_string(),
        "HEVC" => "hev1".to_string(),
        "MPG1" => "mpeg1".to_string(),
        "MPG2" => "mpeg2".to_string(),
        _ => String::from_utf8_lossy(&cc)
            .trim_matches(char::from(0))
            .trim()
            .to_lowercase(),
    }
}

/// Map a WAVEFORMATEX format tag to a codec short string.
fn wave_format_name(format_tag: u16) -> &'static str {
    match format_tag {
        0x0001 => "pcm",
        0x0055 => "mp3",
        0x00FF => "aac",
        0x2000 => "ac3",
        _ => "",
    }
}
