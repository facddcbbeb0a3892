//! MP4/MOV (ISO BMFF) metadata parser.
//!
//! Walks the box tree under `moov` to recover track dimensions, rotation,
//! codec identification, color description, frame rate, duration, audio
//! parameters, and the QuickTime recording-location tag. Media payloads
//! (`mdat`) are never read.
//!
//! QuickTime is the same parser with the aperture hook enabled: `clap` and
//! `tapt/clef` then override the display dimensions, `tapt/clef` winning
//! when both are present.

pub mod boxes;

use tracing::{debug, warn};
use vp_common::{
    Container, GeoLocation, ParsedVideoMetadata, ProbeError, ProbeResult, VideoColorInfo,
};

use crate::color::parse_mp4_color_info;
use crate::fps::{calculate_fps, parse_stts_timing};
use crate::reader::ByteReader;
use boxes::*;

/// The Apple metadata key carrying an ISO 6709 location string.
const QUICKTIME_LOCATION_KEY: &str = "com.apple.quicktime.location.ISO6709";

/// ISO BMFF parser, shared between the `mp4` and `mov` containers.
pub struct Mp4Parser {
    container: Container,
    quicktime_apertures: bool,
}

impl Mp4Parser {
    /// Plain MP4 parsing.
    pub fn new() -> Self {
        Self {
            container: Container::Mp4,
            quicktime_apertures: false,
        }
    }

    /// QuickTime parsing: also honors `clap`/`tapt` aperture boxes.
    pub fn quicktime() -> Self {
        Self {
            container: Container::Mov,
            quicktime_apertures: true,
        }
    }

    /// Parse a whole-file buffer into a container-level metadata record.
    pub fn parse(&self, data: &[u8]) -> ProbeResult<ParsedVideoMetadata> {
        let mut r = ByteReader::new(data);

        // Top-level scan: find moov, note moof fragments. A box with a size
        // smaller than its header truncates the walk.
        let mut moov_header: Option<BoxHeader> = None;
        let mut moof_headers: Vec<BoxHeader> = Vec::new();
        loop {
            match read_box_header(&mut r) {
                Ok(Some(h)) => {
                    match h.box_type {
                        MOOV => moov_header = Some(h),
                        MOOF => moof_headers.push(h),
                        _ => {}
                    }
                    if skip_box(&mut r, &h).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!("top-level walk stopped: {e}");
                    break;
                }
            }
        }

        let moov = moov_header.ok_or(ProbeError::UnsupportedContainer)?;
        if moov.end_offset() > data.len() as u64 {
            return Err(ProbeError::TruncatedInput {
                context: "moov",
                offset: moov.offset,
            });
        }

        let mut movie = MovieData::default();
        r.seek(moov.content_offset())?;
        self.walk_moov(&mut r, moov.end_offset(), &mut movie)?;

        self.assemble(data, movie, &moof_headers)
    }

    fn walk_moov(
        &self,
        r: &mut ByteReader,
        end: u64,
        movie: &mut MovieData,
    ) -> ProbeResult<()> {
        while r.position() + 8 <= end {
            let child = match read_box_header(r) {
                Ok(Some(h)) => h,
                _ => break,
            };
            if child.end_offset() > end {
                warn!(
                    "child '{}' overruns moov, stopping walk",
                    fourcc_to_string(child.box_type)
                );
                break;
            }

            match child.box_type {
                MVHD => match parse_mvhd(r) {
                    Ok(m) => movie.mvhd = Some(m),
                    Err(e) => debug!("mvhd skipped: {e}"),
                },
                TRAK => {
                    let mut raw = RawTrack::default();
                    self.walk_trak_children(r, child.end_offset(), &mut raw);
                    self.adopt_track(r, raw, movie);
                }
                UDTA => {
                    if movie.location.is_none() {
                        movie.location = self.walk_udta(r, child.end_offset());
                    }
                }
                MVEX => self.walk_mvex(r, child.end_offset(), movie),
                _ => {}
            }

            r.seek(child.end_offset())?;
        }
        Ok(())
    }

    /// Recursively gather trak/mdia/minf/stbl leaves. Malformed children are
    /// skipped; the fields they would have filled stay absent.
    fn walk_trak_children(&self, r: &mut ByteReader, end: u64, out: &mut RawTrack) {
        while r.position() + 8 <= end {
            let child = match read_box_header(r) {
                Ok(Some(h)) => h,
                _ => break,
            };
            if child.end_offset() > end {
                debug!(
                    "child '{}' overruns parent, stopping",
                    fourcc_to_string(child.box_type)
                );
                break;
            }

            match child.box_type {
                TKHD => match parse_tkhd(r) {
                    Ok(t) => out.tkhd = Some(t),
                    Err(e) => debug!("tkhd skipped: {e}"),
                },
                MDHD => match parse_mdhd(r) {
                    Ok(m) => out.mdhd = Some(m),
                    Err(e) => debug!("mdhd skipped: {e}"),
                },
                HDLR => match parse_hdlr(r) {
                    Ok(h) => out.handler = Some(h),
                    Err(e) => debug!("hdlr skipped: {e}"),
                },
                MDIA | MINF | STBL => {
                    self.walk_trak_children(r, child.end_offset(), out);
                }
                STSD => out.stsd = Some((child.content_offset(), child.end_offset())),
                STTS => out.stts = Some((child.content_offset(), child.end_offset())),
                _ => {}
            }

            if r.seek(child.end_offset()).is_err() {
                break;
            }
        }
    }

    /// Classify a gathered trak as the primary video or audio track.
    fn adopt_track(&self, r: &mut ByteReader, raw: RawTrack, movie: &mut MovieData) {
        match raw.handler {
            Some(VIDE) if movie.video.is_none() => {
                let mut video = VideoTrackData {
                    tkhd: raw.tkhd,
                    mdhd: raw.mdhd,
                    ..Default::default()
                };
                if let Some((start, end)) = raw.stsd {
                    if let Err(e) = self.parse_video_stsd(r, start, end, &mut video) {
                        debug!("video stsd skipped: {e}");
                    }
                }
                if let (Some((start, end)), Some(mdhd)) = (raw.stts, raw.mdhd) {
                    video.stts = slice_range(r, start, end);
                    video.timescale_hint = mdhd.timescale;
                }
                movie.video = Some(video);
            }
            Some(SOUN) if movie.audio.is_none() => {
                let mut audio = AudioTrackData {
                    mdhd: raw.mdhd,
                    ..Default::default()
                };
                if let Some((start, end)) = raw.stsd {
                    if let Err(e) = self.parse_audio_stsd(r, start, end, &mut audio) {
                        debug!("audio stsd skipped: {e}");
                    }
                }
                movie.audio = Some(audio);
            }
            _ => {}
        }
    }

    /// Walk stsd for the first video sample entry. The stsd header is 16
    /// bytes (box header + version/flags + entry count) before the first
    /// child entry.
    fn parse_video_stsd(
        &self,
        r: &mut ByteReader,
        start: u64,
        end: u64,
        video: &mut VideoTrackData,
    ) -> ProbeResult<()> {
        r.seek(start)?;
        r.skip(4)?; // version + flags
        let entry_count = r.read_u32()?;

        for _ in 0..entry_count {
            let entry = match read_box_header(r)? {
                Some(h) => h,
                None => break,
            };
            if entry.end_offset() > end {
                break;
            }
            self.parse_video_entry(r, &entry, video)?;
            return Ok(());
        }
        Ok(())
    }

    /// Parse one visual sample entry: a 78-byte fixed prefix, then the
    /// decoration boxes (codec config, color, aspect, bitrate).
    fn parse_video_entry(
        &self,
        r: &mut ByteReader,
        entry: &BoxHeader,
        video: &mut VideoTrackData,
    ) -> ProbeResult<()> {
        let entry_end = entry.end_offset();

        r.skip(8)?; // reserved + data_reference_index
        r.skip(16)?; // pre_defined + reserved
        video.entry_width = r.read_u16()?;
        video.entry_height = r.read_u16()?;
        r.skip(50)?; // resolution, frame_count, compressor, depth

        video.codec = match entry.box_type {
            VP09 => "vp9".to_string(),
            cc => fourcc_to_string(cc).trim().to_lowercase(),
        };

        let mut color_boxes = ColorBoxes::default();
        while r.position() + 8 <= entry_end {
            let child = match read_box_header(r) {
                Ok(Some(h)) => h,
                _ => break,
            };
            if child.end_offset() > entry_end {
                break;
            }
            let payload_len = child.content_size() as usize;

            match child.box_type {
                AVCC => {
                    if let Ok(p) = r.read_bytes(payload_len) {
                        if let Some(codec) = avc_codec_string(p) {
                            video.codec = codec;
                        }
                        color_boxes.avcc = Some(p.to_vec());
                    }
                }
                HVCC => {
                    if let Ok(p) = r.read_bytes(payload_len) {
                        if let Some(codec) = hevc_codec_string(entry.box_type, p) {
                            video.codec = codec;
                        }
                        color_boxes.hvcc = Some(p.to_vec());
                    }
                }
                AV1C => color_boxes.av1c = r.read_bytes(payload_len).ok().map(<[u8]>::to_vec),
                VPCC => color_boxes.vpcc = r.read_bytes(payload_len).ok().map(<[u8]>::to_vec),
                COLR => color_boxes.colr = r.read_bytes(payload_len).ok().map(<[u8]>::to_vec),
                MDCV => color_boxes.mdcv = r.read_bytes(payload_len).ok().map(<[u8]>::to_vec),
                SMDM => color_boxes.smdm = r.read_bytes(payload_len).ok().map(<[u8]>::to_vec),
                CLLI => color_boxes.clli = r.read_bytes(payload_len).ok().map(<[u8]>::to_vec),
                DOVI | DVCC | DVVC => color_boxes.dolby_vision = true,
                PASP => video.pasp = parse_pasp(r).ok().flatten(),
                CLAP if self.quicktime_apertures => {
                    video.clap = parse_clap(r).ok().flatten();
                }
                TAPT if self.quicktime_apertures => {
                    video.clef = self.walk_tapt(r, child.end_offset());
                }
                BTRT => video.bitrate = parse_btrt(r).ok().flatten(),
                _ => {}
            }

            if r.seek(child.end_offset()).is_err() {
                break;
            }
        }

        video.color = select_color(&color_boxes);
        Ok(())
    }

    /// Find the clef (track clean aperture) child of a tapt box.
    fn walk_tapt(&self, r: &mut ByteReader, end: u64) -> Option<(u32, u32)> {
        while r.position() + 8 <= end {
            let child = read_box_header(r).ok().flatten()?;
            if child.end_offset() > end {
                return None;
            }
            if child.box_type == CLEF {
                return parse_clef(r).ok().flatten();
            }
            r.seek(child.end_offset()).ok()?;
        }
        None
    }

    /// Walk stsd for the first audio sample entry (28-byte fixed prefix).
    fn parse_audio_stsd(
        &self,
        r: &mut ByteReader,
        start: u64,
        end: u64,
        audio: &mut AudioTrackData,
    ) -> ProbeResult<()> {
        r.seek(start)?;
        r.skip(4)?;
        let entry_count = r.read_u32()?;

        for _ in 0..entry_count {
            let entry = match read_box_header(r)? {
                Some(h) => h,
                None => break,
            };
            if entry.end_offset() > end {
                break;
            }

            r.skip(8)?; // reserved + data_reference_index
            r.skip(8)?; // version + revision + vendor
            audio.channels = r.read_u16()?;
            r.skip(2)?; // sample size
            r.skip(4)?; // compression id + packet size
            audio.sample_rate = r.read_u32()? >> 16; // 16.16 fixed point

            audio.codec = match entry.box_type {
                MP4A => "aac".to_string(),
                OPUS => "opus".to_string(),
                AC3 => "ac3".to_string(),
                EC3 => "e-ac3".to_string(),
                FLAC => "flac".to_string(),
                ALAC => "alac".to_string(),
                cc => fourcc_to_string(cc).trim().to_lowercase(),
            };

            self.walk_audio_entry_children(r, entry.end_offset(), audio);
            audio.present = true;
            return Ok(());
        }
        Ok(())
    }

    /// Scan audio sample-entry children for esds (directly, or wrapped in a
    /// QuickTime wave box).
    fn walk_audio_entry_children(&self, r: &mut ByteReader, end: u64, audio: &mut AudioTrackData) {
        while r.position() + 8 <= end {
            let child = match read_box_header(r) {
                Ok(Some(h)) => h,
                _ => break,
            };
            if child.end_offset() > end {
                break;
            }

            match child.box_type {
                ESDS => match parse_esds(r, child.end_offset()) {
                    Ok(info) => {
                        if !info.codec.is_empty() {
                            audio.codec = info.codec;
                        }
                        audio.bitrate = info.avg_bitrate.or(audio.bitrate);
                    }
                    Err(e) => debug!("esds skipped: {e}"),
                },
                WAVE => self.walk_audio_entry_children(r, child.end_offset(), audio),
                _ => {}
            }

            if r.seek(child.end_offset()).is_err() {
                break;
            }
        }
    }

    /// Walk mvex for per-track fragment defaults.
    fn walk_mvex(&self, r: &mut ByteReader, end: u64, movie: &mut MovieData) {
        while r.position() + 8 <= end {
            let child = match read_box_header(r) {
                Ok(Some(h)) => h,
                _ => break,
            };
            if child.end_offset() > end {
                break;
            }
            if child.box_type == TREX {
                if let Ok(trex) = parse_trex(r) {
                    movie.trex.push(trex);
                }
            }
            if r.seek(child.end_offset()).is_err() {
                break;
            }
        }
    }

    /// Walk udta for the recording location: the classic `©xyz` atom, or
    /// the keyed metadata path (`meta/keys` + `meta/ilst`).
    fn walk_udta(&self, r: &mut ByteReader, end: u64) -> Option<GeoLocation> {
        while r.position() + 8 <= end {
            let child = read_box_header(r).ok().flatten()?;
            if child.end_offset() > end {
                return None;
            }

            match child.box_type {
                CXYZ => {
                    if let Some(loc) = self.read_cxyz(r, child.end_offset()) {
                        return Some(loc);
                    }
                }
                META => {
                    if let Some(loc) = self.walk_meta(r, child.end_offset()) {
                        return Some(loc);
                    }
                }
                _ => {}
            }
            r.seek(child.end_offset()).ok()?;
        }
        None
    }

    fn read_cxyz(&self, r: &mut ByteReader, end: u64) -> Option<GeoLocation> {
        let len = r.read_u16().ok()? as usize;
        r.skip(2).ok()?; // language
        let available = (end.saturating_sub(r.position())) as usize;
        let tag = r.read_string(len.min(available)).ok()?;
        GeoLocation::from_iso6709(&tag)
    }

    fn walk_meta(&self, r: &mut ByteReader, end: u64) -> Option<GeoLocation> {
        r.skip(4).ok()?; // meta is a full box

        let mut location_key_index: Option<u32> = None;
        let mut items: Vec<(u32, String)> = Vec::new();

        while r.position() + 8 <= end {
            let child = read_box_header(r).ok().flatten()?;
            if child.end_offset() > end {
                break;
            }

            match child.box_type {
                KEYS => {
                    location_key_index = self.find_location_key(r, child.end_offset());
                }
                ILST => self.collect_ilst_strings(r, child.end_offset(), &mut items),
                _ => {}
            }
            r.seek(child.end_offset()).ok()?;
        }

        let index = location_key_index?;
        items
            .iter()
            .find(|(i, _)| *i == index)
            .and_then(|(_, value)| GeoLocation::from_iso6709(value))
    }

    /// Scan the keys box for the location key; indices are 1-based.
    fn find_location_key(&self, r: &mut ByteReader, end: u64) -> Option<u32> {
        r.skip(4).ok()?; // version + flags
        let entry_count = r.read_u32().ok()?;
        for index in 1..=entry_count {
            if r.position() + 8 > end {
                break;
            }
            let size = r.read_u32().ok()? as usize;
            r.skip(4).ok()?; // namespace ('mdta')
            if size < 8 {
                break;
            }
            let name = r.read_string(size - 8).ok()?;
            if name == QUICKTIME_LOCATION_KEY {
                return Some(index);
            }
        }
        None
    }

    /// Collect the string values of ilst items, keyed by their 1-based
    /// keys index (the item box type).
    fn collect_ilst_strings(&self, r: &mut ByteReader, end: u64, out: &mut Vec<(u32, String)>) {
        while r.position() + 8 <= end {
            let item = match read_box_header(r) {
                Ok(Some(h)) => h,
                _ => break,
            };
            if item.end_offset() > end {
                break;
            }

            let item_end = item.end_offset();
            while r.position() + 8 <= item_end {
                let data_box = match read_box_header(r) {
                    Ok(Some(h)) => h,
                    _ => break,
                };
                if data_box.end_offset() > item_end {
                    break;
                }
                if data_box.box_type == DATA && data_box.content_size() >= 8 {
                    let value_len = (data_box.content_size() - 8) as usize;
                    if r.skip(8).is_ok() {
                        if let Ok(value) = r.read_string(value_len) {
                            out.push((item.box_type, value));
                        }
                    }
                }
                if r.seek(data_box.end_offset()).is_err() {
                    break;
                }
            }

            if r.seek(item_end).is_err() {
                break;
            }
        }
    }

    /// Final assembly into the container-level record.
    fn assemble(
        &self,
        data: &[u8],
        movie: MovieData,
        moof_headers: &[BoxHeader],
    ) -> ProbeResult<ParsedVideoMetadata> {
        let mut meta = ParsedVideoMetadata::new(self.container);
        meta.file_size = data.len() as u64;
        meta.location = movie.location;

        let mut timescale = movie.mvhd.map(|m| m.timescale).unwrap_or(0);
        let mut duration_ticks = movie.mvhd.map(|m| m.duration).unwrap_or(0);

        if let Some(video) = &movie.video {
            let (width, height) = match video.tkhd {
                Some(t) if t.width > 0 && t.height > 0 => (t.width, t.height),
                _ => (video.entry_width as u32, video.entry_height as u32),
            };
            meta.video.width = width;
            meta.video.height = height;
            meta.video.rotation = video.tkhd.map(|t| t.rotation).unwrap_or(0);
            meta.video.codec = video.codec.clone();
            meta.video.color = video.color;
            meta.video.video_bitrate = video.bitrate;

            // Display aspect: tapt/clef beats clap beats pasp.
            let (mut daw, mut dah) = (width, height);
            if let Some((h_spacing, v_spacing)) = video.pasp {
                daw = ((width as u64 * h_spacing as u64 + v_spacing as u64 / 2)
                    / v_spacing as u64) as u32;
            }
            if let Some((w, h)) = video.clef.or(video.clap) {
                daw = w;
                dah = h;
            }
            meta.video.display_aspect_width = daw;
            meta.video.display_aspect_height = dah;

            if let Some(mdhd) = video.mdhd {
                if mdhd.timescale > 0 {
                    timescale = mdhd.timescale;
                    duration_ticks = mdhd.duration;
                }
            }

            if let (Some(stts), true) = (&video.stts, video.timescale_hint > 0) {
                if let Some(timing) =
                    parse_stts_timing(stts, video.timescale_hint, duration_ticks)
                {
                    meta.video.fps = calculate_fps(&timing);
                }
            }
        }

        if let Some(audio) = &movie.audio {
            if audio.present {
                meta.has_audio = true;
                meta.audio_channels = audio.channels;
                meta.audio_sample_rate = audio.sample_rate;
                meta.audio_codec = audio.codec.clone();
                meta.video.audio_bitrate = audio.bitrate;
            }
            // Audio-only files take their duration from the audio track.
            if movie.video.is_none() {
                if let Some(mdhd) = audio.mdhd {
                    if mdhd.timescale > 0 {
                        timescale = mdhd.timescale;
                        duration_ticks = mdhd.duration;
                    }
                }
            }
        }

        // Fragmented files: reconstruct duration from moof sample runs and
        // the trex/tfhd defaults when the media header carries none.
        if duration_ticks == 0 && !moof_headers.is_empty() {
            let track_id = movie
                .video
                .as_ref()
                .and_then(|v| v.tkhd.map(|t| t.track_id));
            let trex_default = movie
                .trex
                .iter()
                .find(|t| track_id.map_or(true, |id| t.track_id == id))
                .map(|t| t.default_sample_duration)
                .unwrap_or(0);
            duration_ticks =
                fragment_duration_ticks(data, moof_headers, track_id, trex_default);
        }

        if timescale > 0 && duration_ticks > 0 {
            meta.duration = duration_ticks as f64 / timescale as f64;
        }
        meta.bitrate = meta.video.video_bitrate;

        Ok(meta)
    }
}

impl Default for Mp4Parser {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Gathered structures ─────────────────────────────────────────────

#[derive(Default)]
struct MovieData {
    mvhd: Option<MdhdInfo>,
    video: Option<VideoTrackData>,
    audio: Option<AudioTrackData>,
    trex: Vec<TrexInfo>,
    location: Option<GeoLocation>,
}

#[derive(Default)]
struct RawTrack {
    tkhd: Option<TkhdInfo>,
    mdhd: Option<MdhdInfo>,
    handler: Option<u32>,
    /// stsd content range (offset after the 8-byte box header).
    stsd: Option<(u64, u64)>,
    /// stts content range.
    stts: Option<(u64, u64)>,
}

#[derive(Default)]
struct VideoTrackData {
    tkhd: Option<TkhdInfo>,
    mdhd: Option<MdhdInfo>,
    entry_width: u16,
    entry_height: u16,
    codec: String,
    color: VideoColorInfo,
    pasp: Option<(u32, u32)>,
    clap: Option<(u32, u32)>,
    clef: Option<(u32, u32)>,
    bitrate: Option<u64>,
    stts: Option<Vec<u8>>,
    timescale_hint: u32,
}

#[derive(Default)]
struct AudioTrackData {
    mdhd: Option<MdhdInfo>,
    present: bool,
    channels: u16,
    sample_rate: u32,
    codec: String,
    bitrate: Option<u64>,
}

/// Collected color-bearing boxes of one sample entry.
#[derive(Default)]
struct ColorBoxes {
    colr: Option<Vec<u8>>,
    mdcv: Option<Vec<u8>>,
    smdm: Option<Vec<u8>>,
    clli: Option<Vec<u8>>,
    dolby_vision: bool,
    hvcc: Option<Vec<u8>>,
    vpcc: Option<Vec<u8>>,
    av1c: Option<Vec<u8>>,
    avcc: Option<Vec<u8>>,
}

/// Pick the color description by box priority; the first box yielding any
/// field wins and later boxes never overwrite it. A `clli` box can still
/// upgrade an SDR result to HDR.
fn select_color(boxes: &ColorBoxes) -> VideoColorInfo {
    let mut candidates: Vec<VideoColorInfo> = Vec::new();
    if let Some(p) = &boxes.colr {
        candidates.push(parse_mp4_color_info(p));
    }
    if let Some(p) = &boxes.mdcv {
        candidates.push(parse_mp4_color_info(&tagged(b"mdcv", p)));
    }
    if boxes.dolby_vision {
        candidates.push(VideoColorInfo::dolby_vision());
    }
    if let Some(p) = &boxes.smdm {
        candidates.push(parse_mp4_color_info(&tagged(b"mdcv", p)));
    }
    if let Some(p) = &boxes.hvcc {
        candidates.push(parse_mp4_color_info(p));
    }
    if let Some(p) = &boxes.vpcc {
        candidates.push(parse_mp4_color_info(p));
    }
    if let Some(p) = &boxes.av1c {
        candidates.push(parse_mp4_color_info(p));
    }
    if let Some(p) = &boxes.avcc {
        candidates.push(parse_mp4_color_info(p));
    }

    let mut selected = candidates
        .into_iter()
        .find(|c| !c.is_empty())
        .unwrap_or_default();

    if !selected.is_hdr() {
        if let Some(p) = &boxes.clli {
            let clli = parse_mp4_color_info(&tagged(b"clli", p));
            if clli.is_hdr() {
                selected = clli;
            }
        }
    }
    selected
}

fn tagged(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(tag);
    buf.extend_from_slice(payload);
    buf
}

/// Copy out a content range as an owned buffer, clamped to the input.
fn slice_range(r: &ByteReader, start: u64, end: u64) -> Option<Vec<u8>> {
    let mut sub = r.clone();
    sub.seek(start).ok()?;
    let len = end.checked_sub(start)? as usize;
    sub.read_bytes(len.min(sub.remaining())).ok().map(<[u8]>::to_vec)
}

/// Total sample duration (in media ticks) across the moof fragments for
/// one track, preferring explicit trun durations over tfhd/trex defaults.
fn fragment_duration_ticks(
    data: &[u8],
    moof_headers: &[BoxHeader],
    track_id: Option<u32>,
    trex_default: u32,
) -> u64 {
    let mut total: u64 = 0;

    for moof in moof_headers {
        let mut r = ByteReader::new(data);
        if r.seek(moof.content_offset()).is_err() {
            continue;
        }
        let moof_end = moof.end_offset().min(data.len() as u64);

        while r.position() + 8 <= moof_end {
            let child = match read_box_header(&mut r) {
                Ok(Some(h)) => h,
                _ => break,
            };
            if child.end_offset() > moof_end {
                break;
            }

            if child.box_type == TRAF {
                total += traf_duration_ticks(&mut r, child.end_offset(), track_id, trex_default);
            }
            if r.seek(child.end_offset()).is_err() {
                break;
            }
        }
    }
    total
}

fn traf_duration_ticks(
    r: &mut ByteReader,
    end: u64,
    track_id: Option<u32>,
    trex_default: u32,
) -> u64 {
    let mut default_duration = trex_default;
    let mut matches_track = true;
    let mut ticks: u64 = 0;

    while r.position() + 8 <= end {
        let child = match read_box_header(r) {
            Ok(Some(h)) => h,
            _ => break,
        };
        if child.end_offset() > end {
            break;
        }

        match child.box_type {
            TFHD => {
                if let Ok(tfhd) = parse_tfhd(r) {
                    matches_track = track_id.map_or(true, |id| tfhd.track_id == id);
                    if let Some(d) = tfhd.default_sample_duration {
                        default_duration = d;
                    }
                }
            }
            TRUN if matches_track => {
                if let Ok(trun) = parse_trun(r) {
                    ticks += trun
                        .total_duration
                        .unwrap_or(trun.sample_count as u64 * default_duration as u64);
                }
            }
            _ => {}
        }
        if r.seek(child.end_offset()).is_err() {
            break;
        }
    }

    if matches_track {
        ticks
    } else {
        0
    }
}
