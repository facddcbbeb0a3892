//! Frame-rate reconstruction from ISO BMFF time-to-sample tables.

use tracing::debug;

use crate::reader::ByteReader;

/// Upper sanity bound on `stts` entry counts.
pub const MAX_STTS_ENTRIES: u32 = 10_000;

/// Snap tolerance around the nominal rates.
const FPS_SNAP_TOLERANCE: f64 = 0.01;

/// Common nominal frame rates, including NTSC fractional rates and
/// high-refresh captures.
const NOMINAL_RATES: [f64; 14] = [
    23.976, 24.0, 25.0, 29.97, 30.0, 48.0, 50.0, 59.94, 60.0, 90.0, 120.0, 144.0, 165.0, 240.0,
];

/// One `stts` run: `sample_count` consecutive samples sharing a duration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SttsEntry {
    pub sample_count: u32,
    pub sample_delta: u32,
}

/// Timing data for one track, in media timescale ticks.
///
/// Entries are kept in stream order and always have a positive count and
/// delta; degenerate runs are dropped at parse time.
#[derive(Clone, Debug)]
pub struct TimingInfo {
    /// Ticks per second.
    pub timescale: u32,
    pub entries: Vec<SttsEntry>,
    /// Track duration in timescale ticks.
    pub duration_ticks: u64,
    /// Total samples across all entries.
    pub sample_count: u64,
}

/// Parse an `stts` payload (after the box header) into a timing table.
///
/// Returns `None` for degenerate tables: zero entries, an entry count past
/// the sanity bound, or no entry with positive count and delta.
pub fn parse_stts_timing(payload: &[u8], timescale: u32, duration_ticks: u64) -> Option<TimingInfo> {
    let mut r = ByteReader::new(payload);
    r.skip(4).ok()?; // version + flags

    let entry_count = r.read_u32().ok()?;
    if entry_count == 0 || entry_count > MAX_STTS_ENTRIES {
        debug!("stts entry count {} outside sanity bounds", entry_count);
        return None;
    }

    let mut entries = Vec::with_capacity(entry_count as usize);
    let mut sample_count: u64 = 0;
    for _ in 0..entry_count {
        let count = r.read_u32().ok()?;
        let delta = r.read_u32().ok()?;
        if count == 0 || delta == 0 {
            continue;
        }
        sample_count += count as u64;
        entries.push(SttsEntry {
            sample_count: count,
            sample_delta: delta,
        });
    }

    if entries.is_empty() || timescale == 0 {
        return None;
    }

    Some(TimingInfo {
        timescale,
        entries,
        duration_ticks,
        sample_count,
    })
}

/// Compute frames per second as timescale over the weighted average frame
/// duration, snapped to a nominal rate where close enough.
pub fn calculate_fps(timing: &TimingInfo) -> Option<f64> {
    let mut total_ticks: u128 = 0;
    let mut total_samples: u64 = 0;
    for e in &timing.entries {
        total_ticks += e.sample_count as u128 * e.sample_delta as u128;
        total_samples += e.sample_count as u64;
    }
    if total_samples == 0 || total_ticks == 0 {
        return None;
    }

    let avg_delta = total_ticks as f64 / total_samples as f64;
    snap_fps(timing.timescale as f64 / avg_delta)
}

/// Snap a raw rate to the nominal set within ±0.01, then to doubled or
/// halved nominal rates, then round to 3 decimals inside [10, 240].
/// Anything else is indeterminable. Snapping is idempotent.
pub fn snap_fps(fps: f64) -> Option<f64> {
    if !fps.is_finite() || fps <= 0.0 {
        return None;
    }

    for &rate in &NOMINAL_RATES {
        if (fps - rate).abs() <= FPS_SNAP_TOLERANCE {
            return Some(rate);
        }
    }

    // Interlaced-doubled or half-rate tracks.
    for &rate in &NOMINAL_RATES {
        if (fps - rate * 2.0).abs() <= FPS_SNAP_TOLERANCE {
            return Some(rate * 2.0);
        }
        if (fps - rate / 2.0).abs() <= FPS_SNAP_TOLERANCE {
            return Some(rate / 2.0);
        }
    }

    if (10.0..=240.0).contains(&fps) {
        Some((fps * 1000.0).round() / 1000.0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stts_payload(entries: &[(u32, u32)]) -> Vec<u8> {
        let mut buf = vec![0u8; 4]; // version + flags
        buf.extend_from_slice(&(entries.len() as u32).to_be_bytes());
        for &(count, delta) in entries {
            buf.extend_from_slice(&count.to_be_bytes());
            buf.extend_from_slice(&delta.to_be_bytes());
        }
        buf
    }

    #[test]
    fn exact_30fps() {
        let payload = stts_payload(&[(300, 1000)]);
        let timing = parse_stts_timing(&payload, 30_000, 300_000).unwrap();
        assert_eq!(timing.sample_count, 300);
        assert_eq!(calculate_fps(&timing), Some(30.0));
    }

    #[test]
    fn ntsc_2997() {
        let payload = stts_payload(&[(600, 1001)]);
        let timing = parse_stts_timing(&payload, 30_000, 600_600).unwrap();
        assert_eq!(calculate_fps(&timing), Some(29.97));
    }

    #[test]
    fn film_23976() {
        let payload = stts_payload(&[(240, 1001)]);
        let timing = parse_stts_timing(&payload, 24_000, 240_240).unwrap();
        assert_eq!(calculate_fps(&timing), Some(23.976));
    }

    #[test]
    fn weighted_average_across_runs() {
        // Mostly 30fps with a few long frames; average stays near 30.
        let payload = stts_payload(&[(298, 1000), (2, 1003)]);
        let timing = parse_stts_timing(&payload, 30_000, 300_006).unwrap();
        assert_eq!(calculate_fps(&timing), Some(30.0));
    }

    #[test]
    fn irregular_rate_rounds_to_3_decimals() {
        let payload = stts_payload(&[(100, 617)]);
        let timing = parse_stts_timing(&payload, 12_345, 61_700).unwrap();
        // 12345 / 617 = 20.0081...
        assert_eq!(calculate_fps(&timing), Some(20.008));
    }

    #[test]
    fn zero_entry_count_is_absent() {
        let payload = stts_payload(&[]);
        assert!(parse_stts_timing(&payload, 30_000, 0).is_none());
    }

    #[test]
    fn oversized_entry_count_is_absent() {
        let mut payload = vec![0u8; 4];
        payload.extend_from_slice(&10_001u32.to_be_bytes());
        assert!(parse_stts_timing(&payload, 30_000, 0).is_none());
    }

    #[test]
    fn degenerate_runs_are_dropped() {
        let payload = stts_payload(&[(0, 1000), (300, 0), (300, 1000)]);
        let timing = parse_stts_timing(&payload, 30_000, 300_000).unwrap();
        assert_eq!(timing.entries.len(), 1);
        assert_eq!(timing.sample_count, 300);
    }

    #[test]
    fn all_degenerate_runs_is_absent() {
        let payload = stts_payload(&[(0, 1000), (300, 0)]);
        assert!(parse_stts_timing(&payload, 30_000, 0).is_none());
    }

    #[test]
    fn truncated_table_is_absent() {
        let payload = stts_payload(&[(300, 1000)]);
        assert!(parse_stts_timing(&payload[..10], 30_000, 0).is_none());
    }

    #[test]
    fn snap_half_and_double_rates() {
        // Half of 24.
        assert_eq!(snap_fps(12.0), Some(12.0));
        // Double of 240.
        assert_eq!(snap_fps(479.995), Some(480.0));
        // 11.988 is half of 23.976.
        assert_eq!(snap_fps(11.988), Some(11.988));
    }

    #[test]
    fn snap_out_of_range_is_absent() {
        assert_eq!(snap_fps(2.0), None);
        assert_eq!(snap_fps(1000.0), None);
        assert_eq!(snap_fps(0.0), None);
        assert_eq!(snap_fps(-24.0), None);
        assert_eq!(snap_fps(f64::NAN), None);
    }

    #[test]
    fn snap_is_idempotent() {
        for raw in [
            23.974, 24.0, 25.003, 29.971, 30.0, 59.9405, 100.5, 12.0, 479.995, 20.0081,
        ] {
            let once = snap_fps(raw);
            let twice = once.and_then(snap_fps);
            assert_eq!(once, twice, "snap not idempotent for {raw}");
        }
    }
}
