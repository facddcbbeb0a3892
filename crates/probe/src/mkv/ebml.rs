//! EBML (Extensible Binary Meta Language) element access.
//!
//! Variable-size integers come from the binary reader; this module layers
//! element headers and typed payload reads on top. All integers in EBML
//! are big-endian.
//!
//! EBML uses a leading-1 length encoding:
//! - 1 byte:  `1xxx xxxx`           (7 data bits)
//! - 2 bytes: `01xx xxxx xxxx xxxx` (14 data bits)
//! - up to 8 bytes for sizes; element IDs are at most 4 bytes and keep
//!   the marker bit as part of the ID.

use vp_common::{ProbeError, ProbeResult};

use crate::reader::ByteReader;

/// An EBML element header: ID, payload size, and position info.
#[derive(Clone, Copy, Debug)]
pub struct EbmlElement {
    /// The element ID (1-4 bytes, marker bit included).
    pub id: u32,
    /// The payload size in bytes (`u64::MAX` means unknown).
    pub size: u64,
    /// How many bytes the header (ID + size) consumed.
    pub header_size: u64,
    /// Byte position where this element header starts.
    pub position: u64,
}

impl EbmlElement {
    /// Byte offset where the element's payload begins.
    pub fn data_offset(&self) -> u64 {
        self.position + self.header_size
    }

    /// Byte offset just past the end of this element, or `None` for an
    /// unknown-size element.
    pub fn end_offset(&self) -> Option<u64> {
        if self.size == u64::MAX {
            None
        } else {
            Some(self.position + self.header_size + self.size)
        }
    }
}

/// Read a complete element header (ID + size) at the cursor.
pub fn read_element(r: &mut ByteReader) -> ProbeResult<EbmlElement> {
    let position = r.position();
    let id = r.read_vint_id()?;
    let size = r.read_vint_size()?;
    let header_size = r.position() - position;

    Ok(EbmlElement {
        id,
        size,
        header_size,
        position,
    })
}

/// Read an unsigned integer payload (1-8 bytes, big-endian).
pub fn read_uint(r: &mut ByteReader, size: u64) -> ProbeResult<u64> {
    if size == 0 || size > 8 {
        return Err(ProbeError::MalformedStructure {
            offset: r.position(),
            reason: format!("invalid uint size {size}"),
        });
    }
    let mut value: u64 = 0;
    for &b in r.read_bytes(size as usize)? {
        value = (value << 8) | b as u64;
    }
    Ok(value)
}

/// Read a float payload. Four bytes read as f32, eight as f64; anything
/// else is malformed (a zero-size float reads as 0.0).
pub fn read_float(r: &mut ByteReader, size: u64) -> ProbeResult<f64> {
    match size {
        0 => Ok(0.0),
        4 => {
            let b = r.read_bytes(4)?;
            Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64)
        }
        8 => {
            let b = r.read_bytes(8)?;
            Ok(f64::from_be_bytes([
                b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            ]))
        }
        _ => Err(ProbeError::MalformedStructure {
            offset: r.position(),
            reason: format!("invalid float size {size} (must be 0, 4, or 8)"),
        }),
    }
}

/// Read a UTF-8 string payload; trailing NULs are stripped.
pub fn read_string(r: &mut ByteReader, size: u64) -> ProbeResult<String> {
    let raw = r.read_bytes(size as usize)?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
}

/// Read a raw binary payload.
pub fn read_binary(r: &mut ByteReader, size: u64) -> ProbeResult<Vec<u8>> {
    Ok(r.read_bytes(size as usize)?.to_vec())
}

/// Skip past an element payload. Unknown-size elements cannot be skipped.
pub fn skip_element(r: &mut ByteReader, size: u64) -> ProbeResult<()> {
    if size == u64::MAX {
        return Err(ProbeError::MalformedStructure {
            offset: r.position(),
            reason: "cannot skip element with unknown size".into(),
        });
    }
    r.skip(size as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_header() {
        // EBML header ID (0x1A45DFA3) + size 5.
        let data = [0x1A, 0x45, 0xDF, 0xA3, 0x85];
        let mut r = ByteReader::new(&data);
        let elem = read_element(&mut r).unwrap();
        assert_eq!(elem.id, 0x1A45DFA3);
        assert_eq!(elem.size, 5);
        assert_eq!(elem.position, 0);
        assert_eq!(elem.header_size, 5);
        assert_eq!(elem.data_offset(), 5);
        assert_eq!(elem.end_offset(), Some(10));
    }

    #[test]
    fn element_unknown_size() {
        let data = [0x18, 0x53, 0x80, 0x67, 0xFF];
        let mut r = ByteReader::new(&data);
        let elem = read_element(&mut r).unwrap();
        assert_eq!(elem.id, 0x18538067);
        assert_eq!(elem.size, u64::MAX);
        assert_eq!(elem.end_offset(), None);
    }

    #[test]
    fn uint_values() {
        let mut r = ByteReader::new(&[0x2A]);
        assert_eq!(read_uint(&mut r, 1).unwrap(), 42);

        let mut r = ByteReader::new(&[0x03, 0xE8]);
        assert_eq!(read_uint(&mut r, 2).unwrap(), 1000);

        let mut r = ByteReader::new(&[0x0F, 0x42, 0x40]);
        assert_eq!(read_uint(&mut r, 3).unwrap(), 1_000_000);
    }

    #[test]
    fn uint_invalid_sizes() {
        let mut r = ByteReader::new(&[0u8; 9]);
        assert!(read_uint(&mut r, 0).is_err());
        assert!(read_uint(&mut r, 9).is_err());
    }

    #[test]
    fn float_widths() {
        let bytes = 10_000f32.to_be_bytes();
        let mut r = ByteReader::new(&bytes);
        assert!((read_float(&mut r, 4).unwrap() - 10_000.0).abs() < 1e-3);

        let bytes = 12345.6789f64.to_be_bytes();
        let mut r = ByteReader::new(&bytes);
        assert!((read_float(&mut r, 8).unwrap() - 12345.6789).abs() < 1e-6);

        let mut r = ByteReader::new(&[]);
        assert_eq!(read_float(&mut r, 0).unwrap(), 0.0);

        let mut r = ByteReader::new(&[0u8; 3]);
        assert!(read_float(&mut r, 3).is_err());
    }

    #[test]
    fn string_strips_trailing_nuls() {
        let mut r = ByteReader::new(b"webm\x00\x00");
        assert_eq!(read_string(&mut r, 6).unwrap(), "webm");

        let mut r = ByteReader::new(b"matroska");
        assert_eq!(read_string(&mut r, 8).unwrap(), "matroska");
    }

    #[test]
    fn skip_and_bounds() {
        let data = [0u8; 10];
        let mut r = ByteReader::new(&data);
        skip_element(&mut r, 5).unwrap();
        assert_eq!(r.position(), 5);
        assert!(skip_element(&mut r, u64::MAX).is_err());
        assert!(skip_element(&mut r, 100).is_err());
    }
}
