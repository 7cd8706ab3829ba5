//! Lump-name validation and the 8-byte on-disk canonical form.
//!
//! Write-side validation is strict; read-side decoding is lenient,
//! trimming at the first NUL and accepting whatever bytes precede it —
//! real-world WADs occasionally carry lowercase or extended bytes and
//! rejecting them on load would break compatibility.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

/// Byte width of a name field in a directory record.
pub const NAME_SIZE: usize = 8;

/// Allowed character class for an encoded (uppercased) name.
static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9_\\\[\]-]{1,8}$").unwrap());

/// Validate and encode a logical name into its canonical 8-byte,
/// NUL-padded, uppercased form.
///
/// Lowercase letters are uppercased before validation so that
/// `encode("lump")` and `encode("LUMP")` both succeed and produce the
/// same bytes.
pub fn encode(name: &str) -> Result<[u8; NAME_SIZE]> {
    if name.is_empty() || name.len() > NAME_SIZE {
        return Err(Error::InvalidName(name.to_string()));
    }
    let upper = name.to_ascii_uppercase();
    if !NAME_RE.is_match(&upper) {
        return Err(Error::InvalidName(name.to_string()));
    }
    let mut bytes = [0u8; NAME_SIZE];
    bytes[..upper.len()].copy_from_slice(upper.as_bytes());
    Ok(bytes)
}

/// Decode a raw 8-byte name field into its trimmed logical form.
///
/// Bytes after the first NUL are ignored; non-UTF8 trailing garbage
/// before a NUL is replaced lossily rather than rejected, since this
/// path only ever feeds display and comparison, never validation.
pub fn decode(raw: &[u8; NAME_SIZE]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(NAME_SIZE);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// True when `raw` is the defensive all-zero marker that trailing,
/// block-padded directories sometimes carry; callers silently drop
/// entries where this is true and size is also zero.
pub fn is_blank(raw: &[u8; NAME_SIZE]) -> bool {
    raw.iter().all(|&b| b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_short_name_padded() {
        let bytes = encode("lump").unwrap();
        assert_eq!(&bytes, b"LUMP\0\0\0\0");
    }

    #[test]
    fn encodes_full_length_name() {
        let bytes = encode("ABCDEFGH").unwrap();
        assert_eq!(&bytes, b"ABCDEFGH");
    }

    #[test]
    fn decode_trims_at_first_nul() {
        assert_eq!(decode(b"LUMP\0\0\0\0"), "LUMP");
        assert_eq!(decode(b"ABCDEFGH"), "ABCDEFGH");
    }

    #[test]
    fn rejects_empty_and_overlong() {
        assert!(matches!(encode(""), Err(Error::InvalidName(_))));
        assert!(matches!(encode("TOOLONGNAME"), Err(Error::InvalidName(_))));
    }

    #[test]
    fn rejects_disallowed_bytes() {
        assert!(matches!(encode("LU MP"), Err(Error::InvalidName(_))));
        assert!(matches!(encode("LU.MP"), Err(Error::InvalidName(_))));
    }

    #[test]
    fn allows_doc_listed_punctuation() {
        assert!(encode("F1_START").is_ok());
        assert!(encode("P[1]-X").is_ok());
        assert!(encode("A\\B").is_ok());
    }

    #[test]
    fn name_round_trip() {
        for n in ["lump", "LUMP01", "a", "P1_START"] {
            let encoded = encode(n).unwrap();
            assert_eq!(decode(&encoded), n.to_ascii_uppercase());
        }
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(b"\0\0\0\0\0\0\0\0"));
        assert!(!is_blank(b"LUMP\0\0\0\0"));
    }
}
