//! Best-effort decoder for `attributedBody` rich-text payloads in Messages.db.
//!
//! macOS Messages stores text in two places:
//! - `text` column: plain text (older messages)
//! - `attributedBody` column: binary blob (macOS Ventura+)
//!
//! The blob is a `streamtyped` NSAttributedString archive, occasionally an
//! NSKeyedArchiver bplist. Decoding is lossy and tied to the payload layout
//! observed in the store; when Apple changes the layout, only this module
//! changes. If no known marker is present the decoder returns `None` and the
//! message is skipped by callers.
//!
//! CHANGELOG:
//! - 10/19/2026 - Decoder trait, exact length-prefixed reads, no marker-less fallback
//! - 01/10/2026 - Implemented full blob parsing
//! - 01/10/2026 - Initial stub

use plist::Value;

/// Extracts displayable text from a rich-text payload.
pub trait BodyDecoder: Send {
    /// Payload format revision this decoder understands.
    fn version(&self) -> &'static str;

    /// Embedded string, or `None` when the payload isn't recognized.
    fn decode(&self, blob: &[u8]) -> Option<String>;
}

/// Decoder for the `streamtyped` layout, with a bplist path for keyed archives.
#[derive(Debug, Default, Clone, Copy)]
pub struct StreamTypedDecoder;

impl BodyDecoder for StreamTypedDecoder {
    fn version(&self) -> &'static str {
        "streamtyped-v1"
    }

    fn decode(&self, blob: &[u8]) -> Option<String> {
        extract_text_from_blob(blob)
    }
}

/// Extract text from an attributedBody blob.
pub fn extract_text_from_blob(blob: &[u8]) -> Option<String> {
    if blob.is_empty() {
        return None;
    }

    // bplist header may not be at the start of the blob
    if let Some(bplist_start) = find_subsequence(blob, b"bplist") {
        if let Some(text) = parse_bplist(&blob[bplist_start..]) {
            return Some(text);
        }
    }

    parse_streamtyped(blob)
}

/// Find a subsequence in a byte slice.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// NSKeyedArchiver keeps its values in the `$objects` array.
fn parse_bplist(blob: &[u8]) -> Option<String> {
    let plist: Value = plist::from_bytes(blob).ok()?;
    let dict = plist.as_dictionary()?;
    let objects = dict.get("$objects")?.as_array()?;

    objects.iter().find_map(|obj| match obj {
        Value::String(s) if !s.starts_with("NS") && !s.starts_with('$') => non_empty(s),
        Value::Dictionary(d) => match d.get("NS.string") {
            Some(Value::String(s)) => non_empty(s),
            _ => match d.get("NS.bytes") {
                Some(Value::Data(data)) => std::str::from_utf8(data).ok().and_then(non_empty),
                _ => None,
            },
        },
        _ => None,
    })
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parse the streamtyped layout.
///
/// After the `NSString` (or `NSMutableString`) class marker come a few
/// control bytes, a `+`, a length prefix, then the UTF-8 text. Lengths of 128
/// or more are written as `0x81` + u16 LE or `0x82` + u32 LE.
fn parse_streamtyped(blob: &[u8]) -> Option<String> {
    for marker in [&b"NSString"[..], &b"NSMutableString"[..]] {
        let Some(marker_idx) = find_subsequence(blob, marker) else {
            continue;
        };
        let after_marker = &blob[marker_idx + marker.len()..];
        let Some(plus_offset) = after_marker.iter().position(|&b| b == b'+') else {
            continue;
        };
        if plus_offset > 16 {
            continue;
        }

        let prefixed = &after_marker[plus_offset + 1..];
        if let Some(text) = read_length_prefixed(prefixed).and_then(decode_text) {
            return Some(text);
        }
        // Length prefix disagreed with the payload; scan to the terminator.
        if let Some(text) = prefixed.get(1..).and_then(|rest| decode_text(extract_until_control(rest))) {
            return Some(text);
        }
    }

    None
}

fn read_length_prefixed(bytes: &[u8]) -> Option<&[u8]> {
    let (&tag, rest) = bytes.split_first()?;
    let (len, body) = match tag {
        0x81 => {
            let raw = rest.get(..2)?;
            (u16::from_le_bytes([raw[0], raw[1]]) as usize, &rest[2..])
        }
        0x82 => {
            let raw = rest.get(..4)?;
            (
                u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize,
                &rest[4..],
            )
        }
        n if n < 0x80 => (n as usize, rest),
        _ => return None,
    };
    body.get(..len)
}

/// Bytes up to the first control sequence that ends the string.
fn extract_until_control(blob: &[u8]) -> &[u8] {
    let end = blob
        .iter()
        .position(|&b| b == 0x86 || b == 0x84 || b == 0x00)
        .unwrap_or(blob.len());
    &blob[..end]
}

fn decode_text(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    non_empty(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn streamtyped(text: &[u8], length_prefix: &[u8]) -> Vec<u8> {
        let mut blob: Vec<u8> = b"\x04\x0bstreamtyped\x81\xe8\x03\x84\x01@\x84\x84\x84\x12NSAttributedString\x00\x84\x84\x08NSObject\x00\x85\x92\x84\x84\x84".to_vec();
        blob.extend_from_slice(b"NSString");
        blob.extend_from_slice(&[0x01, 0x94, 0x84, 0x01, b'+']);
        blob.extend_from_slice(length_prefix);
        blob.extend_from_slice(text);
        blob.extend_from_slice(&[0x86, 0x84, 0x02, b'i', b'I', 0x01]);
        blob.extend_from_slice(b"NSDictionary");
        blob
    }

    #[test]
    fn test_empty_blob() {
        assert_eq!(extract_text_from_blob(&[]), None);
    }

    #[test]
    fn test_streamtyped_nsstring() {
        let blob = streamtyped(b"Hello", &[0x05]);
        assert_eq!(extract_text_from_blob(&blob), Some("Hello".to_string()));
    }

    #[test]
    fn test_streamtyped_long_length_prefix() {
        let text = "x".repeat(300);
        let blob = streamtyped(text.as_bytes(), &[0x81, 0x2c, 0x01]);
        assert_eq!(extract_text_from_blob(&blob), Some(text));
    }

    #[test]
    fn test_text_containing_control_like_letters() {
        // "iI" inside the text must not truncate it when the length is known.
        let blob = streamtyped(b"Hi Ian", &[0x06]);
        assert_eq!(extract_text_from_blob(&blob), Some("Hi Ian".to_string()));
    }

    #[test]
    fn test_unicode_text() {
        let text = "caf\u{e9} \u{1F600}";
        let blob = streamtyped(text.as_bytes(), &[text.len() as u8]);
        assert_eq!(extract_text_from_blob(&blob), Some(text.to_string()));
    }

    #[test]
    fn test_no_markers_is_skipped() {
        assert_eq!(extract_text_from_blob(b"just some bytes without markers"), None);
    }

    #[test]
    fn test_decoder_trait() {
        let decoder = StreamTypedDecoder;
        assert_eq!(decoder.version(), "streamtyped-v1");
        assert_eq!(decoder.decode(&streamtyped(b"ok", &[0x02])), Some("ok".to_string()));
    }

    #[test]
    fn test_find_subsequence() {
        assert_eq!(find_subsequence(b"hello world", b"world"), Some(6));
        assert_eq!(find_subsequence(b"hello", b"world"), None);
        assert_eq!(find_subsequence(b"NSString test", b"NSString"), Some(0));
    }
}
