//! Text decoding with an encoding-detector fallback.

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use std::borrow::Cow;

/// Encoding recorded for files that decode as UTF-8.
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Outcome of decoding a file's bytes.
#[derive(Debug)]
pub enum Decoded<'a> {
    Text {
        text: Cow<'a, str>,
        encoding: &'static str,
    },
    /// Neither UTF-8 nor the detected encoding could decode the bytes
    Failed { encoding: &'static str },
}

/// Decode as UTF-8, falling back to the encoding detector.
pub fn decode(bytes: &[u8]) -> Decoded<'_> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Decoded::Text {
            text: Cow::Borrowed(text),
            encoding: DEFAULT_ENCODING,
        };
    }

    let encoding = detect(bytes);
    let (text, actual, had_errors) = encoding.decode(bytes);
    if had_errors {
        Decoded::Failed {
            encoding: actual.name(),
        }
    } else {
        Decoded::Text {
            text,
            encoding: actual.name(),
        }
    }
}

/// Decode with a previously recorded encoding label. Returns `None` when the
/// label is unknown or the bytes do not decode cleanly.
pub fn decode_with<'a>(bytes: &'a [u8], label: Option<&str>) -> Option<Cow<'a, str>> {
    let label = label.unwrap_or(DEFAULT_ENCODING);
    if label.eq_ignore_ascii_case(DEFAULT_ENCODING) {
        return std::str::from_utf8(bytes).ok().map(Cow::Borrowed);
    }

    let encoding = Encoding::for_label(label.as_bytes())?;
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors { None } else { Some(text) }
}

fn detect(bytes: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}
