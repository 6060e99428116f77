//! Turns the bytes of a saved feed page into text.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHtml {
    pub html: String,
    pub encoding_label: &'static str,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("saved page is not valid {encoding}")]
    Malformed { encoding: &'static str },
}

/// A byte order mark wins; otherwise valid UTF-8 is taken as is and anything
/// else goes through chardetng, which also reads `<meta charset>` hints.
pub fn decode_html(bytes: &[u8]) -> Result<DecodedHtml, DecodeError> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None => (detect(bytes), bytes),
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|html| DecodedHtml {
            html: html.into_owned(),
            encoding_label: encoding.name(),
        })
        .ok_or(DecodeError::Malformed {
            encoding: encoding.name(),
        })
}

fn detect(bytes: &[u8]) -> &'static Encoding {
    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}
