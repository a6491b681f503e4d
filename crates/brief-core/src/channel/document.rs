use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::{last_chars, take_chars, AcquisitionError};

/// Decoded text is cut to this many characters.
pub const DOCUMENT_MAX_CHARS: usize = 100_000;

/// Above this many characters the text is condensed before extraction.
pub const DOCUMENT_CONDENSE_THRESHOLD: usize = 30_000;

/// Characters kept from each end when condensing.
pub const DOCUMENT_EDGE_CHARS: usize = 15_000;

const CONDENSE_MARKER: &str = "\n[...]\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDocument {
    /// Media type from a `data:` URL prefix, if one was supplied.
    pub media_type: Option<String>,
    pub text: String,
}

/// Decode an uploaded document.
///
/// Accepts bare base64 or a `data:<type>;base64,<payload>` URL. Bytes that are
/// not valid UTF-8 are dropped rather than replaced. The result is capped at
/// [`DOCUMENT_MAX_CHARS`].
pub fn decode_document(payload: &str) -> Result<DecodedDocument, AcquisitionError> {
    let (media_type, encoded) = split_data_url(payload.trim());

    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| AcquisitionError::InvalidBase64(e.to_string()))?;

    let text = utf8_ignoring_invalid(&bytes);
    if text.trim().is_empty() {
        return Err(AcquisitionError::EmptyDocument);
    }

    Ok(DecodedDocument {
        media_type,
        text: take_chars(&text, DOCUMENT_MAX_CHARS).to_string(),
    })
}

/// Reduce long documents to their head and tail so the prompt stays bounded.
pub fn condense_for_extraction(text: &str) -> Cow<'_, str> {
    if text.chars().count() <= DOCUMENT_CONDENSE_THRESHOLD {
        return Cow::Borrowed(text);
    }
    Cow::Owned(format!(
        "{}{}{}",
        take_chars(text, DOCUMENT_EDGE_CHARS),
        CONDENSE_MARKER,
        last_chars(text, DOCUMENT_EDGE_CHARS)
    ))
}

/// Media type declared by a `data:` URL prefix, without decoding the payload.
pub fn declared_media_type(payload: &str) -> Option<String> {
    split_data_url(payload.trim()).0
}

fn split_data_url(payload: &str) -> (Option<String>, &str) {
    let Some((header, data)) = payload.split_once(',') else {
        return (None, payload);
    };
    let media_type = header
        .strip_prefix("data:")
        .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
        .filter(|t| !t.is_empty());
    (media_type, data)
}

fn utf8_ignoring_invalid(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                // valid_up_to guarantees this prefix is UTF-8
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match e.error_len() {
                    Some(len) => bytes = &rest[len..],
                    // Truncated sequence at the end of input
                    None => return out,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &[u8]) -> String {
        STANDARD.encode(text)
    }

    #[test]
    fn test_decode_bare_base64() {
        let doc = decode_document(&encode("Online courses for architects".as_bytes())).unwrap();
        assert_eq!(doc.text, "Online courses for architects");
        assert_eq!(doc.media_type, None);
    }

    #[test]
    fn test_decode_data_url_keeps_media_type() {
        let payload = format!("data:text/plain;base64,{}", encode("Hello".as_bytes()));
        let doc = decode_document(&payload).unwrap();
        assert_eq!(doc.text, "Hello");
        assert_eq!(doc.media_type.as_deref(), Some("text/plain"));
        assert_eq!(declared_media_type(&payload).as_deref(), Some("text/plain"));
        assert_eq!(declared_media_type("SGVsbG8="), None);
    }

    #[test]
    fn test_invalid_utf8_bytes_are_dropped() {
        let mut bytes = b"Coffee ".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice("roastery café".as_bytes());
        bytes.push(0xe2); // truncated multi-byte sequence
        let doc = decode_document(&encode(&bytes)).unwrap();
        assert_eq!(doc.text, "Coffee roastery café");
    }

    #[test]
    fn test_decoded_text_capped() {
        let text = "я".repeat(DOCUMENT_MAX_CHARS + 50);
        let doc = decode_document(&encode(text.as_bytes())).unwrap();
        assert_eq!(doc.text.chars().count(), DOCUMENT_MAX_CHARS);
    }

    #[test]
    fn test_bad_base64_is_acquisition_error() {
        assert!(matches!(
            decode_document("data:application/pdf;base64,@@not-base64@@"),
            Err(AcquisitionError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_blank_document_rejected() {
        assert_eq!(
            decode_document(&encode(b"  \n\t ")),
            Err(AcquisitionError::EmptyDocument)
        );
    }

    #[test]
    fn test_condense_short_text_borrowed() {
        let text = "a".repeat(DOCUMENT_CONDENSE_THRESHOLD);
        assert!(matches!(condense_for_extraction(&text), Cow::Borrowed(_)));
    }

    #[test]
    fn test_condense_keeps_head_and_tail() {
        let text = format!(
            "{}{}{}",
            "h".repeat(DOCUMENT_EDGE_CHARS),
            "m".repeat(10_000),
            "t".repeat(DOCUMENT_EDGE_CHARS)
        );
        let condensed = condense_for_extraction(&text);
        assert!(condensed.starts_with(&"h".repeat(DOCUMENT_EDGE_CHARS)));
        assert!(condensed.ends_with(&"t".repeat(DOCUMENT_EDGE_CHARS)));
        assert!(condensed.contains("\n[...]\n"));
        assert!(!condensed.contains('m'));
    }
}
