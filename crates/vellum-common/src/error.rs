//! Errors on the embedding surface of the pipeline.
//!
//! The pipeline stages themselves are total: malformed markup and CSS never
//! fail, they degrade. The only fallible step is handing bytes to the
//! pipeline in the first place, which is where decoding and sizing are
//! checked.

use std::borrow::Cow;

use thiserror::Error;

/// Upper bound on document size accepted by [`decode_document`].
///
/// The renderer runs on machines without swap; a runaway download must not
/// be able to exhaust memory through the parser.
pub const MAX_DOCUMENT_BYTES: usize = 32 * 1024 * 1024;

/// Errors produced while preparing a byte stream for the parser.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The input exceeded [`MAX_DOCUMENT_BYTES`].
    #[error("document of {size} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Observed input size in bytes.
        size: usize,
        /// The configured limit.
        limit: usize,
    },
}

/// Decode a raw document byte stream into a character string.
///
/// UTF-8 is decoded losslessly where valid; invalid sequences are replaced
/// with U+FFFD so that the tokenizer downstream always sees a character
/// string. Only oversized input is rejected.
///
/// # Errors
///
/// Returns [`DocumentError::TooLarge`] when the input exceeds
/// [`MAX_DOCUMENT_BYTES`].
pub fn decode_document(bytes: &[u8]) -> Result<Cow<'_, str>, DocumentError> {
    if bytes.len() > MAX_DOCUMENT_BYTES {
        return Err(DocumentError::TooLarge {
            size: bytes.len(),
            limit: MAX_DOCUMENT_BYTES,
        });
    }
    Ok(String::from_utf8_lossy(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_clean_utf8_borrowed() {
        let decoded = decode_document(b"<p>hi</p>").unwrap();
        assert_eq!(decoded, "<p>hi</p>");
        assert!(matches!(decoded, Cow::Borrowed(_)));
    }

    #[test]
    fn replaces_invalid_sequences() {
        let decoded = decode_document(b"a\xffb").unwrap();
        assert_eq!(decoded, "a\u{fffd}b");
    }
}
