//! Named text decoders for scanned lines.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

/// Decodes raw line bytes using a named encoding.
///
/// Unknown names fall back to UTF-8; invalid sequences are replaced rather than
/// rejected, so decoding never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextDecoder {
    encoding: &'static Encoding,
}

impl TextDecoder {
    /// Look up a decoder by WHATWG label (`"utf-8"`, `"latin1"`, `"shift_jis"`, ...).
    pub fn for_label(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() {
            return Self::system_default();
        }
        match Encoding::for_label(label.as_bytes()) {
            Some(encoding) => Self { encoding },
            None => {
                log::debug!("unknown encoding '{label}', falling back to UTF-8");
                Self::system_default()
            }
        }
    }

    pub fn system_default() -> Self {
        Self { encoding: UTF_8 }
    }

    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        let (text, _had_errors) = self.encoding.decode_without_bom_handling(bytes);
        text.into_owned()
    }

    /// Number of bytes `text` occupies in this encoding.
    ///
    /// Maps offsets in decoded text back to file offsets. Exact for text that
    /// decoded cleanly; a replacement character counts as its re-encoded size.
    pub fn encoded_len(&self, text: &str) -> usize {
        if self.encoding == UTF_8 {
            return text.len();
        }
        if self.encoding == UTF_16LE || self.encoding == UTF_16BE {
            return text.encode_utf16().count() * 2;
        }
        let (bytes, _, _) = self.encoding.encode(text);
        bytes.len()
    }
}

impl Default for TextDecoder {
    fn default() -> Self {
        Self::system_default()
    }
}
