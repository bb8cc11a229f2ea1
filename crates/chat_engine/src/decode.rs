use encoding_rs::{Decoder, DecoderResult, UTF_8};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid UTF-8 at byte {offset}")]
    Malformed { offset: u64 },
    #[error("stream ended inside a multi-byte character")]
    Truncated,
}

/// Resumable UTF-8 decoder for chunked byte streams.
///
/// A character split across two chunks is held back until its remaining bytes
/// arrive, so every returned string is complete text. Malformed input is an
/// error rather than a replacement character.
pub struct Utf8StreamDecoder {
    decoder: Decoder,
    consumed: u64,
}

impl Default for Utf8StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self {
            decoder: UTF_8.new_decoder_without_bom_handling(),
            consumed: 0,
        }
    }

    /// Decodes the next chunk. May return an empty string if the chunk only
    /// held the start of a character.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String, DecodeError> {
        let mut out = String::new();
        self.decode_into(chunk, &mut out)?;
        Ok(out)
    }

    /// Flushes the decoder at end of stream.
    pub fn finish(&mut self) -> Result<String, DecodeError> {
        let mut out = String::new();
        self.finish_into(&mut out)?;
        Ok(out)
    }

    /// Appends the decoded text of `chunk` to `out`.
    ///
    /// On error `out` still holds everything decoded before the bad byte.
    pub fn decode_into(&mut self, chunk: &[u8], out: &mut String) -> Result<(), DecodeError> {
        self.decode_inner(chunk, out, false)
    }

    /// Like [`Self::finish`], appending to `out`.
    pub fn finish_into(&mut self, out: &mut String) -> Result<(), DecodeError> {
        self.decode_inner(&[], out, true)
    }

    fn decode_inner(
        &mut self,
        mut src: &[u8],
        out: &mut String,
        last: bool,
    ) -> Result<(), DecodeError> {
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length_without_replacement(src.len())
                .unwrap_or(src.len().saturating_add(4));
            out.reserve(needed);

            let (result, read) = self
                .decoder
                .decode_to_string_without_replacement(src, out, last);
            self.consumed += read as u64;
            src = &src[read..];

            match result {
                DecoderResult::InputEmpty => return Ok(()),
                DecoderResult::OutputFull => continue,
                DecoderResult::Malformed(_, _) if last && src.is_empty() => {
                    return Err(DecodeError::Truncated)
                }
                DecoderResult::Malformed(_, _) => {
                    return Err(DecodeError::Malformed {
                        offset: self.consumed,
                    })
                }
            }
        }
    }
}
