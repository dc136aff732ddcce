//! Incremental framing of the chat event stream.
//!
//! The server writes one frame per line:
//!
//! ```text
//! data: {"content":"Hel"}
//!
//! data: {"event":"preferences_saved"}
//! ```
//!
//! Chunks from the transport can split a frame anywhere, including in the
//! middle of a multi-byte code point or between `\r` and `\n`. The decoder
//! buffers raw bytes and only decodes a line once its terminating `\n` has
//! arrived. `\n` never occurs inside a multi-byte UTF-8 sequence, so splitting
//! on it before decoding cannot tear a code point.

/// Prefix that marks a data line
pub const DATA_PREFIX: &str = "data: ";

/// Byte-level line splitter that yields frame payloads
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the payload of every frame it completes, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut frames = Vec::new();
        if chunk.is_empty() {
            return frames;
        }

        // Only the new bytes can contain a terminator we have not seen yet.
        let mut scan_from = self.pending.len();
        self.pending.extend_from_slice(chunk);

        let mut consumed = 0;
        while let Some(offset) = self.pending[scan_from..].iter().position(|&b| b == b'\n') {
            let end = scan_from + offset;
            if let Some(payload) = frame_payload(&self.pending[consumed..end]) {
                frames.push(payload);
            }
            consumed = end + 1;
            scan_from = consumed;
        }

        if consumed > 0 {
            self.pending.drain(..consumed);
        }
        frames
    }

    /// Bytes buffered while waiting for the rest of a line
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Consume the decoder at end of stream.
    ///
    /// A trailing line without its `\n` is not a frame; its byte count is
    /// returned so callers can log what was dropped.
    pub fn finish(self) -> usize {
        self.pending.len()
    }
}

/// Extract the payload of a single line, or `None` if it is not a data frame
pub fn frame_payload(line: &[u8]) -> Option<String> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let payload = line.strip_prefix(DATA_PREFIX.as_bytes())?;
    if payload.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(payload).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(chunks: &[&[u8]]) -> Vec<String> {
        let mut decoder = FrameDecoder::new();
        chunks.iter().flat_map(|c| decoder.push(c)).collect()
    }

    #[test]
    fn test_single_chunk_multiple_frames() {
        let frames = decode_all(&[b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\n"]);
        assert_eq!(frames, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let frames = decode_all(&[b"data: {\"content\":\"Hel", b"lo\"}\n"]);
        assert_eq!(frames, vec!["{\"content\":\"Hello\"}"]);
    }

    #[test]
    fn test_split_inside_prefix() {
        let frames = decode_all(&[b"da", b"ta", b": x\n"]);
        assert_eq!(frames, vec!["x"]);
    }

    #[test]
    fn test_split_between_cr_and_lf() {
        let frames = decode_all(&[b"data: x\r", b"\ndata: y\r\n"]);
        assert_eq!(frames, vec!["x", "y"]);
    }

    #[test]
    fn test_split_inside_multibyte_codepoint() {
        let text = "data: caf\u{e9} \u{1F697}\n".as_bytes();
        // Split inside the 4-byte emoji and the 2-byte e-acute.
        let e_acute = text.iter().position(|&b| b == 0xC3).unwrap();
        let emoji = text.iter().position(|&b| b == 0xF0).unwrap();
        let frames = decode_all(&[
            &text[..e_acute + 1],
            &text[e_acute + 1..emoji + 2],
            &text[emoji + 2..],
        ]);
        assert_eq!(frames, vec!["caf\u{e9} \u{1F697}"]);
    }

    #[test]
    fn test_one_byte_at_a_time() {
        let input = "data: {\"content\":\"\u{00fc}ber\"}\ndata: {\"event\":\"end\"}\n";
        let chunks: Vec<&[u8]> = input.as_bytes().chunks(1).collect();
        let frames = decode_all(&chunks);
        assert_eq!(frames, vec!["{\"content\":\"\u{00fc}ber\"}", "{\"event\":\"end\"}"]);
    }

    #[test]
    fn test_ignores_blank_comment_and_empty_data_lines() {
        let frames = decode_all(&[b"\n\n: keep-alive\nevent: ping\ndata: \ndata:x\ndata: ok\n"]);
        assert_eq!(frames, vec!["ok"]);
    }

    #[test]
    fn test_zero_length_chunks_are_harmless() {
        let frames = decode_all(&[b"", b"data: a", b"", b"\n", b""]);
        assert_eq!(frames, vec!["a"]);
    }

    #[test]
    fn test_unterminated_tail_is_held_then_dropped() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.push(b"data: one\ndata: tw"), vec!["one"]);
        assert_eq!(decoder.pending_len(), "data: tw".len());
        assert_eq!(decoder.finish(), "data: tw".len());
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let frames = decode_all(&[b"data: a\xFFb\n"]);
        assert_eq!(frames, vec!["a\u{FFFD}b"]);
    }
}
