//! Server-Sent Events decoding with byte buffering.
//!
//! Frames can span several TCP packets, and a packet boundary can fall inside
//! a multi-byte UTF-8 sequence, so bytes are buffered until a full line is
//! available and only complete lines are decoded as text.

use std::fmt;

use thiserror::Error;

/// Longest line the decoder will buffer while waiting for its newline.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Decoding failures.
#[derive(Debug, Error, PartialEq)]
pub enum SseError {
    #[error("SSE line exceeds {limit} bytes without a newline")]
    LineTooLong { limit: usize },
}

/// One decoded SSE frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SseFrame {
    /// The event type (from "event:" lines)
    pub event: Option<String>,
    /// The joined "data:" lines
    pub data: String,
}

impl SseFrame {
    /// Check if this is the `[DONE]` terminator of a chat-completions stream.
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Incremental SSE decoder.
#[derive(Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed received bytes and return every frame they complete.
    ///
    /// Fails once the unterminated tail grows past [`MAX_LINE_BYTES`]; the
    /// buffer is cleared and the decoder should not be fed again.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<SseFrame>, SseError> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);

            if line.is_empty() {
                if let Some(frame) = self.take_frame() {
                    frames.push(frame);
                }
            } else {
                self.accept_line(line);
            }
        }

        if self.buffer.len() > MAX_LINE_BYTES {
            self.buffer = Vec::new();
            return Err(SseError::LineTooLong {
                limit: MAX_LINE_BYTES,
            });
        }
        Ok(frames)
    }

    /// Flush a trailing frame when the body ends without a blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest);
            let line = line.trim_end_matches(['\r', '\n']);
            if !line.is_empty() {
                self.accept_line(line);
            }
        }
        self.take_frame()
    }

    fn accept_line(&mut self, line: &str) {
        // comment
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
    }

    fn take_frame(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        Some(SseFrame {
            event,
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

impl fmt::Debug for SseDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseDecoder")
            .field("buffered_bytes", &self.buffer.len())
            .field("pending_data_lines", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: {\"a\":1}\n\n").unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"a\":1}");
        assert_eq!(frames[0].event, None);
    }

    #[test]
    fn test_several_frames_in_one_packet() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: one\n\ndata: two\n\ndata: [DONE]\n\n").unwrap();

        let data: Vec<_> = frames.iter().map(|f| f.data.as_str()).collect();
        assert_eq!(data, ["one", "two", "[DONE]"]);
        assert!(frames[2].is_done());
    }

    #[test]
    fn test_frame_split_across_packets() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"content\":").unwrap().is_empty());
        assert!(decoder.push(b" \"hel").unwrap().is_empty());

        let frames = decoder.push(b"lo\"}\n\n").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, r#"{"content": "hello"}"#);
    }

    #[test]
    fn test_utf8_sequence_split_across_packets() {
        let text = "data: caf\u{e9}\n\n".as_bytes();
        // split inside the two-byte encoding of 'é'
        let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&text[..split]).unwrap().is_empty());
        let frames = decoder.push(&text[split..]).unwrap();
        assert_eq!(frames[0].data, "caf\u{e9}");
    }

    #[test]
    fn test_event_name_and_multiline_data() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"event: error\ndata: line one\ndata: line two\n\n").unwrap();

        assert_eq!(frames[0].event.as_deref(), Some("error"));
        assert_eq!(frames[0].data, "line one\nline two");
    }

    #[test]
    fn test_comments_crlf_and_empty_frames() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": keep-alive\r\n\r\n\r\ndata: hi\r\n\r\n").unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "hi");
    }

    #[test]
    fn test_finish_flushes_unterminated_frame() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: tail").unwrap().is_empty());
        assert_eq!(decoder.finish().map(|f| f.data), Some("tail".to_string()));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_overlong_line_is_rejected() {
        let mut decoder = SseDecoder::new();
        let chunk = vec![b'x'; 64 * 1024];
        let mut pushed = 0;
        let err = loop {
            match decoder.push(&chunk) {
                Ok(frames) => {
                    assert!(frames.is_empty());
                    pushed += chunk.len();
                    assert!(pushed <= MAX_LINE_BYTES);
                }
                Err(e) => break e,
            }
        };
        assert_eq!(err, SseError::LineTooLong { limit: MAX_LINE_BYTES });
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_long_line_within_limit_decodes() {
        let mut decoder = SseDecoder::new();
        let payload = "y".repeat(MAX_LINE_BYTES - 16);
        let frames = decoder
            .push(format!("data: {}\n\n", payload).as_bytes())
            .unwrap();
        assert_eq!(frames[0].data, payload);
    }
}
