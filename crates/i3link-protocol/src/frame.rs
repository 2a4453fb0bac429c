//! Reassembly of line frames from an arbitrary TCP byte stream.
//!
//! Socket reads do not respect message boundaries: one read may carry
//! several complete lines plus the start of the next, and a long line may
//! need several reads. [`LineFramer`] accumulates bytes and hands out
//! complete lines in arrival order.

use crate::codec::FRAME_TERMINATOR;
use crate::ProtocolError;

/// Default upper bound for a single frame.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

/// Splits off the first complete line of `buf`.
///
/// Returns the line without its terminator (and without a trailing `\r`)
/// and the bytes after the terminator, or `None` when `buf` holds no
/// terminator yet.
pub fn split_frame(buf: &[u8]) -> Option<(&[u8], &[u8])> {
    let pos = buf.iter().position(|b| *b == FRAME_TERMINATOR)?;
    let line = strip_cr(&buf[..pos]);
    Some((line, &buf[pos + 1..]))
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Accumulating line framer with an explicit frame-size limit.
///
/// Feed every socket read to [`push`](Self::push), then call
/// [`next_frame`](Self::next_frame) until it returns `None`.
#[derive(Debug)]
pub struct LineFramer {
    buf: Vec<u8>,
    max_frame: usize,
    /// Set while skipping the remainder of an oversized line.
    discarding: bool,
}

impl LineFramer {
    /// Creates a framer that rejects lines longer than `max_frame` bytes.
    pub fn new(max_frame: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_frame: max_frame.max(1),
            discarding: false,
        }
    }

    /// Appends freshly read bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Returns the next complete frame, if any.
    ///
    /// Blank lines are skipped. An oversized line yields one
    /// `Err(FrameTooLarge)` and is then dropped up to its terminator;
    /// framing resumes cleanly with the following line.
    pub fn next_frame(&mut self) -> Option<Result<Vec<u8>, ProtocolError>> {
        loop {
            let Some(pos) = self.buf.iter().position(|b| *b == FRAME_TERMINATOR) else {
                if self.discarding {
                    self.buf.clear();
                    return None;
                }
                if self.buf.len() > self.max_frame {
                    let seen = self.buf.len();
                    tracing::trace!(seen, "discarding oversized partial frame");
                    self.buf.clear();
                    self.discarding = true;
                    return Some(Err(ProtocolError::FrameTooLarge {
                        limit: self.max_frame,
                        seen,
                    }));
                }
                return None;
            };

            let raw: Vec<u8> = self.buf.drain(..=pos).collect();

            if self.discarding {
                // Tail of a line we already reported.
                self.discarding = false;
                continue;
            }

            let line = strip_cr(&raw[..raw.len() - 1]);
            if line.len() > self.max_frame {
                return Some(Err(ProtocolError::FrameTooLarge {
                    limit: self.max_frame,
                    seen: line.len(),
                }));
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Some(Ok(line.to_vec()));
        }
    }

    /// Number of buffered bytes still waiting for a terminator.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Drops everything buffered. Used when a connection is torn down so
    /// half a line from the old socket can't prefix the new one.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.discarding = false;
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(framer: &mut LineFramer) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(frame) = framer.next_frame() {
            out.push(frame.expect("frame should be valid"));
        }
        out
    }

    #[test]
    fn test_split_frame_returns_line_and_rest() {
        let (line, rest) = split_frame(b"{\"a\":1}\r\n{\"b\"").unwrap();
        assert_eq!(line, b"{\"a\":1}");
        assert_eq!(rest, b"{\"b\"");
    }

    #[test]
    fn test_split_frame_without_terminator_is_none() {
        assert!(split_frame(b"{\"partial\":").is_none());
    }

    #[test]
    fn test_next_frame_multiple_frames_in_one_read_keep_order() {
        let mut framer = LineFramer::default();
        framer.push(b"{\"method\":\"ping\"}\n{\"method\":\"mud_online\"}\n");
        assert_eq!(
            frames(&mut framer),
            vec![
                b"{\"method\":\"ping\"}".to_vec(),
                b"{\"method\":\"mud_online\"}".to_vec(),
            ]
        );
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_next_frame_reassembles_across_reads() {
        let mut framer = LineFramer::default();
        framer.push(b"{\"method\":");
        assert!(framer.next_frame().is_none());
        assert_eq!(framer.buffered(), 10);

        framer.push(b"\"tell_received\"}\n{\"id\"");
        assert_eq!(
            frames(&mut framer),
            vec![b"{\"method\":\"tell_received\"}".to_vec()]
        );
        assert_eq!(framer.buffered(), 5, "partial next frame is retained");
    }

    #[test]
    fn test_next_frame_skips_blank_lines() {
        let mut framer = LineFramer::default();
        framer.push(b"\n\r\n  \n{}\n");
        assert_eq!(frames(&mut framer), vec![b"{}".to_vec()]);
    }

    #[test]
    fn test_next_frame_frame_longer_than_one_read_chunk() {
        let mut framer = LineFramer::new(1 << 20);
        let body = vec![b'x'; 20_000];
        for chunk in body.chunks(4096) {
            framer.push(chunk);
            assert!(framer.next_frame().is_none());
        }
        framer.push(b"\n");
        assert_eq!(frames(&mut framer), vec![body]);
    }

    #[test]
    fn test_next_frame_oversized_partial_is_reported_once_then_resyncs() {
        let mut framer = LineFramer::new(8);
        framer.push(b"0123456789");
        assert!(matches!(
            framer.next_frame(),
            Some(Err(ProtocolError::FrameTooLarge { limit: 8, seen: 10 }))
        ));
        assert!(framer.next_frame().is_none());

        // Rest of the same line is skipped silently.
        framer.push(b"abcdef");
        assert!(framer.next_frame().is_none());
        framer.push(b"gh\n{}\n");
        assert_eq!(frames(&mut framer), vec![b"{}".to_vec()]);
    }

    #[test]
    fn test_next_frame_oversized_complete_line_is_rejected() {
        let mut framer = LineFramer::new(4);
        framer.push(b"123456\nok\n");
        assert!(matches!(
            framer.next_frame(),
            Some(Err(ProtocolError::FrameTooLarge { seen: 6, .. }))
        ));
        assert_eq!(frames(&mut framer), vec![b"ok".to_vec()]);
    }

    #[test]
    fn test_clear_drops_partial_data() {
        let mut framer = LineFramer::default();
        framer.push(b"{\"half\":");
        framer.clear();
        framer.push(b"{}\n");
        assert_eq!(frames(&mut framer), vec![b"{}".to_vec()]);
    }
}
