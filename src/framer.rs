//! Per-connection byte buffer that turns stream reads into complete lines.
//!
//! This replaces the original C server's one-byte-at-a-time reads straight
//! into the name field with a proper line framer: all newline detection
//! happens here, so the per-mode dispatch code (naming / composing /
//! command) only ever sees whole lines.

/// Accumulates bytes across an arbitrary number of reads and yields complete
/// lines (newline-terminated, trailing `\r` stripped, newline itself
/// dropped). Partial data — a line still missing its `\n` — stays buffered
/// across calls to [`LineFramer::feed`].
#[derive(Default)]
pub struct LineFramer {
    buf: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append `data` to the buffer and drain every complete line out of it.
    /// Lines are returned in the order they appear in the stream.
    pub fn feed(&mut self, data: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(data);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop(); // drop the '\n'
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Bytes currently buffered without a terminating newline.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Discard whatever is buffered (used after a "name too long" reset).
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_multiple_lines() {
        let mut f = LineFramer::new();
        let lines = f.feed(b"alice\nbob\n");
        assert_eq!(lines, vec!["alice", "bob"]);
        assert_eq!(f.buffered_len(), 0);
    }

    #[test]
    fn partial_line_stays_buffered() {
        let mut f = LineFramer::new();
        assert!(f.feed(b"ali").is_empty());
        assert_eq!(f.buffered_len(), 3);
        let lines = f.feed(b"ce\n");
        assert_eq!(lines, vec!["alice"]);
    }

    #[test]
    fn strips_trailing_cr() {
        let mut f = LineFramer::new();
        let lines = f.feed(b"alice\r\n");
        assert_eq!(lines, vec!["alice"]);
    }

    #[test]
    fn clear_discards_buffered_bytes() {
        let mut f = LineFramer::new();
        f.feed(b"partial-no-newline");
        assert_eq!(f.buffered_len(), 18);
        f.clear();
        assert_eq!(f.buffered_len(), 0);
    }

    /// Framing law: feeding bytes split across arbitrary chunk boundaries
    /// yields the same sequence of lines as feeding them whole.
    #[test]
    fn framing_law_is_chunk_boundary_independent() {
        let whole = b"alice\nbob says hi\nlast\n".to_vec();

        let mut one_shot = LineFramer::new();
        let expected = one_shot.feed(&whole);

        for split in 1..whole.len() {
            let (a, b) = whole.split_at(split);
            let mut f = LineFramer::new();
            let mut got = f.feed(a);
            got.extend(f.feed(b));
            assert_eq!(got, expected, "split at {split} produced different lines");
        }
    }

    #[test]
    fn byte_by_byte_feed_matches_whole_feed() {
        let whole = b"first line\nsecond\n".to_vec();
        let mut reference = LineFramer::new();
        let expected = reference.feed(&whole);

        let mut f = LineFramer::new();
        let mut got = Vec::new();
        for b in &whole {
            got.extend(f.feed(std::slice::from_ref(b)));
        }
        assert_eq!(got, expected);
    }
}
