/// Splits decoded text into newline-terminated records.
///
/// Text after the last `\n` is kept until a later push completes it. A
/// trailing `\r` is stripped from each line.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: String,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `text` and returns every line it completed, oldest first.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        let mut scan_from = self.pending.len();
        self.pending.push_str(text);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.pending[scan_from..].find('\n') {
            let end = scan_from + pos;
            lines.push(self.pending[start..end].trim_end_matches('\r').to_string());
            start = end + 1;
            scan_from = start;
        }
        self.pending.drain(..start);
        lines
    }

    /// Returns the unterminated remainder, if it holds anything but whitespace.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        if rest.trim().is_empty() {
            None
        } else {
            Some(rest)
        }
    }

    /// Bytes buffered while waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::LineSplitter;

    #[test]
    fn complete_lines_are_returned_in_order() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.push("a\nb\nc\n"), vec!["a", "b", "c"]);
        assert_eq!(splitter.pending_len(), 0);
    }

    #[test]
    fn partial_line_waits_for_newline() {
        let mut splitter = LineSplitter::new();
        assert!(splitter.push("{\"mess").is_empty());
        assert!(splitter.push("age\":").is_empty());
        assert_eq!(splitter.push("1}\n{\"x\""), vec!["{\"message\":1}"]);
        assert_eq!(splitter.pending_len(), 4);
        assert_eq!(splitter.push(":2}\n"), vec!["{\"x\":2}"]);
    }

    #[test]
    fn crlf_and_blank_lines() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.push("one\r\n\r\ntwo\n"), vec!["one", "", "two"]);
    }

    #[test]
    fn finish_returns_meaningful_remainder_only() {
        let mut splitter = LineSplitter::new();
        splitter.push("done\n  ");
        assert_eq!(splitter.finish(), None);

        splitter.push("{\"done\":true}");
        assert_eq!(splitter.finish().as_deref(), Some("{\"done\":true}"));
        assert_eq!(splitter.pending_len(), 0);
    }
}
