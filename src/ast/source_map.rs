/// Maps byte offsets to line/column positions within source text.
///
/// Lines break at `\n`, `\r\n` or a lone `\r`. Columns count characters,
/// not bytes.
pub struct SourceMap<'src> {
    source: &'src str,
    line_starts: Vec<usize>,
}

impl<'src> SourceMap<'src> {
    pub fn new(source: &'src str) -> Self {
        let bytes = source.as_bytes();
        let mut line_starts = vec![0];
        for (i, &b) in bytes.iter().enumerate() {
            let breaks = match b {
                b'\n' => true,
                b'\r' => bytes.get(i + 1) != Some(&b'\n'),
                _ => false,
            };
            if breaks {
                line_starts.push(i + 1);
            }
        }
        SourceMap { source, line_starts }
    }

    /// Returns (line, col), both 1-based. Offsets past the end clamp to the
    /// end of the source.
    pub fn lookup(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let start = self.line_starts.get(line).copied().unwrap_or(0);
        let col = self
            .source
            .get(start..offset)
            .map_or(offset - start, |prefix| prefix.chars().count());
        (line + 1, col + 1)
    }

    /// Returns the full text of the given 1-based line number.
    pub fn line_text(&self, line: usize) -> &'src str {
        if line == 0 || line > self.line_starts.len() {
            return "";
        }
        let start = self.line_starts[line - 1];
        let end = self.line_starts.get(line).copied().unwrap_or(self.source.len());
        self.source
            .get(start..end)
            .unwrap_or("")
            .trim_end_matches('\n')
            .trim_end_matches('\r')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let sm = SourceMap::new("2 + 3 * 4");
        assert_eq!(sm.lookup(0), (1, 1));
        assert_eq!(sm.lookup(4), (1, 5));
        assert_eq!(sm.lookup(9), (1, 10));
    }

    #[test]
    fn multi_line() {
        let sm = SourceMap::new("sqrt(\n  16\n)");
        assert_eq!(sm.lookup(0), (1, 1));
        assert_eq!(sm.lookup(5), (1, 6)); // the '\n'
        assert_eq!(sm.lookup(8), (2, 3)); // '1' of 16
        assert_eq!(sm.lookup(11), (3, 1)); // ')'
        assert_eq!(sm.line_text(3), ")");
    }

    #[test]
    fn crlf_lines() {
        let src = "1 +\r\n2";
        let sm = SourceMap::new(src);
        assert_eq!(sm.lookup(5), (2, 1));
        assert_eq!(sm.line_text(1), "1 +");
        assert_eq!(sm.line_text(2), "2");
    }

    #[test]
    fn lone_cr_breaks_lines() {
        let sm = SourceMap::new("1 +\r)\r\r2");
        assert_eq!(sm.lookup(4), (2, 1));
        assert_eq!(sm.lookup(6), (3, 1));
        assert_eq!(sm.lookup(7), (4, 1));
        assert_eq!(sm.line_text(1), "1 +");
        assert_eq!(sm.line_text(2), ")");
        assert_eq!(sm.line_text(3), "");
        assert_eq!(sm.line_text(4), "2");
    }

    #[test]
    fn mixed_line_endings() {
        let sm = SourceMap::new("a\r\nb\rc\nd");
        assert_eq!(sm.lookup(3), (2, 1));
        assert_eq!(sm.lookup(5), (3, 1));
        assert_eq!(sm.lookup(7), (4, 1));
        assert_eq!(sm.line_text(2), "b");
    }

    #[test]
    fn columns_count_chars() {
        let sm = SourceMap::new("π + $");
        // 'π' is two bytes; '$' sits at byte 5 but column 5
        assert_eq!(sm.lookup(5), (1, 5));
    }

    #[test]
    fn line_text_out_of_bounds() {
        let sm = SourceMap::new("pi");
        assert_eq!(sm.line_text(0), "");
        assert_eq!(sm.line_text(99), "");
    }

    #[test]
    fn offset_past_end_clamps() {
        let sm = SourceMap::new("abc");
        assert_eq!(sm.lookup(42), (1, 4));
    }

    #[test]
    fn empty_source() {
        let sm = SourceMap::new("");
        assert_eq!(sm.lookup(0), (1, 1));
        assert_eq!(sm.line_text(1), "");
    }
}
