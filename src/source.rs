use crate::token::Span;

/// A source file with its line index, used to locate diagnostics.
pub struct Source<'a> {
    pub path: &'a str,
    pub text: &'a str,
    line_starts: Vec<u32>,
}

/// A 1-based line and column pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub col: u32,
}

impl<'a> Source<'a> {
    pub fn new(path: &'a str, text: &'a str) -> Source<'a> {
        let line_starts = std::iter::once(0)
            .chain(
                text.bytes()
                    .enumerate()
                    .filter(|&(_, b)| b == b'\n')
                    .map(|(i, _)| i + 1),
            )
            .map(|lo| u32::try_from(lo).unwrap_or(u32::MAX))
            .collect();
        Source {
            path,
            text,
            line_starts,
        }
    }

    /// Locates the given byte offset. Columns count characters, not bytes.
    pub fn locate(&self, offset: u32) -> Location {
        let offset = offset.min(self.len());
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_lo = self.line_starts[line_idx] as usize;
        let col = self.text[line_lo..offset as usize].chars().count() + 1;
        Location {
            line: u32::try_from(line_idx + 1).unwrap_or(u32::MAX),
            col: u32::try_from(col).unwrap_or(u32::MAX),
        }
    }

    pub fn locate_span(&self, span: Span) -> Location {
        self.locate(span.lo)
    }

    fn len(&self) -> u32 {
        u32::try_from(self.text.len()).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loc(line: u32, col: u32) -> Location {
        Location { line, col }
    }

    #[test]
    fn locates_offsets() {
        let src = Source::new("t.bk", "var x: int\nx = 1\n\nreturn x");
        assert_eq!(src.locate(0), loc(1, 1));
        assert_eq!(src.locate(4), loc(1, 5));
        assert_eq!(src.locate(10), loc(1, 11));
        assert_eq!(src.locate(11), loc(2, 1));
        assert_eq!(src.locate(17), loc(3, 1));
        assert_eq!(src.locate(25), loc(4, 8));
    }

    #[test]
    fn clamps_past_the_end() {
        let src = Source::new("t.bk", "ab\n");
        assert_eq!(src.locate(100), loc(2, 1));
    }

    #[test]
    fn columns_count_chars() {
        let src = Source::new("t.bk", "\"héllo\" x");
        assert_eq!(src.locate(9), loc(1, 9));
    }

    #[test]
    fn locates_spans() {
        let src = Source::new("t.bk", "a\nbc");
        assert_eq!(src.locate_span(Span::new_of_length(3, 1)), loc(2, 2));
    }
}
