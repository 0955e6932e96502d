//! Position cache: recovers line/column information and line text
//! from byte spans, for diagnostics with source excerpts.

use crate::Span;

/// Precomputed line-start table over one source file.
pub struct SourceMap {
    source: String,
    /// Byte offset of the first character of each line.
    line_starts: Vec<u32>,
}

/// A 1-based line/column pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LineCol {
    pub line: u32,
    pub column: u32,
}

impl SourceMap {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let mut line_starts = vec![0u32];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        SourceMap {
            source,
            line_starts,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Map the start of a span to its 1-based line and column.
    ///
    /// Columns count Unicode scalar values, not bytes.
    pub fn lookup(&self, span: Span) -> LineCol {
        let offset = span.start.min(self.source.len() as u32);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.line_starts[line_idx] as usize;
        let column = self.source[line_start..offset as usize].chars().count() as u32 + 1;
        LineCol {
            line: line_idx as u32 + 1,
            column,
        }
    }

    /// The text of a 1-based line, without its terminator.
    pub fn line_text(&self, line: u32) -> &str {
        let idx = (line as usize).saturating_sub(1);
        let start = self.line_starts[idx] as usize;
        let end = self
            .line_starts
            .get(idx + 1)
            .map_or(self.source.len(), |&s| s as usize);
        self.source[start..end].trim_end_matches(['\n', '\r'])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_lines_and_columns() {
        let map = SourceMap::new("func main() {\n    ret 42;\n}\n");
        assert_eq!(map.lookup(Span::new(0, 4)), LineCol { line: 1, column: 1 });
        assert_eq!(
            map.lookup(Span::new(18, 21)),
            LineCol { line: 2, column: 5 }
        );
        assert_eq!(map.line_text(2), "    ret 42;");
    }

    #[test]
    fn multibyte_columns() {
        let map = SourceMap::new("var π = 3;\n");
        // "π" is 2 bytes; '=' starts at byte 7 but is the 7th character.
        let eq_offset = map.source().find('=').expect("source has '='") as u32;
        let lc = map.lookup(Span::new(eq_offset, eq_offset + 1));
        assert_eq!(lc, LineCol { line: 1, column: 7 });
    }

    #[test]
    fn span_past_end_clamps() {
        let map = SourceMap::new("x");
        let lc = map.lookup(Span::new(100, 101));
        assert_eq!(lc.line, 1);
    }
}
