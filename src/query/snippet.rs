use crate::graph::node::ByteRange;

/// Lines of context shown on each side of a symbol by default.
pub const DEFAULT_CONTEXT_LINES: usize = 5;

/// Source lines covering `range`, widened by `context_lines` on each side.
///
/// Returns the 1-based number of the first line together with the text. Ranges
/// past the end of `text` are clamped.
pub fn snippet(text: &str, range: ByteRange, context_lines: usize) -> (usize, String) {
    let start = range.start.min(text.len());
    let end = range.end.clamp(start, text.len());

    let first_line = line_index(text, start);
    let last_line = line_index(text, end.saturating_sub(1).max(start));

    let from = first_line.saturating_sub(context_lines);
    let to = last_line + context_lines;
    let lines: Vec<&str> = text
        .lines()
        .enumerate()
        .filter(|(i, _)| *i >= from && *i <= to)
        .map(|(_, line)| line)
        .collect();
    (from + 1, lines.join("\n"))
}

/// Zero-based line containing byte `offset`.
fn line_index(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "l1\nl2\nl3\nl4\nl5\nl6\nl7\n";

    #[test]
    fn test_snippet_with_context() {
        // "l4" starts at byte 9
        let (line, text) = snippet(TEXT, ByteRange::new(9, 11), 1);
        assert_eq!(line, 3);
        assert_eq!(text, "l3\nl4\nl5");
    }

    #[test]
    fn test_snippet_clamps_at_edges() {
        let (line, text) = snippet(TEXT, ByteRange::new(0, 2), DEFAULT_CONTEXT_LINES);
        assert_eq!(line, 1);
        assert_eq!(text, "l1\nl2\nl3\nl4\nl5\nl6");

        let (line, text) = snippet(TEXT, ByteRange::new(500, 900), 0);
        assert_eq!(line, 8);
        assert_eq!(text, "");
    }
}
