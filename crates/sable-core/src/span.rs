//! Source locations attached to expression nodes and diagnostics.

use std::fmt;

/// A source location: the start of an expression plus its length.
///
/// Expression trees are built by an external front end, so the span is the
/// only link a diagnostic has back to source text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// Location used for compiler-synthesized nodes that have no source text.
    pub const SYNTHETIC: Span = Span {
        line: 0,
        col: 0,
        len: 0,
    };

    #[inline]
    pub const fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// A zero-length span at a position.
    #[inline]
    pub const fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.line == 0
    }

    /// Smallest span on the same line covering both operands of a binary node.
    ///
    /// Spans on different lines keep the start of `self` and sum the lengths.
    pub fn to(self, other: Span) -> Span {
        if self.is_synthetic() {
            return other;
        }
        if other.is_synthetic() {
            return self;
        }
        if self.line != other.line {
            return Span::new(self.line, self.col, self.len + other.len);
        }
        let start = self.col.min(other.col);
        let end = (self.col + self.len).max(other.col + other.len);
        Span::new(self.line, start, end - start)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}+{}", self.line, self.col, self.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_synthetic() {
            f.write_str("<synthetic>")
        } else {
            write!(f, "{}:{}", self.line, self.col)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_line_col() {
        assert_eq!(Span::new(3, 15, 5).to_string(), "3:15");
        assert_eq!(Span::SYNTHETIC.to_string(), "<synthetic>");
    }

    #[test]
    fn to_covers_both_operands() {
        let left = Span::new(1, 5, 1);
        let right = Span::new(1, 9, 3);
        assert_eq!(left.to(right), Span::new(1, 5, 7));
        assert_eq!(right.to(left), Span::new(1, 5, 7));
    }

    #[test]
    fn to_ignores_synthetic_side() {
        let real = Span::new(2, 4, 2);
        assert_eq!(Span::SYNTHETIC.to(real), real);
        assert_eq!(real.to(Span::SYNTHETIC), real);
    }

    #[test]
    fn to_across_lines_keeps_start() {
        let merged = Span::new(1, 10, 2).to(Span::new(2, 1, 3));
        assert_eq!(merged.line, 1);
        assert_eq!(merged.col, 10);
        assert_eq!(merged.len, 5);
    }
}
