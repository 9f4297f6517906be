//! Character cursor for the chasm lexer.
//!
//! The cursor walks the source one `char` at a time and keeps the line,
//! column and byte offset that token spans are built from. A token starts
//! with [`Cursor::mark`] and ends with [`Cursor::span_since`] and
//! [`Cursor::lexeme_since`].

use chasm_core::Span;

/// Start position of a token being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pub line: u32,
    pub column: u32,
    offset: u32,
}

impl Mark {
    /// Zero-length span at this position.
    pub fn point(self) -> Span {
        Span::point(self.line, self.column)
    }
}

pub struct Cursor<'src> {
    source: &'src str,
    /// Unscanned tail of `source`.
    rest: &'src str,
    offset: u32,
    line: u32,
    /// 1-based, counted in bytes.
    column: u32,
}

impl<'src> Cursor<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            rest: source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// The current position, to be closed later by [`Cursor::span_since`].
    #[inline]
    pub fn mark(&self) -> Mark {
        Mark {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    /// Span from `mark` to the current position.
    #[inline]
    pub fn span_since(&self, mark: Mark) -> Span {
        Span::new(mark.line, mark.column, self.offset - mark.offset)
    }

    /// Source text from `mark` to the current position.
    #[inline]
    pub fn lexeme_since(&self, mark: Mark) -> &'src str {
        &self.source[mark.offset as usize..self.offset as usize]
    }

    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[inline]
    pub fn column(&self) -> u32 {
        self.column
    }

    #[inline]
    pub fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    #[inline]
    pub fn peek_second(&self) -> Option<char> {
        self.rest.chars().nth(1)
    }

    #[inline]
    pub fn check(&self, f: impl Fn(char) -> bool) -> bool {
        self.peek().is_some_and(f)
    }

    /// Consume one character, moving to the next line after `\n`.
    pub fn advance(&mut self) -> Option<char> {
        let ch = self.rest.chars().next()?;
        let len = ch.len_utf8();

        self.rest = &self.rest[len..];
        self.offset += len as u32;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += len as u32;
        }

        Some(ch)
    }

    #[inline]
    pub fn eat(&mut self, ch: char) -> bool {
        let matched = self.peek() == Some(ch);
        if matched {
            self.advance();
        }
        matched
    }

    /// Consume the longest run matching `f` and return it.
    pub fn eat_while(&mut self, f: impl Fn(char) -> bool) -> &'src str {
        let mark = self.mark();
        while self.check(&f) {
            self.advance();
        }
        self.lexeme_since(mark)
    }

    /// Skip whitespace and `#` comments running to end of line.
    pub fn skip_trivia(&mut self) {
        loop {
            self.eat_while(char::is_whitespace);
            if !self.eat('#') {
                break;
            }
            self.eat_while(|c| c != '\n');
        }
    }

    /// Whether a numeric literal starts here, including a leading `-`.
    pub fn at_number(&self) -> bool {
        match self.peek() {
            Some('-') => self.peek_second().is_some_and(|c| c.is_ascii_digit()),
            Some(c) => c.is_ascii_digit(),
            None => false,
        }
    }

    /// Consume a `0x` or `0b` prefix, returning its radix.
    pub fn eat_radix_prefix(&mut self) -> Option<u32> {
        let radix = match (self.peek(), self.peek_second()) {
            (Some('0'), Some('x' | 'X')) => 16,
            (Some('0'), Some('b' | 'B')) => 2,
            _ => return None,
        };
        self.advance();
        self.advance();
        Some(radix)
    }

    /// Consume `.digits`. A dot with no digit after it is left alone.
    pub fn eat_fraction(&mut self) -> bool {
        let fraction = self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit());
        if fraction {
            self.advance();
            self.eat_while(|c| c.is_ascii_digit());
        }
        fraction
    }
}

#[inline]
pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[inline]
pub fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source() {
        let mut cursor = Cursor::new("");
        assert_eq!(cursor.peek(), None);
        assert_eq!(cursor.advance(), None);
        assert!(!cursor.at_number());
        assert_eq!(cursor.mark().point(), Span::point(1, 1));
    }

    #[test]
    fn advance_tracks_lines() {
        let mut cursor = Cursor::new("ab\ncd");
        cursor.advance();
        cursor.advance();
        assert_eq!(cursor.column(), 3);
        assert_eq!(cursor.advance(), Some('\n'));
        assert_eq!(cursor.line(), 2);
        assert_eq!(cursor.column(), 1);
        assert_eq!(cursor.peek(), Some('c'));
    }

    #[test]
    fn mark_closes_into_span_and_lexeme() {
        let mut cursor = Cursor::new("  psh_b 5");
        cursor.skip_trivia();
        let mark = cursor.mark();
        assert_eq!(cursor.eat_while(is_ident_continue), "psh_b");
        assert_eq!(cursor.span_since(mark), Span::new(1, 3, 5));
        assert_eq!(cursor.lexeme_since(mark), "psh_b");
        assert!(!cursor.eat('x'));
        assert!(cursor.eat(' '));
        assert_eq!(cursor.lexeme_since(mark), "psh_b ");
    }

    #[test]
    fn trivia_spans_comments_and_lines() {
        let mut cursor = Cursor::new("# header\n\n  # note\n\tret");
        cursor.skip_trivia();
        assert_eq!((cursor.line(), cursor.column()), (4, 2));
        assert_eq!(cursor.peek(), Some('r'));

        let mut cursor = Cursor::new("# trailing");
        cursor.skip_trivia();
        assert_eq!(cursor.peek(), None);
    }

    #[test]
    fn number_starts() {
        assert!(Cursor::new("7").at_number());
        assert!(Cursor::new("-7").at_number());
        assert!(!Cursor::new("-x").at_number());
        assert!(!Cursor::new("-").at_number());
        assert!(!Cursor::new("x7").at_number());
    }

    #[test]
    fn radix_prefixes() {
        let mut cursor = Cursor::new("0x1f");
        assert_eq!(cursor.eat_radix_prefix(), Some(16));
        assert_eq!(cursor.peek(), Some('1'));

        let mut cursor = Cursor::new("0B10");
        assert_eq!(cursor.eat_radix_prefix(), Some(2));

        let mut cursor = Cursor::new("012");
        assert_eq!(cursor.eat_radix_prefix(), None);
        assert_eq!(cursor.peek(), Some('0'));
    }

    #[test]
    fn fraction_needs_a_digit() {
        let mut cursor = Cursor::new(".25;");
        assert!(cursor.eat_fraction());
        assert_eq!(cursor.peek(), Some(';'));

        let mut cursor = Cursor::new(".;");
        assert!(!cursor.eat_fraction());
        assert_eq!(cursor.peek(), Some('.'));
    }

    #[test]
    fn multibyte_columns_are_bytes() {
        let mut cursor = Cursor::new("é!");
        let mark = cursor.mark();
        assert_eq!(cursor.advance(), Some('é'));
        assert_eq!(cursor.column(), 3);
        assert_eq!(cursor.span_since(mark).len, 2);
    }

    #[test]
    fn ident_classes() {
        assert!(is_ident_start('_'));
        assert!(is_ident_start('a'));
        assert!(!is_ident_start('1'));
        assert!(is_ident_continue('1'));
        assert!(!is_ident_continue('-'));
    }
}
