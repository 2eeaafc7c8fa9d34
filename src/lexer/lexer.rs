use super::token::Token;
use crate::parser::BuildError;

/// Characters separating words: space, tab, CR, LF.
pub const DELIMS: &[char] = &[' ', '\t', '\r', '\n'];

/// Lazy token stream over one input line.
pub struct Lexer<'a> {
    words: std::str::Split<'a, &'static [char]>,
}

impl<'a> Lexer<'a> {
    /// Starts tokenizing `line`, rejecting lines longer than `max_line` bytes.
    /// The trailing line terminator does not count towards the limit.
    pub fn new(line: &'a str, max_line: usize) -> Result<Self, BuildError> {
        let body = line.strip_suffix('\n').unwrap_or(line);
        let body = body.strip_suffix('\r').unwrap_or(body);
        if body.len() > max_line {
            return Err(BuildError::InputTooLong {
                len: body.len(),
                max: max_line,
            });
        }
        Ok(Lexer {
            words: line.split(DELIMS),
        })
    }

}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let word = self.words.next()?;
            if !word.is_empty() {
                return Some(Token::from_word(word));
            }
        }
    }
}
