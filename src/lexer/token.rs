#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    Background,     // &
    RedirectOut,    // >
    RedirectOutFd1, // 1>
    RedirectErr,    // 2>
    AppendOut,      // >>
    AppendErr,      // 2>>
    RedirectBoth,   // &>
    RedirectIn,     // <
    Pipe,           // |
}

/// Operator spellings in the order they are matched.
pub const OPERATORS: [(&str, Token); 9] = [
    ("&", Token::Background),
    ("|", Token::Pipe),
    (">", Token::RedirectOut),
    ("1>", Token::RedirectOutFd1),
    ("2>", Token::RedirectErr),
    (">>", Token::AppendOut),
    ("2>>", Token::AppendErr),
    ("&>", Token::RedirectBoth),
    ("<", Token::RedirectIn),
];

impl Token {
    pub fn from_word(word: &str) -> Token {
        OPERATORS
            .iter()
            .find(|(lexeme, _)| *lexeme == word)
            .map(|(_, token)| token.clone())
            .unwrap_or_else(|| Token::Word(word.to_string()))
    }

    /// Original spelling of the token.
    pub fn lexeme(&self) -> &str {
        match self {
            Token::Word(w) => w,
            other => OPERATORS
                .iter()
                .find(|(_, token)| token == other)
                .map(|(lexeme, _)| *lexeme)
                .unwrap_or(""),
        }
    }

    pub fn is_operator(&self) -> bool {
        !matches!(self, Token::Word(_))
    }
}
