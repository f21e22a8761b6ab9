use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("unexpected end of input at {pos}")]
    UnexpectedEof { pos: usize },

    #[error("invalid syntax at {pos}: {message}")]
    InvalidSyntax { pos: usize, message: String },

    #[error("unterminated {construct} starting at {pos}")]
    Unterminated { pos: usize, construct: String },

    #[error("mismatched closing tag at {pos}: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("unrecognized input at {pos}")]
    LexerError { pos: usize },
}

impl ParseError {
    pub fn unexpected_token(
        pos: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize) -> Self {
        Self::UnexpectedEof { pos }
    }

    pub fn invalid_syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            pos,
            message: message.into(),
        }
    }

    pub fn unterminated(pos: usize, construct: impl Into<String>) -> Self {
        Self::Unterminated {
            pos,
            construct: construct.into(),
        }
    }

    pub fn lexer_error(pos: usize) -> Self {
        Self::LexerError { pos }
    }
}
