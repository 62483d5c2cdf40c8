use wiretree_core::TreeError;

/// Failure kinds surfaced by the JSON parser and formatter, carrying the
/// 1-based line number the original `JsonParser::_lineNo` tracks so a
/// `JsonError` never loses its position the way a bare `std::runtime_error`
/// would.
#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    #[error("line {line}: unexpected character {found:?}")]
    UnexpectedChar { found: char, line: usize },

    #[error("line {line}: unexpected end of input")]
    UnexpectedEnd { line: usize },

    #[error("no data: input contained no value")]
    NoData,

    #[error("line {line}: invalid unicode escape")]
    InvalidEscape { line: usize },

    #[error("line {line}: invalid number literal {token:?}")]
    InvalidNumber { token: String, line: usize },

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Format(#[from] wiretree_core::FormatError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
