use thiserror::Error;

/// Build-time script errors. Any of these rejects the whole script before a
/// single machine is touched.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line {line}: unknown directive '{keyword}'")]
    UnknownKeyword { line: usize, keyword: String },

    #[error("line {line}: {keyword} declared more than once")]
    DuplicatePreamble { line: usize, keyword: &'static str },

    #[error("line {line}: {keyword} must precede all actions")]
    PreambleAfterAction { line: usize, keyword: &'static str },

    #[error("line {line}: {keyword}: {reason}")]
    InvalidArgs {
        line: usize,
        keyword: &'static str,
        reason: String,
    },

    #[error("line {line}: unbalanced quote in arguments")]
    UnbalancedQuote { line: usize },
}
