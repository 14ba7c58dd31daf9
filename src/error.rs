//! Error enum
use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Csv(csv::Error),
    Serde(serde_json::Error),
    /// Malformed CoNLL-U row. `line` is 1-based.
    Conllu {
        line: usize,
        reason: String,
    },
    /// Worker answer that is neither `0` nor `1`.
    InvalidAnswer {
        worker: String,
        answer: String,
    },
    MissingColumn(String),
    Sampling(String),
    Binomial(rand_distr::BinomialError),
    Glob(glob::GlobError),
    GlobPattern(glob::PatternError),
    Custom(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Csv(e) => write!(f, "csv error: {}", e),
            Error::Serde(e) => write!(f, "json error: {}", e),
            Error::Conllu { line, reason } => {
                write!(f, "malformed conllu at line {}: {}", line, reason)
            }
            Error::InvalidAnswer { worker, answer } => {
                write!(f, "invalid answer {:?} from worker {}", answer, worker)
            }
            Error::MissingColumn(c) => write!(f, "missing column {:?}", c),
            Error::Sampling(s) => write!(f, "sampling error: {}", s),
            Error::Binomial(e) => write!(f, "binomial error: {}", e),
            Error::Glob(e) => write!(f, "glob error: {}", e),
            Error::GlobPattern(e) => write!(f, "glob pattern error: {}", e),
            Error::Custom(s) => write!(f, "{}", s),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Error {
        Error::Csv(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Serde(e)
    }
}

impl From<rand_distr::BinomialError> for Error {
    fn from(e: rand_distr::BinomialError) -> Error {
        Error::Binomial(e)
    }
}

impl From<glob::GlobError> for Error {
    fn from(e: glob::GlobError) -> Error {
        Error::Glob(e)
    }
}

impl From<glob::PatternError> for Error {
    fn from(e: glob::PatternError) -> Error {
        Error::GlobPattern(e)
    }
}

impl From<String> for Error {
    fn from(s: String) -> Error {
        Error::Custom(s)
    }
}
