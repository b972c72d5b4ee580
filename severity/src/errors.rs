//! Definition of errors.

use std::error::Error;
use std::fmt;

pub type Result<T, E = SeverityError> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum SeverityError {
    InvalidModel(InvalidModelError),
    InvalidArgument(InvalidArgumentError),
    Training(TrainingError),
    UTF8Error(std::string::FromUtf8Error),
    CastError(std::num::TryFromIntError),
    Regex(regex::Error),
    IOError(std::io::Error),
}

impl SeverityError {
    pub(crate) fn invalid_model<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidModel(InvalidModelError { msg: msg.into() })
    }

    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    pub(crate) fn training<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::Training(TrainingError { msg: msg.into() })
    }
}

impl fmt::Display for SeverityError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidModel(e) => e.fmt(f),
            Self::InvalidArgument(e) => e.fmt(f),
            Self::Training(e) => e.fmt(f),
            Self::UTF8Error(e) => e.fmt(f),
            Self::CastError(e) => e.fmt(f),
            Self::Regex(e) => e.fmt(f),
            Self::IOError(e) => e.fmt(f),
        }
    }
}

impl Error for SeverityError {}

/// Error used when a model artifact cannot be loaded or does not match the
/// vectors it is applied to.
#[derive(Debug)]
pub struct InvalidModelError {
    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidModelError: {}", self.msg)
    }
}

impl Error for InvalidModelError {}

/// Error used when the argument is invalid.
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// Name of the argument.
    pub(crate) arg: &'static str,

    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidArgumentError {}

/// Error used when a model cannot be trained from the given corpus.
#[derive(Debug)]
pub struct TrainingError {
    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for TrainingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TrainingError: {}", self.msg)
    }
}

impl Error for TrainingError {}

impl From<std::string::FromUtf8Error> for SeverityError {
    fn from(error: std::string::FromUtf8Error) -> Self {
        Self::UTF8Error(error)
    }
}

impl From<std::num::TryFromIntError> for SeverityError {
    fn from(error: std::num::TryFromIntError) -> Self {
        Self::CastError(error)
    }
}

impl From<regex::Error> for SeverityError {
    fn from(error: regex::Error) -> Self {
        Self::Regex(error)
    }
}

impl From<std::io::Error> for SeverityError {
    fn from(error: std::io::Error) -> Self {
        Self::IOError(error)
    }
}
