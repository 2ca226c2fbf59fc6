#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validate(#[from] validator::ValidationErrors),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Unknown(#[from] anyhow::Error),
}

impl Error {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validate(_) | Self::Invalid(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<time::error::Parse> for Error {
    fn from(value: time::error::Parse) -> Self {
        Self::Invalid(value.to_string())
    }
}

impl From<strum::ParseError> for Error {
    fn from(value: strum::ParseError) -> Self {
        Self::Invalid(value.to_string())
    }
}

#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::Error::Invalid(format!($msg)).into())
    };
    ($err:expr $(,)?) => {
        return Err($crate::Error::Invalid(format!($err)).into())
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::Error::Invalid(format!($fmt, $($arg)*)).into())
    };
}
