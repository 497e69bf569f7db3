pub use log::{debug, error, info, trace, warn};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Local precondition, protocol or connection failure
    #[error("{0}")]
    Runtime(String),
    /// The service answered with a status we don't accept
    #[error("{message}")]
    Http { message: String, status: u16 },
}

impl Error {
    pub fn runtime<S: Into<String>>(msg: S) -> Self {
        Error::Runtime(msg.into())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Runtime(_) => None,
            Error::Http { status, .. } => Some(*status),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Runtime(format!("Failed to write report: {}", err))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
