pub mod chat;
pub mod dataset;
pub mod query;

#[derive(thiserror::Error, Debug)]
pub enum AdapterError {
    #[error("{0}")]
    FetchError(#[from] reqwest::Error),
    #[error("Parsing: {0}")]
    ParseError(String),
    #[error("Backend responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("I/O: {0}")]
    Io(String),
}

impl From<std::io::Error> for AdapterError {
    fn from(err: std::io::Error) -> Self {
        AdapterError::Io(err.to_string())
    }
}
