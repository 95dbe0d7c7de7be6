#[derive(Debug, thiserror::Error)]
pub enum Error {
    // port could not be opened, or the analyzer did not answer
    #[error("connection error: {0}")]
    Connection(String),

    #[error("timed out waiting for response to {0:?}")]
    Timeout(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("need at least {needed} samples, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config error: {0}")]
    Config(#[from] confy::ConfyError),
}

pub type Result<T> = std::result::Result<T, Error>;
