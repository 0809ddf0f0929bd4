use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("Not connected to oscilloscope")]
    NotConnected,
    #[error("Invalid channel: {0}")]
    InvalidChannel(i32),
    #[error("Invalid measurement type: {0}")]
    InvalidMeasurement(String),
    #[error("Invalid resource locator: {0}")]
    InvalidAddress(String),
    #[error("Instrument response timeout")]
    Timeout,
    #[error("{context}: {source}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
}
