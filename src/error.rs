//! Errors that end the pipe session.
//!
//! Lookup failures are not in here: they are answered with
//! `{"result": false}` and the session carries on.

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipeError {
    #[snafu(display("failed to read from input stream: {source}"))]
    ReadInput { source: std::io::Error },

    #[snafu(display("failed to write response: {source}"))]
    WriteOutput { source: std::io::Error },

    #[snafu(display("Failed to decode request: {source}"))]
    MalformedRequest { source: serde_json::Error },

    #[snafu(display("failed to encode response: {source}"))]
    EncodeResponse { source: serde_json::Error },

    #[snafu(display("Waited for 'initialize', got: {method}"))]
    NotInitialized { method: String },

    /// An `initialize` parameter is missing its expected shape or value.
    #[snafu(display("{message}"))]
    InvalidParameter { message: String },

    /// No store connection could be established.
    #[snafu(display("{message}"))]
    Connect { message: String },
}

pub type Result<T, E = PipeError> = std::result::Result<T, E>;
