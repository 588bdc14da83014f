use thiserror::Error;

/// A single malformed message: logged at warning and dropped by the parser-dispatch stage,
/// never fatal to the pipeline.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    MalformedXml(String),
    #[error("missing required field {0}")]
    MissingField(&'static str),
    #[error("unparseable value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}
