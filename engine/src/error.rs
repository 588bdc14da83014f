use thiserror::Error;

/// Broker session errors: transient ones are retried by the consumer's reconnect loop,
/// `MaxAttemptsExceeded` is fatal (exit code 2).
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker connection failed: {0}")]
    ConnectionFailed(#[from] lapin::Error),
    #[error("broker reconnect attempts exhausted ({0})")]
    MaxAttemptsExceeded(u32),
}

/// Flight-state store errors. Always logged and skipped, never fatal.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event for unknown or missing gufi dropped")]
    MissingGufi,
}

/// Client fanout / transport errors; always scoped to the one client that raised them.
#[derive(Debug, Error)]
pub enum FanoutError {
    #[error("client write failed: {0}")]
    WriteFailed(String),
    #[error("client queue closed")]
    QueueClosed,
}
