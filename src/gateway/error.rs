//! GatewayError — failure modes for a `DataSourceGateway` implementation.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("connection to data source failed: {0}")]
    ConnectionFailed(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("no record found for {0}")]
    NotFound(String),

    #[error("ambiguous reference: {0}")]
    Ambiguous(String),
}

impl From<GatewayError> for crate::error::Error {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::ConnectionFailed(msg) => crate::error::Error::Connectivity(msg),
            GatewayError::QueryFailed(msg) => crate::error::Error::Query(msg),
            GatewayError::NotFound(msg) => crate::error::Error::Query(format!("not found: {msg}")),
            GatewayError::Ambiguous(msg) => crate::error::Error::AmbiguousReference(msg),
        }
    }
}
