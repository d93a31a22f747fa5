//! Typed failure taxonomy for the task store.

use thiserror::Error;

/// Errors surfaced by the task store.
///
/// The HTTP layer is the only place these become status codes and JSON
/// bodies; the store itself never shapes a response.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Bad or missing input. Maps to 400.
    #[error("{0}")]
    Validation(String),

    /// The id has no row. Maps to 404.
    #[error("Tarea no encontrada")]
    NotFound,

    /// The underlying database is unreachable. Fatal at startup,
    /// unhealthy at runtime.
    #[error("base de datos inaccesible: {0}")]
    Connection(String),

    /// Any other SQL failure. Maps to 500.
    #[error(transparent)]
    Store(#[from] rusqlite::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
