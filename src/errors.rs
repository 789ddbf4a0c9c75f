//! errors.rs
//! Taxonomía de errores del envío programado y del generador de contenido.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Credenciales del transporte ausentes o con placeholders
    #[error("configuration error: {0}")]
    Configuration(String),

    /// El proveedor rechazó o no completó el envío
    #[error("transport error: {0}")]
    Transport(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Registro programado malformado
    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("content generator is not configured: {0}")]
    NotConfigured(String),

    #[error("content generator request failed: {0}")]
    Upstream(String),

    #[error("content generator returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        GenerationError::Upstream(e.to_string())
    }
}
