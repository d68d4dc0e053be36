//! Error types for operation dispatch.

use thiserror::Error;

use crate::model::PaymentId;
use crate::plugin::PluginError;

/// Error returned by [`Engine::apply`](super::Engine::apply).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no plugin processes payment system '{0}'")]
    NoPlugin(String),

    #[error("payment {payment} is in {expected}, operation is in {found}")]
    CurrencyMismatch {
        payment: PaymentId,
        expected: String,
        found: String,
    },

    #[error("{0}")]
    Plugin(#[from] PluginError),
}
