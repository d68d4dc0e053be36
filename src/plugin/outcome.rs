use thiserror::Error;

use crate::model::FinancialTransaction;
use crate::nvp::ClientError;

/// Something the payer has to do before the operation can resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send the payer to this URL.
    VisitUrl(String),
}

impl Action {
    pub fn url(&self) -> &str {
        match self {
            Action::VisitUrl(url) => url,
        }
    }
}

/// A business rejection. The same codes are stored on the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub message: String,
    pub response_code: String,
    pub reason_code: Option<String>,
}

impl Failure {
    /// Build from the codes already written onto `transaction`.
    pub(crate) fn recorded(message: impl Into<String>, transaction: &FinancialTransaction) -> Self {
        Self {
            message: message.into(),
            response_code: transaction.response_code.clone().unwrap_or_default(),
            reason_code: transaction.reason_code.clone(),
        }
    }
}

/// Result of one plugin operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The transaction went through; its fields are filled in.
    Success,
    /// Not an error: redirect the payer, then call the same operation again
    /// with the same transaction.
    ActionRequired(Action),
    /// PayPal holds the payment; retry the whole operation later.
    Pending { reason: String },
    /// PayPal rejected the operation.
    Failed(Failure),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::ActionRequired(_) => "action_required",
            Outcome::Pending { .. } => "pending",
            Outcome::Failed(_) => "failed",
        }
    }
}

/// Errors that stop an operation before PayPal could decide anything.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("NVP call failed: {0}")]
    Client(#[from] ClientError),

    #[error("you must configure a {0}")]
    Configuration(&'static str),

    #[error("extended data has no {0}")]
    MissingData(&'static str),

    #[error("PayPal response has no {0} field")]
    MissingResponseField(&'static str),

    #[error("{0} is not supported by this plugin")]
    FunctionNotSupported(&'static str),
}

impl PluginError {
    pub fn is_communication(&self) -> bool {
        matches!(self, PluginError::Client(err) if err.is_communication())
    }
}
