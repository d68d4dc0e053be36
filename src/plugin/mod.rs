//! Payment plugins driven by the hosting framework's dispatcher.
//!
//! A plugin borrows one [`FinancialTransaction`] per call, mutates it in
//! place and reports what happened as an [`Outcome`]. Plugins keep no
//! per-transaction state, so a single instance can serve many transactions.

use async_trait::async_trait;

use crate::model::FinancialTransaction;

mod express_checkout;
pub use express_checkout::{CredentialsKeyResolver, ExpressCheckoutPlugin, PAYMENT_SYSTEM_NAME};

mod outcome;
pub use outcome::{Action, Failure, Outcome, PluginError};

/// Capabilities the dispatcher can invoke. Operations a plugin does not
/// implement answer [`PluginError::FunctionNotSupported`].
#[async_trait]
pub trait Plugin: Send + Sync {
    async fn approve(&self, _transaction: &mut FinancialTransaction) -> Result<Outcome, PluginError> {
        Err(PluginError::FunctionNotSupported("approve"))
    }

    async fn approve_and_deposit(
        &self,
        _transaction: &mut FinancialTransaction,
    ) -> Result<Outcome, PluginError> {
        Err(PluginError::FunctionNotSupported("approve_and_deposit"))
    }

    async fn deposit(&self, _transaction: &mut FinancialTransaction) -> Result<Outcome, PluginError> {
        Err(PluginError::FunctionNotSupported("deposit"))
    }

    async fn credit(&self, _transaction: &mut FinancialTransaction) -> Result<Outcome, PluginError> {
        Err(PluginError::FunctionNotSupported("credit"))
    }

    async fn reverse_approval(
        &self,
        _transaction: &mut FinancialTransaction,
    ) -> Result<Outcome, PluginError> {
        Err(PluginError::FunctionNotSupported("reverse_approval"))
    }

    async fn re_approve(&self, _transaction: &mut FinancialTransaction) -> Result<Outcome, PluginError> {
        Err(PluginError::FunctionNotSupported("re_approve"))
    }

    /// Whether this plugin handles the named payment system.
    fn processes(&self, payment_system_name: &str) -> bool;

    fn is_independent_credit_supported(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Amount;
    use crate::model::TransactionType;

    struct Noop;

    #[async_trait]
    impl Plugin for Noop {
        fn processes(&self, payment_system_name: &str) -> bool {
            payment_system_name == "noop"
        }

        fn is_independent_credit_supported(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn default_operations_are_not_supported() {
        let mut tx = FinancialTransaction::new(TransactionType::Credit, Amount::from_cents(1), "EUR");
        let err = Noop.credit(&mut tx).await.unwrap_err();
        assert!(matches!(err, PluginError::FunctionNotSupported("credit")));
        assert!(!err.is_communication());
        assert!(Noop.processes("noop"));
    }
}
