//! Operation dispatcher.
//!
//! The engine routes each operation to the plugin that processes its payment
//! system and keeps per-payment state (extended data, approved and deposited
//! amounts) between operations. Operations are applied one at a time, in
//! stream order.

use std::collections::HashMap;

use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use crate::Amount;
use crate::model::{FinancialTransaction, PaymentId, TransactionType};
use crate::plugin::{Outcome, Plugin, PluginError};

mod state;
pub use state::PaymentRecord;

mod error;
pub use error::EngineError;

/// One requested operation on a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: TransactionType,
    pub payment: PaymentId,
    pub amount: Amount,
    pub currency: String,
    /// Payment system name used to pick the plugin.
    pub system: String,
    /// Resume a checkout started elsewhere.
    pub token: Option<String>,
    /// Act on an authorization made elsewhere.
    pub authorization_id: Option<String>,
}

/// What happened to one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub payment: PaymentId,
    pub kind: TransactionType,
    /// `Err` holds the text of an error that stopped the operation.
    pub outcome: Result<Outcome, String>,
    pub reference: Option<String>,
    pub response_code: Option<String>,
    pub reason_code: Option<String>,
}

impl Report {
    pub fn error(payment: PaymentId, kind: TransactionType, error: impl ToString) -> Self {
        Self {
            payment,
            kind,
            outcome: Err(error.to_string()),
            reference: None,
            response_code: None,
            reason_code: None,
        }
    }

    pub fn outcome_name(&self) -> &'static str {
        match &self.outcome {
            Ok(outcome) => outcome.name(),
            Err(_) => "error",
        }
    }

    /// Redirect URL, pending reason, failure message or error text.
    pub fn detail(&self) -> &str {
        match &self.outcome {
            Ok(Outcome::Success) => "",
            Ok(Outcome::ActionRequired(action)) => action.url(),
            Ok(Outcome::Pending { reason }) => reason.as_str(),
            Ok(Outcome::Failed(failure)) => failure.message.as_str(),
            Err(error) => error.as_str(),
        }
    }
}

/// The operation dispatcher.
pub struct Engine {
    plugins: Vec<Box<dyn Plugin>>,
    payments: HashMap<PaymentId, PaymentRecord>,
}

/// Public API
impl Engine {
    pub fn new(plugins: Vec<Box<dyn Plugin>>) -> Self {
        Self {
            plugins,
            payments: HashMap::new(),
        }
    }

    /// Run the engine with the given operation stream, one report per operation
    pub async fn run(&mut self, mut stream: impl Stream<Item = Operation> + Unpin) -> Vec<Report> {
        let mut reports = Vec::new();
        while let Some(operation) = stream.next().await {
            let (payment, kind) = (operation.payment, operation.kind);
            // an error only ends its own operation
            let report = self
                .apply(operation)
                .await
                .unwrap_or_else(|e| Report::error(payment, kind, e));
            reports.push(report);
        }
        reports
    }

    /// Return the state of one payment
    pub fn payment(&self, payment: PaymentId) -> Option<&PaymentRecord> {
        self.payments.get(&payment)
    }

    /// Apply a single operation on top of the current engine state
    pub async fn apply(&mut self, operation: Operation) -> Result<Report, EngineError> {
        let result = self.dispatch(&operation).await;
        Self::log_result(&operation, &result);
        result
    }
}

/// Private API
impl Engine {
    /// Small helper to log `apply` results
    fn log_result(operation: &Operation, result: &Result<Report, EngineError>) {
        match result {
            Ok(report) => info!(
                payment = operation.payment,
                amount = %operation.amount,
                outcome = report.outcome_name(),
                "{} applied",
                operation.kind
            ),
            Err(e) => warn!(
                payment = operation.payment,
                amount = %operation.amount,
                reason = %e,
                "{} skipped",
                operation.kind
            ),
        }
    }

    /// Apply an `Operation`:
    /// - Find the plugin for its payment system
    /// - Load the payment, or open it (a payment first seen on a follow-up
    ///   operation is taken as approved and deposited for the row amount)
    /// - Check the currency and seed token / authorization id
    /// - Call the plugin and fold the result back into the payment
    async fn dispatch(&mut self, operation: &Operation) -> Result<Report, EngineError> {
        let plugin = self
            .plugins
            .iter()
            .find(|plugin| plugin.processes(&operation.system))
            .ok_or_else(|| EngineError::NoPlugin(operation.system.clone()))?;

        let record = self.payments.entry(operation.payment).or_insert_with(|| {
            let mut record = PaymentRecord::new(&operation.currency);
            if !matches!(
                operation.kind,
                TransactionType::Approve | TransactionType::ApproveAndDeposit
            ) {
                record.approved = operation.amount;
                record.deposited = operation.amount;
            }
            record
        });

        if record.currency != operation.currency {
            return Err(EngineError::CurrencyMismatch {
                payment: operation.payment,
                expected: record.currency.clone(),
                found: operation.currency.clone(),
            });
        }
        if let Some(token) = &operation.token {
            record.extended_data.express_checkout_token = Some(token.clone());
        }
        if let Some(authorization_id) = &operation.authorization_id {
            record.extended_data.authorization_id = Some(authorization_id.clone());
        }

        let mut transaction = record.transaction(operation.kind, operation.amount);
        let result = call(plugin.as_ref(), &mut transaction).await;
        record.absorb(&transaction, result.as_ref().ok());

        let outcome = result?;
        Ok(Report {
            payment: operation.payment,
            kind: operation.kind,
            outcome: Ok(outcome),
            reference: transaction.reference_number,
            response_code: transaction.response_code,
            reason_code: transaction.reason_code,
        })
    }
}

async fn call(
    plugin: &dyn Plugin,
    transaction: &mut FinancialTransaction,
) -> Result<Outcome, PluginError> {
    match transaction.kind {
        TransactionType::Approve => plugin.approve(transaction).await,
        TransactionType::ApproveAndDeposit => plugin.approve_and_deposit(transaction).await,
        TransactionType::Deposit => plugin.deposit(transaction).await,
        TransactionType::Credit => plugin.credit(transaction).await,
        TransactionType::ReverseApproval => plugin.reverse_approval(transaction).await,
        TransactionType::ReApprove => plugin.re_approve(transaction).await,
    }
}
