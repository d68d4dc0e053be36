//! Core domain types shared by the orchestrator and the dispatcher.

use std::fmt;

use crate::Amount;

/// Payment identifier, as assigned by the hosting framework.
pub type PaymentId = u32;

/// Response code stored on a transaction that went through.
pub const RESPONSE_CODE_SUCCESS: &str = "success";
/// Response code stored when PayPal reports a terminal payment status.
pub const RESPONSE_CODE_FAILED: &str = "Failed";
/// Response code stored while PayPal keeps the payment pending.
pub const RESPONSE_CODE_PENDING: &str = "pending";
/// Reason code stored on a transaction that went through.
pub const REASON_CODE_SUCCESS: &str = "none";

/// The operation a financial transaction was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionType {
    /// Authorize the payment without capturing it.
    Approve,
    /// Authorize and capture in one go (PayPal `Sale`).
    ApproveAndDeposit,
    /// Capture a previously authorized payment.
    Deposit,
    /// Refund a captured payment.
    Credit,
    /// Void an authorization.
    ReverseApproval,
    /// Renew an expired authorization.
    ReApprove,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Approve => "approve",
            TransactionType::ApproveAndDeposit => "approve_and_deposit",
            TransactionType::Deposit => "deposit",
            TransactionType::Credit => "credit",
            TransactionType::ReverseApproval => "reverse_approval",
            TransactionType::ReApprove => "re_approve",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PayPal-specific state persisted between re-entrant plugin calls.
///
/// Keys read and written per transition:
/// - `express_checkout_token`: written by SetExpressCheckout, read by every
///   later approval step.
/// - `paypal_payer_id`: written once the buyer approved the checkout.
/// - `authorization_id`: written by DoExpressCheckoutPayment and
///   DoReauthorization, read by deposit, credit, void and re-authorization.
/// - `checkout_params`, `useraction`, `return_url`, `cancel_url`,
///   `notify_url`: caller-provided overrides, only read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedData {
    pub express_checkout_token: Option<String>,
    pub authorization_id: Option<String>,
    pub paypal_payer_id: Option<String>,
    /// Extra SetExpressCheckout fields, sent in order.
    pub checkout_params: Vec<(String, String)>,
    pub useraction: Option<String>,
    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
    pub notify_url: Option<String>,
}

/// The slice of the owning payment (or credit) aggregate the plugin reads
/// and flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentContext {
    /// Amount authorized by the approve transaction.
    pub approved_amount: Amount,
    /// Amount captured so far.
    pub deposited_amount: Amount,
    /// Set when PayPal returned a status that needs manual review.
    pub attention_required: bool,
}

/// One attempt at a financial operation, created by the hosting framework
/// and mutated in place by the plugin.
#[derive(Debug, Clone)]
pub struct FinancialTransaction {
    pub kind: TransactionType,
    pub requested_amount: Amount,
    pub currency: String,
    pub extended_data: ExtendedData,
    pub reference_number: Option<String>,
    pub processed_amount: Option<Amount>,
    pub response_code: Option<String>,
    pub reason_code: Option<String>,
    pub payment: PaymentContext,
}

impl FinancialTransaction {
    pub fn new(kind: TransactionType, requested_amount: Amount, currency: impl Into<String>) -> Self {
        Self {
            kind,
            requested_amount,
            currency: currency.into(),
            extended_data: ExtendedData::default(),
            reference_number: None,
            processed_amount: None,
            response_code: None,
            reason_code: None,
            payment: PaymentContext::default(),
        }
    }

    /// Record a successful transition.
    pub fn mark_success(&mut self, processed_amount: Amount) {
        self.processed_amount = Some(processed_amount);
        self.response_code = Some(RESPONSE_CODE_SUCCESS.to_string());
        self.reason_code = Some(REASON_CODE_SUCCESS.to_string());
    }

    /// Record the codes of a rejected transition.
    pub fn mark_failed(&mut self, response_code: impl Into<String>, reason_code: Option<String>) {
        self.response_code = Some(response_code.into());
        self.reason_code = reason_code;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transaction_is_blank() {
        let tx = FinancialTransaction::new(TransactionType::Approve, Amount::from_cents(100), "EUR");
        assert_eq!(tx.currency, "EUR");
        assert_eq!(tx.extended_data, ExtendedData::default());
        assert!(tx.reference_number.is_none());
        assert!(tx.response_code.is_none());
        assert!(!tx.payment.attention_required);
    }

    #[test]
    fn mark_success_sets_codes() {
        let mut tx = FinancialTransaction::new(TransactionType::Deposit, Amount::from_cents(100), "EUR");
        tx.mark_success(Amount::from_cents(100));
        assert_eq!(tx.processed_amount, Some(Amount::from_cents(100)));
        assert_eq!(tx.response_code.as_deref(), Some(RESPONSE_CODE_SUCCESS));
        assert_eq!(tx.reason_code.as_deref(), Some(REASON_CODE_SUCCESS));
    }

    #[test]
    fn transaction_type_names() {
        assert_eq!(TransactionType::ApproveAndDeposit.to_string(), "approve_and_deposit");
        assert_eq!(TransactionType::ReApprove.as_str(), "re_approve");
    }
}
