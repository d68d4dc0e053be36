use crate::Amount;
use crate::model::{ExtendedData, FinancialTransaction, TransactionType};
use crate::plugin::Outcome;

/// What the engine remembers about one payment between operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub currency: String,
    pub extended_data: ExtendedData,
    pub approved: Amount,
    pub deposited: Amount,
    pub attention_required: bool,
}

impl PaymentRecord {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            extended_data: ExtendedData::default(),
            approved: Amount::ZERO,
            deposited: Amount::ZERO,
            attention_required: false,
        }
    }

    /// A fresh transaction carrying this payment's state.
    pub fn transaction(&self, kind: TransactionType, amount: Amount) -> FinancialTransaction {
        let mut transaction = FinancialTransaction::new(kind, amount, self.currency.clone());
        transaction.extended_data = self.extended_data.clone();
        transaction.payment.approved_amount = self.approved;
        transaction.payment.deposited_amount = self.deposited;
        transaction.payment.attention_required = self.attention_required;
        transaction
    }

    /// Take back what the plugin wrote on `transaction`, folding amounts in
    /// when the operation went through.
    pub fn absorb(&mut self, transaction: &FinancialTransaction, outcome: Option<&Outcome>) {
        self.extended_data = transaction.extended_data.clone();
        self.attention_required |= transaction.payment.attention_required;

        if !outcome.is_some_and(Outcome::is_success) {
            return;
        }

        let processed = transaction
            .processed_amount
            .unwrap_or(transaction.requested_amount);
        match transaction.kind {
            TransactionType::Approve => self.approved = processed,
            TransactionType::ApproveAndDeposit => {
                self.approved = processed;
                self.deposited = processed;
            }
            TransactionType::Deposit => self.deposited += processed,
            TransactionType::ReverseApproval => self.approved = Amount::ZERO,
            TransactionType::Credit | TransactionType::ReApprove => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_carries_payment_state() {
        let mut record = PaymentRecord::new("EUR");
        record.approved = Amount::from_cents(5000);
        record.extended_data.authorization_id = Some("AUTH-1".to_string());

        let tx = record.transaction(TransactionType::Deposit, Amount::from_cents(2000));
        assert_eq!(tx.currency, "EUR");
        assert_eq!(tx.payment.approved_amount, Amount::from_cents(5000));
        assert_eq!(tx.extended_data.authorization_id.as_deref(), Some("AUTH-1"));
    }

    #[test]
    fn deposits_accumulate() {
        let mut record = PaymentRecord::new("EUR");
        for cents in [2000, 3000] {
            let mut tx = record.transaction(TransactionType::Deposit, Amount::from_cents(cents));
            tx.mark_success(Amount::from_cents(cents));
            record.absorb(&tx, Some(&Outcome::Success));
        }
        assert_eq!(record.deposited, Amount::from_cents(5000));
    }

    #[test]
    fn deposits_saturate_at_the_largest_amount() {
        let mut record = PaymentRecord::new("EUR");
        for _ in 0..2 {
            let mut tx = record.transaction(TransactionType::Deposit, Amount::from_cents(1));
            tx.mark_success(Amount::from_scaled(i64::MAX - 1));
            record.absorb(&tx, Some(&Outcome::Success));
        }
        assert_eq!(record.deposited, Amount::from_scaled(i64::MAX));
    }

    #[test]
    fn failures_keep_amounts_but_raise_attention() {
        let mut record = PaymentRecord::new("EUR");
        record.approved = Amount::from_cents(100);

        let mut tx = record.transaction(TransactionType::ReverseApproval, Amount::from_cents(100));
        tx.payment.attention_required = true;
        record.absorb(&tx, None);

        assert_eq!(record.approved, Amount::from_cents(100));
        assert!(record.attention_required);
    }

    #[test]
    fn reverse_approval_clears_approved_amount() {
        let mut record = PaymentRecord::new("EUR");
        record.approved = Amount::from_cents(100);

        let tx = record.transaction(TransactionType::ReverseApproval, Amount::from_cents(100));
        record.absorb(&tx, Some(&Outcome::Success));

        assert_eq!(record.approved, Amount::ZERO);
    }
}
