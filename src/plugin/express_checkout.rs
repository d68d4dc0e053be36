use async_trait::async_trait;
use tracing::{info, warn};

use super::{Action, Failure, Outcome, Plugin, PluginError};
use crate::Amount;
use crate::model::{ExtendedData, FinancialTransaction, RESPONSE_CODE_FAILED, RESPONSE_CODE_PENDING};
use crate::nvp::{Client, CompleteType, HttpTransport, Parameters, PaymentAction, Response, Transport};

/// Payment system handled by [`ExpressCheckoutPlugin`].
pub const PAYMENT_SYSTEM_NAME: &str = "paypal_express_checkout";

/// DoReauthorization refused outside the honor window; the original
/// authorization is reused as is.
const HONOR_WINDOW_ERROR_CODE: &str = "10617";

/// Pending reason of a payment that is authorized but not captured yet.
const PENDING_REASON_AUTHORIZATION: &str = "authorization";

/// Picks the credentials key used for every NVP call of one transaction.
pub trait CredentialsKeyResolver: Send + Sync {
    fn credentials_key(&self, transaction: &FinancialTransaction) -> Option<String>;
}

impl<F> CredentialsKeyResolver for F
where
    F: Fn(&FinancialTransaction) -> Option<String> + Send + Sync,
{
    fn credentials_key(&self, transaction: &FinancialTransaction) -> Option<String> {
        self(transaction)
    }
}

/// Drives a PayPal Express Checkout payment through its NVP calls.
///
/// Approval is re-entrant across the buyer's visit to PayPal: the first call
/// issues a token and answers [`Outcome::ActionRequired`]; once the buyer is
/// back, the same operation is called again with the same transaction and
/// completes the payment.
pub struct ExpressCheckoutPlugin<T = HttpTransport> {
    client: Client<T>,
    return_url: Option<String>,
    cancel_url: Option<String>,
    notify_url: Option<String>,
    user_action: Option<String>,
    credentials_key_resolver: Option<Box<dyn CredentialsKeyResolver>>,
}

/// How PayPal classified a payment, reduced to what the plugin acts on.
enum PaymentStatus<'a> {
    Accepted,
    Pending(&'a str),
    Rejected(&'a str),
}

impl<'a> PaymentStatus<'a> {
    fn of(response: &'a Response, status_field: &str, reason_field: &str) -> Self {
        let reason = response.get(reason_field).unwrap_or_default();
        match response.get(status_field).unwrap_or_default() {
            "Completed" => PaymentStatus::Accepted,
            "Pending" if reason == PENDING_REASON_AUTHORIZATION => PaymentStatus::Accepted,
            "Pending" => PaymentStatus::Pending(reason),
            other => PaymentStatus::Rejected(other),
        }
    }
}

/// Public API
impl<T: Transport> ExpressCheckoutPlugin<T> {
    pub fn new(client: Client<T>) -> Self {
        Self {
            client,
            return_url: None,
            cancel_url: None,
            notify_url: None,
            user_action: None,
            credentials_key_resolver: None,
        }
    }

    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = Some(url.into());
        self
    }

    pub fn with_cancel_url(mut self, url: impl Into<String>) -> Self {
        self.cancel_url = Some(url.into());
        self
    }

    pub fn with_notify_url(mut self, url: impl Into<String>) -> Self {
        self.notify_url = Some(url.into());
        self
    }

    /// Default `useraction` appended to redirect URLs, e.g. `commit`.
    pub fn with_user_action(mut self, action: impl Into<String>) -> Self {
        self.user_action = Some(action.into());
        self
    }

    pub fn with_credentials_key_resolver(
        mut self,
        resolver: impl CredentialsKeyResolver + 'static,
    ) -> Self {
        self.credentials_key_resolver = Some(Box::new(resolver));
        self
    }

    pub fn client(&self) -> &Client<T> {
        &self.client
    }
}

/// Private API
impl<T: Transport> ExpressCheckoutPlugin<T> {
    fn credentials_key(&self, transaction: &FinancialTransaction) -> Option<String> {
        self.credentials_key_resolver
            .as_ref()
            .and_then(|resolver| resolver.credentials_key(transaction))
    }

    fn return_url(&self, data: &ExtendedData) -> Result<String, PluginError> {
        non_empty(data.return_url.as_ref().or(self.return_url.as_ref()))
            .ok_or(PluginError::Configuration("return url"))
    }

    fn cancel_url(&self, data: &ExtendedData) -> Result<String, PluginError> {
        non_empty(data.cancel_url.as_ref().or(self.cancel_url.as_ref()))
            .ok_or(PluginError::Configuration("cancel url"))
    }

    /// Currency and notify URL of `PAYMENTREQUEST_0`.
    fn payment_request_fields(&self, transaction: &FinancialTransaction) -> Parameters {
        let mut fields =
            Parameters::new().with("PAYMENTREQUEST_0_CURRENCYCODE", &transaction.currency);
        let notify_url = transaction
            .extended_data
            .notify_url
            .as_ref()
            .or(self.notify_url.as_ref());
        if let Some(url) = non_empty(notify_url) {
            fields.set("PAYMENTREQUEST_0_NOTIFYURL", url);
        }
        fields
    }

    fn visit_checkout(&self, transaction: &FinancialTransaction, token: &str) -> Outcome {
        let user_action = transaction
            .extended_data
            .useraction
            .as_deref()
            .or(self.user_action.as_deref());
        let params: Vec<(&str, &str)> = user_action
            .map(|action| ("useraction", action))
            .into_iter()
            .collect();

        Outcome::ActionRequired(Action::VisitUrl(
            self.client
                .authenticate_express_checkout_token_url(token, &params),
        ))
    }

    /// Approve or sell, depending on `payment_action`:
    /// - No token yet: SetExpressCheckout, store the token, send the buyer to PayPal
    /// - Token stored: check the checkout status, send the buyer back to PayPal
    ///   until they approved
    /// - Approved: DoExpressCheckoutPayment and classify the payment status
    async fn create_checkout_billing_agreement(
        &self,
        transaction: &mut FinancialTransaction,
        payment_action: PaymentAction,
    ) -> Result<Outcome, PluginError> {
        let key = self.credentials_key(transaction);
        let key = key.as_deref();

        let Some(token) = transaction.extended_data.express_checkout_token.clone() else {
            return self.request_token(transaction, payment_action, key).await;
        };

        let details = self
            .client
            .request_get_express_checkout_details(&token, key)
            .await?;
        if let Err(failed) = ensure_success(&details, transaction) {
            return Ok(failed);
        }

        match details.get("CHECKOUTSTATUS") {
            Some("PaymentActionFailed") => {
                transaction.mark_failed(RESPONSE_CODE_FAILED, Some("PaymentActionFailed".to_string()));
                return Ok(Outcome::Failed(Failure::recorded(
                    "PaymentAction failed.",
                    transaction,
                )));
            }
            Some("PaymentCompleted" | "PaymentActionNotInitiated") => {}
            _ => return Ok(self.visit_checkout(transaction, &token)),
        }

        // no payer yet means the buyer has not approved at PayPal
        let Some(payer_id) = details.get("PAYERID") else {
            return Ok(self.visit_checkout(transaction, &token));
        };
        transaction.extended_data.paypal_payer_id = Some(payer_id.to_string());

        let response = self
            .client
            .request_do_express_checkout_payment(
                &token,
                transaction.requested_amount,
                payment_action,
                payer_id,
                self.payment_request_fields(transaction),
                key,
            )
            .await?;
        if let Err(failed) = ensure_success(&response, transaction) {
            return Ok(failed);
        }

        let transaction_id = response
            .get("PAYMENTINFO_0_TRANSACTIONID")
            .map(str::to_string);
        transaction.reference_number = transaction_id.clone();

        match PaymentStatus::of(
            &response,
            "PAYMENTINFO_0_PAYMENTSTATUS",
            "PAYMENTINFO_0_PENDINGREASON",
        ) {
            PaymentStatus::Accepted => {}
            PaymentStatus::Pending(reason) => return Ok(pending(transaction, reason)),
            PaymentStatus::Rejected(status) => return Ok(rejected(transaction, status)),
        }

        transaction.extended_data.authorization_id = transaction_id;
        let processed = amount_field(&response, "PAYMENTINFO_0_AMT")
            .unwrap_or(transaction.requested_amount);
        transaction.mark_success(processed);

        Ok(Outcome::Success)
    }

    async fn request_token(
        &self,
        transaction: &mut FinancialTransaction,
        payment_action: PaymentAction,
        key: Option<&str>,
    ) -> Result<Outcome, PluginError> {
        let return_url = self.return_url(&transaction.extended_data)?;
        let cancel_url = self.cancel_url(&transaction.extended_data)?;

        let mut optional: Parameters = transaction
            .extended_data
            .checkout_params
            .iter()
            .cloned()
            .collect();
        optional.set("PAYMENTREQUEST_0_PAYMENTACTION", payment_action.as_str());
        optional.extend(self.payment_request_fields(transaction));

        let response = self
            .client
            .request_set_express_checkout(
                transaction.requested_amount,
                &return_url,
                &cancel_url,
                optional,
                key,
            )
            .await?;
        if let Err(failed) = ensure_success(&response, transaction) {
            return Ok(failed);
        }

        let token = response
            .get("TOKEN")
            .ok_or(PluginError::MissingResponseField("TOKEN"))?;
        transaction.extended_data.express_checkout_token = Some(token.to_string());

        Ok(self.visit_checkout(transaction, token))
    }

    async fn capture(&self, transaction: &mut FinancialTransaction) -> Result<Outcome, PluginError> {
        let key = self.credentials_key(transaction);
        let key = key.as_deref();
        let authorization_id = authorization_id(transaction)?;

        let complete_type = if transaction
            .requested_amount
            .eq_cents(transaction.payment.approved_amount)
        {
            CompleteType::Complete
        } else {
            CompleteType::NotComplete
        };

        let capture = self
            .client
            .request_do_capture(
                &authorization_id,
                transaction.requested_amount,
                complete_type,
                Parameters::new().with("CURRENCYCODE", &transaction.currency),
                key,
            )
            .await?;
        if let Err(failed) = ensure_success(&capture, transaction) {
            return Ok(failed);
        }

        let details = self
            .client
            .request_get_transaction_details(&authorization_id, key)
            .await?;
        if let Err(failed) = ensure_success(&details, transaction) {
            return Ok(failed);
        }

        transaction.reference_number = Some(authorization_id);
        match PaymentStatus::of(&details, "PAYMENTSTATUS", "PENDINGREASON") {
            PaymentStatus::Accepted => {}
            PaymentStatus::Pending(reason) => return Ok(pending(transaction, reason)),
            PaymentStatus::Rejected(status) => return Ok(rejected(transaction, status)),
        }

        let processed = amount_field(&capture, "AMT").unwrap_or(transaction.requested_amount);
        transaction.mark_success(processed);

        Ok(Outcome::Success)
    }

    async fn reauthorize(
        &self,
        transaction: &mut FinancialTransaction,
    ) -> Result<Outcome, PluginError> {
        let key = self.credentials_key(transaction);
        let authorization_id = authorization_id(transaction)?;

        let response = self
            .client
            .request_do_reauthorization(
                &authorization_id,
                transaction.requested_amount,
                Parameters::new().with("CURRENCYCODE", &transaction.currency),
                key.as_deref(),
            )
            .await?;

        let renewed = if response.is_success() {
            response
                .get("AUTHORIZATIONID")
                .map(str::to_string)
                .unwrap_or(authorization_id)
        } else if response
            .errors()
            .iter()
            .any(|error| error.code == HONOR_WINDOW_ERROR_CODE)
        {
            info!(
                authorization_id = %authorization_id,
                "reauthorization refused, keeping authorization"
            );
            authorization_id
        } else {
            return Ok(reject(&response, transaction));
        };

        transaction.extended_data.authorization_id = Some(renewed.clone());
        transaction.reference_number = Some(renewed);
        transaction.mark_success(transaction.requested_amount);

        Ok(Outcome::Success)
    }

    async fn refund(&self, transaction: &mut FinancialTransaction) -> Result<Outcome, PluginError> {
        let key = self.credentials_key(transaction);
        let authorization_id = authorization_id(transaction)?;

        let mut optional = Parameters::new();
        if !transaction
            .requested_amount
            .eq_cents(transaction.payment.deposited_amount)
        {
            optional.set("REFUNDTYPE", "Partial");
            optional.set("AMT", transaction.requested_amount.to_string());
            optional.set("CURRENCYCODE", &transaction.currency);
        }

        let response = self
            .client
            .request_refund_transaction(&authorization_id, optional, key.as_deref())
            .await?;
        if let Err(failed) = ensure_success(&response, transaction) {
            return Ok(failed);
        }

        transaction.reference_number = response.get("REFUNDTRANSACTIONID").map(str::to_string);
        let processed =
            amount_field(&response, "NETREFUNDAMT").unwrap_or(transaction.requested_amount);
        transaction.mark_success(processed);

        Ok(Outcome::Success)
    }

    async fn void(&self, transaction: &mut FinancialTransaction) -> Result<Outcome, PluginError> {
        let key = self.credentials_key(transaction);
        let authorization_id = authorization_id(transaction)?;

        let response = self
            .client
            .request_do_void(&authorization_id, Parameters::new(), key.as_deref())
            .await?;
        if let Err(failed) = ensure_success(&response, transaction) {
            return Ok(failed);
        }

        transaction.reference_number = Some(authorization_id);
        transaction.mark_success(transaction.requested_amount);

        Ok(Outcome::Success)
    }
}

#[async_trait]
impl<T: Transport> Plugin for ExpressCheckoutPlugin<T> {
    async fn approve(&self, transaction: &mut FinancialTransaction) -> Result<Outcome, PluginError> {
        let result = self
            .create_checkout_billing_agreement(transaction, PaymentAction::Authorization)
            .await;
        log_result(transaction, &result);
        result
    }

    async fn approve_and_deposit(
        &self,
        transaction: &mut FinancialTransaction,
    ) -> Result<Outcome, PluginError> {
        let result = self
            .create_checkout_billing_agreement(transaction, PaymentAction::Sale)
            .await;
        log_result(transaction, &result);
        result
    }

    async fn deposit(&self, transaction: &mut FinancialTransaction) -> Result<Outcome, PluginError> {
        let result = self.capture(transaction).await;
        log_result(transaction, &result);
        result
    }

    async fn credit(&self, transaction: &mut FinancialTransaction) -> Result<Outcome, PluginError> {
        let result = self.refund(transaction).await;
        log_result(transaction, &result);
        result
    }

    async fn reverse_approval(
        &self,
        transaction: &mut FinancialTransaction,
    ) -> Result<Outcome, PluginError> {
        let result = self.void(transaction).await;
        log_result(transaction, &result);
        result
    }

    async fn re_approve(&self, transaction: &mut FinancialTransaction) -> Result<Outcome, PluginError> {
        let result = self.reauthorize(transaction).await;
        log_result(transaction, &result);
        result
    }

    fn processes(&self, payment_system_name: &str) -> bool {
        payment_system_name == PAYMENT_SYSTEM_NAME
    }

    fn is_independent_credit_supported(&self) -> bool {
        false
    }
}

/// Turn a non-success `ACK` into a failed outcome, recording `ACK` and the
/// first error code on the transaction.
fn ensure_success(response: &Response, transaction: &mut FinancialTransaction) -> Result<(), Outcome> {
    if response.is_success() {
        Ok(())
    } else {
        Err(reject(response, transaction))
    }
}

fn reject(response: &Response, transaction: &mut FinancialTransaction) -> Outcome {
    transaction.mark_failed(
        response.get("ACK").unwrap_or_default(),
        response.first_error_code().map(str::to_string),
    );
    Outcome::Failed(Failure::recorded(
        format!("PayPal-Response was not successful: {response}"),
        transaction,
    ))
}

fn pending(transaction: &mut FinancialTransaction, reason: &str) -> Outcome {
    transaction.mark_failed(RESPONSE_CODE_PENDING, Some(reason.to_string()));
    Outcome::Pending {
        reason: reason.to_string(),
    }
}

/// A terminal payment status; the owning payment needs a human look.
fn rejected(transaction: &mut FinancialTransaction, status: &str) -> Outcome {
    transaction.mark_failed(RESPONSE_CODE_FAILED, Some(status.to_string()));
    transaction.payment.attention_required = true;
    Outcome::Failed(Failure::recorded(
        format!("PaymentStatus is not completed: {status}"),
        transaction,
    ))
}

fn authorization_id(transaction: &FinancialTransaction) -> Result<String, PluginError> {
    transaction
        .extended_data
        .authorization_id
        .clone()
        .ok_or(PluginError::MissingData("authorization_id"))
}

fn amount_field(response: &Response, field: &str) -> Option<Amount> {
    response.get(field).and_then(|value| value.parse().ok())
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|value| !value.is_empty()).cloned()
}

/// Small helper to log plugin results
fn log_result(transaction: &FinancialTransaction, result: &Result<Outcome, PluginError>) {
    let kind = transaction.kind;
    let amount = transaction.requested_amount;
    match result {
        Ok(Outcome::Success) => info!(
            kind = %kind,
            amount = %amount,
            reference = transaction.reference_number.as_deref().unwrap_or_default(),
            "transaction succeeded"
        ),
        Ok(Outcome::ActionRequired(action)) => info!(
            kind = %kind,
            amount = %amount,
            url = action.url(),
            "payer action required"
        ),
        Ok(Outcome::Pending { reason }) => info!(
            kind = %kind,
            amount = %amount,
            reason = %reason,
            "payment pending"
        ),
        Ok(Outcome::Failed(failure)) => warn!(
            kind = %kind,
            amount = %amount,
            response_code = %failure.response_code,
            reason_code = failure.reason_code.as_deref().unwrap_or_default(),
            "transaction failed"
        ),
        Err(e) => warn!(
            kind = %kind,
            amount = %amount,
            reason = %e,
            "transaction aborted"
        ),
    }
}
