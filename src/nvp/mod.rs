//! Client for PayPal's classic Name-Value-Pair API.
//!
//! The [`Client`] adds the fixed `METHOD`/`VERSION` fields, lets an
//! [`AuthenticationStrategy`] sign the request, hands it to a [`Transport`]
//! and parses the flat form-encoded answer into a [`Response`]. It makes
//! exactly one attempt per call and never inspects `ACK` beyond logging it.

use tracing::{debug, warn};
use url::form_urlencoded;

use crate::Amount;

pub mod auth;
pub use auth::{
    AuthenticationStrategy, CredentialPlacement, Credentials,
    KeyedCredentialsAuthenticationStrategy, TokenAuthenticationStrategy,
};

mod error;
pub use error::ClientError;

mod response;
pub use response::{Ack, ErrorEntry, Response};

pub mod transport;
pub use transport::{HttpTransport, RawResponse, Transport};

/// NVP API version sent on every call.
pub const API_VERSION: &str = "65.1";

/// Ordered NVP fields. Setting an existing name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters(Vec<(String, String)>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((name, value)),
        }
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, String)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut parameters = Parameters::new();
        parameters.extend(iter);
        parameters
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Parameters {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.set(name, value);
        }
    }
}

impl IntoIterator for Parameters {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// How the fields travel in the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyEncoding {
    #[default]
    FormUrlEncoded,
    Multipart,
}

/// An outgoing NVP call. Always sent as an HTTP POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NvpRequest {
    url: String,
    fields: Parameters,
    headers: Vec<(String, String)>,
    encoding: BodyEncoding,
}

impl NvpRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            fields: Parameters::new(),
            headers: Vec::new(),
            encoding: BodyEncoding::default(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.set(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &Parameters {
        &self.fields
    }

    /// Set a header, replacing any header of the same (case-insensitive) name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some((_, slot)) => *slot = value,
            None => self.headers.push((name, value)),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn encoding(&self) -> BodyEncoding {
        self.encoding
    }

    pub fn set_encoding(&mut self, encoding: BodyEncoding) {
        self.encoding = encoding;
    }

    /// The fields as an `application/x-www-form-urlencoded` body.
    pub fn encode_body(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }
}

/// `PAYMENTREQUEST_0_PAYMENTACTION` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentAction {
    Authorization,
    Sale,
}

impl PaymentAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentAction::Authorization => "Authorization",
            PaymentAction::Sale => "Sale",
        }
    }
}

/// `COMPLETETYPE` of a DoCapture call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteType {
    Complete,
    NotComplete,
}

impl CompleteType {
    pub fn as_str(self) -> &'static str {
        match self {
            CompleteType::Complete => "Complete",
            CompleteType::NotComplete => "NotComplete",
        }
    }
}

/// NVP API client.
#[derive(Debug)]
pub struct Client<T = HttpTransport> {
    authentication: Box<dyn AuthenticationStrategy>,
    transport: T,
    sandbox: bool,
    endpoint: Option<String>,
    body_encoding: BodyEncoding,
}

impl<T: Transport> Client<T> {
    pub fn new(
        authentication: impl AuthenticationStrategy + 'static,
        transport: T,
        sandbox: bool,
    ) -> Self {
        Self {
            authentication: Box::new(authentication),
            transport,
            sandbox,
            endpoint: None,
            body_encoding: BodyEncoding::default(),
        }
    }

    /// Send calls to `endpoint` instead of the PayPal host picked by the
    /// authentication strategy.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Encode every request body as `encoding` (form-urlencoded by default).
    pub fn with_body_encoding(mut self, encoding: BodyEncoding) -> Self {
        self.body_encoding = encoding;
        self
    }

    pub fn is_sandbox(&self) -> bool {
        self.sandbox
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn api_endpoint(&self) -> &str {
        match &self.endpoint {
            Some(endpoint) => endpoint.as_str(),
            None => self.authentication.api_endpoint(self.sandbox),
        }
    }

    /// Send one NVP call.
    ///
    /// `METHOD` and `VERSION` override caller fields of the same name.
    pub async fn send(
        &self,
        method: &str,
        parameters: Parameters,
        credentials_key: Option<&str>,
    ) -> Result<Response, ClientError> {
        let mut request = NvpRequest::new(self.api_endpoint());
        request.set_encoding(self.body_encoding);
        request.fields.extend(parameters);
        request.set("METHOD", method);
        request.set("VERSION", API_VERSION);
        self.authentication.authenticate(&mut request, credentials_key)?;

        let raw = self.transport.send(request).await?;
        if raw.status != 200 {
            warn!(method, status = raw.status, "NVP request was not successful");
            return Err(ClientError::Status {
                status: raw.status,
                body: raw.body,
            });
        }

        let response = Response::parse(&raw.body)?;
        let ack = response.get("ACK").unwrap_or_default();
        let correlation_id = response.correlation_id().unwrap_or_default();
        if response.is_success() {
            debug!(method, ack, correlation_id, "NVP request completed");
        } else {
            warn!(
                method,
                ack,
                correlation_id,
                error_code = response.first_error_code().unwrap_or_default(),
                "NVP request rejected"
            );
        }

        Ok(response)
    }

    /// Redirect URL where the buyer approves the checkout identified by `token`.
    pub fn authenticate_express_checkout_token_url(
        &self,
        token: &str,
        params: &[(&str, &str)],
    ) -> String {
        let host = if self.sandbox {
            "www.sandbox.paypal.com"
        } else {
            "www.paypal.com"
        };
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("token", token)
            .extend_pairs(params)
            .finish();

        format!("https://{host}/cgi-bin/webscr?cmd=_express-checkout&{query}")
    }

    pub async fn request_address_verify(
        &self,
        email: &str,
        street: &str,
        postal_code: &str,
        credentials_key: Option<&str>,
    ) -> Result<Response, ClientError> {
        let parameters = Parameters::new()
            .with("EMAIL", email)
            .with("STREET", street)
            .with("ZIP", postal_code);
        self.send("AddressVerify", parameters, credentials_key).await
    }

    pub async fn request_bill_outstanding_amount(
        &self,
        profile_id: &str,
        optional: Parameters,
        credentials_key: Option<&str>,
    ) -> Result<Response, ClientError> {
        let parameters = optional.with("PROFILEID", profile_id);
        self.send("BillOutstandingAmount", parameters, credentials_key)
            .await
    }

    pub async fn request_create_recurring_payments_profile(
        &self,
        token: &str,
        credentials_key: Option<&str>,
    ) -> Result<Response, ClientError> {
        let parameters = Parameters::new().with("TOKEN", token);
        self.send("CreateRecurringPaymentsProfile", parameters, credentials_key)
            .await
    }

    pub async fn request_do_authorization(
        &self,
        transaction_id: &str,
        amount: Amount,
        optional: Parameters,
        credentials_key: Option<&str>,
    ) -> Result<Response, ClientError> {
        let parameters = optional
            .with("TRANSACTIONID", transaction_id)
            .with("AMT", amount.to_string());
        self.send("DoAuthorization", parameters, credentials_key)
            .await
    }

    pub async fn request_do_reauthorization(
        &self,
        authorization_id: &str,
        amount: Amount,
        optional: Parameters,
        credentials_key: Option<&str>,
    ) -> Result<Response, ClientError> {
        let parameters = optional
            .with("AUTHORIZATIONID", authorization_id)
            .with("AMT", amount.to_string());
        self.send("DoReauthorization", parameters, credentials_key)
            .await
    }

    pub async fn request_do_capture(
        &self,
        authorization_id: &str,
        amount: Amount,
        complete_type: CompleteType,
        optional: Parameters,
        credentials_key: Option<&str>,
    ) -> Result<Response, ClientError> {
        let parameters = optional
            .with("AUTHORIZATIONID", authorization_id)
            .with("AMT", amount.to_string())
            .with("COMPLETETYPE", complete_type.as_str());
        self.send("DoCapture", parameters, credentials_key).await
    }

    pub async fn request_do_direct_payment(
        &self,
        ip_address: &str,
        optional: Parameters,
        credentials_key: Option<&str>,
    ) -> Result<Response, ClientError> {
        let parameters = optional.with("IPADDRESS", ip_address);
        self.send("DoDirectPayment", parameters, credentials_key)
            .await
    }

    pub async fn request_do_express_checkout_payment(
        &self,
        token: &str,
        amount: Amount,
        payment_action: PaymentAction,
        payer_id: &str,
        optional: Parameters,
        credentials_key: Option<&str>,
    ) -> Result<Response, ClientError> {
        let parameters = optional
            .with("TOKEN", token)
            .with("PAYMENTREQUEST_0_AMT", amount.to_string())
            .with("PAYMENTREQUEST_0_PAYMENTACTION", payment_action.as_str())
            .with("PAYERID", payer_id);
        self.send("DoExpressCheckoutPayment", parameters, credentials_key)
            .await
    }

    pub async fn request_do_void(
        &self,
        authorization_id: &str,
        optional: Parameters,
        credentials_key: Option<&str>,
    ) -> Result<Response, ClientError> {
        let parameters = optional.with("AUTHORIZATIONID", authorization_id);
        self.send("DoVoid", parameters, credentials_key).await
    }

    /// Start an ExpressCheckout session; a successful answer carries `TOKEN`.
    pub async fn request_set_express_checkout(
        &self,
        amount: Amount,
        return_url: &str,
        cancel_url: &str,
        optional: Parameters,
        credentials_key: Option<&str>,
    ) -> Result<Response, ClientError> {
        let parameters = optional
            .with("PAYMENTREQUEST_0_AMT", amount.to_string())
            .with("RETURNURL", return_url)
            .with("CANCELURL", cancel_url);
        self.send("SetExpressCheckout", parameters, credentials_key)
            .await
    }

    pub async fn request_get_express_checkout_details(
        &self,
        token: &str,
        credentials_key: Option<&str>,
    ) -> Result<Response, ClientError> {
        let parameters = Parameters::new().with("TOKEN", token);
        self.send("GetExpressCheckoutDetails", parameters, credentials_key)
            .await
    }

    pub async fn request_get_transaction_details(
        &self,
        transaction_id: &str,
        credentials_key: Option<&str>,
    ) -> Result<Response, ClientError> {
        let parameters = Parameters::new().with("TRANSACTIONID", transaction_id);
        self.send("GetTransactionDetails", parameters, credentials_key)
            .await
    }

    pub async fn request_refund_transaction(
        &self,
        transaction_id: &str,
        optional: Parameters,
        credentials_key: Option<&str>,
    ) -> Result<Response, ClientError> {
        let parameters = optional.with("TRANSACTIONID", transaction_id);
        self.send("RefundTransaction", parameters, credentials_key)
            .await
    }
}
