//! Credential injection and endpoint selection.

use std::collections::HashMap;
use std::fmt;

use url::form_urlencoded;

use super::{ClientError, NvpRequest};

pub const LIVE_ENDPOINT: &str = "https://api-3t.paypal.com/nvp";
pub const SANDBOX_ENDPOINT: &str = "https://api-3t.sandbox.paypal.com/nvp";

/// Header carrying the credentials when they are not sent as body fields.
pub const AUTHORIZATION_HEADER: &str = "X-PP-AUTHORIZATION";

/// Signs outgoing NVP requests.
///
/// Implementations set fields and headers rather than appending them, so
/// authenticating the same request twice leaves it unchanged.
pub trait AuthenticationStrategy: Send + Sync + fmt::Debug {
    fn authenticate(
        &self,
        request: &mut NvpRequest,
        credentials_key: Option<&str>,
    ) -> Result<(), ClientError>;

    fn api_endpoint(&self, sandbox: bool) -> &str {
        if sandbox {
            SANDBOX_ENDPOINT
        } else {
            LIVE_ENDPOINT
        }
    }
}

/// Where the credentials go on the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialPlacement {
    /// `USER`, `PWD` and `SIGNATURE` body fields.
    #[default]
    Body,
    /// A single url-encoded `X-PP-AUTHORIZATION` header.
    Header,
}

/// API username, password and signature of one merchant account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
    signature: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            signature: signature.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    fn apply(&self, request: &mut NvpRequest, placement: CredentialPlacement) {
        match placement {
            CredentialPlacement::Body => {
                request.set("PWD", &self.password);
                request.set("USER", &self.username);
                request.set("SIGNATURE", &self.signature);
            }
            CredentialPlacement::Header => {
                let value = form_urlencoded::Serializer::new(String::new())
                    .append_pair("PWD", &self.password)
                    .append_pair("USER", &self.username)
                    .append_pair("SIGNATURE", &self.signature)
                    .finish();
                request.set_header(AUTHORIZATION_HEADER, value);
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("signature", &"<redacted>")
            .finish()
    }
}

/// One fixed set of credentials for every call.
#[derive(Debug, Clone)]
pub struct TokenAuthenticationStrategy {
    credentials: Credentials,
    placement: CredentialPlacement,
}

impl TokenAuthenticationStrategy {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self::from_credentials(Credentials::new(username, password, signature))
    }

    pub fn from_credentials(credentials: Credentials) -> Self {
        Self {
            credentials,
            placement: CredentialPlacement::Body,
        }
    }

    pub fn with_placement(mut self, placement: CredentialPlacement) -> Self {
        self.placement = placement;
        self
    }
}

impl AuthenticationStrategy for TokenAuthenticationStrategy {
    fn authenticate(
        &self,
        request: &mut NvpRequest,
        _credentials_key: Option<&str>,
    ) -> Result<(), ClientError> {
        self.credentials.apply(request, self.placement);
        Ok(())
    }
}

/// Per-merchant credentials selected by an opaque key on each call.
#[derive(Debug, Clone, Default)]
pub struct KeyedCredentialsAuthenticationStrategy {
    credentials: HashMap<String, Credentials>,
    default: Option<Credentials>,
    placement: CredentialPlacement,
}

impl KeyedCredentialsAuthenticationStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, key: impl Into<String>, credentials: Credentials) -> Self {
        self.credentials.insert(key.into(), credentials);
        self
    }

    /// Credentials used when a call carries no key.
    pub fn with_default(mut self, credentials: Credentials) -> Self {
        self.default = Some(credentials);
        self
    }

    pub fn with_placement(mut self, placement: CredentialPlacement) -> Self {
        self.placement = placement;
        self
    }

    fn resolve(&self, credentials_key: Option<&str>) -> Result<&Credentials, ClientError> {
        match credentials_key {
            Some(key) => self
                .credentials
                .get(key)
                .ok_or_else(|| ClientError::UnknownCredentials(key.to_string())),
            None => self.default.as_ref().ok_or(ClientError::MissingCredentials),
        }
    }
}

impl AuthenticationStrategy for KeyedCredentialsAuthenticationStrategy {
    fn authenticate(
        &self,
        request: &mut NvpRequest,
        credentials_key: Option<&str>,
    ) -> Result<(), ClientError> {
        self.resolve(credentials_key)?.apply(request, self.placement);
        Ok(())
    }
}
