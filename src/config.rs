//! Command line and environment configuration of the batch runner.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::nvp::{
    BodyEncoding, Client, ClientError, CredentialPlacement, HttpTransport,
    TokenAuthenticationStrategy,
};
use crate::plugin::ExpressCheckoutPlugin;

/// Values come from flags first, then from the environment (`.env` included).
#[derive(Parser, Clone)]
#[command(name = "paypal-nvp")]
#[command(about = "Run PayPal Express Checkout operations from a csv file")]
pub struct Config {
    /// CSV file of operations
    pub input: PathBuf,

    /// NVP API username
    #[arg(long, env = "PAYPAL_USERNAME")]
    pub username: String,

    /// NVP API password
    #[arg(long, env = "PAYPAL_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// NVP API signature
    #[arg(long, env = "PAYPAL_SIGNATURE", hide_env_values = true)]
    pub signature: String,

    /// Use the sandbox API and checkout hosts
    #[arg(long, env = "PAYPAL_SANDBOX")]
    pub sandbox: bool,

    /// Send credentials in the X-PP-AUTHORIZATION header instead of the body
    #[arg(long, env = "PAYPAL_HEADER_AUTH")]
    pub header_auth: bool,

    /// Where PayPal sends the buyer after approval
    #[arg(long, env = "PAYPAL_RETURN_URL")]
    pub return_url: Option<String>,

    /// Where PayPal sends the buyer after cancelling
    #[arg(long, env = "PAYPAL_CANCEL_URL")]
    pub cancel_url: Option<String>,

    /// Instant payment notification URL
    #[arg(long, env = "PAYPAL_NOTIFY_URL")]
    pub notify_url: Option<String>,

    /// `useraction` appended to checkout redirect URLs, e.g. `commit`
    #[arg(long, env = "PAYPAL_USERACTION")]
    pub useraction: Option<String>,

    /// Send NVP bodies as multipart/form-data instead of form-urlencoded
    #[arg(long, env = "PAYPAL_MULTIPART")]
    pub multipart: bool,

    /// Override the NVP endpoint
    #[arg(long, env = "PAYPAL_NVP_ENDPOINT")]
    pub endpoint: Option<String>,

    /// HTTP timeout of one NVP call, in seconds
    #[arg(long, env = "PAYPAL_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}

impl Config {
    pub fn authentication(&self) -> TokenAuthenticationStrategy {
        let placement = if self.header_auth {
            CredentialPlacement::Header
        } else {
            CredentialPlacement::Body
        };
        TokenAuthenticationStrategy::new(&self.username, &self.password, &self.signature)
            .with_placement(placement)
    }

    pub fn client(&self) -> Result<Client, ClientError> {
        let transport = HttpTransport::new(Some(Duration::from_secs(self.timeout_secs)))?;
        let encoding = if self.multipart {
            BodyEncoding::Multipart
        } else {
            BodyEncoding::FormUrlEncoded
        };
        let client = Client::new(self.authentication(), transport, self.sandbox)
            .with_body_encoding(encoding);
        Ok(match &self.endpoint {
            Some(endpoint) => client.with_endpoint(endpoint),
            None => client,
        })
    }

    pub fn plugin(&self) -> Result<ExpressCheckoutPlugin, ClientError> {
        let mut plugin = ExpressCheckoutPlugin::new(self.client()?);
        if let Some(url) = &self.return_url {
            plugin = plugin.with_return_url(url);
        }
        if let Some(url) = &self.cancel_url {
            plugin = plugin.with_cancel_url(url);
        }
        if let Some(url) = &self.notify_url {
            plugin = plugin.with_notify_url(url);
        }
        if let Some(action) = &self.useraction {
            plugin = plugin.with_user_action(action);
        }
        Ok(plugin)
    }
}
