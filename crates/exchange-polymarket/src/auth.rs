//! L2 request authentication for the Polymarket CLOB.
//!
//! Every authenticated request carries HMAC-SHA256 headers computed over
//! `{timestamp}{method}{path}{body}` with the API secret. The secret may
//! be URL-safe base64; both directions are normalized.
//!
//! Credentials are loaded from environment variables and never logged.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use updown_arb_core::VenueError;

type HmacSha256 = Hmac<Sha256>;

/// Environment variable holding the API key UUID.
pub const API_KEY_ENV: &str = "POLYMARKET_API_KEY";
/// Environment variable holding the base64 API secret.
pub const API_SECRET_ENV: &str = "POLYMARKET_API_SECRET";
/// Environment variable holding the API passphrase.
pub const PASSPHRASE_ENV: &str = "POLYMARKET_PASSPHRASE";

/// API credentials for L2-authenticated CLOB requests.
pub struct PolymarketCredentials {
    /// API key UUID.
    api_key: String,

    /// Base64-encoded HMAC secret.
    api_secret: SecretString,

    /// Passphrase bound to the API key.
    passphrase: SecretString,

    /// Wallet address the key was derived for (0x-prefixed).
    wallet_address: String,
}

impl std::fmt::Debug for PolymarketCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolymarketCredentials")
            .field("wallet_address", &self.wallet_address)
            .finish_non_exhaustive()
    }
}

impl PolymarketCredentials {
    /// Creates credentials from explicit values.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        passphrase: impl Into<String>,
        wallet_address: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: SecretString::from(api_secret.into()),
            passphrase: SecretString::from(passphrase.into()),
            wallet_address: wallet_address.into(),
        }
    }

    /// Loads credentials from the environment.
    ///
    /// # Errors
    ///
    /// Returns `VenueError::Configuration` when a variable is missing.
    pub fn from_env(wallet_address: impl Into<String>) -> Result<Self, VenueError> {
        let read = |name: &str| {
            std::env::var(name)
                .map_err(|_| VenueError::Configuration(format!("missing env var {name}")))
        };

        Ok(Self {
            api_key: read(API_KEY_ENV)?,
            api_secret: SecretString::from(read(API_SECRET_ENV)?),
            passphrase: SecretString::from(read(PASSPHRASE_ENV)?),
            wallet_address: wallet_address.into(),
        })
    }

    /// Computes the HMAC-SHA256 signature for a request at `timestamp`
    /// (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns `VenueError::Authentication` when the secret is not valid
    /// base64.
    pub fn sign(
        &self,
        timestamp: &str,
        method: &str,
        path: &str,
        body: &str,
    ) -> Result<String, VenueError> {
        let message = format!("{timestamp}{method}{path}{body}");

        // The secret may arrive URL-safe; normalize before decoding.
        let normalized = self
            .api_secret
            .expose_secret()
            .replace('-', "+")
            .replace('_', "/");
        let secret_bytes = BASE64
            .decode(&normalized)
            .map_err(|e| VenueError::Authentication(format!("invalid API secret: {e}")))?;

        let mut mac = HmacSha256::new_from_slice(&secret_bytes)
            .map_err(|e| VenueError::Authentication(format!("HMAC init: {e}")))?;
        mac.update(message.as_bytes());
        let digest = mac.finalize().into_bytes();

        // The API expects URL-safe base64.
        Ok(BASE64.encode(digest).replace('+', "-").replace('/', "_"))
    }

    /// Builds the full L2 header set for one request.
    ///
    /// # Errors
    ///
    /// Returns `VenueError::Authentication` when signing fails.
    pub fn headers(
        &self,
        method: &str,
        path: &str,
        body: &str,
    ) -> Result<[(&'static str, String); 5], VenueError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&timestamp, method, path, body)?;

        Ok([
            ("POLY_ADDRESS", self.wallet_address.clone()),
            ("POLY_SIGNATURE", signature),
            ("POLY_TIMESTAMP", timestamp),
            ("POLY_API_KEY", self.api_key.clone()),
            ("POLY_PASSPHRASE", self.passphrase.expose_secret().to_string()),
        ])
    }

    /// Returns the wallet address the credentials belong to.
    #[must_use]
    pub fn wallet_address(&self) -> &str {
        &self.wallet_address
    }
}
