//! Rate-limited Polymarket CLOB REST client and `Venue` implementation.
//!
//! The traded instrument is a complementary UP/DOWN token pair; a ticker
//! is assembled from the best ask of each side's order book, fetched
//! concurrently. Orders are always BUYs, signed with EIP-712 and submitted
//! with L2 auth headers.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use updown_arb_core::{OrderFill, PolymarketSection, Side, Ticker, Venue, VenueError};

use crate::auth::PolymarketCredentials;
use crate::signing::{ApiOrder, OrderSigner};

/// Polymarket CLOB production base URL.
pub const CLOB_PROD_URL: &str = "https://clob.polymarket.com";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Polymarket venue.
#[derive(Debug, Clone)]
pub struct PolymarketClientConfig {
    /// Base URL for the CLOB API.
    pub base_url: String,

    /// Token ID of the UP outcome.
    pub up_token_id: String,

    /// Token ID of the DOWN outcome.
    pub down_token_id: String,

    /// Address holding the funds (proxy or EOA).
    pub funder_address: String,

    /// Chain ID for order signing (137 = Polygon mainnet).
    pub chain_id: u64,

    /// Requests per minute limit.
    pub requests_per_minute: NonZeroU32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for PolymarketClientConfig {
    fn default() -> Self {
        Self {
            base_url: CLOB_PROD_URL.to_string(),
            up_token_id: String::new(),
            down_token_id: String::new(),
            funder_address: String::new(),
            chain_id: 137,
            requests_per_minute: nonzero!(60u32),
            timeout_secs: 10,
        }
    }
}

impl PolymarketClientConfig {
    /// Builds a client config from the app config section.
    #[must_use]
    pub fn from_section(section: &PolymarketSection) -> Self {
        Self {
            base_url: section.base_url.clone(),
            up_token_id: section.up_token_id.clone(),
            down_token_id: section.down_token_id.clone(),
            funder_address: section.funder_address.clone(),
            chain_id: section.chain_id,
            requests_per_minute: NonZeroU32::new(section.requests_per_minute)
                .unwrap_or(nonzero!(60u32)),
            timeout_secs: section.timeout_secs,
        }
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the token pair.
    #[must_use]
    pub fn with_token_pair(
        mut self,
        up_token_id: impl Into<String>,
        down_token_id: impl Into<String>,
    ) -> Self {
        self.up_token_id = up_token_id.into();
        self.down_token_id = down_token_id.into();
        self
    }
}

// =============================================================================
// API Response Types
// =============================================================================

/// Raw order book response from the CLOB.
#[derive(Debug, Clone, Deserialize)]
struct RawBook {
    #[serde(default)]
    asks: Vec<RawLevel>,
    #[serde(default)]
    #[allow(dead_code)]
    bids: Vec<RawLevel>,
}

/// One price level, string-encoded as the API sends it.
#[derive(Debug, Clone, Deserialize)]
struct RawLevel {
    price: String,
    #[allow(dead_code)]
    size: String,
}

impl RawBook {
    /// Best ask as a decimal price.
    fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().and_then(|l| l.price.parse().ok())
    }
}

/// Payload for POST /order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostOrderRequest {
    order: ApiOrder,
    owner: String,
    order_type: String,
}

/// Raw order acknowledgement from the CLOB.
#[derive(Debug, Clone, Deserialize)]
struct RawOrderAck {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default, rename = "errorMsg")]
    error_msg: Option<String>,
    #[serde(default, rename = "orderID")]
    order_id: Option<String>,
    /// USDC spent, as reported by the matching engine.
    #[serde(default, rename = "makingAmount")]
    making_amount: Option<String>,
    /// Shares received.
    #[serde(default, rename = "takingAmount")]
    taking_amount: Option<String>,
}

impl RawOrderAck {
    /// Average fill price from the reported amounts, when both are present
    /// and parseable.
    fn fill_price(&self) -> Option<Decimal> {
        let making: Decimal = self.making_amount.as_deref()?.parse().ok()?;
        let taking: Decimal = self.taking_amount.as_deref()?.parse().ok()?;
        if taking > Decimal::ZERO {
            Some(making / taking)
        } else {
            None
        }
    }
}

// =============================================================================
// PolymarketVenue
// =============================================================================

/// Live Polymarket venue.
///
/// All requests are rate-limited and L2-authenticated.
pub struct PolymarketVenue {
    config: PolymarketClientConfig,
    http: Client,
    rate_limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
    credentials: PolymarketCredentials,
    signer: OrderSigner,
}

impl std::fmt::Debug for PolymarketVenue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolymarketVenue")
            .field("base_url", &self.config.base_url)
            .field("requests_per_minute", &self.config.requests_per_minute)
            .finish_non_exhaustive()
    }
}

impl PolymarketVenue {
    /// Creates a venue with credentials and the signing key read from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error when credentials are missing or the HTTP client
    /// cannot be built.
    pub fn new(config: PolymarketClientConfig) -> Result<Self, VenueError> {
        let signer = OrderSigner::from_env(&config.funder_address, config.chain_id)?;
        let credentials = PolymarketCredentials::from_env(signer.funder_address())?;
        Self::with_auth(config, credentials, signer)
    }

    /// Creates a venue with explicit credentials (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns `VenueError::Network` when the HTTP client cannot be built.
    pub fn with_auth(
        config: PolymarketClientConfig,
        credentials: PolymarketCredentials,
        signer: OrderSigner,
    ) -> Result<Self, VenueError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VenueError::Network(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_minute(config.requests_per_minute);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            config,
            http,
            rate_limiter,
            credentials,
            signer,
        })
    }

    fn token_for(&self, side: Side) -> &str {
        match side {
            Side::Up => &self.config.up_token_id,
            Side::Down => &self.config.down_token_id,
        }
    }

    /// Waits for the rate limiter and fetches one side's order book.
    async fn get_book(&self, token_id: &str) -> Result<RawBook, VenueError> {
        self.rate_limiter.until_ready().await;

        let path = format!("/book?token_id={token_id}");
        let url = format!("{}{}", self.config.base_url, path);
        let headers = self.credentials.headers("GET", &path, "")?;

        tracing::debug!("GET {}", url);

        let mut request = self.http.get(&url).header("Accept", "application/json");
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request.send().await.map_err(http_error)?;

        handle_response(response).await
    }

    /// Waits for the rate limiter and posts a signed order.
    async fn post_order(&self, payload: &PostOrderRequest) -> Result<RawOrderAck, VenueError> {
        self.rate_limiter.until_ready().await;

        let path = "/order";
        let url = format!("{}{}", self.config.base_url, path);
        let body = serde_json::to_string(payload)?;
        let headers = self.credentials.headers("POST", path, &body)?;

        tracing::debug!("POST {} body_len={}", url, body.len());

        let mut request = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json");
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request.body(body).send().await.map_err(http_error)?;

        handle_response(response).await
    }
}

#[async_trait]
impl Venue for PolymarketVenue {
    async fn get_ticker(&self, market_id: &str) -> Result<Ticker, VenueError> {
        let (up_book, down_book) = tokio::join!(
            self.get_book(&self.config.up_token_id),
            self.get_book(&self.config.down_token_id)
        );
        let (up_book, down_book) = (up_book?, down_book?);

        let price_up = up_book.best_ask().ok_or_else(|| {
            VenueError::MarketData(format!(
                "no asks for UP token {}",
                self.config.up_token_id
            ))
        })?;
        let price_down = down_book.best_ask().ok_or_else(|| {
            VenueError::MarketData(format!(
                "no asks for DOWN token {}",
                self.config.down_token_id
            ))
        })?;

        Ok(Ticker {
            market_id: market_id.to_string(),
            price_up,
            price_down,
            timestamp: Utc::now(),
        })
    }

    async fn place_order(
        &self,
        market_id: &str,
        side: Side,
        size: Decimal,
        price: Decimal,
    ) -> Result<OrderFill, VenueError> {
        let token_id = self.token_for(side).to_string();
        let order = self.signer.build_buy_order(&token_id, size, price)?;
        let payload = PostOrderRequest {
            order,
            owner: self.signer.funder_address(),
            order_type: "GTC".to_string(),
        };

        let ack = self.post_order(&payload).await?;
        if ack.success == Some(false) {
            return Err(VenueError::OrderRejected(
                ack.error_msg.unwrap_or_else(|| "order not accepted".to_string()),
            ));
        }

        // The matching engine's reported amounts are authoritative; fall
        // back to the submitted price when the ack omits them.
        let fill_price = ack.fill_price().unwrap_or(price);

        tracing::info!(
            side = %side,
            requested = %price,
            filled = %fill_price,
            size = %size,
            "order accepted"
        );

        Ok(OrderFill {
            order_id: ack
                .order_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            market_id: market_id.to_string(),
            side,
            price: fill_price,
            size,
            timestamp: Utc::now(),
        })
    }

    fn current_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Maps a transport error into the venue taxonomy.
fn http_error(err: reqwest::Error) -> VenueError {
    if err.is_timeout() {
        VenueError::Timeout(err.to_string())
    } else if err.is_connect() {
        VenueError::Network(format!("connection failed: {err}"))
    } else {
        VenueError::Network(err.to_string())
    }
}

/// Handles an API response, converting HTTP errors appropriately.
async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, VenueError> {
    let status = response.status();

    if status.as_u16() == 429 {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        return Err(VenueError::rate_limit(retry_after));
    }

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(VenueError::api(status.as_u16(), text));
    }

    let body = response.text().await.map_err(http_error)?;
    serde_json::from_str(&body).map_err(VenueError::from)
}
