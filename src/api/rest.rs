//! Reference REST implementation of the session capability.
//!
//! Covers the private read endpoints the engine consumes; order submission
//! stays behind `OrderExecutor`, and rate limiting/retry policy belongs to
//! the caller wrapping this provider.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::Value;
use sha2::{Digest, Sha256, Sha512};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::api::session::{ExchangeSession, SessionProvider};
use crate::models::{Account, ExchangeId};

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

pub const BINANCE_SPOT_URL: &str = "https://api.binance.com";
pub const BINANCE_FUTURES_URL: &str = "https://fapi.binance.com";
pub const KRAKEN_URL: &str = "https://api.kraken.com";
pub const OKX_URL: &str = "https://www.okx.com";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Session provider backed by each venue's REST API.
pub struct RestSessionProvider {
    http: Client,
}

impl RestSessionProvider {
    /// Create a provider with default HTTP settings.
    pub fn new() -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl SessionProvider for RestSessionProvider {
    async fn refresh_session(&self, account: &Account) -> anyhow::Result<Arc<dyn ExchangeSession>> {
        // Sessions here are stateless request signers; a fresh one per call
        // is cheap and avoids holding credentials longer than needed.
        Ok(Arc::new(RestSession {
            http: self.http.clone(),
            account: account.clone(),
        }))
    }
}

struct RestSession {
    http: Client,
    account: Account,
}

#[async_trait]
impl ExchangeSession for RestSession {
    async fn fetch_balance(&self) -> anyhow::Result<Value> {
        match self.account.exchange {
            ExchangeId::BinanceSpot => {
                self.binance_signed_get(BINANCE_SPOT_URL, "/api/v3/account").await
            }
            ExchangeId::BinanceFutures => {
                self.binance_signed_get(BINANCE_FUTURES_URL, "/fapi/v2/account").await
            }
            ExchangeId::Kraken => self.kraken_private_post("/0/private/Balance").await,
            ExchangeId::Okx => self.okx_signed_get("/api/v5/account/balance").await,
        }
    }

    async fn fetch_private_account_info(&self) -> anyhow::Result<Value> {
        match self.account.exchange {
            ExchangeId::BinanceFutures => {
                self.binance_signed_get(BINANCE_FUTURES_URL, "/fapi/v2/account").await
            }
            ExchangeId::Okx => self.okx_signed_get("/api/v5/account/positions").await,
            exchange => Err(anyhow!("{exchange} has no derivative account endpoint")),
        }
    }
}

impl RestSession {
    async fn binance_signed_get(&self, base: &str, path: &str) -> anyhow::Result<Value> {
        let mut query = format!("timestamp={}", Utc::now().timestamp_millis());
        let signature = sign_hex_sha256(&self.account.api_secret, &query)?;
        query.push_str(&format!("&signature={signature}"));

        let url = format!("{base}{path}?{query}");
        debug!(account = %self.account.account_id(), path = %path, "binance signed request");

        let response = self
            .http
            .get(&url)
            .header("X-MBX-APIKEY", &self.account.api_key)
            .send()
            .await?;
        check_status(response).await
    }

    async fn okx_signed_get(&self, path: &str) -> anyhow::Result<Value> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        let prehash = format!("{timestamp}GET{path}");
        let mut mac = HmacSha256::new_from_slice(self.account.api_secret.as_bytes())
            .context("invalid API secret")?;
        mac.update(prehash.as_bytes());
        let signature = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        debug!(account = %self.account.account_id(), path = %path, "okx signed request");

        let response = self
            .http
            .get(format!("{OKX_URL}{path}"))
            .header("OK-ACCESS-KEY", &self.account.api_key)
            .header("OK-ACCESS-SIGN", signature)
            .header("OK-ACCESS-TIMESTAMP", timestamp)
            .header("OK-ACCESS-PASSPHRASE", &self.account.api_passphrase)
            .send()
            .await?;
        check_status(response).await
    }

    async fn kraken_private_post(&self, path: &str) -> anyhow::Result<Value> {
        let nonce = Utc::now().timestamp_millis().to_string();
        let body = format!("nonce={nonce}");
        let signature = kraken_sign(&self.account.api_secret, path, &nonce, &body)?;

        debug!(account = %self.account.account_id(), path = %path, "kraken signed request");

        let response = self
            .http
            .post(format!("{KRAKEN_URL}{path}"))
            .header("API-Key", &self.account.api_key)
            .header("API-Sign", signature)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        check_status(response).await
    }
}

/// HMAC-SHA256 over the payload, hex encoded (Binance convention).
fn sign_hex_sha256(secret: &str, payload: &str) -> anyhow::Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).context("invalid API secret")?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Kraken's API-Sign: HMAC-SHA512 over the path and SHA256(nonce + body),
/// keyed with the base64-decoded secret, base64 encoded.
fn kraken_sign(secret: &str, path: &str, nonce: &str, body: &str) -> anyhow::Result<String> {
    let key = base64::engine::general_purpose::STANDARD
        .decode(secret)
        .context("API secret is not valid base64")?;

    let mut digest = Sha256::new();
    digest.update(nonce.as_bytes());
    digest.update(body.as_bytes());

    let mut mac = HmacSha512::new_from_slice(&key).context("invalid API secret")?;
    mac.update(path.as_bytes());
    mac.update(&digest.finalize());
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

async fn check_status(response: reqwest::Response) -> anyhow::Result<Value> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("request failed: {} - {}", status, body);
    }
    response.json().await.context("Failed to parse response body")
}
