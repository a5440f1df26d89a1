//! Telegram Bot API access: polling and delivery calls over plain HTTP.
//!
//! One `reqwest::Client` is built at startup and cloned into the watcher,
//! the media probe and the fan-out; clones share the connection pool.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

/// Public Bot API host.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Build the shared HTTP client.
///
/// Idle pool of 100 connections, 90s idle timeout, 10s connect/handshake
/// timeout, `request_timeout` per call.
pub fn build_http_client(request_timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(100)
        .pool_idle_timeout(Duration::from_secs(90))
        .connect_timeout(Duration::from_secs(10))
        .timeout(request_timeout)
        .build()
}

/// Bot API endpoint set for one bot credential.
#[derive(Debug, Clone)]
pub struct BotApi {
    base: String,
    bot_token: SecretString,
    client: reqwest::Client,
}

impl BotApi {
    pub fn new(base: impl Into<String>, bot_token: SecretString, client: reqwest::Client) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            base,
            bot_token,
            client,
        }
    }

    /// Contains the token; never log the result.
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base, self.bot_token.expose_secret())
    }

    /// `getUpdates`, with `offset` only once a cursor exists.
    fn updates_url(&self, offset: i64) -> String {
        if offset == 0 {
            self.api_url("getUpdates")
        } else {
            format!("{}?offset={offset}", self.api_url("getUpdates"))
        }
    }

    /// GET pending updates starting at `offset`.
    ///
    /// Errors have the URL stripped so the token cannot reach the logs.
    pub async fn get_updates(&self, offset: i64) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .get(self.updates_url(offset))
            .send()
            .await
            .map_err(reqwest::Error::without_url)
    }

    /// POST a JSON body to a Bot API method such as `sendPhoto`.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        method: &str,
        body: &T,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
