//! The StarryNift HTTP API as seen by the workflow.
//!
//! [`StarryApi`] is the narrow contract the workflow needs. [`HttpStarryApi`]
//! implements it over reqwest with one client (proxy, user agent, headers)
//! per account.

use crate::account::Account;
use crate::config::StarryConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::NetworkError;
use ethers::types::{H256, U256};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CONTENT_TYPE, ORIGIN, REFERER};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(deserialize_with = "de_id", serialize_with = "ser_id")]
    pub user_id: String,
    #[serde(default)]
    pub level: Value,
    #[serde(default)]
    pub xp: Value,
    #[serde(default)]
    pub referral_code: Value,
}

/// Another user as returned by the character lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowTarget {
    #[serde(deserialize_with = "de_id")]
    pub user_id: String,
    #[serde(default)]
    pub is_follow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuestItem {
    pub name: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RaffleStatus {
    #[serde(default)]
    pub used: bool,
    #[serde(default, deserialize_with = "de_u256")]
    pub xp: U256,
    #[serde(default, deserialize_with = "de_u256")]
    pub nonce: U256,
    #[serde(default)]
    pub signature: Option<String>,
}

/// Ids arrive as numbers or strings depending on the endpoint.
fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn de_u256<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(U256::zero()),
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid integer {}", n))),
        Value::String(s) => U256::from_dec_str(&s)
            .map_err(|_| serde::de::Error::custom(format!("invalid integer '{}'", s))),
        other => Err(serde::de::Error::custom(format!(
            "expected integer, got {}",
            other
        ))),
    }
}

/// Sends an id back the way the service hands it out: numeric when the text
/// is exactly a number's decimal form.
fn id_value(id: &str) -> Value {
    match id.parse::<u64>() {
        Ok(n) if n.to_string() == id => json!(n),
        _ => json!(id),
    }
}

fn ser_id<S>(id: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    id_value(id).serialize(serializer)
}

#[async_trait]
pub trait StarryApi: Send + Sync {
    /// Message to sign for login.
    async fn login_challenge(&self, address: &str) -> Result<String>;
    /// Returns the session token.
    async fn login(&self, address: &str, signature: &str, referral_code: &str) -> Result<String>;
    async fn current_user(&self, token: &str) -> Result<UserProfile>;
    async fn user_info(&self, token: &str, user_id: &str) -> Result<FollowTarget>;
    async fn is_pass_minted(&self, token: &str, address: &str) -> Result<bool>;
    async fn mint_signature(&self, token: &str) -> Result<String>;
    async fn confirm_mint(&self, token: &str, tx_hash: H256) -> Result<()>;
    async fn confirm_daily_claim(&self, token: &str, tx_hash: H256) -> Result<()>;
    async fn daily_quests(&self, token: &str) -> Result<Vec<QuestItem>>;
    async fn follow(&self, token: &str, user_id: &str) -> Result<()>;
    async fn ping_online(&self, token: &str) -> Result<()>;
    async fn raffle_status(&self, token: &str) -> Result<RaffleStatus>;
    async fn confirm_raffle(&self, token: &str, tx_hash: H256) -> Result<()>;
}

/// Builds the API client for one account.
pub trait ApiFactory: Send + Sync {
    type Api: StarryApi + 'static;

    fn build(&self, account: &Account) -> Result<Self::Api>;
}

/// Hands every account its own [`HttpStarryApi`].
pub struct HttpApiFactory {
    config: StarryConfig,
}

impl HttpApiFactory {
    pub fn new(config: StarryConfig) -> Self {
        Self { config }
    }
}

impl ApiFactory for HttpApiFactory {
    type Api = HttpStarryApi;

    fn build(&self, account: &Account) -> Result<HttpStarryApi> {
        HttpStarryApi::new(account, &self.config)
    }
}

pub struct HttpStarryApi {
    client: Client,
    base_url: String,
}

impl HttpStarryApi {
    pub fn new(account: &Account, config: &StarryConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json;charset=UTF-8"),
        );
        headers.insert(ORIGIN, HeaderValue::from_static("https://starrynift.art"));
        headers.insert(REFERER, HeaderValue::from_static("https://starrynift.art/"));
        headers.insert("Sec-Ch-Ua-Mobile", HeaderValue::from_static("?0"));
        headers.insert("Sec-Ch-Ua-Platform", HeaderValue::from_static("\"Windows\""));
        headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("empty"));
        headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("cors"));
        headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-site"));

        let mut client_builder = Client::builder()
            .default_headers(headers)
            .user_agent(account.user_agent())
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(config.accept_invalid_certs);

        if let Some(proxy_conf) = account.proxy() {
            let mut proxy = reqwest::Proxy::all(&proxy_conf.url)?;
            if let (Some(u), Some(p)) = (&proxy_conf.username, &proxy_conf.password) {
                proxy = proxy.basic_auth(u, p);
            }
            client_builder = client_builder.proxy(proxy);
        }

        Ok(Self {
            client: client_builder.build().context("Failed to build HTTP client")?,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        authorize(self.client.get(self.url(path)), token)
    }

    fn post(&self, path: &str, token: Option<&str>, body: Value) -> RequestBuilder {
        authorize(self.client.post(self.url(path)), token).json(&body)
    }

    /// Sends the request and returns the JSON body of a 200/201 response.
    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<Value> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(NetworkError::Timeout {
                    timeout_ms: REQUEST_TIMEOUT.as_millis() as u64,
                    endpoint: endpoint.to_string(),
                }
                .into())
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("Request to {} failed", endpoint)))
            }
        };

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response from {}", endpoint))?;

        if !NetworkError::is_success_status(status) {
            return Err(NetworkError::HttpError {
                status_code: status,
                endpoint: endpoint.to_string(),
                body,
            }
            .into());
        }

        serde_json::from_str(&body).map_err(|e| {
            NetworkError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn confirm_tx(&self, token: &str, path: &str, tx_hash: H256) -> Result<()> {
        let body = self
            .send(
                self.post(path, Some(token), json!({ "txHash": format!("{:?}", tx_hash) })),
                path,
            )
            .await?;
        expect_ok(&body, path)
    }
}

fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

fn field<T: DeserializeOwned>(body: &Value, name: &str, endpoint: &str) -> Result<T> {
    let value = body.get(name).cloned().ok_or_else(|| NetworkError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason: format!("missing '{}' in {}", name, body),
    })?;
    serde_json::from_value(value).map_err(|e| {
        NetworkError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: format!("bad '{}': {}", name, e),
        }
        .into()
    })
}

fn parse<T: DeserializeOwned>(body: Value, endpoint: &str) -> Result<T> {
    serde_json::from_value(body).map_err(|e| {
        NetworkError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Webhook-style endpoints answer `{"ok": 1}` on success.
fn expect_ok(body: &Value, endpoint: &str) -> Result<()> {
    if body.get("ok").and_then(Value::as_i64) == Some(1) {
        Ok(())
    } else {
        Err(NetworkError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: format!("not ok: {}", body),
        }
        .into())
    }
}

#[async_trait]
impl StarryApi for HttpStarryApi {
    async fn login_challenge(&self, address: &str) -> Result<String> {
        let path = format!("/starryverse/auth/wallet/challenge?address={}", address);
        let body = self.send(self.get(&path, None), "challenge").await?;
        field(&body, "message", "challenge")
    }

    async fn login(&self, address: &str, signature: &str, referral_code: &str) -> Result<String> {
        let endpoint = "/starryverse/auth/wallet/evm/login";
        let payload = json!({
            "address": address,
            "signature": signature,
            "referralCode": referral_code,
            "referralSource": 0,
        });
        let body = self.send(self.post(endpoint, None, payload), endpoint).await?;
        field(&body, "token", endpoint)
    }

    async fn current_user(&self, token: &str) -> Result<UserProfile> {
        let endpoint = "/starryverse/character";
        let body = self.send(self.get(endpoint, Some(token)), endpoint).await?;
        parse(body, endpoint)
    }

    async fn user_info(&self, token: &str, user_id: &str) -> Result<FollowTarget> {
        let path = format!("/starryverse/character/user/{}", user_id);
        let body = self.send(self.get(&path, Some(token)), &path).await?;
        parse(body, &path)
    }

    async fn is_pass_minted(&self, token: &str, address: &str) -> Result<bool> {
        let path = format!(
            "/citizenship/citizenship-card/check-card-minted?address={}",
            address
        );
        let body = self.send(self.get(&path, Some(token)), "check-card-minted").await?;
        field(&body, "isMinted", "check-card-minted")
    }

    async fn mint_signature(&self, token: &str) -> Result<String> {
        let endpoint = "/citizenship/citizenship-card/sign";
        let body = self
            .send(self.post(endpoint, Some(token), json!({ "category": 1 })), endpoint)
            .await?;
        field(&body, "signature", endpoint)
    }

    async fn confirm_mint(&self, token: &str, tx_hash: H256) -> Result<()> {
        self.confirm_tx(token, "/webhook/confirm/citizenship/mint", tx_hash)
            .await
    }

    async fn confirm_daily_claim(&self, token: &str, tx_hash: H256) -> Result<()> {
        self.confirm_tx(token, "/webhook/confirm/daily-checkin/checkin", tx_hash)
            .await
    }

    async fn daily_quests(&self, token: &str) -> Result<Vec<QuestItem>> {
        let path = "/citizenship/citizenship-card/daily-tasks?page=1&page_size=10";
        let body = self.send(self.get(path, Some(token)), "daily-tasks").await?;
        field(&body, "items", "daily-tasks")
    }

    async fn follow(&self, token: &str, user_id: &str) -> Result<()> {
        let endpoint = "/starryverse/user/follow";
        let body = self
            .send(
                self.post(endpoint, Some(token), json!({ "userId": id_value(user_id) })),
                endpoint,
            )
            .await?;
        expect_ok(&body, endpoint)
    }

    async fn ping_online(&self, token: &str) -> Result<()> {
        let endpoint = "/space/online/ping";
        self.send(self.get(endpoint, Some(token)), endpoint).await?;
        Ok(())
    }

    async fn raffle_status(&self, token: &str) -> Result<RaffleStatus> {
        let endpoint = "/citizenship/raffle/status";
        let body = self
            .send(self.post(endpoint, Some(token), json!({})), endpoint)
            .await?;
        parse(body, endpoint)
    }

    async fn confirm_raffle(&self, token: &str, tx_hash: H256) -> Result<()> {
        self.confirm_tx(token, "/webhook/confirm/raffle/mint", tx_hash)
            .await
    }
}
