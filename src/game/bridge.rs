//! HTTP client for a local browser bridge exposing the game as JSON.
//!
//! The bridge reports displayed text; number parsing happens here so the
//! decision core only sees typed values.

use crate::error::GameError;
use crate::game::parse::{parse_display_number, parse_owned_count};
use crate::game::GameInterface;
use crate::types::{ItemCategory, PurchasableItem};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Game bridge client.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    base_url: String,
    http: reqwest::Client,
}

// -- Request / response types -----------------------------------------------

#[derive(Debug, Deserialize)]
struct TextResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    id: String,
    name: String,
    price: String,
    #[serde(default)]
    owned: String,
    enabled: bool,
}

#[derive(Debug, Serialize)]
struct PurchaseRequest<'a> {
    id: &'a str,
    category: ItemCategory,
}

#[derive(Debug, Deserialize)]
struct PurchaseResponse {
    purchased: bool,
}

#[derive(Debug, Deserialize)]
struct ClaimResponse {
    claimed: bool,
}

#[derive(Debug, Deserialize)]
struct SaveResponse {
    save: Option<String>,
}

impl BridgeClient {
    /// Create a new bridge client.
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build bridge HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GameError> {
        debug!("Bridge GET {}", path);
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        decode(path, resp).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GameError> {
        debug!("Bridge POST {}", path);
        let resp = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        decode(path, resp).await
    }

    async fn read_number(&self, path: &str, field: &'static str) -> Result<f64, GameError> {
        let body: TextResponse = self.get_json(path).await?;
        parse_display_number(&body.text).ok_or_else(|| GameError::parse(field, body.text))
    }

    async fn list_items(&self, path: &str, category: ItemCategory) -> Result<Vec<PurchasableItem>, GameError> {
        let raw: Vec<RawItem> = self.get_json(path).await?;
        Ok(raw
            .into_iter()
            .filter_map(|r| into_item(r, category))
            .collect())
    }
}

/// Convert a raw listing; entries with an unreadable price are dropped.
fn into_item(raw: RawItem, category: ItemCategory) -> Option<PurchasableItem> {
    let Some(price) = parse_display_number(&raw.price) else {
        debug!("Skipping {} '{}': unreadable price {:?}", category, raw.id, raw.price);
        return None;
    };
    Some(PurchasableItem {
        id: raw.id,
        display_name: raw.name,
        price,
        owned_count: parse_owned_count(&raw.owned),
        category,
        enabled: raw.enabled,
    })
}

fn transport_error(path: &str, e: reqwest::Error) -> GameError {
    if e.is_connect() {
        GameError::Unavailable(format!("bridge {path}: {e}"))
    } else {
        GameError::transient(format!("bridge {path}: {e}"))
    }
}

async fn decode<T: DeserializeOwned>(path: &str, resp: reqwest::Response) -> Result<T, GameError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(match status {
            StatusCode::SERVICE_UNAVAILABLE => {
                GameError::Unavailable(format!("bridge {path} ({status}): {body}"))
            }
            _ => GameError::transient(format!("bridge {path} ({status}): {body}")),
        });
    }
    resp.json()
        .await
        .map_err(|e| GameError::transient(format!("bridge {path}: malformed response: {e}")))
}

#[async_trait]
impl GameInterface for BridgeClient {
    async fn ready(&self) -> Result<(), GameError> {
        let resp = self
            .http
            .get(self.url("health"))
            .send()
            .await
            .map_err(|e| GameError::Unavailable(format!("bridge health: {e}")))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(GameError::Unavailable(format!(
                "bridge health returned {}",
                resp.status()
            )))
        }
    }

    async fn read_resource_count(&self) -> Result<f64, GameError> {
        self.read_number("resources", "resource count").await
    }

    async fn read_production_rate(&self) -> Result<f64, GameError> {
        self.read_number("production", "production rate").await
    }

    async fn list_producers(&self) -> Result<Vec<PurchasableItem>, GameError> {
        self.list_items("producers", ItemCategory::Producer).await
    }

    async fn list_upgrades(&self) -> Result<Vec<PurchasableItem>, GameError> {
        self.list_items("upgrades", ItemCategory::Upgrade).await
    }

    async fn claim_bonus(&self) -> Result<bool, GameError> {
        let body: ClaimResponse = self.post_json("bonus/claim", &serde_json::json!({})).await?;
        Ok(body.claimed)
    }

    async fn click(&self) -> Result<(), GameError> {
        let _: serde_json::Value = self.post_json("click", &serde_json::json!({})).await?;
        Ok(())
    }

    async fn purchase(&self, item: &PurchasableItem) -> Result<bool, GameError> {
        let body: PurchaseResponse = self
            .post_json(
                "purchase",
                &PurchaseRequest {
                    id: &item.id,
                    category: item.category,
                },
            )
            .await?;
        Ok(body.purchased)
    }

    async fn export_save(&self) -> Result<Option<String>, GameError> {
        let body: SaveResponse = self.get_json("save").await?;
        Ok(body.save.filter(|s| !s.is_empty()))
    }
}
