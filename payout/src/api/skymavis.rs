//! Sky Mavis game API + GraphQL identity gateway.
//!
//! Claim flow:
//! 1. `CreateRandomMessage` → message to sign
//! 2. account signs it (EIP-191) → `CreateAccessTokenWithSignature` → JWT
//! 3. `POST /v1/players/me/items/1/claim` with the JWT → server signature,
//!    amount and timestamp for the on-chain `checkpoint` call

use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use slp_payout_core::ClaimAuthorization;
use std::time::Duration;

use super::{ApiError, IdentityApi, RewardApi, UnclaimedBalance};
use crate::config::NetworkConfig;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.77 Safari/537.36";

/// The item endpoint is flaky; it is polled until it answers.
const UNCLAIMED_FETCH_ATTEMPTS: u32 = 50;
const UNCLAIMED_FETCH_DELAY: Duration = Duration::from_secs(1);

const RANDOM_MESSAGE_QUERY: &str = "mutation CreateRandomMessage { createRandomMessage }";
const ACCESS_TOKEN_QUERY: &str = "mutation CreateAccessTokenWithSignature($input: SignatureInput!) { createAccessTokenWithSignature(input: $input) { newAccount result accessToken __typename } }";

// ═══════════════════════════════════════════════════════════════
// Response payloads
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemResponse {
    claimable_total: u64,
    last_claimed_item_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClaimResponse {
    blockchain_related: BlockchainRelated,
}

#[derive(Debug, Deserialize)]
struct BlockchainRelated {
    signature: SignaturePayload,
}

#[derive(Debug, Deserialize)]
struct SignaturePayload {
    signature: String,
    amount: u64,
    timestamp: u64,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RandomMessageData {
    create_random_message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenData {
    create_access_token_with_signature: AccessTokenResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenResult {
    access_token: String,
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}

fn decode<T: DeserializeOwned>(endpoint: &'static str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Malformed {
        endpoint,
        reason: format!("{} (body: {})", e, preview(body)),
    })
}

pub(crate) fn parse_unclaimed(body: &str) -> Result<UnclaimedBalance, ApiError> {
    let item: ItemResponse = decode("items", body)?;
    let last_claimed_at =
        DateTime::<Utc>::from_timestamp(item.last_claimed_item_at, 0).ok_or_else(|| ApiError::Malformed {
            endpoint: "items",
            reason: format!("lastClaimedItemAt {} is out of range", item.last_claimed_item_at),
        })?;

    Ok(UnclaimedBalance {
        amount: item.claimable_total,
        last_claimed_at,
    })
}

pub(crate) fn parse_claim_authorization(body: &str) -> Result<ClaimAuthorization, ApiError> {
    let claim: ClaimResponse = decode("claim", body)?;
    let payload = claim.blockchain_related.signature;
    let signature: Bytes = payload.signature.parse().map_err(|_| ApiError::Malformed {
        endpoint: "claim",
        reason: format!("signature '{}' is not hex", payload.signature),
    })?;

    Ok(ClaimAuthorization {
        signature,
        amount: payload.amount,
        timestamp: payload.timestamp,
    })
}

fn graphql_data<T: DeserializeOwned>(endpoint: &'static str, body: &str) -> Result<T, ApiError> {
    let response: GraphqlResponse<T> = decode(endpoint, body)?;
    if !response.errors.is_empty() {
        return Err(ApiError::Malformed {
            endpoint,
            reason: format!("GraphQL errors: {}", Value::Array(response.errors)),
        });
    }
    response.data.ok_or_else(|| ApiError::Malformed {
        endpoint,
        reason: "missing data".to_string(),
    })
}

// ═══════════════════════════════════════════════════════════════
// Client
// ═══════════════════════════════════════════════════════════════

pub struct SkyMavisClient {
    http: reqwest::Client,
    game_api_url: String,
    graphql_url: String,
}

impl SkyMavisClient {
    pub fn new(network: &NetworkConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|source| ApiError::Http {
                endpoint: "client",
                source,
            })?;

        Ok(Self {
            http,
            game_api_url: network.game_api_url.trim_end_matches('/').to_string(),
            graphql_url: network.graphql_url.clone(),
        })
    }

    async fn checked_body(
        endpoint: &'static str,
        response: reqwest::Response,
    ) -> Result<String, ApiError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ApiError::Http { endpoint, source })?;

        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
                body: preview(&body),
            });
        }
        Ok(body)
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        payload: Value,
    ) -> Result<T, ApiError> {
        let response = self
            .http
            .post(&self.graphql_url)
            .json(&payload)
            .send()
            .await
            .map_err(|source| ApiError::Http { endpoint, source })?;
        let body = Self::checked_body(endpoint, response).await?;
        graphql_data(endpoint, &body)
    }

    async fn fetch_item_once(&self, url: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ApiError::Http {
                endpoint: "items",
                source,
            })?;
        Self::checked_body("items", response).await
    }
}

#[async_trait]
impl RewardApi for SkyMavisClient {
    async fn get_unclaimed_balance(&self, address: Address) -> Result<UnclaimedBalance, ApiError> {
        let url = format!("{}/v1/players/{}/items/1", self.game_api_url, address);

        let mut last_error = None;
        for attempt in 1..=UNCLAIMED_FETCH_ATTEMPTS {
            match self.fetch_item_once(&url).await {
                Ok(body) => return parse_unclaimed(&body),
                Err(e) => {
                    tracing::debug!(
                        "Unclaimed SLP lookup for {} failed ({}/{}): {}",
                        address,
                        attempt,
                        UNCLAIMED_FETCH_ATTEMPTS,
                        e
                    );
                    last_error = Some(e);
                }
            }
            if attempt < UNCLAIMED_FETCH_ATTEMPTS {
                tokio::time::sleep(UNCLAIMED_FETCH_DELAY).await;
            }
        }

        Err(last_error.unwrap_or_else(|| ApiError::Malformed {
            endpoint: "items",
            reason: "no attempt was made".to_string(),
        }))
    }

    async fn request_claim_authorization(
        &self,
        address: Address,
        access_token: &str,
    ) -> Result<ClaimAuthorization, ApiError> {
        let url = format!("{}/v1/players/me/items/1/claim", self.game_api_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|source| ApiError::Http {
                endpoint: "claim",
                source,
            })?;
        let body = Self::checked_body("claim", response).await?;
        let authorization = parse_claim_authorization(&body)?;

        tracing::info!(
            "Claim authorized for {}: {} SLP (timestamp {})",
            address,
            authorization.amount,
            authorization.timestamp
        );
        Ok(authorization)
    }
}

#[async_trait]
impl IdentityApi for SkyMavisClient {
    async fn create_challenge(&self) -> Result<String, ApiError> {
        let payload = json!({
            "operationName": "CreateRandomMessage",
            "variables": {},
            "query": RANDOM_MESSAGE_QUERY,
        });
        let data: RandomMessageData = self.graphql("CreateRandomMessage", payload).await?;
        Ok(data.create_random_message)
    }

    async fn exchange_signed_challenge(
        &self,
        address: Address,
        message: &str,
        signature: &str,
    ) -> Result<String, ApiError> {
        let payload = json!({
            "operationName": "CreateAccessTokenWithSignature",
            "variables": {
                "input": {
                    "mainnet": "ronin",
                    "owner": address.to_string(),
                    "message": message,
                    "signature": signature,
                }
            },
            "query": ACCESS_TOKEN_QUERY,
        });
        let data: AccessTokenData = self
            .graphql("CreateAccessTokenWithSignature", payload)
            .await?;
        Ok(data.create_access_token_with_signature.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unclaimed_item() {
        let body = r#"{"clientId":"0xabc","itemId":1,"total":612,"blockchainRelated":{"balance":500},"claimableTotal":112,"lastClaimedItemAt":1650000000}"#;
        let balance = parse_unclaimed(body).unwrap();
        assert_eq!(balance.amount, 112);
        assert_eq!(balance.last_claimed_at.timestamp(), 1_650_000_000);
    }

    #[test]
    fn test_parse_unclaimed_rejects_missing_fields() {
        assert!(matches!(
            parse_unclaimed(r#"{"total": 5}"#),
            Err(ApiError::Malformed { endpoint: "items", .. })
        ));
    }

    #[test]
    fn test_parse_claim_authorization() {
        let body = r#"{"success":true,"blockchainRelated":{"signature":{"signature":"0xdeadbeef","amount":112,"timestamp":1650000123,"nonce":0}}}"#;
        let auth = parse_claim_authorization(body).unwrap();
        assert_eq!(auth.signature, Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(auth.amount, 112);
        assert_eq!(auth.timestamp, 1_650_000_123);
    }

    #[test]
    fn test_parse_claim_rejects_non_hex_signature() {
        let body = r#"{"blockchainRelated":{"signature":{"signature":"0xnothex","amount":1,"timestamp":1}}}"#;
        assert!(parse_claim_authorization(body).is_err());
    }

    #[test]
    fn test_graphql_errors_surface() {
        let body = r#"{"data":null,"errors":[{"message":"invalid signature"}]}"#;
        let err = graphql_data::<RandomMessageData>("CreateRandomMessage", body).unwrap_err();
        assert!(err.to_string().contains("invalid signature"));
    }

    #[test]
    fn test_graphql_random_message() {
        let body = r#"{"data":{"createRandomMessage":"Sign this: 42"}}"#;
        let data: RandomMessageData = graphql_data("CreateRandomMessage", body).unwrap();
        assert_eq!(data.create_random_message, "Sign this: 42");
    }
}
