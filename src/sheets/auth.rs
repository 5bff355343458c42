// src/sheets/auth.rs
//
// Service-account OAuth: sign a JWT with the account's private key and trade it
// for a short-lived bearer token at the account's token endpoint.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::config::ServiceAccountSource;
use crate::error::EtlError;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a Google service account key file we use.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| EtlError::InvalidConfig(format!("service account key: {}", e)).into())
    }

    pub fn from_source(source: &ServiceAccountSource) -> Result<Self> {
        match source {
            ServiceAccountSource::File(path) => {
                let json = std::fs::read_to_string(path).map_err(|e| {
                    EtlError::InvalidConfig(format!(
                        "cannot read service account file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Self::from_json(&json)
            }
            ServiceAccountSource::Inline(json) => Self::from_json(json),
        }
    }

    fn encoding_key(&self) -> Result<EncodingKey> {
        EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| EtlError::InvalidConfig(format!("service account private key: {}", e)).into())
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(key: &ServiceAccountKey, scope: &str, now: DateTime<Utc>) -> Self {
        Self {
            iss: key.client_email.clone(),
            scope: scope.to_string(),
            aud: key.token_uri.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + TOKEN_LIFETIME_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: DateTime<Utc>,
}

/// Hands out bearer tokens, reusing one until a minute before it expires.
pub struct TokenProvider {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    http: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(key: ServiceAccountKey, http: Client) -> Result<Self> {
        let encoding_key = key.encoding_key()?;
        Ok(Self {
            key,
            encoding_key,
            scope: SHEETS_SCOPE.to_string(),
            http,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    pub async fn token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(tok) = cached.as_ref() {
            if Utc::now() < tok.refresh_at {
                return Ok(tok.value.clone());
            }
        }
        let fresh = self.exchange().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    #[instrument(level = "debug", skip(self), fields(account = %self.key.client_email))]
    async fn exchange(&self) -> Result<CachedToken> {
        let now = Utc::now();
        let claims = Claims::new(&self.key, &self.scope, now);
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .context("signing service account assertion")?;

        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| EtlError::Connection(format!("token request to {}: {}", self.key.token_uri, e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EtlError::Connection(format!(
                "token endpoint returned {}: {}",
                status,
                body.trim()
            ))
            .into());
        }
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| EtlError::Connection(format!("unreadable token response: {}", e)))?;

        let lifetime = token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS);
        debug!(lifetime, "obtained access token");
        Ok(CachedToken {
            value: token.access_token,
            refresh_at: now + Duration::seconds(lifetime - 60),
        })
    }
}
