// src/sheets/client.rs

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::auth::{ServiceAccountKey, TokenProvider};
use super::SheetsApi;
use crate::error::EtlError;
use crate::table::Cell;

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

/// Sheets v4 REST client authenticated as a service account.
pub struct SheetsClient {
    http: Client,
    base: Url,
    auth: TokenProvider,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

fn value_to_string(v: Value) -> String {
    match v {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        other => other.to_string(),
    }
}

fn is_access_failure(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
    )
}

impl SheetsClient {
    pub fn new(key: ServiceAccountKey) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("building HTTP client")?;
        let auth = TokenProvider::new(key, http.clone())?;
        debug!(account = auth.client_email(), "sheets client ready");
        Ok(Self {
            http,
            base: Url::parse(SHEETS_BASE)?,
            auth,
        })
    }

    /// `{base}{spreadsheet_id}/{segments...}`, each segment percent-encoded.
    fn url(&self, spreadsheet_id: &str, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("cannot build URL from {}", self.base))?
            .pop_if_empty()
            .push(spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str, action: Option<&str>) -> Result<Url> {
        let last = match action {
            Some(a) => format!("{}:{}", range, a),
            None => range.to_string(),
        };
        self.url(spreadsheet_id, &["values", &last])
    }

    /// One request, no retries. 401/403/404 mean the spreadsheet is unreachable
    /// with these credentials.
    #[instrument(level = "debug", skip(self, body))]
    async fn call(&self, method: Method, url: Url, body: Option<Value>) -> Result<Value> {
        let token = self.auth.token().await?;
        let mut req = self.http.request(method.clone(), url.clone()).bearer_auth(token);
        if let Some(b) = &body {
            req = req.json(b);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| EtlError::Connection(format!("{} {}: {}", method, url, e)))?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<Value>()
                .await
                .with_context(|| format!("Reading JSON from {}", url));
        }

        let text = resp.text().await.unwrap_or_default();
        let message = format!("{} {} returned {}: {}", method, url, status, text.trim());
        if is_access_failure(status) {
            Err(EtlError::Connection(message).into())
        } else {
            Err(anyhow!(message))
        }
    }
}

#[async_trait]
impl SheetsApi for SheetsClient {
    async fn sheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>> {
        let mut url = self.url(spreadsheet_id, &[])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties.title");
        let body = self.call(Method::GET, url, None).await?;
        let sheet: Spreadsheet = serde_json::from_value(body).context("parsing spreadsheet metadata")?;
        Ok(sheet.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn add_sheet(&self, spreadsheet_id: &str, title: &str) -> Result<()> {
        let url = self.url(&format!("{}:batchUpdate", spreadsheet_id), &[])?;
        let body = json!({
            "requests": [{ "addSheet": { "properties": { "title": title } } }]
        });
        self.call(Method::POST, url, Some(body)).await?;
        debug!(title, "added sheet");
        Ok(())
    }

    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(spreadsheet_id, range, None)?;
        let body = self.call(Method::GET, url, None).await?;
        let vr: ValueRange = serde_json::from_value(body).context("parsing value range")?;
        Ok(vr
            .values
            .into_iter()
            .map(|row| row.into_iter().map(value_to_string).collect())
            .collect())
    }

    async fn clear_values(&self, spreadsheet_id: &str, range: &str) -> Result<()> {
        let url = self.values_url(spreadsheet_id, range, Some("clear"))?;
        self.call(Method::POST, url, Some(json!({}))).await?;
        Ok(())
    }

    async fn update_values(&self, spreadsheet_id: &str, range: &str, rows: &[Vec<Cell>]) -> Result<()> {
        let mut url = self.values_url(spreadsheet_id, range, None)?;
        url.query_pairs_mut().append_pair("valueInputOption", "USER_ENTERED");
        let body = json!({ "range": range, "majorDimension": "ROWS", "values": rows });
        self.call(Method::PUT, url, Some(body)).await?;
        Ok(())
    }

    async fn append_values(&self, spreadsheet_id: &str, range: &str, rows: &[Vec<Cell>]) -> Result<()> {
        let mut url = self.values_url(spreadsheet_id, range, Some("append"))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let body = json!({ "range": range, "majorDimension": "ROWS", "values": rows });
        self.call(Method::POST, url, Some(body)).await?;
        Ok(())
    }
}
