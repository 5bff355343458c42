// src/config.rs

use anyhow::Result;
use std::path::PathBuf;

use crate::error::EtlError;

pub const RAW_SPREADSHEET_ID: &str = "RAW_SPREADSHEET_ID";
pub const TARGET_SPREADSHEET_ID: &str = "TARGET_SPREADSHEET_ID";
pub const GOOGLE_SERVICE_ACCOUNT_FILE: &str = "GOOGLE_SERVICE_ACCOUNT_FILE";
pub const GOOGLE_SERVICE_ACCOUNT_JSON: &str = "GOOGLE_SERVICE_ACCOUNT_JSON";
pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

/// Where the service account key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceAccountSource {
    /// Path to a JSON key file (preferred).
    File(PathBuf),
    /// The key JSON itself.
    Inline(String),
}

/// Telegram alerting settings. Recognised but not used yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub raw_spreadsheet_id: String,
    pub target_spreadsheet_id: String,
    pub service_account: ServiceAccountSource,
    pub telegram: TelegramConfig,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key → value lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(EtlError::MissingConfig(key));

        let raw_spreadsheet_id = require(RAW_SPREADSHEET_ID)?;
        let target_spreadsheet_id = require(TARGET_SPREADSHEET_ID)?;

        let service_account = match (
            get(GOOGLE_SERVICE_ACCOUNT_FILE),
            get(GOOGLE_SERVICE_ACCOUNT_JSON),
        ) {
            (Some(path), _) => ServiceAccountSource::File(PathBuf::from(path)),
            (None, Some(json)) => ServiceAccountSource::Inline(json),
            (None, None) => return Err(EtlError::MissingConfig(GOOGLE_SERVICE_ACCOUNT_FILE).into()),
        };

        Ok(Self {
            raw_spreadsheet_id,
            target_spreadsheet_id,
            service_account,
            telegram: TelegramConfig {
                bot_token: get(TELEGRAM_BOT_TOKEN),
                chat_id: get(TELEGRAM_CHAT_ID),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_all_recognised_options() {
        let cfg = Config::from_lookup(lookup(&[
            (RAW_SPREADSHEET_ID, "raw-id"),
            (TARGET_SPREADSHEET_ID, "db-id"),
            (GOOGLE_SERVICE_ACCOUNT_FILE, "/keys/sa.json"),
            (TELEGRAM_BOT_TOKEN, "token"),
            (TELEGRAM_CHAT_ID, "42"),
        ]))
        .unwrap();

        assert_eq!(cfg.raw_spreadsheet_id, "raw-id");
        assert_eq!(cfg.target_spreadsheet_id, "db-id");
        assert_eq!(
            cfg.service_account,
            ServiceAccountSource::File(PathBuf::from("/keys/sa.json"))
        );
        assert!(cfg.telegram.is_configured());
    }

    #[test]
    fn file_wins_over_inline_json() {
        let cfg = Config::from_lookup(lookup(&[
            (RAW_SPREADSHEET_ID, "raw"),
            (TARGET_SPREADSHEET_ID, "db"),
            (GOOGLE_SERVICE_ACCOUNT_FILE, "sa.json"),
            (GOOGLE_SERVICE_ACCOUNT_JSON, "{}"),
        ]))
        .unwrap();
        assert!(matches!(cfg.service_account, ServiceAccountSource::File(_)));

        let cfg = Config::from_lookup(lookup(&[
            (RAW_SPREADSHEET_ID, "raw"),
            (TARGET_SPREADSHEET_ID, "db"),
            (GOOGLE_SERVICE_ACCOUNT_JSON, "{\"type\":\"service_account\"}"),
        ]))
        .unwrap();
        assert!(matches!(cfg.service_account, ServiceAccountSource::Inline(_)));
        assert!(!cfg.telegram.is_configured());
    }

    #[test]
    fn missing_or_blank_variable_is_reported_by_name() {
        let err = Config::from_lookup(lookup(&[
            (RAW_SPREADSHEET_ID, "raw"),
            (TARGET_SPREADSHEET_ID, "   "),
            (GOOGLE_SERVICE_ACCOUNT_FILE, "sa.json"),
        ]))
        .unwrap_err();

        match err.downcast_ref::<EtlError>() {
            Some(EtlError::MissingConfig(name)) => assert_eq!(*name, TARGET_SPREADSHEET_ID),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn credentials_are_required() {
        let err = Config::from_lookup(lookup(&[
            (RAW_SPREADSHEET_ID, "raw"),
            (TARGET_SPREADSHEET_ID, "db"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(GOOGLE_SERVICE_ACCOUNT_FILE));
    }
}
