//! Google Sheets ledger client
//!
//! 服务账号 JWT (RS256) 换取 OAuth access token，然后调用 Sheets v4
//! values API：
//!
//! | 操作 | 方法 | 路径 |
//! |------|------|------|
//! | 读取表头 | GET | `/values/{range}` |
//! | 写入表头 | PUT | `/values/{range}?valueInputOption=USER_ENTERED` |
//! | 追加行 | POST | `/values/{range}:append?valueInputOption=USER_ENTERED` |

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::time::Duration;

use super::LedgerError;
use super::rows::Sheet;
use super::sink::LedgerSink;
use crate::core::LedgerConfig;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertion lifetime requested from Google (max 1h)
const ASSERTION_TTL_SECS: i64 = 3600;

/// Refresh the cached token this long before it expires
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_TTL_SECS
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: i64,
}

/// Sheets API client bound to one spreadsheet
pub struct SheetsClient {
    client: Client,
    spreadsheet_id: String,
    service_account_email: String,
    key: EncodingKey,
    token: tokio::sync::Mutex<Option<CachedToken>>,
    headers_checked: Mutex<HashSet<Sheet>>,
}

impl std::fmt::Debug for SheetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsClient")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("service_account_email", &self.service_account_email)
            .finish_non_exhaustive()
    }
}

impl SheetsClient {
    pub fn new(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let (Some(spreadsheet_id), Some(email), Some(private_key)) = (
            config.spreadsheet_id.clone(),
            config.service_account_email.clone(),
            config.private_key.as_deref(),
        ) else {
            return Err(LedgerError::NotConfigured);
        };

        let key = EncodingKey::from_rsa_pem(private_key.as_bytes())?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            spreadsheet_id,
            service_account_email: email,
            key,
            token: tokio::sync::Mutex::new(None),
            headers_checked: Mutex::new(HashSet::new()),
        })
    }

    fn values_url(&self, range: &str) -> String {
        format!("{}/{}/values/{}", SHEETS_API, self.spreadsheet_id, range)
    }

    /// Cached access token, refreshed shortly before expiry
    async fn access_token(&self) -> Result<String, LedgerError> {
        let mut cached = self.token.lock().await;
        let now = chrono::Utc::now().timestamp();
        if let Some(token) = cached.as_ref()
            && token.expires_at - TOKEN_REFRESH_MARGIN_SECS > now
        {
            return Ok(token.token.clone());
        }

        let claims = AssertionClaims {
            iss: &self.service_account_email,
            scope: SCOPE,
            aud: TOKEN_URL,
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)?;

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let response = check_status(response).await?;
        let token: TokenResponse = response.json().await?;

        tracing::debug!(expires_in = token.expires_in, "Ledger access token refreshed");
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });
        Ok(token.access_token)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LedgerError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(LedgerError::Status { status, body })
}

#[async_trait]
impl LedgerSink for SheetsClient {
    async fn ensure_header(&self, sheet: Sheet) -> Result<(), LedgerError> {
        if self.headers_checked.lock().contains(&sheet) {
            return Ok(());
        }

        let token = self.access_token().await?;
        let range = sheet.header_range();
        let response = self
            .client
            .get(self.values_url(&range))
            .bearer_auth(&token)
            .send()
            .await?;
        let existing: ValueRange = check_status(response).await?.json().await?;

        let has_header = existing
            .values
            .first()
            .is_some_and(|row| row.iter().any(|v| v.as_str().is_some_and(|s| !s.is_empty())));
        if !has_header {
            let response = self
                .client
                .put(self.values_url(&range))
                .query(&[("valueInputOption", "USER_ENTERED")])
                .bearer_auth(&token)
                .json(&json!({
                    "range": range,
                    "majorDimension": "ROWS",
                    "values": [sheet.header_row()],
                }))
                .send()
                .await?;
            check_status(response).await?;
            tracing::info!(sheet = sheet.name(), "Ledger header row written");
        }

        self.headers_checked.lock().insert(sheet);
        Ok(())
    }

    async fn append_rows(&self, sheet: Sheet, rows: Vec<Vec<Value>>) -> Result<(), LedgerError> {
        if rows.is_empty() {
            return Ok(());
        }
        let token = self.access_token().await?;
        let url = format!("{}:append", self.values_url(&sheet.append_range()));
        let response = self
            .client
            .post(url)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(&token)
            .json(&json!({ "majorDimension": "ROWS", "values": rows }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_are_rejected() {
        let config = LedgerConfig {
            spreadsheet_id: Some("sheet".into()),
            service_account_email: None,
            private_key: None,
            timeout_ms: 1000,
        };
        assert!(matches!(
            SheetsClient::new(&config),
            Err(LedgerError::NotConfigured)
        ));
    }

    #[test]
    fn bad_private_key_is_rejected() {
        let config = LedgerConfig {
            spreadsheet_id: Some("sheet".into()),
            service_account_email: Some("svc@example.iam.gserviceaccount.com".into()),
            private_key: Some("not a pem".into()),
            timeout_ms: 1000,
        };
        assert!(matches!(SheetsClient::new(&config), Err(LedgerError::Key(_))));
    }
}
