//! Store protocol boundary.
//!
//! The graph daemon is reached through its HTTP gateway: `POST /api/db/connect`
//! opens an authenticated session and returns a bearer token, and
//! `POST /api/db/exec` runs one statement block inside that session, answering
//! with a `(code, message)` pair where code 0 means success. The loader only
//! ever sees the [`GraphStore`] trait, so tests can substitute an in-memory
//! store.

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Credentials rejected before any statement was submitted. Fatal.
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed gateway response: {0}")]
    Protocol(String),
}

/// Store-reported result of one statement submission.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub code: i64,
    pub message: String,
}

impl ExecOutcome {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

#[async_trait]
pub trait GraphStore: Send {
    /// Submit one statement block; `Ok` carries the store's own verdict,
    /// `Err` means the statement never reached the store.
    async fn execute(&mut self, statement: &str) -> Result<ExecOutcome, StoreError>;
}

#[derive(Serialize)]
struct ConnectRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct ExecRequest<'a> {
    gql: &'a str,
}

#[derive(Deserialize)]
struct GatewayResponse {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Session-holding client for the store's HTTP gateway.
pub struct HttpGraphStore {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpGraphStore {
    /// Connect and authenticate in one step; a rejected credential pair is
    /// `StoreError::Auth` and nothing further may be submitted.
    pub async fn connect(
        addr: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> Result<Self, StoreError> {
        let base_url = format!("http://{}:{}", addr, port);
        info!("Connecting to graph store at {}...", base_url);

        let http = reqwest::Client::new();
        let resp: GatewayResponse = http
            .post(format!("{}/api/db/connect", base_url))
            .json(&ConnectRequest { username, password })
            .send()
            .await?
            .json()
            .await?;

        if resp.code != 0 {
            return Err(StoreError::Auth(resp.message));
        }
        let token = resp
            .data
            .get("token")
            .and_then(|t| t.as_str())
            .ok_or_else(|| StoreError::Protocol("connect response carries no token".into()))?
            .to_string();

        info!("Authenticated as '{}'", username);
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    /// Switch the session to the given namespace.
    pub async fn select_namespace(&mut self, name: &str) -> Result<ExecOutcome, StoreError> {
        self.execute(&format!("USE {};", name)).await
    }
}

#[async_trait]
impl GraphStore for HttpGraphStore {
    async fn execute(&mut self, statement: &str) -> Result<ExecOutcome, StoreError> {
        let resp: GatewayResponse = self
            .http
            .post(format!("{}/api/db/exec", self.base_url))
            .bearer_auth(&self.token)
            .json(&ExecRequest { gql: statement })
            .send()
            .await?
            .json()
            .await?;

        Ok(ExecOutcome {
            code: resp.code,
            message: resp.message,
        })
    }
}
