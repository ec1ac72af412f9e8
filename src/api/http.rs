//! reqwest client for the MediTrack backend.
//!
//! The client keeps a cookie store, so the session cookie set by `/login`
//! rides along on every later call, including auto-save updates.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{Result, TransportError, TransportErrorKind};
use crate::store::ProfileStore;
use crate::sync::ProfileTransport;
use crate::types::SavePayload;

const LOGIN_PATH: &str = "login";
const ME_PATH: &str = "me";
const LOGOUT_PATH: &str = "logout";
const UPDATE_PROFILE_PATH: &str = "update-profile";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody<'a> {
    email_id: &'a str,
    password: &'a str,
}

pub struct HttpClient {
    client: Client,
    config: ClientConfig,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::new(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Start a session. Returns the account document.
    pub async fn login(&self, email: &str, password: &str) -> Result<Value, TransportError> {
        let url = self.config.endpoint(LOGIN_PATH);
        debug!(%url, "logging in");
        let response = self
            .client
            .post(&url)
            .json(&LoginBody {
                email_id: email,
                password,
            })
            .send()
            .await
            .map_err(|e| request_error(e, LOGIN_PATH))?;
        let account = read_account(check_status(response, LOGIN_PATH)?, LOGIN_PATH).await?;
        info!("session started");
        Ok(account)
    }

    /// Fetch the signed-in user's account document.
    pub async fn me(&self) -> Result<Value, TransportError> {
        let url = self.config.endpoint(ME_PATH);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| request_error(e, ME_PATH))?;
        read_account(check_status(response, ME_PATH)?, ME_PATH).await
    }

    pub async fn logout(&self) -> Result<(), TransportError> {
        let url = self.config.endpoint(LOGOUT_PATH);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| request_error(e, LOGOUT_PATH))?;
        check_status(response, LOGOUT_PATH)?;
        info!("session ended");
        Ok(())
    }

    /// Hydrate `store` from `/login` when credentials are configured,
    /// otherwise from `/me` on the existing session.
    pub async fn load_into(&self, store: &ProfileStore) -> Result<()> {
        let account = match self.config.credentials() {
            Some((email, password)) => self.login(email, password).await?,
            None => self.me().await?,
        };
        store.initialize(&account)?;
        Ok(())
    }
}

#[async_trait]
impl ProfileTransport for HttpClient {
    async fn update_profile(&self, payload: &SavePayload) -> Result<(), TransportError> {
        let url = self.config.endpoint(UPDATE_PROFILE_PATH);
        debug!(%url, partitions = payload.len(), "PUT profile update");
        let response = self
            .client
            .put(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| request_error(e, UPDATE_PROFILE_PATH))?;
        check_status(response, UPDATE_PROFILE_PATH)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn check_status(response: Response, endpoint: &str) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(TransportError::from_status(status.as_u16(), endpoint))
    }
}

fn request_error(error: reqwest::Error, endpoint: &str) -> TransportError {
    let kind = if error.is_decode() {
        TransportErrorKind::Decode
    } else {
        TransportErrorKind::Network
    };
    TransportError::with_kind(format!("{endpoint}: {error}"), kind)
}

/// Session endpoints wrap the account as `{"data": …}`; a bare document is
/// accepted as well.
async fn read_account(response: Response, endpoint: &str) -> Result<Value, TransportError> {
    let body: Value = response.json().await.map_err(|e| {
        TransportError::with_kind(format!("{endpoint}: {e}"), TransportErrorKind::Decode)
    })?;
    Ok(unwrap_envelope(body))
}

pub(crate) fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}
