// Async HTTP client for the Flair cloud API.
//
// Base path: /api/
// Auth: OAuth2 client-credentials bearer token from /oauth2/token

use std::collections::HashMap;
use std::time::{Duration, Instant};

use futures_util::future::{join_all, try_join_all};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::auth::{AccessToken, ClientCredentials, DEFAULT_SCOPE, TokenResponse};
use crate::resource::{
    AccountSummary, Document, FlairData, Resource, ResourceKind, StructureData,
};
use crate::transport::TransportConfig;
use crate::Error;

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://api.flair.co";

const BODY_PREVIEW_LEN: usize = 200;

// ── Error response shape ─────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<ErrorObject>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(serde::Deserialize)]
struct ErrorObject {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl ErrorResponse {
    fn into_message(self) -> Option<String> {
        self.errors
            .into_iter()
            .find_map(|e| e.detail.or(e.title))
            .or(self.message)
            .or(self.error_description)
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the Flair REST API.
///
/// Holds one cached bearer token, fetched lazily on first use and
/// re-fetched when it nears expiry or the API answers 401.
pub struct FlairClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: ClientCredentials,
    token: Mutex<Option<AccessToken>>,
    timeout: Duration,
}

impl FlairClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Client against the production API host.
    pub fn new(credentials: ClientCredentials, transport: &TransportConfig) -> Result<Self, Error> {
        Self::with_base_url(DEFAULT_BASE_URL, credentials, transport)
    }

    /// Client against an arbitrary host (staging, mock servers).
    pub fn with_base_url(
        base_url: &str,
        credentials: ClientCredentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let base_url = normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            credentials,
            token: Mutex::new(None),
            timeout: transport.timeout,
        })
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        credentials: ClientCredentials,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
            credentials,
            token: Mutex::new(None),
            timeout: crate::transport::DEFAULT_TIMEOUT,
        })
    }

    /// The client id these credentials belong to.
    pub fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Fetch a fresh token now, replacing any cached one.
    pub async fn authenticate(&self) -> Result<(), Error> {
        let token = self.request_token().await?;
        *self.token.lock().await = Some(token);
        Ok(())
    }

    /// Drop the cached token so the next call re-authenticates.
    pub async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn bearer(&self) -> Result<SecretString, Error> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.secret.clone());
        }
        let token = self.request_token().await?;
        let secret = token.secret.clone();
        *guard = Some(token);
        Ok(secret)
    }

    async fn request_token(&self) -> Result<AccessToken, Error> {
        let url = self.url("oauth2/token")?;
        debug!("POST {url}");

        let form = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.expose_secret()),
            ("grant_type", "client_credentials"),
            ("scope", DEFAULT_SCOPE),
        ];

        let resp = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = resp.status();
        if matches!(status.as_u16(), 400 | 401 | 403) {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(ErrorResponse::into_message)
                .unwrap_or_else(|| format!("token request rejected (HTTP {status})"));
            return Err(Error::Authentication { message });
        }

        let parsed: TokenResponse = self.handle_response(resp).await?;
        debug!("obtained access token");
        Ok(AccessToken::from_response(parsed, Instant::now()))
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let bearer = self.bearer().await?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(bearer.expose_secret())
            .header(reqwest::header::ACCEPT, "application/vnd.api+json")
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        self.handle_response(resp).await
    }

    async fn patch<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("PATCH {url}");

        let bearer = self.bearer().await?;
        let resp = self
            .http
            .patch(url)
            .bearer_auth(bearer.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await.map_err(|e| self.map_transport(e))?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(BODY_PREVIEW_LEN).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.invalidate_token().await;
            return Error::Authentication {
                message: "access token rejected (HTTP 401)".into(),
            };
        }

        let raw = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&raw)
            .ok()
            .and_then(ErrorResponse::into_message)
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    status.canonical_reason().unwrap_or("unknown error").to_owned()
                } else {
                    raw.chars().take(BODY_PREVIEW_LEN).collect()
                }
            });

        Error::Api {
            status: status.as_u16(),
            message,
        }
    }

    fn map_transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// `GET /api/users`
    pub async fn get_users(&self) -> Result<Vec<Resource>, Error> {
        let doc: Document<Vec<Resource>> = self.get("api/users").await?;
        Ok(doc.data)
    }

    /// `GET /api/structures`
    pub async fn get_structures(&self) -> Result<Vec<Resource>, Error> {
        let doc: Document<Vec<Resource>> = self.get("api/structures").await?;
        Ok(doc.data)
    }

    /// `GET /api/structures/{id}/{kind}`
    pub async fn get_structure_resources(
        &self,
        structure_id: &str,
        kind: ResourceKind,
    ) -> Result<Vec<Resource>, Error> {
        let doc: Document<Vec<Resource>> = self
            .get(&format!("api/structures/{structure_id}/{kind}"))
            .await?;
        Ok(doc.data)
    }

    /// `GET /api/{kind}/{id}/current-reading`, attributes only.
    pub async fn get_current_reading(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> Result<Map<String, Value>, Error> {
        let doc: Document<Resource> = self
            .get(&format!("api/{kind}/{id}/current-reading"))
            .await?;
        Ok(doc.data.attributes)
    }

    /// Pull every structure and all of its devices in one pass.
    ///
    /// Current readings are best-effort: a puck or vent whose reading
    /// fails to load is kept without one.
    pub async fn get_flair_data(&self) -> Result<FlairData, Error> {
        let structures = self.get_structures().await?;
        let structures =
            try_join_all(structures.into_iter().map(|s| self.get_structure_data(s))).await?;

        debug!(structures = structures.len(), "fetched flair data");
        Ok(FlairData { structures })
    }

    async fn get_structure_data(&self, structure: Resource) -> Result<StructureData, Error> {
        let id = structure.id.as_str();
        let (pucks, vents, rooms, bridges, hvac_units, schedules) = tokio::try_join!(
            self.get_structure_resources(id, ResourceKind::Pucks),
            self.get_structure_resources(id, ResourceKind::Vents),
            self.get_structure_resources(id, ResourceKind::Rooms),
            self.get_structure_resources(id, ResourceKind::Bridges),
            self.get_structure_resources(id, ResourceKind::HvacUnits),
            self.get_structure_resources(id, ResourceKind::Schedules),
        )?;

        let reading_targets = pucks
            .iter()
            .map(|p| (ResourceKind::Pucks, p.id.as_str()))
            .chain(vents.iter().map(|v| (ResourceKind::Vents, v.id.as_str())));

        let readings = join_all(reading_targets.map(|(kind, device_id)| async move {
            match self.get_current_reading(kind, device_id).await {
                Ok(attrs) => Some((device_id.to_owned(), attrs)),
                Err(e) => {
                    debug!(%kind, device_id, error = %e, "current reading unavailable");
                    None
                }
            }
        }))
        .await;

        let current_readings: HashMap<_, _> = readings.into_iter().flatten().collect();

        Ok(StructureData {
            structure,
            pucks,
            vents,
            rooms,
            bridges,
            hvac_units,
            schedules,
            current_readings,
        })
    }

    /// Check that the credentials work and the account is usable.
    pub async fn validate(&self) -> Result<AccountSummary, Error> {
        let (users, structures) = tokio::try_join!(self.get_users(), self.get_structures())?;
        if users.is_empty() {
            return Err(Error::NoUsers);
        }
        if structures.is_empty() {
            return Err(Error::NoStructures);
        }
        Ok(AccountSummary { users, structures })
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// `PATCH /api/{kind}/{id}` with the given attributes and relationships.
    pub async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        attributes: &Map<String, Value>,
        relationships: &Map<String, Value>,
    ) -> Result<(), Error> {
        let body = json!({
            "data": {
                "type": kind.as_str(),
                "id": id,
                "attributes": attributes,
                "relationships": relationships,
            }
        });
        self.patch(&format!("api/{kind}/{id}"), &body).await
    }
}

/// Base URLs always end with `/` so relative joins keep the full path.
fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    let path = url.path().trim_end_matches('/').to_owned();
    url.set_path(&format!("{path}/"));
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = normalize_base_url("http://localhost:8080/proxy").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/proxy/");
        assert_eq!(
            url.join("api/structures").unwrap().as_str(),
            "http://localhost:8080/proxy/api/structures"
        );
    }

    #[test]
    fn error_message_prefers_detail() {
        let parsed: ErrorResponse = serde_json::from_str(
            r#"{"errors":[{"status":"422","title":"Unprocessable","detail":"bad set point"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.into_message().as_deref(), Some("bad set point"));
    }
}
