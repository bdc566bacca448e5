//! client
//!
//! HTTP client for a Parseable server.
//!
//! # Design
//!
//! One [`ServerClient`] is built per command from the resolved profile. It
//! authenticates every request with basic auth and maps non-success
//! responses to [`ClientError`]. There are no retries.
//!
//! # Endpoints
//!
//! | Operation            | Request                                |
//! |----------------------|----------------------------------------|
//! | list streams         | `GET    /api/v1/logstream`             |
//! | create stream        | `PUT    /api/v1/logstream/{name}`      |
//! | delete stream        | `DELETE /api/v1/logstream/{name}`      |
//! | stream stats         | `GET    /api/v1/logstream/{name}/stats`|
//! | list users           | `GET    /api/v1/user`                  |
//! | create user          | `POST   /api/v1/user/{name}`           |
//! | delete user          | `DELETE /api/v1/user/{name}`           |
//! | set user roles       | `PUT    /api/v1/user/{name}/role`      |
//! | list roles           | `GET    /api/v1/role`                  |
//! | create role          | `PUT    /api/v1/role/{name}`           |
//! | delete role          | `DELETE /api/v1/role/{name}`           |
//! | query                | `POST   /api/v1/query`                 |
//! | saved queries        | `GET    /api/v1/filters/{user}`        |

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::engine::ResolvedProfile;

const USER_AGENT_VALUE: &str = concat!("pb/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const API_PREFIX: [&str; 2] = ["api", "v1"];

/// Errors from server requests.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The profile URL cannot serve as an API base.
    #[error("invalid server url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Credentials were rejected.
    #[error("authentication failed for user '{username}'; check the profile's credentials")]
    Unauthorized { username: String },

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// The response body was not what the endpoint promises.
    #[error("unexpected response from server: {0}")]
    Decode(String),
}

/// A log stream as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StreamInfo {
    pub name: String,
}

/// Ingestion and storage figures for one stream.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StreamStats {
    #[serde(default)]
    pub stream: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub ingestion: IngestionStats,
    #[serde(default)]
    pub storage: StorageStats,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct IngestionStats {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub format: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StorageStats {
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub format: String,
}

/// A user as listed by the server.
///
/// Older servers list bare names; newer ones list objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UserEntry {
    Name(String),
    Detailed {
        id: String,
        #[serde(default)]
        method: Option<String>,
    },
}

impl UserEntry {
    pub fn id(&self) -> &str {
        match self {
            UserEntry::Name(name) => name,
            UserEntry::Detailed { id, .. } => id,
        }
    }
}

/// One privilege granted by a role.
///
/// Stream-scoped privileges carry the stream as their resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePrivilege {
    pub privilege: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<RoleResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleResource {
    pub stream: String,
}

/// A query saved on the server by a user.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SavedQuery {
    #[serde(default)]
    pub filter_id: Option<String>,
    pub filter_name: String,
    #[serde(default)]
    pub stream_name: String,
    #[serde(default)]
    pub query: SavedQueryText,
    #[serde(default)]
    pub time_filter: Option<TimeFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SavedQueryText {
    #[serde(default)]
    pub filter_type: String,
    #[serde(default)]
    pub filter_query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeFilter {
    pub from: String,
    pub to: String,
}

/// Body of `POST /api/v1/query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    pub start_time: String,
    pub end_time: String,
}

/// Error body returned by the server for some failures.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: String,
}

/// Authenticated client for one profile.
pub struct ServerClient {
    client: Client,
    base: Url,
    username: String,
    password: String,
}

// Custom Debug to keep the password out of logs
impl std::fmt::Debug for ServerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerClient")
            .field("base", &self.base.as_str())
            .field("username", &self.username)
            .field("has_password", &!self.password.is_empty())
            .finish()
    }
}

impl ServerClient {
    /// Build a client for a resolved profile.
    pub fn new(target: &ResolvedProfile) -> Result<Self, ClientError> {
        let base = target
            .profile
            .endpoint(&target.name)
            .map_err(|e| ClientError::InvalidUrl {
                url: target.profile.url.clone(),
                reason: e.to_string(),
            })?;
        Self::with_base(base, &target.profile.username, &target.profile.password)
    }

    /// Build a client for an explicit base URL.
    pub fn with_base(base: Url, username: &str, password: &str) -> Result<Self, ClientError> {
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl {
                url: base.to_string(),
                reason: "cannot be used as a base url".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// The server base URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    pub async fn list_streams(&self) -> Result<Vec<StreamInfo>, ClientError> {
        let response = self.send(self.request(Method::GET, &["logstream"])?).await?;
        decode(response).await
    }

    pub async fn create_stream(&self, name: &str) -> Result<(), ClientError> {
        self.send(self.request(Method::PUT, &["logstream", name])?)
            .await
            .map(drop)
    }

    pub async fn delete_stream(&self, name: &str) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, &["logstream", name])?)
            .await
            .map(drop)
    }

    pub async fn stream_stats(&self, name: &str) -> Result<StreamStats, ClientError> {
        let response = self
            .send(self.request(Method::GET, &["logstream", name, "stats"])?)
            .await?;
        decode(response).await
    }

    pub async fn list_users(&self) -> Result<Vec<UserEntry>, ClientError> {
        let response = self.send(self.request(Method::GET, &["user"])?).await?;
        decode(response).await
    }

    /// Create a user, returning the password generated by the server.
    pub async fn create_user(&self, name: &str, roles: &[String]) -> Result<String, ClientError> {
        let mut request = self.request(Method::POST, &["user", name])?;
        if !roles.is_empty() {
            request = request.json(roles);
        }
        let response = self.send(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(body.trim().trim_matches('"').to_string())
    }

    pub async fn delete_user(&self, name: &str) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, &["user", name])?)
            .await
            .map(drop)
    }

    /// Replace a user's roles.
    pub async fn set_user_roles(&self, name: &str, roles: &[String]) -> Result<(), ClientError> {
        let request = self.request(Method::PUT, &["user", name, "role"])?.json(roles);
        self.send(request).await.map(drop)
    }

    pub async fn list_roles(&self) -> Result<Vec<String>, ClientError> {
        let response = self.send(self.request(Method::GET, &["role"])?).await?;
        decode(response).await
    }

    /// Create or replace a role with the given privileges.
    pub async fn create_role(
        &self,
        name: &str,
        privileges: &[RolePrivilege],
    ) -> Result<(), ClientError> {
        let request = self.request(Method::PUT, &["role", name])?.json(privileges);
        self.send(request).await.map(drop)
    }

    pub async fn delete_role(&self, name: &str) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, &["role", name])?)
            .await
            .map(drop)
    }

    /// Run a SQL query, returning the records as JSON values.
    pub async fn query(&self, query: &QueryRequest) -> Result<Vec<serde_json::Value>, ClientError> {
        let request = self.request(Method::POST, &["query"])?.json(query);
        let response = self.send(request).await?;
        decode(response).await
    }

    /// Saved queries owned by the authenticated user.
    pub async fn list_saved_queries(&self) -> Result<Vec<SavedQuery>, ClientError> {
        let response = self
            .send(self.request(Method::GET, &["filters", self.username.as_str()])?)
            .await?;
        decode(response).await
    }

    /// URL for an API path, with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl {
                url: self.base.to_string(),
                reason: "cannot be used as a base url".to_string(),
            })?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        let url = self.url(segments)?;
        debug!(%method, %url, "server request");
        Ok(self
            .client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password)))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized {
                username: self.username.clone(),
            });
        }

        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => body.message,
            Err(_) if text.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
            Err(_) => text.trim().to_string(),
        };

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    response
        .json()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}
