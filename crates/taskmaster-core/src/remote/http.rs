//! REST client for the hosted document store.
//!
//! Documents are addressed as `{base_url}/users/{userId}/{collection}/{id}`;
//! requests carry the session's access token as a bearer credential.

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::ACCEPT, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::RemoteStore;
use crate::auth::AuthSession;
use crate::error::{Error, Result};
use crate::models::{sort_newest_first, Entity};
use crate::util::{compact_text, is_http_url, normalize_text_option, now_millis};

/// Remote store backed by the document store's HTTP API.
pub struct HttpRemoteStore<T: Entity> {
    base_url: String,
    client: reqwest::Client,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> HttpRemoteStore<T> {
    /// Build a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Config(format!("Failed to construct HTTP client: {error}")))?;
        Self::with_client(base_url, client)
    }

    /// Build a store sharing an existing HTTP client.
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url.into())?,
            client,
            _entity: PhantomData,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, user_id: &str) -> String {
        format!(
            "{}/users/{}/{}",
            self.base_url,
            urlencoding::encode(user_id),
            T::COLLECTION
        )
    }

    fn document_url(&self, user_id: &str, id: &T::Id) -> String {
        format!("{}/{id}", self.collection_url(user_id))
    }

    async fn send(request: RequestBuilder, session: &AuthSession) -> Result<Response> {
        request
            .bearer_auth(&session.access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)
    }

    /// Body of a successful response, or the mapped error for any other status.
    async fn success_body(response: Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(map_status(status, &body))
        }
    }

    /// The server's copy of a written document, falling back to what was sent.
    fn echoed_or(body: &str, sent: T) -> T {
        if body.trim().is_empty() {
            return sent;
        }
        match serde_json::from_str(body) {
            Ok(echoed) => echoed,
            Err(error) => {
                tracing::warn!(
                    "Ignoring unreadable {} echoed by the server: {}",
                    T::KIND,
                    error
                );
                sent
            }
        }
    }
}

impl<T: Entity> fmt::Debug for HttpRemoteStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRemoteStore")
            .field("collection", &T::COLLECTION)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T: Entity> RemoteStore<T> for HttpRemoteStore<T> {
    async fn list(&self, session: Option<&AuthSession>) -> Result<Vec<T>> {
        let Some(session) = session else {
            return Ok(Vec::new());
        };

        let request = self
            .client
            .get(self.collection_url(&session.user_id))
            .query(&[("orderBy", "createdAt"), ("direction", "desc")]);
        let body = Self::success_body(Self::send(request, session).await?).await?;

        let mut entities = decode_documents::<T>(&body)?;
        sort_newest_first(&mut entities);
        tracing::debug!("Fetched {} remote {}", entities.len(), T::COLLECTION);
        Ok(entities)
    }

    async fn get(&self, session: Option<&AuthSession>, id: &T::Id) -> Result<Option<T>> {
        let Some(session) = session else {
            return Ok(None);
        };

        let request = self.client.get(self.document_url(&session.user_id, id));
        let response = Self::send(request, session).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = Self::success_body(response).await?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|error| Error::InvalidData(format!("{} {id}: {error}", T::KIND)))
    }

    async fn create(&self, session: Option<&AuthSession>, entity: T) -> Result<T> {
        let session = session.ok_or(Error::NotAuthenticated)?;

        let request = self
            .client
            .put(self.document_url(&session.user_id, &entity.id()))
            .json(&entity);
        let body = Self::success_body(Self::send(request, session).await?).await?;
        Ok(Self::echoed_or(&body, entity))
    }

    async fn update(&self, session: Option<&AuthSession>, mut entity: T) -> Result<T> {
        let session = session.ok_or(Error::NotAuthenticated)?;
        entity.stamp_updated(now_millis());

        let request = self
            .client
            .patch(self.document_url(&session.user_id, &entity.id()))
            .json(&entity);
        let body = Self::success_body(Self::send(request, session).await?).await?;
        Ok(Self::echoed_or(&body, entity))
    }

    async fn delete(&self, session: Option<&AuthSession>, id: &T::Id) -> Result<()> {
        let session = session.ok_or(Error::NotAuthenticated)?;

        let request = self.client.delete(self.document_url(&session.user_id, id));
        Self::success_body(Self::send(request, session).await?).await?;
        Ok(())
    }
}

/// Decode a collection payload, skipping documents that don't parse.
fn decode_documents<T: Entity>(body: &str) -> Result<Vec<T>> {
    let documents: Vec<serde_json::Value> = serde_json::from_str(body).map_err(|error| {
        Error::InvalidData(format!("{} list payload: {error}", T::COLLECTION))
    })?;

    Ok(documents
        .into_iter()
        .filter_map(|document| match serde_json::from_value(document) {
            Ok(entity) => Some(entity),
            Err(error) => {
                tracing::warn!("Skipping malformed remote {}: {}", T::KIND, error);
                None
            }
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", compact_text(&message), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{trimmed} ({})", status.as_u16())
    }
}

/// Classify a non-success response.
fn map_status(status: StatusCode, body: &str) -> Error {
    let message = parse_api_error(status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::PermissionDenied(message),
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::InvalidData(message),
        _ => Error::Network(message),
    }
}

fn map_transport_error(error: reqwest::Error) -> Error {
    if error.is_decode() {
        Error::InvalidData(error.to_string())
    } else {
        Error::Network(error.to_string())
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let base_url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config("remote base URL must not be empty".to_string()))?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "remote base URL must include http:// or https://".to_string(),
        ))
    }
}
