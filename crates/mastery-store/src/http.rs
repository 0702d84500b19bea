//! REST document-store adapter.
//!
//! Endpoints, relative to the configured base URL:
//!
//! - `GET    users/{user}/evaluations`       → JSON array of events
//! - `POST   users/{user}/evaluations`       → the stored event
//! - `DELETE users/{user}/evaluations/{id}`  → 2xx, or 404 if already gone
//!
//! Every request carries the bearer token of the signed-in [`Session`].

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::instrument;

use mastery_core::error::StoreError;
use mastery_core::model::{EvaluationEvent, EventId, NewEvaluation, UserId};
use mastery_core::session::Session;
use mastery_core::traits::EventStore;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_CONCURRENT_DELETES: usize = 8;

/// Event store backed by a remote document API.
pub struct HttpEventStore {
    base_url: Url,
    client: Client,
    timeout_secs: u64,
    session: RwLock<Option<Session>>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl HttpEventStore {
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(base_url: &str, timeout_secs: u64) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StoreError::InvalidKey(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidKey(format!(
                "base URL '{base_url}' cannot hold a path"
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            client,
            timeout_secs,
            session: RwLock::new(None),
        })
    }

    /// Builder form of [`sign_in`](Self::sign_in) for use before the store is shared.
    pub fn with_session(self, session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
            ..self
        }
    }

    /// Start acting on behalf of the session's user.
    pub async fn sign_in(&self, session: Session) {
        tracing::info!(user = %session.user_id(), "signed in");
        *self.session.write().await = Some(session);
    }

    /// Drop the active session, returning it if there was one.
    pub async fn sign_out(&self) -> Option<Session> {
        let previous = self.session.write().await.take();
        if let Some(session) = &previous {
            tracing::info!(user = %session.user_id(), "signed out");
        }
        previous
    }

    pub async fn session_user(&self) -> Option<UserId> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.user_id().clone())
    }

    async fn bearer_for(&self, user: &UserId) -> Result<String, StoreError> {
        let guard = self.session.read().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| StoreError::AuthenticationFailed("no active session".into()))?;
        if !session.authorizes(user) {
            return Err(StoreError::AuthenticationFailed(format!(
                "session belongs to '{}', not '{user}'",
                session.user_id()
            )));
        }
        Ok(format!("Bearer {}", session.access_token()))
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `with_timeout` rejected cannot-be-a-base URLs, so this is always Ok.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn collection_url(&self, user: &UserId) -> Url {
        self.url(&["users", user.as_str(), "evaluations"])
    }

    fn send_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Unavailable(format!("request timed out after {}s", self.timeout_secs))
        } else {
            StoreError::Unavailable(e.to_string())
        }
    }

    async fn delete_one(
        &self,
        user: &UserId,
        id: &EventId,
        bearer: &str,
    ) -> Result<bool, StoreError> {
        let url = self.url(&["users", user.as_str(), "evaluations", id.as_str()]);
        let response = self
            .client
            .delete(url)
            .header("authorization", bearer)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        if response.status().as_u16() == 404 {
            tracing::debug!(event_id = %id, "event already gone");
            return Ok(false);
        }
        check_status(response).await?;
        Ok(true)
    }
}

/// Map non-success responses onto store errors.
async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    Err(match status {
        401 | 403 => StoreError::AuthenticationFailed(message),
        s if s >= 500 => StoreError::Unavailable(format!("HTTP {status}: {message}")),
        _ => StoreError::Rejected { status, message },
    })
}

#[async_trait]
impl EventStore for HttpEventStore {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip_all, fields(user = %user))]
    async fn list_by_user(&self, user: &UserId) -> Result<Vec<EvaluationEvent>, StoreError> {
        let bearer = self.bearer_for(user).await?;
        let response = self
            .client
            .get(self.collection_url(user))
            .header("authorization", bearer)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = check_status(response).await?;

        let documents: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| StoreError::Corrupt(format!("failed to parse event list: {e}")))?;

        let total = documents.len();
        let events: Vec<EvaluationEvent> = documents
            .into_iter()
            .filter_map(|doc| match serde_json::from_value(doc) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!("skipping undecodable event: {e}");
                    None
                }
            })
            .collect();
        tracing::debug!(total, decoded = events.len(), "fetched events");
        Ok(events)
    }

    #[instrument(skip_all, fields(user = %user))]
    async fn append(
        &self,
        user: &UserId,
        event: NewEvaluation,
    ) -> Result<EvaluationEvent, StoreError> {
        let bearer = self.bearer_for(user).await?;
        let response = self
            .client
            .post(self.collection_url(user))
            .header("authorization", bearer)
            .json(&event)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = check_status(response).await?;

        response
            .json::<EvaluationEvent>()
            .await
            .map_err(|e| StoreError::Corrupt(format!("failed to parse stored event: {e}")))
    }

    #[instrument(skip_all, fields(user = %user, requested = ids.len()))]
    async fn delete_many(&self, user: &UserId, ids: &[EventId]) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let bearer = self.bearer_for(user).await?;
        let bearer = bearer.as_str();
        let results: Vec<Result<bool, StoreError>> = stream::iter(ids.iter().cloned())
            .map(move |id| async move { self.delete_one(user, &id, bearer).await })
            .buffer_unordered(MAX_CONCURRENT_DELETES)
            .collect()
            .await;

        let mut deleted = 0usize;
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            return Ok(deleted);
        }
        if deleted == 0 {
            return Err(errors.swap_remove(0));
        }
        tracing::warn!(
            deleted,
            failed = errors.len(),
            "batch delete partially failed: {}",
            errors[0]
        );
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mastery_core::model::{SourceType, TopicId};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const EVENTS_PATH: &str = "/users/learner-1/evaluations";

    fn event_json(id: &str, topics: &[&str], score: f64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "topic_ids": topics,
            "source_type": "past-exam",
            "source_ref": "2024 midterm",
            "occurred_at": "2026-02-01T09:00:00Z",
            "performance_score": score,
            "created_at": "2026-02-01T09:05:00Z"
        })
    }

    async fn signed_in_store(server: &MockServer) -> HttpEventStore {
        let store = HttpEventStore::new(&server.uri()).unwrap();
        store.sign_in(Session::new("learner-1", "tok-123")).await;
        store
    }

    fn user() -> UserId {
        UserId::from("learner-1")
    }

    #[tokio::test]
    async fn lists_events_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(EVENTS_PATH))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                event_json("e1", &["algebra", "ratios"], 80.0),
                event_json("e2", &["ratios"], 45.0),
            ])))
            .mount(&server)
            .await;

        let store = signed_in_store(&server).await;
        let events = store.list_by_user(&user()).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].source_type, SourceType::PastExam);
        assert_eq!(events[1].performance_score, 45.0);
    }

    #[tokio::test]
    async fn skips_undecodable_documents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(EVENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                event_json("e1", &["algebra"], 80.0),
                {"id": "broken"},
            ])))
            .mount(&server)
            .await;

        let store = signed_in_store(&server).await;
        let events = store.list_by_user(&user()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id.as_str(), "e1");
    }

    #[tokio::test]
    async fn append_returns_stored_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(EVENTS_PATH))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(event_json("srv-1", &["algebra"], 70.0)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = signed_in_store(&server).await;
        let stored = store
            .append(
                &user(),
                NewEvaluation {
                    topic_ids: vec![TopicId::from("algebra")],
                    source_type: SourceType::PastExam,
                    source_ref: None,
                    occurred_at: Utc::now(),
                    performance_score: 70.0,
                    evaluation_tier: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(stored.id.as_str(), "srv-1");
    }

    #[tokio::test]
    async fn requires_a_session_for_the_same_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let store = HttpEventStore::new(&server.uri()).unwrap();
        let err = store.list_by_user(&user()).await.unwrap_err();
        assert!(matches!(err, StoreError::AuthenticationFailed(_)));

        store.sign_in(Session::new("someone-else", "tok")).await;
        let err = store.list_by_user(&user()).await.unwrap_err();
        assert!(err.to_string().contains("someone-else"));

        assert!(store.sign_out().await.is_some());
        assert!(store.session_user().await.is_none());
    }

    #[tokio::test]
    async fn server_errors_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(EVENTS_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let store = signed_in_store(&server).await;
        let err = store.list_by_user(&user()).await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("maintenance"));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_authentication_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(EVENTS_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "token expired"}
            })))
            .mount(&server)
            .await;

        let store = signed_in_store(&server).await;
        let err = store
            .append(
                &user(),
                NewEvaluation {
                    topic_ids: vec![TopicId::from("algebra")],
                    source_type: SourceType::FreePractice,
                    source_ref: None,
                    occurred_at: Utc::now(),
                    performance_score: 10.0,
                    evaluation_tier: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AuthenticationFailed(ref m) if m == "token expired"));
    }

    #[tokio::test]
    async fn partial_batch_delete_reports_true_count() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("{EVENTS_PATH}/e1")))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("{EVENTS_PATH}/e2")))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("{EVENTS_PATH}/e3")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = signed_in_store(&server).await;
        let deleted = store
            .delete_many(&user(), &["e1".into(), "e2".into(), "e3".into()])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn batch_larger_than_concurrency_bound_deletes_all() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(204))
            .expect(20)
            .mount(&server)
            .await;

        let store = signed_in_store(&server).await;
        let ids: Vec<EventId> = (0..20).map(|i| EventId::new(format!("e{i}"))).collect();
        let deleted = store.delete_many(&user(), &ids).await.unwrap();
        assert_eq!(deleted, 20);
    }

    #[tokio::test]
    async fn fully_failed_batch_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let store = signed_in_store(&server).await;
        let err = store
            .delete_many(&user(), &["e1".into(), "e2".into()])
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(HttpEventStore::new("not a url").is_err());
        assert!(HttpEventStore::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn urls_keep_base_path_and_encode_segments() {
        let store = HttpEventStore::new("https://docs.example.com/api/v1/").unwrap();
        let url = store.collection_url(&UserId::from("a b"));
        assert_eq!(
            url.as_str(),
            "https://docs.example.com/api/v1/users/a%20b/evaluations"
        );
    }
}
