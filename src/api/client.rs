use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::models::*;
use crate::identity::PeerIdentity;
use crate::shared::BridgeError;

/// Supplies the anti-forgery token attached to mutating requests.
///
/// Injected into the HTTP client instead of patching some global request
/// primitive; a `None` token simply omits the header.
pub trait TokenProvider: Send + Sync {
    fn csrf_token(&self) -> Option<String>;
}

/// Token provider backed by a fixed token (or none at all).
pub struct StaticTokenProvider(Option<String>);

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self(token)
    }
}

impl TokenProvider for StaticTokenProvider {
    fn csrf_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// REST collaborator of the coordinator, one method per backend endpoint.
///
/// The trait returns acknowledgments as the server sent them, including
/// `success: false` rejections; deciding what a rejection means (publish
/// nothing, notify, return an error) is the coordinator's job.
#[async_trait]
pub trait ConnectionApi: Send + Sync {
    async fn resolve_identity(&self) -> Result<IdentityInfo, BridgeError>;

    async fn send_message(&self, request: &SendMessageRequest)
        -> Result<SendMessageAck, BridgeError>;

    async fn fetch_messages(
        &self,
        identity: &PeerIdentity,
        limit: u32,
        offset: u32,
    ) -> Result<MessagePage, BridgeError>;

    async fn sync_appointment(
        &self,
        request: &SyncAppointmentRequest,
    ) -> Result<ApiAck, BridgeError>;

    async fn fetch_appointments(
        &self,
        identity: &PeerIdentity,
        status: &str,
        limit: u32,
    ) -> Result<AppointmentPage, BridgeError>;

    async fn share_resource(&self, request: &ShareResourceRequest) -> Result<ApiAck, BridgeError>;

    async fn fetch_shared_resources(
        &self,
        identity: &PeerIdentity,
        limit: u32,
    ) -> Result<ResourcePage, BridgeError>;

    async fn fetch_notifications(
        &self,
        limit: u32,
        unread_only: bool,
    ) -> Result<NotificationPage, BridgeError>;

    async fn mark_notification_read(&self, notification_id: &str) -> Result<ApiAck, BridgeError>;

    async fn connection_status(
        &self,
        identity: &PeerIdentity,
    ) -> Result<ConnectionStatusResponse, BridgeError>;
}

/// `ConnectionApi` over HTTP, speaking the backend's JSON wire format.
pub struct HttpConnectionApi {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpConnectionApi {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, BridgeError> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let response = self.http.get(&url).query(query).send().await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BridgeError> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        let mut request = self.http.post(&url).json(body);
        if let Some(token) = self.tokens.csrf_token() {
            request = request.header("X-CSRFToken", token);
        }
        let response = request.send().await?;
        Self::decode(response).await
    }

    /// Decode a response, distinguishing network-level failures from
    /// shape-level ones.
    ///
    /// The backend answers errors either as JSON `{"error": ...}` bodies or,
    /// when a proxy or login redirect gets in the way, as HTML pages; both
    /// forms are sniffed here so callers see a single taxonomy.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BridgeError> {
        let status = response.status();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("application/json"))
            .unwrap_or(false);

        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(BridgeError::network(format!(
                "authentication required ({})",
                status.as_u16()
            )));
        }

        if !is_json {
            return Err(BridgeError::protocol(format!(
                "non-JSON response (status {})",
                status.as_u16()
            )));
        }

        if !status.is_success() {
            // Error statuses still carry a JSON body with the reason.
            let body: serde_json::Value = response.json().await?;
            let reason = body
                .get("error")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
            return Err(BridgeError::Network(reason));
        }

        let body = response.json::<T>().await.map_err(|e| {
            BridgeError::protocol(format!("unexpected response shape: {}", e))
        })?;
        Ok(body)
    }
}

#[async_trait]
impl ConnectionApi for HttpConnectionApi {
    async fn resolve_identity(&self) -> Result<IdentityInfo, BridgeError> {
        self.get_json("get-navigation-links", &[]).await
    }

    async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageAck, BridgeError> {
        self.post_json("send-message", request).await
    }

    async fn fetch_messages(
        &self,
        identity: &PeerIdentity,
        limit: u32,
        offset: u32,
    ) -> Result<MessagePage, BridgeError> {
        self.get_json(
            "get-messages",
            &[
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
                ("student_id", identity.student_id.to_string()),
                ("therapist_id", identity.therapist_id.to_string()),
            ],
        )
        .await
    }

    async fn sync_appointment(
        &self,
        request: &SyncAppointmentRequest,
    ) -> Result<ApiAck, BridgeError> {
        self.post_json("sync-appointment", request).await
    }

    async fn fetch_appointments(
        &self,
        identity: &PeerIdentity,
        status: &str,
        limit: u32,
    ) -> Result<AppointmentPage, BridgeError> {
        self.get_json(
            "get-shared-appointments",
            &[
                ("status", status.to_string()),
                ("limit", limit.to_string()),
                ("student_id", identity.student_id.to_string()),
                ("therapist_id", identity.therapist_id.to_string()),
            ],
        )
        .await
    }

    async fn share_resource(&self, request: &ShareResourceRequest) -> Result<ApiAck, BridgeError> {
        self.post_json("share-resource", request).await
    }

    async fn fetch_shared_resources(
        &self,
        identity: &PeerIdentity,
        limit: u32,
    ) -> Result<ResourcePage, BridgeError> {
        self.get_json(
            "get-shared-resources",
            &[
                ("limit", limit.to_string()),
                ("student_id", identity.student_id.to_string()),
                ("therapist_id", identity.therapist_id.to_string()),
            ],
        )
        .await
    }

    async fn fetch_notifications(
        &self,
        limit: u32,
        unread_only: bool,
    ) -> Result<NotificationPage, BridgeError> {
        self.get_json(
            "get-notifications",
            &[
                ("limit", limit.to_string()),
                ("unread_only", unread_only.to_string()),
            ],
        )
        .await
    }

    async fn mark_notification_read(&self, notification_id: &str) -> Result<ApiAck, BridgeError> {
        let path = format!("mark-notification-read/{}", notification_id);
        self.post_json(&path, &serde_json::json!({})).await
    }

    async fn connection_status(
        &self,
        identity: &PeerIdentity,
    ) -> Result<ConnectionStatusResponse, BridgeError> {
        self.get_json(
            "get-connection-status",
            &[
                ("student_id", identity.student_id.to_string()),
                ("therapist_id", identity.therapist_id.to_string()),
            ],
        )
        .await
    }
}
