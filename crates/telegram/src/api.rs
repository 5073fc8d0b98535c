//! Bot API transport.
//!
//! The relay talks to exactly two methods, `getUpdates` and `sendMessage`,
//! so the client is a thin JSON-over-POST wrapper behind [`BotApi`].

use std::time::Duration;

use {
    async_trait::async_trait,
    duplex_config::DuplexSettings,
    serde::{Serialize, de::DeserializeOwned},
    tracing::debug,
};

use crate::{
    Error, Result,
    types::{ApiResponse, GetUpdatesRequest, SendMessageRequest, Update},
};

/// The two Bot API calls the relay needs. Tokens are passed per call because
/// the sender and receiver sides use different bots.
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn get_updates(&self, token: &str, request: &GetUpdatesRequest) -> Result<Vec<Update>>;
    async fn send_message(&self, token: &str, request: &SendMessageRequest) -> Result<()>;
}

/// [`BotApi`] over reqwest.
pub struct HttpBotApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBotApi {
    /// `request_timeout` must exceed the long-poll wait, or the client
    /// aborts the request before the provider answers.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::transport("client", e))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn from_settings(settings: &DuplexSettings) -> Result<Self> {
        Self::new(&settings.api_base_url, settings.request_timeout())
    }

    async fn call<B, T>(&self, token: &str, method: &'static str, body: &B) -> Result<Option<T>>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}/bot{token}/{method}", self.base_url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            // The URL embeds the bot token.
            .map_err(|e| Error::transport(method, e.without_url()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::transport(method, e.without_url()))?;

        if !status.is_success() {
            let description = serde_json::from_str::<ApiResponse<serde_json::Value>>(&text)
                .ok()
                .and_then(|r| r.description)
                .unwrap_or_default();
            return Err(Error::transport(
                method,
                format!("HTTP {status} {description}").trim_end(),
            ));
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&text)
            .map_err(|e| Error::transport(method, format!("undecodable response: {e}")))?;
        if !envelope.ok {
            return Err(Error::transport(
                method,
                envelope
                    .description
                    .unwrap_or_else(|| "request rejected".to_string()),
            ));
        }
        Ok(envelope.result)
    }
}

#[async_trait]
impl BotApi for HttpBotApi {
    async fn get_updates(&self, token: &str, request: &GetUpdatesRequest) -> Result<Vec<Update>> {
        let updates: Option<Vec<Update>> = self.call(token, "getUpdates", request).await?;
        let updates = updates.unwrap_or_default();
        debug!(
            offset = request.offset,
            count = updates.len(),
            "got telegram updates"
        );
        Ok(updates)
    }

    async fn send_message(&self, token: &str, request: &SendMessageRequest) -> Result<()> {
        let _: Option<serde_json::Value> = self.call(token, "sendMessage", request).await?;
        debug!(chat_id = %request.chat_id, "telegram message sent");
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        axum::{
            Json, Router,
            body::Bytes,
            extract::State,
            http::{StatusCode, Uri},
            routing::post,
        },
        serde_json::{Value, json},
        std::sync::{Arc, Mutex},
        tokio::sync::oneshot,
    };

    #[derive(Debug, Clone)]
    struct CapturedRequest {
        path: String,
        body: Value,
    }

    #[derive(Clone)]
    struct MockTelegramApi {
        requests: Arc<Mutex<Vec<CapturedRequest>>>,
        reply_status: StatusCode,
        reply: Value,
    }

    async fn telegram_api_handler(
        State(state): State<MockTelegramApi>,
        uri: Uri,
        body: Bytes,
    ) -> (StatusCode, Json<Value>) {
        let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
        state.requests.lock().expect("lock requests").push(CapturedRequest {
            path: uri.path().to_string(),
            body,
        });
        (state.reply_status, Json(state.reply.clone()))
    }

    struct MockServer {
        api: HttpBotApi,
        requests: Arc<Mutex<Vec<CapturedRequest>>>,
        shutdown: Option<oneshot::Sender<()>>,
    }

    impl Drop for MockServer {
        fn drop(&mut self) {
            if let Some(tx) = self.shutdown.take() {
                let _ = tx.send(());
            }
        }
    }

    async fn serve(reply_status: StatusCode, reply: Value) -> MockServer {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/{*path}", post(telegram_api_handler))
            .with_state(MockTelegramApi {
                requests: Arc::clone(&requests),
                reply_status,
                reply,
            });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("serve mock telegram api");
        });

        let api = HttpBotApi::new(format!("http://{addr}/"), Duration::from_secs(5)).unwrap();
        MockServer {
            api,
            requests,
            shutdown: Some(shutdown_tx),
        }
    }

    #[tokio::test]
    async fn get_updates_posts_expected_body() {
        let server = serve(
            StatusCode::OK,
            json!({
                "ok": true,
                "result": [
                    { "update_id": 10, "channel_post": { "message_id": 3, "date": 100, "text": "Bob:\nhey" } }
                ]
            }),
        )
        .await;

        let updates = server
            .api
            .get_updates("123:abc", &GetUpdatesRequest::channel_posts(10, 60))
            .await
            .unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].update_id, 10);

        let requests = server.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/bot123:abc/getUpdates");
        assert_eq!(
            requests[0].body,
            json!({ "offset": 10, "timeout": 60, "allowed_updates": ["channel_post"] })
        );
    }

    #[tokio::test]
    async fn missing_result_is_zero_updates() {
        let server = serve(StatusCode::OK, json!({ "ok": true })).await;
        let updates = server
            .api
            .get_updates("t", &GetUpdatesRequest::channel_posts(0, 1))
            .await
            .unwrap();
        assert!(updates.is_empty());
    }

    #[tokio::test]
    async fn send_message_posts_chat_and_text() {
        let server = serve(
            StatusCode::OK,
            json!({ "ok": true, "result": { "message_id": 1, "date": 0 } }),
        )
        .await;

        let request = SendMessageRequest {
            chat_id: "@alice_out".into(),
            text: "Alice:\nhello".into(),
        };
        server.api.send_message("111:aaa", &request).await.unwrap();

        let requests = server.requests.lock().unwrap().clone();
        assert_eq!(requests[0].path, "/bot111:aaa/sendMessage");
        assert_eq!(
            requests[0].body,
            json!({ "chat_id": "@alice_out", "text": "Alice:\nhello" })
        );
    }

    #[tokio::test]
    async fn non_success_status_is_transport_failure() {
        let server = serve(
            StatusCode::UNAUTHORIZED,
            json!({ "ok": false, "error_code": 401, "description": "Unauthorized" }),
        )
        .await;

        let err = server
            .api
            .get_updates("bad", &GetUpdatesRequest::channel_posts(0, 1))
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("Unauthorized"));
        assert!(!err.to_string().contains("bad"));
    }

    #[tokio::test]
    async fn ok_false_is_transport_failure() {
        let server = serve(
            StatusCode::OK,
            json!({ "ok": false, "description": "Bad Request: chat not found" }),
        )
        .await;

        let request = SendMessageRequest {
            chat_id: "@nowhere".into(),
            text: "x".into(),
        };
        let err = server.api.send_message("t", &request).await.unwrap_err();
        assert!(err.to_string().contains("chat not found"));
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_failure() {
        let api = HttpBotApi::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = api
            .get_updates("secret-token", &GetUpdatesRequest::channel_posts(0, 1))
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(!err.to_string().contains("secret-token"));
    }
}
