//! Webhook HTTP server
//!
//! QQ posts every callback to one URL. Validation requests are answered
//! inline; message events are acknowledged at once and handled in the
//! background so slow chat API calls never time out the callback.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::core::InboundMessage;
use crate::dispatcher::MessageDispatcher;
use crate::gateway::payload::{
    CallbackAck, GroupAtMessage, ValidationRequest, ValidationResponse, WebhookPayload,
    GROUP_AT_MESSAGE_CREATE, OP_CALLBACK_VALIDATION, OP_DISPATCH,
};
use crate::gateway::signature::WebhookSigner;

/// Signature header
pub const SIGNATURE_HEADER: &str = "X-Signature-Ed25519";

/// Signature timestamp header
pub const TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

/// Shared state of the webhook handlers
#[derive(Clone)]
pub struct GatewayState {
    /// Handles inbound messages
    pub dispatcher: Arc<MessageDispatcher>,
    /// Signs validation answers and checks event signatures
    pub signer: Arc<WebhookSigner>,
    /// Reject events with missing or bad signatures
    pub verify_signatures: bool,
}

/// Build the webhook router
pub fn build_router(state: GatewayState, callback_path: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(callback_path, post(callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

fn check_signature(state: &GatewayState, headers: &HeaderMap, body: &[u8]) -> Result<(), Response> {
    if !state.verify_signatures {
        return Ok(());
    }

    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let (Some(signature), Some(timestamp)) = (header(SIGNATURE_HEADER), header(TIMESTAMP_HEADER))
    else {
        warn!("Callback without signature headers rejected");
        return Err((StatusCode::UNAUTHORIZED, "missing signature").into_response());
    };

    state.signer.verify(timestamp, body, signature).map_err(|e| {
        warn!("Callback rejected: {}", e);
        (StatusCode::UNAUTHORIZED, "invalid signature").into_response()
    })
}

async fn callback(State(state): State<GatewayState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(rejection) = check_signature(&state, &headers, &body) {
        return rejection;
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Malformed callback payload: {}", e);
            return (StatusCode::BAD_REQUEST, "malformed payload").into_response();
        }
    };

    match payload.op {
        OP_CALLBACK_VALIDATION => validate(&state, payload),
        OP_DISPATCH => {
            dispatch(&state, payload).await;
            Json(CallbackAck::default()).into_response()
        }
        op => {
            debug!("Ignoring callback op {}", op);
            Json(CallbackAck::default()).into_response()
        }
    }
}

fn validate(state: &GatewayState, payload: WebhookPayload) -> Response {
    let request: ValidationRequest = match serde_json::from_value(payload.d) {
        Ok(request) => request,
        Err(e) => {
            warn!("Malformed validation request: {}", e);
            return (StatusCode::BAD_REQUEST, "malformed validation request").into_response();
        }
    };

    info!("Answering callback URL validation");
    let signature = state
        .signer
        .sign_validation(&request.event_ts, &request.plain_token);
    Json(ValidationResponse {
        plain_token: request.plain_token,
        signature,
    })
    .into_response()
}

async fn dispatch(state: &GatewayState, payload: WebhookPayload) {
    if payload.t.as_deref() != Some(GROUP_AT_MESSAGE_CREATE) {
        debug!("Ignoring event {:?}", payload.t);
        return;
    }

    let message: InboundMessage = match serde_json::from_value::<GroupAtMessage>(payload.d) {
        Ok(message) => message.into(),
        Err(e) => {
            warn!("Malformed group message event: {}", e);
            return;
        }
    };

    let dispatcher = state.dispatcher.clone();
    state
        .dispatcher
        .tasks()
        .spawn("dispatch", async move {
            let outcome = dispatcher.handle(&message).await;
            info!("Message {} handled: {:?}", message.id, outcome);
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{ChatApi, SendLock};
    use crate::core::{GroupChannel, MediaKind, OutboundMessage, UploadedMedia};
    use crate::error::Result;
    use crate::state::InMemoryStateStore;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const SECRET: &str = "DG5g3B4j9X2KOErG";

    struct EchoChat(SendLock);

    #[async_trait]
    impl ChatApi for EchoChat {
        async fn ask(&self, query: &str) -> String {
            format!("echo: {}", query)
        }

        fn send_lock(&self) -> &SendLock {
            &self.0
        }
    }

    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<OutboundMessage>>,
    }

    #[async_trait]
    impl GroupChannel for RecordingChannel {
        async fn upload_media(&self, _: &str, _: MediaKind, _: &str) -> Result<UploadedMedia> {
            unreachable!("no media in these tests")
        }

        async fn send(&self, _: &str, _: &str, message: &OutboundMessage, _: u32) -> Result<()> {
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }

    fn setup(verify_signatures: bool) -> (Router, Arc<MessageDispatcher>, Arc<RecordingChannel>) {
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = Arc::new(MessageDispatcher::new(
            Arc::new(EchoChat(SendLock::new())),
            Arc::new(InMemoryStateStore::new()),
            channel.clone(),
        ));
        let state = GatewayState {
            dispatcher: dispatcher.clone(),
            signer: Arc::new(WebhookSigner::new(SECRET).unwrap()),
            verify_signatures,
        };
        (build_router(state, "/qq/callback"), dispatcher, channel)
    }

    fn signed_request(body: &Value) -> Request<Body> {
        let body = serde_json::to_vec(body).unwrap();
        let signer = WebhookSigner::new(SECRET).unwrap();
        let signature = signer.sign(&[b"1725442341".as_slice(), body.as_slice()].concat());
        Request::post("/qq/callback")
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .header(TIMESTAMP_HEADER, "1725442341")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _, _) = setup(true);
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_validation_is_signed() {
        let (router, _, _) = setup(true);
        let request = signed_request(&json!({
            "op": 13,
            "d": {"plain_token": "Arq0D5A61EgUu4OxUvOp", "event_ts": "1725442341"}
        }));

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let expected = WebhookSigner::new(SECRET)
            .unwrap()
            .sign_validation("1725442341", "Arq0D5A61EgUu4OxUvOp");
        assert_eq!(body["plain_token"], "Arq0D5A61EgUu4OxUvOp");
        assert_eq!(body["signature"], expected.as_str());
    }

    #[tokio::test]
    async fn test_group_message_is_acked_and_answered() {
        let (router, dispatcher, channel) = setup(true);
        let request = signed_request(&json!({
            "op": 0,
            "t": "GROUP_AT_MESSAGE_CREATE",
            "d": {
                "id": "msg-1",
                "content": " hello",
                "group_openid": "group-1",
                "author": {"member_openid": "m"}
            }
        }));

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(json_body(response).await, json!({"op": 12, "d": 0}));

        dispatcher.tasks().join_all().await;
        assert_eq!(
            *channel.sent.lock().await,
            vec![OutboundMessage::Text("echo: hello".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unsigned_request_rejected() {
        let (router, _, channel) = setup(true);
        let request = Request::post("/qq/callback")
            .body(Body::from(r#"{"op":0}"#))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(channel.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_verification_can_be_disabled() {
        let (router, _, _) = setup(false);
        let request = Request::post("/qq/callback")
            .body(Body::from(r#"{"op":0,"t":"READY","d":{}}"#))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let (router, _, _) = setup(false);
        let request = Request::post("/qq/callback")
            .body(Body::from("not json"))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
