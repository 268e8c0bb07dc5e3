//! Gateway module - QQ webhook receiver
//!
//! ```text
//!   QQ platform ──POST callback──▶ axum router ──▶ MessageDispatcher
//!        ▲                              │                  │
//!        └──── op 12 ack / op 13 ───────┘                  ▼
//!                                            GroupChannel (OpenAPI replies)
//! ```

pub mod payload;
pub mod server;
pub mod signature;

pub use payload::{
    CallbackAck, GroupAtMessage, GroupMember, ValidationRequest, ValidationResponse,
    WebhookPayload, GROUP_AT_MESSAGE_CREATE, OP_CALLBACK_ACK, OP_CALLBACK_VALIDATION,
    OP_DISPATCH,
};
pub use server::{build_router, GatewayState, SIGNATURE_HEADER, TIMESTAMP_HEADER};
pub use signature::{derive_seed, WebhookSigner};
