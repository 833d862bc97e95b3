//! Client SDK for the Adrenal hosted chatbot platform.
//!
//! The core of the crate is [`chat::ChatController`], a conversation stream
//! controller: it bootstraps chatbot metadata, owns the ordered message
//! store, turns user input into completion requests, and incrementally
//! decodes the streamed reply into render-ready snapshots. UI bindings
//! observe the controller through a `tokio::sync::watch` channel and never
//! touch its state directly.
//!
//! Supporting pieces: [`protocol`] decodes the line-oriented streaming wire
//! format, [`client`] speaks the HTTP contract, [`webhook`] verifies
//! server-side webhook signatures, and [`widget`] renders the embed snippet
//! for the hosted widget loader.

pub mod chat;
pub mod client;
pub mod error;
pub mod protocol;
pub mod types;
pub mod webhook;
pub mod widget;

pub use chat::{ChatConfig, ChatController, ChatSnapshot, SessionState};
pub use client::ApiClient;
pub use error::{ChatError, ChatErrorKind};
pub use types::{Chatbot, Message, MessageId, Role};
