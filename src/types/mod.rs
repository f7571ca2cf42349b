//! 类型系统模块：对话消息与上游聊天补全接口的数据类型。
//!
//! # Types Module
//!
//! Core data types shared by the cache, transport and client layers.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Conversation turn with role and text content |
//! | [`MessageRole`] | `system`, `user` or `assistant` |
//! | [`ChatCompletionRequest`] | Request body posted upstream |
//! | [`ChatCompletionResponse`] | Parsed upstream completion |
//!
//! ## Example
//!
//! ```rust
//! use completion_gateway::types::{ChatCompletionRequest, Message};
//!
//! let messages = vec![
//!     Message::system("Responde en español."),
//!     Message::user("¿Qué es la NSR-10?"),
//! ];
//! let req = ChatCompletionRequest::from_messages("qwen-3-32b", &messages, 0.7, 1000);
//! assert_eq!(req.messages.len(), 2);
//! ```

pub mod chat;
pub mod message;

pub use chat::{
    ChatCompletionRequest, ChatCompletionResponse, ContentPart, ImageUrl, Usage, WireContent,
    WireMessage,
};
pub use message::{conversation_with_query, Message, MessageRole};
