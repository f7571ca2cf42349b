//! Gateway client.
//!
//! Keep the public surface small and predictable: one client, one builder.
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod core;
pub mod response;
pub mod signals;
pub mod vision;

pub use builder::GatewayClientBuilder;
pub use core::GatewayClient;
pub use response::{
    concise_answer, parse_completion, split_concise_directive, strip_reasoning, Completion,
    CONCISE_DIRECTIVE,
};
pub use signals::SignalsSnapshot;
pub use vision::{encode_image, sniff_media_type, MAX_IMAGE_BYTES};
