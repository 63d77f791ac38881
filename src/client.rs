//! Client entry point and the shared request pipeline.
//!
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod codec;
pub mod core;
pub mod execution;

pub use builder::ClientBuilder;
pub use codec::{Codec, JsonCodec};
pub use core::Client;
pub use execution::{NoBody, RequestExecutor};
