//! # supabase-core
//!
//! Typed request pipeline and streaming file transfers shared by the Supabase
//! REST sub-APIs (tabular queries, object storage, serverless functions).
//!
//! ## Overview
//!
//! Every sub-API funnels through the same [`RequestExecutor`]: it merges
//! default and call headers, encodes query parameters or a JSON body, sends
//! the request over one shared connection pool, and either returns a
//! [`ResponseEnvelope`] or raises a typed [`Error`]. Large payloads go through
//! the [`transfer`] module, which reports progress while streaming and honours
//! cooperative cancellation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use supabase_core::{ClientBuilder, TransferControl};
//!
//! #[tokio::main]
//! async fn main() -> supabase_core::Result<()> {
//!     let client = ClientBuilder::new()
//!         .url("https://xyz.supabase.co")
//!         .api_key("public-anon-key")
//!         .build()?;
//!
//!     let avatars = client.storage().from("avatars");
//!     let control = TransferControl::new().on_progress(|pct| println!("{pct:.0}%"));
//!     let key = avatars
//!         .upload(b"hello".to_vec(), "greetings/hello.txt", None, &control)
//!         .await?;
//!     println!("uploaded {key}");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client, builder, request executor and codecs |
//! | [`request`] | Methods, header map/composition, URL query merging |
//! | [`response`] | Envelopes, typed responses, server error bodies |
//! | [`transfer`] | Progress-observable uploads and the download copier |
//! | [`storage`] | Bucket-scoped object operations |
//! | [`functions`] | Serverless function invocation |
//! | [`transport`] | The shared HTTP transport |

pub mod client;
pub mod config;
pub mod functions;
pub mod request;
pub mod response;
pub mod storage;
pub mod transfer;
pub mod transport;

// Re-export main types for convenience
pub use client::{Client, ClientBuilder, Codec, JsonCodec, NoBody, RequestExecutor};
pub use config::ClientOptions;
pub use functions::{FunctionsClient, InvokeOptions};
pub use request::{Headers, Method, RangeSpec};
pub use response::{ErrorResponse, ResponseEnvelope, TypedResponse, FALLBACK_ERROR_MESSAGE};
pub use storage::{FileObject, FileOptions, SearchOptions, StorageClient, StorageFileApi};
pub use transfer::{ProgressObserver, TransferControl, TransferEvent, UploadState};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, RequestError};
