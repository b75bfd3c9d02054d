//! # xms - An asynchronous client for the XMS SMS REST API
//!
//! `xms` sends and manages SMS batches, delivery reports, batch tags and
//! recipient groups. Every operation returns an undispatched [`Call`] which
//! can be awaited, dispatched with a completion callback, or run to
//! completion on the calling thread.
//!
//! ## Quick Start
//!
//! ```no_run
//! use xms::{Client, MtBatchTextSmsCreate};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), xms::Error> {
//!     let client = Client::builder()
//!         .username("jdoe")
//!         .token("secret")
//!         .use_current_runtime()
//!         .build()?;
//!
//!     let batch = MtBatchTextSmsCreate::new("12345", vec!["987654321".to_string()], "Hello");
//!     let created = client.create_text_batch(&batch).await?;
//!     println!("Created batch {}", created.id);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Three ways to run a call** - `.await`, [`Call::send_with`] with a [`Callback`], or [`Call::blocking`]
//! - **Cancellation** - [`CallHandle::cancel`] drops the request and reports [`Error::Interrupted`]
//! - **Typed failures** - API errors, unexpected responses with their raw body, and execution faults are told apart
//! - **Lazy pagination** - [`PagedFetcher`] fetches one page at a time, only when asked for more
//! - **Partial updates** - [`UpdateValue`] separates "leave untouched" from "clear"
//! - **Structured logging** - through `tracing`
//! - **Reactor ownership** - run calls on an owned runtime or on one you already have
//!
//! ## Error Handling
//!
//! A call fails in one of four ways:
//!
//! ```no_run
//! use xms::{BatchId, Client, Error};
//!
//! # async fn example(client: Client) {
//! match client.fetch_batch(&BatchId::from("b1")).await {
//!     Ok(batch) => println!("Batch {}", batch.id()),
//!     Err(Error::Api(e)) => eprintln!("Rejected: {} ({})", e.text, e.code),
//!     Err(Error::UnexpectedResponse(response)) => {
//!         eprintln!("HTTP {}: {}", response.status, response.body_text());
//!     }
//!     Err(Error::Interrupted) => eprintln!("Cancelled"),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! # }
//! ```
//!
//! ## Pagination
//!
//! ```no_run
//! use xms::{BatchFilter, Client};
//!
//! # fn example(client: Client) -> Result<(), xms::Error> {
//! let filter = BatchFilter {
//!     page_size: Some(50),
//!     ..Default::default()
//! };
//!
//! for batch in client.fetch_batches(filter).items() {
//!     println!("{}", batch?.id());
//! }
//! # Ok(())
//! # }
//! ```

mod api;
pub mod callback;
mod classify;
mod client;
mod consumer;
mod descriptor;
mod error;
mod handle;
mod operations;
mod paged;
mod retry_hint;
mod update;

pub use api::*;
pub use callback::{Callback, CallbackWrapper};
pub use classify::{
    Classifier, Decode, Empty, Json, DEFAULT_SUCCESS_CODES, MODELED_ERROR_CODES, OK_ONLY,
};
pub use client::{Client, ClientBuilder, DEFAULT_ENDPOINT, SDK_VERSION_HEADER};
pub use descriptor::RequestDescriptor;
pub use error::{ApiError, Error, ExecutionFault, Result, UnexpectedResponse};
pub use handle::{Call, CallHandle};
pub use paged::{Items, Page, PageDecoder, PageSource, PagedFetcher, Pages};
pub use retry_hint::RetryHint;
pub use update::UpdateValue;
