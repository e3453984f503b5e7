// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # docview
//!
//! Client toolkit for a markdown documentation browser whose backend serves
//! a document index, individual documents, and full-text search under `/api`.
//!
//! ## Architecture
//!
//! - **Debouncer** (`debounce`): collapses bursts of calls into one delayed call
//! - **API client** (`client`, `model`): typed GETs for index, documents, search
//! - **Theme** (`theme`): light/dark preference, durable store, change broadcast
//! - **Dev server** (`devserver`, feature `dev-server`): `/api` proxy + static assets
//! - **Configuration** (`config`, `paths`): TOML config under XDG directories
//!
//! ## Library usage
//!
//! ```no_run
//! use docview::client::ApiClient;
//!
//! # async fn demo() -> docview::error::DocviewResult<()> {
//! let client = ApiClient::new("http://localhost:8090");
//! let index = client.get_index().await?;
//! for doc in index.documents() {
//!     println!("{} ({})", doc.title, doc.rel_path);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod debounce;
#[cfg(feature = "dev-server")]
pub mod devserver;
pub mod error;
pub mod model;
pub mod paths;
pub mod theme;
