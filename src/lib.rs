//! MediTrack profile client.
//!
//! Holds a user's profile as four independently dirty-tracked partitions and
//! auto-saves edited partitions to the backend after a quiet period, batching
//! everything dirty into one `PUT /update-profile`.
//!
//! - [`store`] — [`ProfileStore`](store::ProfileStore) and hydration.
//! - [`sync`] — [`AutoSaver`](sync::AutoSaver), the debounced flusher.
//! - [`api`] — reqwest-backed [`HttpClient`](api::HttpClient).
//! - [`profile`] — derived views (completion score).

pub mod api;
pub mod config;
pub mod error;
pub mod profile;
pub mod store;
pub mod sync;
pub mod types;

pub use error::{MediTrackError, Result};
pub use types::{PartitionKey, SavePayload};
