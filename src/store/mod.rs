//! Profile store — the four partitions and their dirty tracking.
//!
//! - [`profile_store`] — [`ProfileStore`], the accessor/mutator the auto-saver
//!   is wired to, with its synchronous change listeners.
//! - [`hydrate`] — account document → partitions.
//! - [`event`] — [`StoreEvent`].

pub mod event;
pub mod hydrate;
pub mod profile_store;

pub use event::{ListenerId, StoreEvent, StoreListener};
pub use hydrate::{split_account, HydratedProfile};
pub use profile_store::{ProfileState, ProfileStore};
