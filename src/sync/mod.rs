pub mod auto_saver;
pub mod types;

pub use auto_saver::{AutoSaver, Subscription};
pub use types::{
    AutoSaverOptions, LastSave, PartitionSource, ProfileTransport, SaveErrorCallback,
    SaveErrorEvent, SaveOutcome, SaveStatus, SavedCallback, DEFAULT_QUIET_INTERVAL,
};
