pub mod extract;
pub mod feed;
pub mod processed;
pub mod raw;

pub use extract::ExtractError;
pub use feed::FeedError;
pub use processed::*;
pub use raw::{FetchError, MensaType, Snapshot, Source, UnknownMensa, View, WebSource};
