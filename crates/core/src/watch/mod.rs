pub mod debouncer;
pub mod service;
pub mod source;

pub use debouncer::Debouncer;
pub use service::{WatchService, route_event};
pub use source::{ChangeEvent, ChangeKind, ChangeSource, NotifySource};
