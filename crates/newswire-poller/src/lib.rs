pub mod activity;
pub mod controller;
pub mod queue;
pub mod source;
pub mod store;

pub use activity::ActivityLog;
pub use controller::{Controller, ControllerConfig, CycleOutcome, SessionSummary};
pub use queue::{PollItem, PollQueue, QueueError};
pub use source::HeadlineSource;
pub use store::{HeadlineStore, PgHeadlineStore};
