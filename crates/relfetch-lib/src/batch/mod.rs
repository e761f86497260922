mod controller;
mod retry;
mod types;

pub use controller::{ConcurrencyController, JobRunner};
pub use retry::{AttemptBudget, RetryPolicy, retry_delay, with_retry};
pub use types::{BatchReport, JobOutcome};
