pub mod action_executor;
pub mod order_pipeline;
pub mod outcome;
pub mod retry;

pub use action_executor::{charge_comment, ActionExecutor};
pub use order_pipeline::{OrderFailure, OrderPipeline};
pub use outcome::{failure_entry, report_entry};
pub use retry::retry_with_policy;
