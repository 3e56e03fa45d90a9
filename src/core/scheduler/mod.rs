// Scheduled background work.
// - `schedule.rs` computes when a task runs next (pure, no tokio).
// - `retry.rs` is the one place that retries a flaky call.
// - `scheduler_service.rs` spawns and tracks the task loops.

pub mod retry;
pub mod schedule;
pub mod scheduler_service;

pub use retry::{retry, Retry, RetryPolicy};
pub use schedule::TaskSchedule;
pub use scheduler_service::{ScheduledTask, Scheduler, TaskError, TaskStatus};
