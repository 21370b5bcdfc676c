//! Background jobs.
//!
//! Bulk "mark all as read" runs here, off the caller's path: the caller
//! submits a [`MarkAllAsRead`] to the [`JobQueue`] and gets control back
//! as soon as the queue accepts it. Listings issued while a job is running
//! may see some of its stories already read and others not yet.

mod mark_all_as_read;
mod queue;

pub use mark_all_as_read::{MarkAllAsRead, MarkAllOutcome};
pub use queue::{JobQueue, QueueError, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};

use std::panic::AssertUnwindSafe;

use futures::FutureExt;

/// Run a future, turning a panic into an error carrying the panic message.
pub(crate) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future).catch_unwind().await.map_err(|panic| {
        if let Some(s) = panic.downcast_ref::<&'static str>() {
            s.to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        }
    })
}
