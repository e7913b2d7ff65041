//! Page modules.
//!
//! Every page follows the same contract: scoped reads into page-local state
//! on refresh, a change-feed subscription that triggers an unconditional
//! refetch, submit operations that validate only "required fields
//! non-empty" before issuing a single tenant-tagged write, and success or
//! error notifications for every outcome. State is always fully replaced,
//! never merged; last write wins. Pages are independent of each other and
//! of the view router.

pub mod admin;
pub mod attendance;
pub mod dashboard;
pub mod employees;
pub mod payroll;
pub mod recruitment;

pub use admin::AdminPage;
pub use attendance::AttendancePage;
pub use dashboard::DashboardPage;
pub use employees::EmployeesPage;
pub use payroll::PayrollPage;
pub use recruitment::RecruitmentPage;

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{Error, Result};
use crate::gateway::Subscription;

/// Handle for a running change-feed watcher. Dropping it stops the refetch
/// loop and unsubscribes.
pub struct Watcher {
    handle: JoinHandle<()>,
}

impl Watcher {
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Drives a page refetch for every change notification on `table`.
pub(crate) fn spawn_refetch<F, Fut>(
    mut subscription: Subscription,
    table: &'static str,
    refetch: F,
) -> Watcher
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let handle = tokio::spawn(async move {
        while let Some(event) = subscription.next().await {
            debug!(table, kind = ?event.kind, "Change notification, refetching");
            refetch().await;
        }
        debug!(table, "Change feed ended");
    });
    Watcher { handle }
}

/// Required-field check. The only client-side validation the forms do.
pub(crate) fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::EmptyField(field))
    } else {
        Ok(())
    }
}
