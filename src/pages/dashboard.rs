//! Overview dashboard.

use std::sync::Arc;

use chrono::Local;
use tracing::debug;
use uuid::Uuid;

use super::recruitment::STATUS_ACTIVE;
use crate::error::Result;
use crate::gateway::Gateway;
use crate::models::PayrollRecord;
use crate::notify::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub total_employees: u64,
    pub active_postings: u64,
    pub payroll_net_total: i64,
    /// Percentage of employees marked present today, rounded.
    pub attendance_rate: u8,
}

pub struct DashboardPage {
    gateway: Arc<Gateway>,
    notifier: Notifier,
    company_id: Uuid,
}

impl DashboardPage {
    pub fn new(gateway: Arc<Gateway>, notifier: Notifier, company_id: Uuid) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            notifier,
            company_id,
        })
    }

    /// Computes the stat cards in one pass. Count queries stay head-only;
    /// payroll is the one table whose rows are transferred, to sum net pay.
    pub async fn stats(&self) -> Result<DashboardStats> {
        let employees = self
            .gateway
            .table("employees")
            .eq("company_id", self.company_id)
            .count()
            .await;
        let employees = match employees {
            Ok(count) => count,
            Err(e) => {
                self.notifier.error("Failed to load dashboard data", e.to_string());
                return Err(e);
            }
        };

        let postings = self
            .gateway
            .table("job_postings")
            .eq("company_id", self.company_id)
            .eq("status", STATUS_ACTIVE)
            .count()
            .await;
        let postings = match postings {
            Ok(count) => count,
            Err(e) => {
                self.notifier.error("Failed to load dashboard data", e.to_string());
                return Err(e);
            }
        };

        let payroll = self
            .gateway
            .table("payroll")
            .select("*")
            .eq("company_id", self.company_id)
            .fetch::<PayrollRecord>()
            .await;
        let payroll_net_total = match payroll {
            Ok(rows) => rows.iter().map(|r| r.net_pay).sum(),
            Err(e) => {
                self.notifier.error("Failed to load dashboard data", e.to_string());
                return Err(e);
            }
        };

        let today = Local::now().date_naive();
        let present = self
            .gateway
            .table("attendance")
            .eq("company_id", self.company_id)
            .eq("date", today)
            .eq("status", "present")
            .count()
            .await;
        let present = match present {
            Ok(count) => count,
            Err(e) => {
                self.notifier.error("Failed to load dashboard data", e.to_string());
                return Err(e);
            }
        };

        let attendance_rate = if employees > 0 {
            ((present as f64 / employees as f64) * 100.0).round() as u8
        } else {
            0
        };

        let stats = DashboardStats {
            total_employees: employees,
            active_postings: postings,
            payroll_net_total,
            attendance_rate,
        };
        debug!(company_id = %self.company_id, ?stats, "Computed dashboard stats");
        Ok(stats)
    }
}
