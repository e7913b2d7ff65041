//! Daily attendance page.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{spawn_refetch, Watcher};
use crate::error::Result;
use crate::gateway::Gateway;
use crate::models::{AttendanceRecord, AttendanceStatus, Employee, NewAttendanceRecord};
use crate::notify::Notifier;

const DEFAULT_CHECK_IN: &str = "09:00";
const DEFAULT_CHECK_OUT: &str = "17:00";

/// Attendance record joined with the employee it belongs to.
#[derive(Debug, Clone)]
pub struct AttendanceLine {
    pub record: AttendanceRecord,
    pub employee_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttendanceStats {
    pub present: usize,
    pub absent: usize,
    pub headcount: usize,
    /// Percentage of employees marked present today, rounded.
    pub rate: u8,
}

pub struct AttendancePage {
    gateway: Arc<Gateway>,
    notifier: Notifier,
    company_id: Uuid,
    employees: RwLock<Vec<Employee>>,
    records: RwLock<Vec<AttendanceRecord>>,
}

impl AttendancePage {
    pub fn new(gateway: Arc<Gateway>, notifier: Notifier, company_id: Uuid) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            notifier,
            company_id,
            employees: RwLock::new(Vec::new()),
            records: RwLock::new(Vec::new()),
        })
    }

    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Refetches the roster and today's attendance rows.
    pub async fn refresh(&self) -> Result<()> {
        let employees = match self
            .gateway
            .table("employees")
            .select("*")
            .eq("company_id", self.company_id)
            .fetch::<Employee>()
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                self.notifier.error("Failed to load employees", e.to_string());
                return Err(e);
            }
        };

        let records = match self
            .gateway
            .table("attendance")
            .select("*")
            .eq("company_id", self.company_id)
            .eq("date", Self::today())
            .fetch::<AttendanceRecord>()
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                self.notifier.error("Failed to load attendance", e.to_string());
                return Err(e);
            }
        };

        debug!(
            company_id = %self.company_id,
            employees = employees.len(),
            records = records.len(),
            "Fetched attendance data"
        );
        *self.employees.write().await = employees;
        *self.records.write().await = records;
        Ok(())
    }

    /// Today's records joined with employee names client-side.
    pub async fn lines(&self) -> Vec<AttendanceLine> {
        let employees = self.employees.read().await;
        let records = self.records.read().await;
        records
            .iter()
            .map(|record| AttendanceLine {
                record: record.clone(),
                employee_name: employees
                    .iter()
                    .find(|e| e.id == record.employee_id)
                    .map(|e| e.name.clone())
                    .unwrap_or_else(|| "Unknown employee".to_string()),
            })
            .collect()
    }

    pub async fn stats(&self) -> AttendanceStats {
        let records = self.records.read().await;
        let headcount = self.employees.read().await.len();
        let present = records
            .iter()
            .filter(|r| r.status == AttendanceStatus::Present)
            .count();
        let absent = records
            .iter()
            .filter(|r| r.status == AttendanceStatus::Absent)
            .count();
        let rate = if headcount > 0 {
            ((present as f64 / headcount as f64) * 100.0).round() as u8
        } else {
            0
        };
        AttendanceStats {
            present,
            absent,
            headcount,
            rate,
        }
    }

    /// Marks every employee present for today. Upserted on the
    /// `(employee_id, date)` key, so repeat calls the same day rewrite the
    /// existing rows instead of duplicating them.
    pub async fn mark_today(&self) -> Result<()> {
        let employees = self.employees.read().await.clone();
        let today = Self::today();

        let rows: Vec<NewAttendanceRecord> = employees
            .iter()
            .map(|employee| NewAttendanceRecord {
                company_id: self.company_id,
                employee_id: employee.id,
                date: today,
                status: AttendanceStatus::Present,
                check_in: Some(DEFAULT_CHECK_IN.to_string()),
                check_out: Some(DEFAULT_CHECK_OUT.to_string()),
            })
            .collect();

        match self
            .gateway
            .table("attendance")
            .upsert(&rows, "employee_id,date")
            .await
        {
            Ok(()) => {
                info!(company_id = %self.company_id, count = rows.len(), date = %today, "Marked attendance");
                self.notifier
                    .success("Attendance marked", "Today's attendance has been recorded");
                self.refresh().await
            }
            Err(e) => {
                self.notifier.error("Failed to mark attendance", e.to_string());
                Err(e)
            }
        }
    }

    pub async fn watch(self: &Arc<Self>) -> Result<Watcher> {
        let subscription = self.gateway.subscribe("attendance").await?;
        let page = Arc::clone(self);
        Ok(spawn_refetch(subscription, "attendance", move || {
            let page = Arc::clone(&page);
            async move {
                let _ = page.refresh().await;
            }
        }))
    }
}
