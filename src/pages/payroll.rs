//! Monthly payroll page.

use std::sync::Arc;

use chrono::{Datelike, Local};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{spawn_refetch, Watcher};
use crate::error::Result;
use crate::gateway::Gateway;
use crate::models::{Employee, NewPayrollRecord, PayrollRecord};
use crate::notify::Notifier;

/// Payroll record joined with the employee it belongs to.
#[derive(Debug, Clone)]
pub struct PayrollLine {
    pub record: PayrollRecord,
    pub employee_name: String,
    pub position: String,
}

pub struct PayrollPage {
    gateway: Arc<Gateway>,
    notifier: Notifier,
    company_id: Uuid,
    employees: RwLock<Vec<Employee>>,
    records: RwLock<Vec<PayrollRecord>>,
}

impl PayrollPage {
    pub fn new(gateway: Arc<Gateway>, notifier: Notifier, company_id: Uuid) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            notifier,
            company_id,
            employees: RwLock::new(Vec::new()),
            records: RwLock::new(Vec::new()),
        })
    }

    pub fn current_period() -> (String, i32) {
        let now = Local::now();
        (now.format("%B").to_string(), now.year())
    }

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
            .table("payroll")
            .select("*")
            .eq("company_id", self.company_id)
            .fetch::<PayrollRecord>()
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                self.notifier.error("Failed to load payroll", e.to_string());
                return Err(e);
            }
        };

        debug!(
            company_id = %self.company_id,
            employees = employees.len(),
            records = records.len(),
            "Fetched payroll data"
        );
        *self.employees.write().await = employees;
        *self.records.write().await = records;
        Ok(())
    }

    pub async fn lines(&self) -> Vec<PayrollLine> {
        let employees = self.employees.read().await;
        let records = self.records.read().await;
        records
            .iter()
            .map(|record| {
                let employee = employees.iter().find(|e| e.id == record.employee_id);
                PayrollLine {
                    record: record.clone(),
                    employee_name: employee
                        .map(|e| e.name.clone())
                        .unwrap_or_else(|| "Unknown employee".to_string()),
                    position: employee
                        .map(|e| e.position.clone())
                        .unwrap_or_else(|| "Unknown position".to_string()),
                }
            })
            .collect()
    }

    pub async fn total_net(&self) -> i64 {
        self.records.read().await.iter().map(|r| r.net_pay).sum()
    }

    /// Runs payroll for the current month: one record per employee, upserted
    /// on `(employee_id, month, year)`, so reprocessing a month rewrites it.
    /// Net pay is base salary plus bonus minus deductions; bonus and
    /// deductions default to zero unless adjusted upstream.
    pub async fn process_current_month(&self) -> Result<()> {
        let (month, year) = Self::current_period();
        self.process_month(&month, year).await
    }

    pub async fn process_month(&self, month: &str, year: i32) -> Result<()> {
        let employees = self.employees.read().await.clone();

        let rows: Vec<NewPayrollRecord> = employees
            .iter()
            .map(|employee| {
                let bonus = 0;
                let deductions = 0;
                NewPayrollRecord {
                    company_id: self.company_id,
                    employee_id: employee.id,
                    month: month.to_string(),
                    year,
                    base_salary: employee.salary,
                    bonus,
                    deductions,
                    net_pay: employee.salary + bonus - deductions,
                }
            })
            .collect();

        match self
            .gateway
            .table("payroll")
            .upsert(&rows, "employee_id,month,year")
            .await
        {
            Ok(()) => {
                info!(company_id = %self.company_id, month, year, count = rows.len(), "Processed payroll");
                self.notifier.success(
                    "Payroll processed",
                    format!("Payroll for {month} {year} has been recorded"),
                );
                self.refresh().await
            }
            Err(e) => {
                self.notifier.error("Failed to process payroll", e.to_string());
                Err(e)
            }
        }
    }

    pub async fn watch(self: &Arc<Self>) -> Result<Watcher> {
        let subscription = self.gateway.subscribe("payroll").await?;
        let page = Arc::clone(self);
        Ok(spawn_refetch(subscription, "payroll", move || {
            let page = Arc::clone(&page);
            async move {
                let _ = page.refresh().await;
            }
        }))
    }
}
