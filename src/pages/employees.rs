//! Employee roster page.

use std::sync::Arc;

use chrono::Local;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{require, spawn_refetch, Watcher};
use crate::error::Result;
use crate::gateway::Gateway;
use crate::models::{Employee, NewEmployee};
use crate::notify::Notifier;

/// Create/edit form. Salary is carried separately since it is numeric; the
/// four text fields are the required ones.
#[derive(Debug, Clone)]
pub struct EmployeeForm {
    pub name: String,
    pub email: String,
    pub position: String,
    pub department: String,
    pub salary: i64,
}

impl EmployeeForm {
    fn validate(&self) -> Result<()> {
        require("name", &self.name)?;
        require("email", &self.email)?;
        require("position", &self.position)?;
        require("department", &self.department)?;
        Ok(())
    }
}

pub struct EmployeesPage {
    gateway: Arc<Gateway>,
    notifier: Notifier,
    company_id: Uuid,
    employees: RwLock<Vec<Employee>>,
}

impl EmployeesPage {
    pub fn new(gateway: Arc<Gateway>, notifier: Notifier, company_id: Uuid) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            notifier,
            company_id,
            employees: RwLock::new(Vec::new()),
        })
    }

    /// Refetches the roster, newest first, fully replacing local state.
    pub async fn refresh(&self) -> Result<()> {
        let rows = self
            .gateway
            .table("employees")
            .select("*")
            .eq("company_id", self.company_id)
            .order("created_at", false)
            .fetch::<Employee>()
            .await;

        match rows {
            Ok(rows) => {
                debug!(company_id = %self.company_id, count = rows.len(), "Fetched employees");
                *self.employees.write().await = rows;
                Ok(())
            }
            Err(e) => {
                self.notifier.error("Failed to load employees", e.to_string());
                Err(e)
            }
        }
    }

    pub async fn employees(&self) -> Vec<Employee> {
        self.employees.read().await.clone()
    }

    pub async fn create(&self, form: EmployeeForm) -> Result<()> {
        if let Err(e) = form.validate() {
            self.notifier.error("Failed to add employee", e.to_string());
            return Err(e);
        }

        let row = NewEmployee {
            company_id: self.company_id,
            name: form.name.clone(),
            email: form.email,
            position: form.position,
            department: form.department,
            salary: form.salary,
            join_date: Local::now().date_naive(),
        };

        match self
            .gateway
            .table("employees")
            .insert::<Employee, _>(&row)
            .await
        {
            Ok(_) => {
                info!(company_id = %self.company_id, name = %form.name, "Added employee");
                self.notifier
                    .success("Employee added", format!("{} joined the roster", form.name));
                self.refresh().await
            }
            Err(e) => {
                self.notifier.error("Failed to add employee", e.to_string());
                Err(e)
            }
        }
    }

    pub async fn update(&self, id: Uuid, form: EmployeeForm) -> Result<()> {
        if let Err(e) = form.validate() {
            self.notifier.error("Failed to update employee", e.to_string());
            return Err(e);
        }

        let patch = serde_json::json!({
            "name": form.name,
            "email": form.email,
            "position": form.position,
            "department": form.department,
            "salary": form.salary,
        });

        match self
            .gateway
            .table("employees")
            .eq("id", id)
            .eq("company_id", self.company_id)
            .update(&patch)
            .await
        {
            Ok(()) => {
                self.notifier
                    .success("Employee updated", format!("{} was updated", form.name));
                self.refresh().await
            }
            Err(e) => {
                self.notifier.error("Failed to update employee", e.to_string());
                Err(e)
            }
        }
    }

    pub async fn remove(&self, id: Uuid) -> Result<()> {
        match self
            .gateway
            .table("employees")
            .eq("id", id)
            .eq("company_id", self.company_id)
            .delete()
            .await
        {
            Ok(()) => {
                info!(company_id = %self.company_id, employee_id = %id, "Removed employee");
                self.notifier
                    .success("Employee removed", "The employee was removed from the roster");
                self.refresh().await
            }
            Err(e) => {
                self.notifier.error("Failed to remove employee", e.to_string());
                Err(e)
            }
        }
    }

    /// Subscribes to the employees change feed; any notification triggers a
    /// full refetch.
    pub async fn watch(self: &Arc<Self>) -> Result<Watcher> {
        let subscription = self.gateway.subscribe("employees").await?;
        let page = Arc::clone(self);
        Ok(spawn_refetch(subscription, "employees", move || {
            let page = Arc::clone(&page);
            async move {
                let _ = page.refresh().await;
            }
        }))
    }
}
