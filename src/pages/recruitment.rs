//! Job posting page.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{require, spawn_refetch, Watcher};
use crate::error::Result;
use crate::gateway::Gateway;
use crate::models::{JobPosting, NewJobPosting};
use crate::notify::Notifier;

pub const STATUS_ACTIVE: &str = "active";

#[derive(Debug, Clone)]
pub struct JobForm {
    pub title: String,
    pub department: String,
    pub location: String,
    pub salary: String,
    pub description: String,
}

impl JobForm {
    fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        require("department", &self.department)?;
        require("location", &self.location)?;
        require("salary", &self.salary)?;
        require("description", &self.description)?;
        Ok(())
    }
}

pub struct RecruitmentPage {
    gateway: Arc<Gateway>,
    notifier: Notifier,
    company_id: Uuid,
    jobs: RwLock<Vec<JobPosting>>,
}

impl RecruitmentPage {
    pub fn new(gateway: Arc<Gateway>, notifier: Notifier, company_id: Uuid) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            notifier,
            company_id,
            jobs: RwLock::new(Vec::new()),
        })
    }

    /// Refetches postings, most recently posted first.
    pub async fn refresh(&self) -> Result<()> {
        let rows = self
            .gateway
            .table("job_postings")
            .select("*")
            .eq("company_id", self.company_id)
            .order("posted_date", false)
            .fetch::<JobPosting>()
            .await;

        match rows {
            Ok(rows) => {
                debug!(company_id = %self.company_id, count = rows.len(), "Fetched job postings");
                *self.jobs.write().await = rows;
                Ok(())
            }
            Err(e) => {
                self.notifier.error("Failed to load job postings", e.to_string());
                Err(e)
            }
        }
    }

    pub async fn jobs(&self) -> Vec<JobPosting> {
        self.jobs.read().await.clone()
    }

    /// Publishes a new posting, stamped active as of now.
    pub async fn publish(&self, form: JobForm) -> Result<()> {
        if let Err(e) = form.validate() {
            self.notifier.error("Failed to publish job", e.to_string());
            return Err(e);
        }

        let row = NewJobPosting {
            company_id: self.company_id,
            title: form.title.clone(),
            department: form.department,
            location: form.location,
            salary: form.salary,
            description: form.description,
            status: STATUS_ACTIVE.to_string(),
            posted_date: Utc::now().naive_utc(),
        };

        match self
            .gateway
            .table("job_postings")
            .insert::<JobPosting, _>(&row)
            .await
        {
            Ok(_) => {
                info!(company_id = %self.company_id, title = %form.title, "Published job posting");
                self.notifier.success(
                    "Job published",
                    format!("The {} opening is now live", form.title),
                );
                self.refresh().await
            }
            Err(e) => {
                self.notifier.error("Failed to publish job", e.to_string());
                Err(e)
            }
        }
    }

    pub async fn watch(self: &Arc<Self>) -> Result<Watcher> {
        let subscription = self.gateway.subscribe("job_postings").await?;
        let page = Arc::clone(self);
        Ok(spawn_refetch(subscription, "job_postings", move || {
            let page = Arc::clone(&page);
            async move {
                let _ = page.refresh().await;
            }
        }))
    }
}
