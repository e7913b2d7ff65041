//! Cross-tenant administration overview.
//!
//! Unlike the other pages this one is not scoped to a single company: it
//! lists every tenant with its owner, plan and billing status. Status is
//! display-only and never gates access.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::gateway::Gateway;
use crate::models::{Company, Plan, Subscription, SubscriptionStatus};
use crate::notify::Notifier;

#[derive(Debug, Deserialize)]
struct OwnerRow {
    id: Uuid,
    email: String,
}

#[derive(Debug, Clone)]
pub struct CompanyOverview {
    pub company: Company,
    pub owner_email: Option<String>,
    pub plan: Option<Plan>,
    pub status: Option<SubscriptionStatus>,
}

impl CompanyOverview {
    pub fn in_good_standing(&self) -> bool {
        self.status.map(|s| s.in_good_standing()).unwrap_or(false)
    }
}

pub struct AdminPage {
    gateway: Arc<Gateway>,
    notifier: Notifier,
    companies: RwLock<Vec<CompanyOverview>>,
}

impl AdminPage {
    pub fn new(gateway: Arc<Gateway>, notifier: Notifier) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            notifier,
            companies: RwLock::new(Vec::new()),
        })
    }

    pub async fn refresh(&self) -> Result<()> {
        let companies = match self
            .gateway
            .table("companies")
            .select("*")
            .fetch::<Company>()
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                self.notifier.error("Failed to load companies", e.to_string());
                return Err(e);
            }
        };

        let owners = match self
            .gateway
            .table("users")
            .select("id,email")
            .fetch::<OwnerRow>()
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                self.notifier.error("Failed to load owner accounts", e.to_string());
                return Err(e);
            }
        };

        let subscriptions = match self
            .gateway
            .table("subscriptions")
            .select("*")
            .fetch::<Subscription>()
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                self.notifier.error("Failed to load subscriptions", e.to_string());
                return Err(e);
            }
        };

        let overviews = companies
            .into_iter()
            .map(|company| {
                let owner_email = owners
                    .iter()
                    .find(|o| o.id == company.owner_id)
                    .map(|o| o.email.clone());
                let subscription = subscriptions.iter().find(|s| s.company_id == company.id);
                CompanyOverview {
                    owner_email,
                    plan: subscription.map(|s| s.plan),
                    status: subscription.map(|s| s.status),
                    company,
                }
            })
            .collect::<Vec<_>>();

        debug!(count = overviews.len(), "Fetched company overview");
        *self.companies.write().await = overviews;
        Ok(())
    }

    pub async fn companies(&self) -> Vec<CompanyOverview> {
        self.companies.read().await.clone()
    }
}
