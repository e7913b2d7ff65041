//! Crewdesk - application core for a multi-tenant HR dashboard backed by a
//! hosted data gateway.
//!
//! The [`AppContext`] is the single explicitly-scoped container for auth and
//! tenant state: constructed once at process start, it owns the gateway
//! handle, the resolved `{session, company, subscription}` triple and the
//! notification side channel, and re-resolves on every auth-state change.
//! The UI shell reads [`AppContext::view`] to decide which screen to show
//! and opens page modules for whichever company is resolved.

pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod notify;
pub mod pages;
pub mod resolver;
pub mod telemetry;
pub mod view;

pub use config::Config;
pub use error::{Error, Result};
pub use gateway::Gateway;
pub use notify::{Notification, Notifier, Severity};
pub use resolver::ResolvedTenant;
pub use telemetry::init_tracing;
pub use view::{derive_view, Intent, View};

use std::sync::Arc;

use serde_json::json;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use models::{Company, Membership, NewCompany, NewSubscription, Plan, Session};
use pages::{
    AdminPage, AttendancePage, DashboardPage, EmployeesPage, PayrollPage, RecruitmentPage,
};

/// Point-in-time copy of the resolved auth/tenant state.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub session: Option<Session>,
    pub tenant: ResolvedTenant,
    pub loading: bool,
    pub intent: Option<Intent>,
    pub is_admin: bool,
}

impl Snapshot {
    pub fn view(&self) -> Option<View> {
        derive_view(self.loading, self.session.as_ref(), &self.tenant, self.intent)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            session: None,
            tenant: ResolvedTenant::default(),
            loading: true,
            intent: None,
            is_admin: false,
        }
    }
}

/// Handle for the spawned auth-state listener. Dropping it stops the loop.
pub struct AuthListener {
    handle: JoinHandle<()>,
}

impl Drop for AuthListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct AppContext {
    gateway: Arc<Gateway>,
    notifier: Notifier,
    state: RwLock<Snapshot>,
}

impl AppContext {
    pub fn new(config: &Config) -> Arc<Self> {
        for issue in config.validate_for_production() {
            warn!(issue = %issue, "Configuration warning");
        }

        Arc::new(Self {
            gateway: Arc::new(Gateway::new(&config.gateway)),
            notifier: Notifier::default(),
            state: RwLock::new(Snapshot::default()),
        })
    }

    pub fn gateway(&self) -> Arc<Gateway> {
        Arc::clone(&self.gateway)
    }

    pub fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }

    /// Runs the initial resolution and starts re-resolving on auth events.
    pub async fn bootstrap(self: &Arc<Self>) -> AuthListener {
        self.refresh().await;
        self.spawn_auth_listener()
    }

    fn spawn_auth_listener(self: &Arc<Self>) -> AuthListener {
        let mut events = self.gateway.on_auth_state_change();
        let context = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        info!(?event, "Auth state changed, re-resolving");
                        context.refresh().await;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        // Refresh is idempotent; one catch-up run covers them.
                        warn!(skipped, "Auth listener lagged");
                        context.refresh().await;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        AuthListener { handle }
    }

    /// Re-resolves tenant state from the current session. Idempotent; safe
    /// to call at any time.
    pub async fn refresh(&self) {
        let session = self.gateway.current_session().await;
        let tenant = resolver::resolve(
            &self.gateway,
            &self.notifier,
            session.as_ref().map(|s| &s.user),
        )
        .await;

        let mut state = self.state.write().await;
        state.loading = false;
        state.is_admin = session.as_ref().map(|s| s.user.is_admin()).unwrap_or(false);
        if session.is_some() {
            state.intent = None;
        }
        state.session = session;
        state.tenant = tenant;
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.clone()
    }

    pub async fn view(&self) -> Option<View> {
        self.snapshot().await.view()
    }

    /// Registers a new identity and provisions its tenant: one company owned
    /// by the new identity plus the membership row linking them.
    pub async fn sign_up(&self, email: &str, password: &str, company_name: &str) -> Result<()> {
        let session = match self
            .gateway
            .sign_up(email, password, json!({ "full_name": "Owner" }))
            .await
        {
            Ok(session) => session,
            Err(e) => {
                self.notifier.error("Sign up failed", e.to_string());
                return Err(e);
            }
        };

        let company = match self
            .gateway
            .table("companies")
            .insert::<Company, _>(&NewCompany {
                name: company_name.to_string(),
                owner_id: session.user.id,
            })
            .await
            .map(|mut rows| rows.pop())
        {
            Ok(Some(company)) => company,
            Ok(None) => {
                let e = Error::Rejected {
                    status: 200,
                    message: "company insert returned no row".to_string(),
                };
                self.notifier.error("Failed to create company", e.to_string());
                return Err(e);
            }
            Err(e) => {
                self.notifier.error("Failed to create company", e.to_string());
                return Err(e);
            }
        };

        if let Err(e) = self
            .gateway
            .table("company_users")
            .insert::<Membership, _>(&Membership {
                user_id: session.user.id,
                company_id: company.id,
            })
            .await
        {
            self.notifier.error("Failed to link account to company", e.to_string());
            return Err(e);
        }

        info!(company_id = %company.id, owner_id = %session.user.id, "Registered company");
        self.refresh().await;
        Ok(())
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        if let Err(e) = self.gateway.sign_in_with_password(email, password).await {
            self.notifier.error("Login failed", e.to_string());
            return Err(e);
        }
        self.refresh().await;
        Ok(())
    }

    pub async fn sign_out(&self) -> Result<()> {
        if let Err(e) = self.gateway.sign_out().await {
            self.notifier.error("Logout failed", e.to_string());
            return Err(e);
        }
        self.refresh().await;
        Ok(())
    }

    /// Creates the subscription for the resolved company. The resolver
    /// refresh afterwards is what moves the router into the `App` view.
    pub async fn select_plan(&self, plan: Plan) -> Result<()> {
        let company_id = match self.primary_company_id().await {
            Some(id) => id,
            None => {
                self.notifier
                    .error("Failed to select plan", "no company found for this account");
                return Err(Error::NoCompany);
            }
        };

        if let Err(e) = self
            .gateway
            .table("subscriptions")
            .insert::<models::Subscription, _>(&NewSubscription { company_id, plan })
            .await
        {
            self.notifier.error("Failed to select plan", e.to_string());
            return Err(e);
        }

        info!(company_id = %company_id, plan = %plan, "Selected plan");
        self.notifier
            .success("Plan selected", format!("Welcome aboard, you are on the {plan} plan"));
        self.refresh().await;
        Ok(())
    }

    pub async fn show_login(&self) {
        self.state.write().await.intent = Some(Intent::Login);
    }

    pub async fn show_register(&self) {
        self.state.write().await.intent = Some(Intent::Register);
    }

    pub async fn show_landing(&self) {
        self.state.write().await.intent = None;
    }

    async fn primary_company_id(&self) -> Option<Uuid> {
        self.state
            .read()
            .await
            .tenant
            .primary_company()
            .map(|c| c.id)
    }

    pub async fn open_employees(&self) -> Result<Arc<EmployeesPage>> {
        let company_id = self.primary_company_id().await.ok_or(Error::NoCompany)?;
        Ok(EmployeesPage::new(self.gateway(), self.notifier(), company_id))
    }

    pub async fn open_recruitment(&self) -> Result<Arc<RecruitmentPage>> {
        let company_id = self.primary_company_id().await.ok_or(Error::NoCompany)?;
        Ok(RecruitmentPage::new(self.gateway(), self.notifier(), company_id))
    }

    pub async fn open_payroll(&self) -> Result<Arc<PayrollPage>> {
        let company_id = self.primary_company_id().await.ok_or(Error::NoCompany)?;
        Ok(PayrollPage::new(self.gateway(), self.notifier(), company_id))
    }

    pub async fn open_attendance(&self) -> Result<Arc<AttendancePage>> {
        let company_id = self.primary_company_id().await.ok_or(Error::NoCompany)?;
        Ok(AttendancePage::new(self.gateway(), self.notifier(), company_id))
    }

    pub async fn open_dashboard(&self) -> Result<Arc<DashboardPage>> {
        let company_id = self.primary_company_id().await.ok_or(Error::NoCompany)?;
        Ok(DashboardPage::new(self.gateway(), self.notifier(), company_id))
    }

    pub fn open_admin(&self) -> Arc<AdminPage> {
        AdminPage::new(self.gateway(), self.notifier())
    }
}
