use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session issued by the hosted auth service.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: Identity,
}

/// Signed-in identity as reported by the auth service. Immutable here:
/// registration is the only write this system performs against it.
#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl Identity {
    pub fn full_name(&self) -> Option<&str> {
        self.user_metadata.get("full_name").and_then(|v| v.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.user_metadata.get("role").and_then(|v| v.as_str()) == Some("admin")
    }
}

/// Tenant owning all domain rows.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct NewCompany {
    pub name: String,
    pub owner_id: Uuid,
}

/// Join row granting an identity access to a company. Never mutated.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Membership {
    pub user_id: Uuid,
    pub company_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Basic,
    Professional,
    Enterprise,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Basic => "basic",
            Plan::Professional => "professional",
            Plan::Enterprise => "enterprise",
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Billing status, observed only. Transitions happen in the external
/// billing system; this crate never gates access on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// Display classification: trialing tenants are in good standing.
    pub fn in_good_standing(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Subscription {
    pub id: Uuid,
    pub company_id: Uuid,
    pub plan: Plan,
    #[serde(default = "default_status")]
    pub status: SubscriptionStatus,
}

fn default_status() -> SubscriptionStatus {
    SubscriptionStatus::Active
}

#[derive(Debug, Serialize)]
pub struct NewSubscription {
    pub company_id: Uuid,
    pub plan: Plan,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Employee {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub email: String,
    pub position: String,
    pub department: String,
    pub salary: i64,
    pub join_date: NaiveDate,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct NewEmployee {
    pub company_id: Uuid,
    pub name: String,
    pub email: String,
    pub position: String,
    pub department: String,
    pub salary: i64,
    pub join_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobPosting {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub department: String,
    pub location: String,
    pub salary: String,
    pub description: String,
    pub status: String,
    pub posted_date: NaiveDateTime,
    #[serde(default)]
    pub applicants: i64,
}

#[derive(Debug, Serialize)]
pub struct NewJobPosting {
    pub company_id: Uuid,
    pub title: String,
    pub department: String,
    pub location: String,
    pub salary: String,
    pub description: String,
    pub status: String,
    pub posted_date: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PayrollRecord {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub month: String,
    pub year: i32,
    pub base_salary: i64,
    pub bonus: i64,
    pub deductions: i64,
    pub net_pay: i64,
}

#[derive(Debug, Serialize)]
pub struct NewPayrollRecord {
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub month: String,
    pub year: i32,
    pub base_salary: i64,
    pub bonus: i64,
    pub deductions: i64,
    pub net_pay: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NewAttendanceRecord {
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
}
