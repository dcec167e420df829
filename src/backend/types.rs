//! Row types mirroring the hosted database schema.
//!
//! The schema is owned by the provider (tables, views, row-level security);
//! these structs only describe the JSON the data API returns. Optional columns
//! default to `None` so partial `select` lists still deserialize.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// A table or view exposed by the data API.
pub trait Relation {
    const NAME: &'static str;
}

macro_rules! relation {
    ($ty:ty, $name:literal) => {
        impl Relation for $ty {
            const NAME: &'static str = $name;
        }
    };
}

/// Authenticated user as returned by the auth API.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Token pair issued by the auth API.
#[derive(Serialize, Deserialize, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user: User,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("expires_in", &self.expires_in)
            .field("user", &self.user)
            .finish()
    }
}

/// Result of a sign-up call: either an immediate session (auto-confirm) or a
/// pending email confirmation.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    Session(Box<Session>),
    ConfirmationSent(User),
}

/// Email OTP flavours accepted by the verify endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpType {
    Signup,
    Recovery,
    Magiclink,
    Invite,
    EmailChange,
    Email,
}

impl OtpType {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "signup" => Some(Self::Signup),
            "recovery" => Some(Self::Recovery),
            "magiclink" => Some(Self::Magiclink),
            "invite" => Some(Self::Invite),
            "email_change" => Some(Self::EmailChange),
            "email" => Some(Self::Email),
            _ => None,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub monthly_income: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}
relation!(Profile, "profiles");

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub account_type: String,
    pub balance: f64,
    #[serde(default)]
    pub currency: Option<String>,
}
relation!(Account, "accounts");

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// `income` or `expense`.
    pub kind: String,
    #[serde(default)]
    pub color: Option<String>,
}
relation!(Category, "categories");

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FixedCharge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub day_of_month: Option<i16>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
}
relation!(FixedCharge, "fixed_charges");

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub account_id: Option<Uuid>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    pub amount: f64,
    /// `income` or `expense`.
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    pub occurred_on: String,
}
relation!(Transaction, "transactions");

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Investment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub investment_type: String,
    pub invested_amount: f64,
    pub current_value: f64,
}
relation!(Investment, "investments");

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Debt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub initial_amount: f64,
    pub remaining_amount: f64,
    #[serde(default)]
    pub interest_rate: Option<f64>,
    #[serde(default)]
    pub monthly_payment: Option<f64>,
}
relation!(Debt, "debts");

/// Point-in-time balance snapshot.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BalanceHistory {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub account_id: Option<Uuid>,
    pub balance: f64,
    pub recorded_on: String,
}
relation!(BalanceHistory, "balance_history");

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SavingsGoal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    #[serde(default)]
    pub deadline: Option<String>,
}
relation!(SavingsGoal, "savings_goals");

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MonthlyBudget {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    /// First day of the month, `YYYY-MM-DD`.
    pub month: String,
    pub planned_amount: f64,
}
relation!(MonthlyBudget, "monthly_budgets");

/// Net worth rollup computed by the `patrimoine_totals` view.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PatrimoineTotals {
    pub user_id: Uuid,
    pub total_assets: f64,
    pub total_investments: f64,
    pub total_debts: f64,
    pub net_worth: f64,
}
relation!(PatrimoineTotals, "patrimoine_totals");

/// Per-month income/expense rollup computed by the `monthly_summaries` view.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MonthlySummary {
    pub user_id: Uuid,
    pub month: String,
    pub total_income: f64,
    pub total_expenses: f64,
    pub balance: f64,
}
relation!(MonthlySummary, "monthly_summaries");
