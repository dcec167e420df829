//! Page data, one handler per feature area.
//!
//! Every protected handler takes [`RequireUser`], reads rows through the data
//! API with the user's own token (row-level security applies) and returns them
//! unchanged. Rollups come from the database views.

use crate::{
    api::{
        error::ApiError,
        password::MIN_PASSWORD_LENGTH,
        session::{gate::RequireUser, policy::safe_return_to},
        state::AppState,
    },
    backend::{
        Backend, BackendError, Relation, fetch_profile, fetch_rows,
        types::{
            Account, BalanceHistory, Category, Debt, FixedCharge, Investment, MonthlyBudget,
            MonthlySummary, PatrimoineTotals, Profile, SavingsGoal, Transaction,
        },
    },
};
use axum::{
    Json,
    extract::{Extension, Query},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub const DEFAULT_TRANSACTION_LIMIT: u32 = 100;
pub const MAX_TRANSACTION_LIMIT: u32 = 500;
const SUMMARY_MONTHS: u32 = 12;

/// Rows of `T` owned by `user_id`, ordered by `order` (data API syntax).
async fn owned_rows<T>(
    backend: &dyn Backend,
    authenticated: &RequireUser,
    order: &str,
    limit: Option<u32>,
) -> Result<Vec<T>, BackendError>
where
    T: Relation + DeserializeOwned,
{
    let RequireUser(user) = authenticated;
    let mut query = vec![
        ("select", "*".to_string()),
        ("user_id", owner_filter(user.user.id)),
        ("order", order.to_string()),
    ];
    if let Some(limit) = limit {
        query.push(("limit", limit.to_string()));
    }
    fetch_rows(backend, &user.access_token, &query).await
}

fn owner_filter(user_id: Uuid) -> String {
    format!("eq.{user_id}")
}

#[derive(ToSchema, Serialize, Debug)]
pub struct DashboardPage {
    pub profile: Option<Profile>,
    pub totals: Option<PatrimoineTotals>,
    /// Most recent months first.
    pub monthly_summaries: Vec<MonthlySummary>,
}

#[utoipa::path(
    get,
    path= "/dashboard",
    responses (
        (status = 200, description = "Net worth and recent monthly rollups", body = DashboardPage),
        (status = 303, description = "No valid session"),
        (status = 502, description = "Data API failure", body = crate::api::error::ErrorBody),
    ),
    tag= "pages"
)]
#[instrument(skip(gate, state))]
pub async fn dashboard(
    gate: RequireUser,
    state: Extension<Arc<AppState>>,
) -> Result<Json<DashboardPage>, ApiError> {
    let backend = state.backend();
    let RequireUser(user) = &gate;
    let totals_query = [
        ("select", "*".to_string()),
        ("user_id", owner_filter(user.user.id)),
        ("limit", "1".to_string()),
    ];

    let (profile, totals, monthly_summaries) = tokio::try_join!(
        fetch_profile(backend, &user.access_token, user.user.id),
        fetch_rows::<PatrimoineTotals>(backend, &user.access_token, &totals_query),
        owned_rows::<MonthlySummary>(backend, &gate, "month.desc", Some(SUMMARY_MONTHS)),
    )?;

    Ok(Json(DashboardPage {
        profile,
        totals: totals.into_iter().next(),
        monthly_summaries,
    }))
}

#[derive(ToSchema, Serialize, Debug)]
pub struct BudgetPage {
    pub monthly_budgets: Vec<MonthlyBudget>,
    pub categories: Vec<Category>,
    pub fixed_charges: Vec<FixedCharge>,
    pub savings_goals: Vec<SavingsGoal>,
}

#[utoipa::path(
    get,
    path= "/budget",
    responses (
        (status = 200, description = "Budgets, categories, fixed charges and savings goals", body = BudgetPage),
        (status = 303, description = "No valid session"),
        (status = 502, description = "Data API failure", body = crate::api::error::ErrorBody),
    ),
    tag= "pages"
)]
#[instrument(skip(gate, state))]
pub async fn budget(
    gate: RequireUser,
    state: Extension<Arc<AppState>>,
) -> Result<Json<BudgetPage>, ApiError> {
    let backend = state.backend();
    let (monthly_budgets, categories, fixed_charges, savings_goals) = tokio::try_join!(
        owned_rows::<MonthlyBudget>(backend, &gate, "month.desc", None),
        owned_rows::<Category>(backend, &gate, "name.asc", None),
        owned_rows::<FixedCharge>(backend, &gate, "day_of_month.asc", None),
        owned_rows::<SavingsGoal>(backend, &gate, "deadline.asc", None),
    )?;

    Ok(Json(BudgetPage {
        monthly_budgets,
        categories,
        fixed_charges,
        savings_goals,
    }))
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct TransactionsParams {
    /// Number of rows, default 100, capped at 500.
    limit: Option<u32>,
}

impl TransactionsParams {
    fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_TRANSACTION_LIMIT)
            .clamp(1, MAX_TRANSACTION_LIMIT)
    }
}

#[derive(ToSchema, Serialize, Debug)]
pub struct TransactionsPage {
    pub transactions: Vec<Transaction>,
    pub limit: u32,
}

#[utoipa::path(
    get,
    path= "/transactions",
    params(TransactionsParams),
    responses (
        (status = 200, description = "Transactions, newest first", body = TransactionsPage),
        (status = 303, description = "No valid session"),
        (status = 502, description = "Data API failure", body = crate::api::error::ErrorBody),
    ),
    tag= "pages"
)]
#[instrument(skip(gate, state))]
pub async fn transactions(
    gate: RequireUser,
    state: Extension<Arc<AppState>>,
    params: Option<Query<TransactionsParams>>,
) -> Result<Json<TransactionsPage>, ApiError> {
    let params = params.map(|Query(params)| params).unwrap_or_default();
    let limit = params.effective_limit();
    let transactions =
        owned_rows(state.backend(), &gate, "occurred_on.desc", Some(limit)).await?;

    Ok(Json(TransactionsPage {
        transactions,
        limit,
    }))
}

#[derive(ToSchema, Serialize, Debug)]
pub struct AccountsPage {
    pub accounts: Vec<Account>,
    pub balance_history: Vec<BalanceHistory>,
}

#[utoipa::path(
    get,
    path= "/accounts",
    responses (
        (status = 200, description = "Accounts and balance snapshots", body = AccountsPage),
        (status = 303, description = "No valid session"),
        (status = 502, description = "Data API failure", body = crate::api::error::ErrorBody),
    ),
    tag= "pages"
)]
#[instrument(skip(gate, state))]
pub async fn accounts(
    gate: RequireUser,
    state: Extension<Arc<AppState>>,
) -> Result<Json<AccountsPage>, ApiError> {
    let backend = state.backend();
    let (accounts, balance_history) = tokio::try_join!(
        owned_rows::<Account>(backend, &gate, "name.asc", None),
        owned_rows::<BalanceHistory>(backend, &gate, "recorded_on.desc", None),
    )?;

    Ok(Json(AccountsPage {
        accounts,
        balance_history,
    }))
}

#[derive(ToSchema, Serialize, Debug)]
pub struct InvestmentsPage {
    pub investments: Vec<Investment>,
}

#[utoipa::path(
    get,
    path= "/investments",
    responses (
        (status = 200, description = "Investments", body = InvestmentsPage),
        (status = 303, description = "No valid session"),
        (status = 502, description = "Data API failure", body = crate::api::error::ErrorBody),
    ),
    tag= "pages"
)]
#[instrument(skip(gate, state))]
pub async fn investments(
    gate: RequireUser,
    state: Extension<Arc<AppState>>,
) -> Result<Json<InvestmentsPage>, ApiError> {
    let investments = owned_rows(state.backend(), &gate, "name.asc", None).await?;
    Ok(Json(InvestmentsPage { investments }))
}

#[derive(ToSchema, Serialize, Debug)]
pub struct DebtsPage {
    pub debts: Vec<Debt>,
}

#[utoipa::path(
    get,
    path= "/debts",
    responses (
        (status = 200, description = "Debts", body = DebtsPage),
        (status = 303, description = "No valid session"),
        (status = 502, description = "Data API failure", body = crate::api::error::ErrorBody),
    ),
    tag= "pages"
)]
#[instrument(skip(gate, state))]
pub async fn debts(
    gate: RequireUser,
    state: Extension<Arc<AppState>>,
) -> Result<Json<DebtsPage>, ApiError> {
    let debts = owned_rows(state.backend(), &gate, "name.asc", None).await?;
    Ok(Json(DebtsPage { debts }))
}

#[derive(ToSchema, Serialize, Debug)]
pub struct SettingsPage {
    pub profile: Option<Profile>,
}

#[utoipa::path(
    get,
    path= "/settings",
    responses (
        (status = 200, description = "Profile of the signed-in user", body = SettingsPage),
        (status = 303, description = "No valid session"),
        (status = 502, description = "Data API failure", body = crate::api::error::ErrorBody),
    ),
    tag= "pages"
)]
#[instrument(skip(gate, state))]
pub async fn settings(
    gate: RequireUser,
    state: Extension<Arc<AppState>>,
) -> Result<Json<SettingsPage>, ApiError> {
    let RequireUser(user) = gate;
    let profile = fetch_profile(state.backend(), &user.access_token, user.user.id).await?;
    Ok(Json(SettingsPage { profile }))
}

#[derive(ToSchema, Serialize, Debug)]
pub struct ResetPasswordPage {
    pub email: Option<String>,
    pub min_password_length: usize,
}

#[utoipa::path(
    get,
    path= "/reset-password",
    responses (
        (status = 200, description = "Reset form for the signed-in user", body = ResetPasswordPage),
        (status = 303, description = "No valid session"),
    ),
    tag= "pages"
)]
pub async fn reset_password_form(gate: RequireUser) -> Json<ResetPasswordPage> {
    let RequireUser(user) = gate;
    Json(ResetPasswordPage {
        email: user.user.email,
        min_password_length: MIN_PASSWORD_LENGTH,
    })
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct LoginPageParams {
    redirect: Option<String>,
    error: Option<String>,
}

#[derive(ToSchema, Serialize, Debug, PartialEq, Eq)]
pub struct LoginPage {
    /// Sanitised return-to path to send back with the credentials.
    pub redirect: Option<String>,
    pub error: Option<String>,
}

#[utoipa::path(
    get,
    path= "/login",
    params(LoginPageParams),
    responses (
        (status = 200, description = "Login form state", body = LoginPage),
        (status = 303, description = "Already signed in"),
    ),
    tag= "pages"
)]
pub async fn login_form(params: Option<Query<LoginPageParams>>) -> Json<LoginPage> {
    let params = params.map(|Query(params)| params).unwrap_or_default();
    Json(LoginPage {
        redirect: safe_return_to(params.redirect.as_deref()).map(str::to_string),
        error: params.error,
    })
}

#[derive(ToSchema, Serialize, Debug)]
pub struct SignupPage {
    pub min_password_length: usize,
}

#[utoipa::path(
    get,
    path= "/signup",
    responses (
        (status = 200, description = "Signup form state", body = SignupPage),
        (status = 303, description = "Already signed in"),
    ),
    tag= "pages"
)]
pub async fn signup_form() -> Json<SignupPage> {
    Json(SignupPage {
        min_password_length: MIN_PASSWORD_LENGTH,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{StubBackend, USER_ID, body_json, test_app};
    use anyhow::Result;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header::COOKIE},
    };
    use serde_json::json;
    use tower::ServiceExt;

    fn get(uri: &str) -> Result<Request<Body>> {
        Ok(Request::builder()
            .uri(uri)
            .header(COOKIE, "patrimoine-access-token=good-token")
            .body(Body::empty())?)
    }

    fn query_of(backend: &StubBackend, relation: &str) -> Vec<(String, String)> {
        backend
            .selects
            .lock()
            .map(|selects| {
                selects
                    .iter()
                    .find(|(name, _)| name == relation)
                    .map(|(_, query)| query.clone())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn transaction_limit_is_clamped() {
        let limit = |limit| TransactionsParams { limit }.effective_limit();
        assert_eq!(limit(None), 100);
        assert_eq!(limit(Some(0)), 1);
        assert_eq!(limit(Some(20)), 20);
        assert_eq!(limit(Some(10_000)), 500);
    }

    #[tokio::test]
    async fn dashboard_reads_views() -> Result<()> {
        let backend = Arc::new(
            StubBackend::default()
                .with_user("good-token")
                .with_profile(Some(3000.0))
                .with_rows(
                    "patrimoine_totals",
                    json!([{
                        "user_id": USER_ID,
                        "total_assets": 12000.0,
                        "total_investments": 8000.0,
                        "total_debts": 5000.0,
                        "net_worth": 15000.0
                    }]),
                )
                .with_rows(
                    "monthly_summaries",
                    json!([{
                        "user_id": USER_ID,
                        "month": "2024-05-01",
                        "total_income": 3000.0,
                        "total_expenses": 2100.0,
                        "balance": 900.0
                    }]),
                ),
        );
        let response = test_app(backend.clone()).oneshot(get("/dashboard")?).await?;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await?;
        assert_eq!(body["totals"]["net_worth"], 15000.0);
        assert_eq!(body["monthly_summaries"][0]["balance"], 900.0);
        assert_eq!(body["profile"]["monthly_income"], 3000.0);

        let summaries = query_of(&backend, "monthly_summaries");
        assert!(summaries.contains(&pair("order", "month.desc")));
        assert!(summaries.contains(&pair("limit", "12")));
        assert!(summaries.contains(&pair("user_id", &format!("eq.{USER_ID}"))));
        Ok(())
    }

    #[tokio::test]
    async fn dashboard_without_totals_row() -> Result<()> {
        let backend = StubBackend::default().with_user("good-token");
        let response = test_app(backend).oneshot(get("/dashboard")?).await?;
        let body = body_json(response).await?;
        assert_eq!(body["totals"], serde_json::Value::Null);
        assert_eq!(body["monthly_summaries"], json!([]));
        Ok(())
    }

    #[tokio::test]
    async fn budget_reads_four_relations() -> Result<()> {
        let backend = Arc::new(StubBackend::default().with_user("good-token"));
        let response = test_app(backend.clone()).oneshot(get("/budget")?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        for relation in ["monthly_budgets", "categories", "fixed_charges", "savings_goals"] {
            assert!(
                !query_of(&backend, relation).is_empty(),
                "{relation} not queried"
            );
        }
        Ok(())
    }

    #[tokio::test]
    async fn transactions_honour_limit() -> Result<()> {
        let backend = Arc::new(StubBackend::default().with_user("good-token"));
        let response = test_app(backend.clone())
            .oneshot(get("/transactions?limit=25")?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await?["limit"], 25);

        let query = query_of(&backend, "transactions");
        assert!(query.contains(&pair("order", "occurred_on.desc")));
        assert!(query.contains(&pair("limit", "25")));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_rows_are_bad_gateway() -> Result<()> {
        let backend = StubBackend::default()
            .with_user("good-token")
            .with_rows("debts", json!([{"id": "not-a-uuid"}]));
        let response = test_app(backend).oneshot(get("/debts")?).await?;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        Ok(())
    }

    #[tokio::test]
    async fn accounts_include_balance_history() -> Result<()> {
        let backend = StubBackend::default().with_user("good-token").with_rows(
            "accounts",
            json!([{
                "id": "0b6c3f5e-1c1d-4a47-9d3e-6f1f0c0a0b01",
                "user_id": USER_ID,
                "name": "Livret A",
                "account_type": "savings",
                "balance": 4200.0
            }]),
        );
        let response = test_app(backend).oneshot(get("/accounts")?).await?;
        let body = body_json(response).await?;
        assert_eq!(body["accounts"][0]["name"], "Livret A");
        assert_eq!(body["balance_history"], json!([]));
        Ok(())
    }

    #[tokio::test]
    async fn login_form_sanitises_redirect() -> Result<()> {
        let response = test_app(StubBackend::default())
            .oneshot(
                Request::builder()
                    .uri("/login?redirect=https%3A%2F%2Fevil.example&error=auth_callback")
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await?,
            json!({"redirect": null, "error": "auth_callback"})
        );
        Ok(())
    }
}
