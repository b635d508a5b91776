use askama::Template;
use axum::extract::{Query, State};
use axum::response::Html;
use serde::Deserialize;
use tower_cookies::Cookies;
use tracing::debug;

use crate::auth::Caller;
use crate::date_utils::Granularity;
use crate::db::queries::{expenses, users};
use crate::error::{AppError, AppResult, RenderHtml};
use crate::flash::{self, Flash};
use crate::models::expense::format_amount;
use crate::models::Expense;
use crate::services::aggregation::{self, CategoryTotal, PeriodTotal};
use crate::services::charts;
use crate::state::AppState;
use crate::VERSION;

#[derive(Template)]
#[template(path = "pages/dashboard.html")]
pub struct DashboardTemplate {
    pub title: String,
    pub version: &'static str,
    pub logged_in: bool,
    pub flash: Option<Flash>,
    pub username: String,
    pub expenses: Vec<Expense>,
    pub categories: Vec<CategoryTotal>,
    pub periods: Vec<PeriodTotal>,
    pub grand_total: String,
    pub granularity: Granularity,
    pub granularities: &'static [Granularity],
    pub pie_chart: String,
    pub bar_chart: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub time_period: Option<String>,
}

impl DashboardQuery {
    /// Unknown or missing values fall back to monthly buckets.
    fn granularity(&self) -> Granularity {
        self.time_period
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }
}

pub async fn index(
    State(state): State<AppState>,
    caller: Caller,
    cookies: Cookies,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Html<String>> {
    let user_id = caller.require()?;
    let granularity = query.granularity();
    let conn = state.db.get()?;

    let user = users::find_user_by_id(&conn, user_id)?.ok_or(AppError::NotAuthenticated)?;
    let expenses = expenses::list_expenses_for_user(&conn, user_id)?;

    let categories = aggregation::aggregate_by_category(&expenses);
    let periods = aggregation::aggregate_by_period(&expenses, granularity);
    let grand_total = aggregation::grand_total(&expenses);

    let pie_chart = charts::render_pie_chart(&categories).data_uri();
    let bar_chart = charts::render_bar_chart(&periods, granularity.chart_title()).data_uri();

    debug!(
        user_id,
        %granularity,
        expense_count = expenses.len(),
        category_count = categories.len(),
        period_count = periods.len(),
        "Rendering dashboard"
    );

    let template = DashboardTemplate {
        title: "Dashboard".into(),
        version: VERSION,
        logged_in: true,
        flash: flash::take(&cookies),
        username: user.username,
        expenses,
        categories,
        periods,
        grand_total: format_amount(grand_total),
        granularity,
        granularities: Granularity::all(),
        pie_chart,
        bar_chart,
    };

    template.render_html()
}
