use axum::{
    Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;
use chrono::Utc;

use crate::middleware::ApiQuery;
use crate::types::forms::DashboardQuery;
use crate::types::views::{Dashboard, MonthWindow};
use crate::{CrmError, router::CrmState};

/// Pending work plus KPIs for `?month=YYYY-MM`, or the current month.
pub async fn dashboard(
    State(state): State<CrmState>,
    WithRejection(Query(query), _): ApiQuery<DashboardQuery>,
) -> Result<Json<Dashboard>, CrmError> {
    let now = Utc::now();
    let window = match query.month.as_deref().map(str::trim) {
        Some(month) if !month.is_empty() => MonthWindow::parse(month)?,
        _ => MonthWindow::containing(now),
    };
    Ok(Json(
        state.storage.dashboard(window, now, &state.dashboard).await?,
    ))
}
