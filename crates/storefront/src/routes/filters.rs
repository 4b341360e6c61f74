//! Filter panel route handlers.
//!
//! Selection state lives on the client; these handlers resolve the panel for
//! a selection and apply toggles without storing anything.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use threadline_core::filters::{FilterPanel, applicable_filters, resolve_panel, selection_mode};
use threadline_core::{FilterDefinition, SelectedFilters};

use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PanelQuery {
    /// Comma-separated category values.
    #[serde(default)]
    pub categories: Option<String>,
}

fn parse_categories(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect()
}

#[derive(Debug, Serialize)]
pub struct PanelResponse {
    pub success: bool,
    /// Applicable dynamic filters, in display order.
    pub filters: Vec<FilterDefinition>,
    pub panel: FilterPanel,
}

/// Filters applicable to the given categories, plus the rendered panel.
#[instrument(skip(state))]
pub async fn panel(
    State(state): State<AppState>,
    Query(query): Query<PanelQuery>,
) -> Result<Json<PanelResponse>> {
    let definitions = state.backends().catalog.filters().await?;
    let categories = parse_categories(query.categories.as_deref());

    let filters = applicable_filters(&definitions, &categories)
        .into_iter()
        .cloned()
        .collect();
    let selected: SelectedFilters = [("category", categories)].into_iter().collect();

    Ok(Json(PanelResponse {
        success: true,
        filters,
        panel: resolve_panel(&definitions, &selected),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    #[serde(default)]
    pub selected: SelectedFilters,
    pub filter_name: String,
    pub value: String,
    pub checked: bool,
}

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub success: bool,
    pub selected: SelectedFilters,
    pub panel: FilterPanel,
}

/// Apply one checkbox or radio change.
#[instrument(skip(state, body), fields(filter = %body.filter_name, checked = body.checked))]
pub async fn toggle(
    State(state): State<AppState>,
    Json(body): Json<ToggleRequest>,
) -> Result<Json<SelectionResponse>> {
    let definitions = state.backends().catalog.filters().await?;
    let mode = selection_mode(&definitions, &body.filter_name);
    let selected = body
        .selected
        .toggle_value(&body.filter_name, &body.value, body.checked, mode);

    Ok(Json(SelectionResponse {
        success: true,
        panel: resolve_panel(&definitions, &selected),
        selected,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ClearRequest {
    #[serde(default)]
    pub selected: SelectedFilters,
}

/// Reset every known filter to an empty selection.
#[instrument(skip_all)]
pub async fn clear(
    State(state): State<AppState>,
    Json(body): Json<ClearRequest>,
) -> Result<Json<SelectionResponse>> {
    let definitions = state.backends().catalog.filters().await?;
    let selected = body.selected.cleared(&definitions);

    Ok(Json(SelectionResponse {
        success: true,
        panel: resolve_panel(&definitions, &selected),
        selected,
    }))
}
