//! Catalog filter definitions and the filter resolver.
//!
//! Filter definitions are managed on the backend. Each one is either global
//! or scoped to a set of categories, and is either single- or multi-select.
//! The resolver decides which definitions apply to the categories a shopper
//! has picked, orders them, and applies checkbox/radio toggles to the
//! selection state.
//!
//! Category and gender are built-in sections: they are always shown first and
//! never come from the dynamic definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::FilterId;

/// Built-in category options, in display order.
pub const CATEGORY_OPTIONS: &[&str] = &[
    "Sarees", "Kurtis", "Suits", "Shirts", "Pants", "Dress", "Salwars", "Sets",
];

/// Built-in gender options, in display order.
pub const GENDER_OPTIONS: &[&str] = &["Women", "Men", "Children"];

/// Selection keys every shopper session knows about, even before any
/// definitions are loaded.
pub const BUILTIN_KEYS: &[&str] = &[
    "category", "gender", "occasion", "type", "color", "material", "size",
];

const CATEGORY_KEY: &str = "category";
const GENDER_KEY: &str = "gender";

/// Display priority for well-known dynamic filters. Unlisted names sort last.
const PRIORITY: &[(&str, u8)] = &[
    ("color", 1),
    ("material", 2),
    ("occasion", 3),
    ("type", 4),
    ("size", 5),
];
const UNLISTED_PRIORITY: u8 = 99;

/// Which products a filter definition applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterScope {
    Global,
    /// Applies when any of these (capitalised) categories is selected.
    CategorySpecific(Vec<String>),
}

/// Radio-button or checkbox semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    SingleSelect,
    #[default]
    MultiSelect,
}

/// One selectable value of a filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterValue {
    pub value: String,
    pub display_name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_code: Option<String>,
}

/// A filter managed on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireFilter", into = "WireFilter")]
pub struct FilterDefinition {
    pub id: Option<FilterId>,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub scope: FilterScope,
    pub mode: SelectionMode,
    pub values: Vec<FilterValue>,
}

impl FilterDefinition {
    /// Values shoppers can currently pick.
    pub fn active_values(&self) -> impl Iterator<Item = &FilterValue> {
        self.values.iter().filter(|v| v.is_active)
    }

    fn is_builtin(&self) -> bool {
        let name = self.name.to_lowercase();
        name == CATEGORY_KEY || name == GENDER_KEY
    }

    fn priority(&self) -> u8 {
        let name = self.name.to_lowercase();
        PRIORITY
            .iter()
            .find(|(known, _)| *known == name)
            .map_or(UNLISTED_PRIORITY, |(_, rank)| *rank)
    }

    fn applies_to(&self, categories: &[String]) -> bool {
        match &self.scope {
            FilterScope::Global => true,
            FilterScope::CategorySpecific(applicable) => categories
                .iter()
                .map(|c| capitalize(c))
                .any(|c| applicable.contains(&c)),
        }
    }
}

/// Backend JSON shape of a filter definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFilter {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<FilterId>,
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "type")]
    scope: String,
    #[serde(default)]
    applicable_categories: Vec<String>,
    #[serde(default)]
    filter_type: Option<String>,
    #[serde(default)]
    values: Vec<FilterValue>,
}

/// Why a backend filter definition was not accepted.
#[derive(Debug, thiserror::Error)]
#[error("filter '{name}' has unknown scope '{scope}'")]
pub struct UnknownScope {
    pub name: String,
    pub scope: String,
}

impl TryFrom<WireFilter> for FilterDefinition {
    type Error = UnknownScope;

    fn try_from(wire: WireFilter) -> Result<Self, Self::Error> {
        let scope = match wire.scope.as_str() {
            "global" => FilterScope::Global,
            "category-specific" => FilterScope::CategorySpecific(wire.applicable_categories),
            _ => {
                return Err(UnknownScope {
                    name: wire.name,
                    scope: wire.scope,
                });
            }
        };
        // Anything but an explicit single-select behaves as checkboxes
        let mode = match wire.filter_type.as_deref() {
            Some("single-select") => SelectionMode::SingleSelect,
            _ => SelectionMode::MultiSelect,
        };
        let display_name = if wire.display_name.is_empty() {
            wire.name.clone()
        } else {
            wire.display_name
        };

        Ok(Self {
            id: wire.id,
            name: wire.name,
            display_name,
            description: wire.description,
            scope,
            mode,
            values: wire.values,
        })
    }
}

impl From<FilterDefinition> for WireFilter {
    fn from(def: FilterDefinition) -> Self {
        let (scope, applicable_categories) = match def.scope {
            FilterScope::Global => ("global".to_owned(), Vec::new()),
            FilterScope::CategorySpecific(categories) => {
                ("category-specific".to_owned(), categories)
            }
        };
        let filter_type = match def.mode {
            SelectionMode::SingleSelect => "single-select",
            SelectionMode::MultiSelect => "multi-select",
        };
        Self {
            id: def.id,
            name: def.name,
            display_name: def.display_name,
            description: def.description,
            scope,
            applicable_categories,
            filter_type: Some(filter_type.to_owned()),
            values: def.values,
        }
    }
}

/// Parse the backend's filter list, dropping (and logging) entries that do
/// not describe a usable definition.
#[must_use]
pub fn parse_definitions(raw: Vec<serde_json::Value>) -> Vec<FilterDefinition> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<FilterDefinition>(value) {
            Ok(def) => Some(def),
            Err(e) => {
                warn!(error = %e, "skipping filter definition");
                None
            }
        })
        .collect()
}

/// Lower-case a category, then upper-case its first letter (`"SAREES"` ->
/// `"Sarees"`), matching how categories are stored on definitions.
fn capitalize(category: &str) -> String {
    let lower = category.trim().to_lowercase();
    let mut chars = lower.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Dynamic filter definitions that apply to the selected categories, in
/// display order.
///
/// With no categories selected only global filters apply. Otherwise global
/// filters apply along with category-specific filters naming at least one
/// selected category. Built-in sections (category, gender) are never
/// included. Known names are ordered by priority; the sort is stable, so
/// unlisted names keep their original order after the known ones.
#[must_use]
pub fn applicable_filters<'a>(
    all: &'a [FilterDefinition],
    selected_categories: &[String],
) -> Vec<&'a FilterDefinition> {
    let mut applicable: Vec<&FilterDefinition> = scope_matches(all, selected_categories)
        .filter(|def| !def.is_builtin())
        .collect();
    applicable.sort_by_key(|def| def.priority());
    applicable
}

/// Definitions whose scope matches the selected categories, built-ins included.
fn scope_matches<'a>(
    all: &'a [FilterDefinition],
    selected_categories: &[String],
) -> impl Iterator<Item = &'a FilterDefinition> {
    all.iter().filter(move |def| {
        if selected_categories.is_empty() {
            def.scope == FilterScope::Global
        } else {
            def.applies_to(selected_categories)
        }
    })
}

/// Selection mode of a named filter. Built-in sections and names without a
/// definition are multi-select.
#[must_use]
pub fn selection_mode(definitions: &[FilterDefinition], name: &str) -> SelectionMode {
    definitions
        .iter()
        .find(|def| def.name == name)
        .map_or(SelectionMode::MultiSelect, |def| def.mode)
}

/// Selected raw values per filter name.
///
/// Lists are used for single-select filters too, so the server always sees
/// the same shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectedFilters(BTreeMap<String, Vec<String>>);

impl SelectedFilters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Values selected for a filter (empty if none).
    #[must_use]
    pub fn values(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn categories(&self) -> &[String] {
        self.values(CATEGORY_KEY)
    }

    #[must_use]
    pub fn is_selected(&self, name: &str, value: &str) -> bool {
        self.values(name).iter().any(|v| v == value)
    }

    /// Apply a checkbox or radio change and return the new selection.
    ///
    /// Multi-select appends on check (once) and removes every occurrence on
    /// uncheck. Single-select replaces the list with `[value]` on check and
    /// with `[]` on uncheck.
    #[must_use]
    pub fn toggle_value(&self, name: &str, value: &str, checked: bool, mode: SelectionMode) -> Self {
        let mut next = self.clone();
        let values = next.0.entry(name.to_owned()).or_default();

        match (mode, checked) {
            (SelectionMode::MultiSelect, true) => {
                if !values.iter().any(|v| v == value) {
                    values.push(value.to_owned());
                }
            }
            (SelectionMode::MultiSelect, false) => values.retain(|v| v != value),
            (SelectionMode::SingleSelect, true) => *values = vec![value.to_owned()],
            (SelectionMode::SingleSelect, false) => values.clear(),
        }
        next
    }

    /// Reset every recognised key to an empty list.
    ///
    /// Recognised keys are the built-in ones, every definition name, and any
    /// key already present in the selection.
    #[must_use]
    pub fn cleared(&self, definitions: &[FilterDefinition]) -> Self {
        let keys = BUILTIN_KEYS
            .iter()
            .map(|k| (*k).to_owned())
            .chain(definitions.iter().map(|def| def.name.clone()))
            .chain(self.0.keys().cloned());
        Self(keys.map(|k| (k, Vec::new())).collect())
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<String>)> for SelectedFilters {
    fn from_iter<I: IntoIterator<Item = (K, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// =============================================================================
// Panel
// =============================================================================

/// A selectable option as rendered in the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelOption {
    pub value: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_code: Option<String>,
    pub selected: bool,
}

/// One section of the filter panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelSection {
    pub name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub mode: SelectionMode,
    pub builtin: bool,
    pub options: Vec<PanelOption>,
}

/// The resolved filter panel for a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPanel {
    pub sections: Vec<PanelSection>,
    /// Shown when no dynamic filter applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_hint: Option<&'static str>,
}

fn builtin_section(name: &str, display_name: &str, options: &[&str], selected: &SelectedFilters) -> PanelSection {
    PanelSection {
        name: name.to_owned(),
        display_name: display_name.to_owned(),
        description: None,
        mode: SelectionMode::MultiSelect,
        builtin: true,
        options: options
            .iter()
            .map(|label| {
                let value = label.to_lowercase();
                PanelOption {
                    selected: selected.is_selected(name, &value),
                    value,
                    display_name: (*label).to_owned(),
                    color_code: None,
                }
            })
            .collect(),
    }
}

/// Build the panel: built-in sections first, then every applicable dynamic
/// filter that still has active values.
#[must_use]
pub fn resolve_panel(definitions: &[FilterDefinition], selected: &SelectedFilters) -> FilterPanel {
    let applicable = applicable_filters(definitions, selected.categories());

    // A backend-defined category or gender filter still counts as configured
    let nothing_configured = scope_matches(definitions, selected.categories())
        .next()
        .is_none();
    let empty_hint = nothing_configured.then(|| {
        if selected.categories().is_empty() {
            "Select a category to see filters"
        } else {
            "No filters configured for this category"
        }
    });

    let mut sections = vec![
        builtin_section(CATEGORY_KEY, "Category", CATEGORY_OPTIONS, selected),
        builtin_section(GENDER_KEY, "Gender", GENDER_OPTIONS, selected),
    ];
    sections.extend(applicable.into_iter().filter_map(|def| {
        let options: Vec<PanelOption> = def
            .active_values()
            .map(|v| PanelOption {
                value: v.value.clone(),
                display_name: v.display_name.clone(),
                color_code: v.color_code.clone(),
                selected: selected.is_selected(&def.name, &v.value),
            })
            .collect();
        (!options.is_empty()).then(|| PanelSection {
            name: def.name.clone(),
            display_name: def.display_name.clone(),
            description: def.description.clone(),
            mode: def.mode,
            builtin: false,
            options,
        })
    }));

    FilterPanel {
        sections,
        empty_hint,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn value(v: &str, active: bool) -> FilterValue {
        FilterValue {
            value: v.to_owned(),
            display_name: capitalize(v),
            is_active: active,
            color_code: None,
        }
    }

    fn def(name: &str, scope: FilterScope, mode: SelectionMode) -> FilterDefinition {
        FilterDefinition {
            id: None,
            name: name.to_owned(),
            display_name: capitalize(name),
            description: None,
            scope,
            mode,
            values: vec![value("a", true), value("b", true)],
        }
    }

    fn global(name: &str) -> FilterDefinition {
        def(name, FilterScope::Global, SelectionMode::MultiSelect)
    }

    fn scoped(name: &str, categories: &[&str]) -> FilterDefinition {
        def(
            name,
            FilterScope::CategorySpecific(categories.iter().map(|c| (*c).to_owned()).collect()),
            SelectionMode::MultiSelect,
        )
    }

    fn names(defs: &[&FilterDefinition]) -> Vec<String> {
        defs.iter().map(|d| d.name.clone()).collect()
    }

    #[test]
    fn test_no_categories_yields_globals_in_priority_order() {
        let all = vec![
            global("occasion"),
            scoped("fabric", &["Sarees"]),
            global("material"),
            global("color"),
        ];
        let applicable = applicable_filters(&all, &[]);
        assert_eq!(names(&applicable), vec!["color", "material", "occasion"]);
    }

    #[test]
    fn test_empty_catalog_yields_nothing() {
        assert!(applicable_filters(&[], &[]).is_empty());
    }

    #[test]
    fn test_category_selection_adds_scoped_filters() {
        let all = vec![
            scoped("blouse", &["Sarees"]),
            global("color"),
            scoped("fit", &["Shirts", "Pants"]),
        ];
        let applicable = applicable_filters(&all, &["sarees".to_owned()]);
        assert_eq!(names(&applicable), vec!["color", "blouse"]);

        let applicable = applicable_filters(&all, &["PANTS".to_owned(), "kurtis".to_owned()]);
        assert_eq!(names(&applicable), vec!["color", "fit"]);
    }

    #[test]
    fn test_unlisted_names_keep_original_order_after_known() {
        let all = vec![global("zari"), global("size"), global("border"), global("color")];
        let applicable = applicable_filters(&all, &[]);
        assert_eq!(names(&applicable), vec!["color", "size", "zari", "border"]);
    }

    #[test]
    fn test_builtin_sections_are_excluded() {
        let all = vec![global("Gender"), global("category"), global("color")];
        let applicable = applicable_filters(&all, &[]);
        assert_eq!(names(&applicable), vec!["color"]);
    }

    #[test]
    fn test_single_select_check_always_singleton() {
        let selected: SelectedFilters = [("size", vec!["s".to_owned(), "m".to_owned()])]
            .into_iter()
            .collect();
        let next = selected.toggle_value("size", "l", true, SelectionMode::SingleSelect);
        assert_eq!(next.values("size"), ["l".to_owned()]);

        let next = SelectedFilters::new().toggle_value("size", "l", true, SelectionMode::SingleSelect);
        assert_eq!(next.values("size"), ["l".to_owned()]);
    }

    #[test]
    fn test_single_select_uncheck_always_empty() {
        let selected: SelectedFilters = [("size", vec!["m".to_owned()])].into_iter().collect();
        let next = selected.toggle_value("size", "l", false, SelectionMode::SingleSelect);
        assert!(next.values("size").is_empty());
    }

    #[test]
    fn test_multi_select_appends_once() {
        let selected = SelectedFilters::new()
            .toggle_value("color", "red", true, SelectionMode::MultiSelect)
            .toggle_value("color", "blue", true, SelectionMode::MultiSelect)
            .toggle_value("color", "red", true, SelectionMode::MultiSelect);
        assert_eq!(selected.values("color"), ["red".to_owned(), "blue".to_owned()]);
    }

    #[test]
    fn test_multi_select_uncheck_removes_all_occurrences() {
        let selected: SelectedFilters =
            [("color", vec!["red".to_owned(), "blue".to_owned(), "red".to_owned()])]
                .into_iter()
                .collect();
        let next = selected.toggle_value("color", "red", false, SelectionMode::MultiSelect);
        assert_eq!(next.values("color"), ["blue".to_owned()]);
    }

    #[test]
    fn test_uncheck_absent_value_is_noop() {
        let selected: SelectedFilters = [("color", vec!["blue".to_owned()])].into_iter().collect();
        let next = selected.toggle_value("color", "red", false, SelectionMode::MultiSelect);
        assert_eq!(next, selected);
    }

    #[test]
    fn test_toggle_does_not_mutate_input() {
        let selected = SelectedFilters::new();
        let _ = selected.toggle_value("color", "red", true, SelectionMode::MultiSelect);
        assert_eq!(selected, SelectedFilters::new());
    }

    #[test]
    fn test_cleared_resets_every_known_key() {
        let selected: SelectedFilters = [
            ("color", vec!["red".to_owned()]),
            ("legacy", vec!["x".to_owned()]),
        ]
        .into_iter()
        .collect();
        let cleared = selected.cleared(&[global("zari")]);

        for key in BUILTIN_KEYS.iter().copied().chain(["zari", "legacy"]) {
            assert!(cleared.values(key).is_empty(), "{key} should be empty");
        }
        let json = serde_json::to_value(&cleared).unwrap();
        assert_eq!(json.as_object().unwrap().len(), BUILTIN_KEYS.len() + 2);
    }

    #[test]
    fn test_selection_mode_lookup_defaults_to_multi() {
        let all = vec![def("size", FilterScope::Global, SelectionMode::SingleSelect)];
        assert_eq!(selection_mode(&all, "size"), SelectionMode::SingleSelect);
        assert_eq!(selection_mode(&all, "category"), SelectionMode::MultiSelect);
        assert_eq!(selection_mode(&all, "unknown"), SelectionMode::MultiSelect);
    }

    #[test]
    fn test_parse_definitions_from_backend() {
        let raw = vec![
            json!({
                "_id": "f1",
                "name": "color",
                "displayName": "Colour",
                "type": "global",
                "filterType": "multi-select",
                "values": [{"value": "red", "displayName": "Red", "isActive": true, "colorCode": "#f00"}]
            }),
            json!({
                "name": "blouse",
                "type": "category-specific",
                "applicableCategories": ["Sarees"],
                "filterType": "single-select",
                "values": []
            }),
            json!({"name": "odd", "type": "seasonal"}),
            json!({"name": "fabric", "type": "global"}),
        ];
        let defs = parse_definitions(raw);

        assert_eq!(defs.len(), 3);
        assert_eq!(defs[0].id, Some(FilterId::new("f1")));
        assert_eq!(defs[0].values[0].color_code.as_deref(), Some("#f00"));
        assert_eq!(defs[1].scope, FilterScope::CategorySpecific(vec!["Sarees".to_owned()]));
        assert_eq!(defs[1].mode, SelectionMode::SingleSelect);
        assert_eq!(defs[1].display_name, "blouse");
        assert_eq!(defs[2].mode, SelectionMode::MultiSelect);
    }

    #[test]
    fn test_panel_omits_filters_without_active_values() {
        let mut hidden = global("material");
        hidden.values = vec![value("silk", false)];
        let mut color = global("color");
        color.values = vec![value("red", true), value("teal", false)];

        let selected: SelectedFilters = [("color", vec!["red".to_owned()])].into_iter().collect();
        let panel = resolve_panel(&[hidden, color], &selected);

        let names: Vec<&str> = panel.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["category", "gender", "color"]);
        let color = &panel.sections[2];
        assert_eq!(color.options.len(), 1);
        assert!(color.options[0].selected);
        assert!(panel.empty_hint.is_none());
    }

    #[test]
    fn test_panel_builtins_reflect_selection() {
        let selected: SelectedFilters = [("category", vec!["kurtis".to_owned()])].into_iter().collect();
        let panel = resolve_panel(&[], &selected);

        let category = &panel.sections[0];
        assert_eq!(category.options.len(), CATEGORY_OPTIONS.len());
        assert!(category.options.iter().any(|o| o.value == "kurtis" && o.selected));
        assert_eq!(panel.empty_hint, Some("No filters configured for this category"));

        let panel = resolve_panel(&[], &SelectedFilters::new());
        assert_eq!(panel.empty_hint, Some("Select a category to see filters"));
    }

    #[test]
    fn test_backend_gender_filter_suppresses_empty_hint() {
        let defs = [global("gender")];
        assert!(applicable_filters(&defs, &[]).is_empty());

        let panel = resolve_panel(&defs, &SelectedFilters::new());
        let names: Vec<&str> = panel.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["category", "gender"]);
        assert!(panel.empty_hint.is_none());
    }
}
