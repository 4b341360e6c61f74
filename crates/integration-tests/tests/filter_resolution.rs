//! Filter definitions from backend JSON through to the resolved panel.

#![allow(clippy::unwrap_used)]

use threadline_core::{FilterScope, SelectionMode};
use threadline_core::filters::{applicable_filters, resolve_panel, selection_mode};
use threadline_core::SelectedFilters;
use threadline_integration_tests::filter_definitions;

fn names(defs: &[&threadline_core::FilterDefinition]) -> Vec<String> {
    defs.iter().map(|d| d.name.clone()).collect()
}

fn categories(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|c| (*c).to_string()).collect()
}

#[test]
fn test_unusable_definitions_are_dropped() {
    let defs = filter_definitions();
    assert_eq!(defs.len(), 4);
    assert!(defs.iter().all(|d| d.name != "broken"));
}

#[test]
fn test_no_category_means_global_filters_in_priority_order() {
    let defs = filter_definitions();
    assert_eq!(names(&applicable_filters(&defs, &[])), ["color", "occasion"]);
}

#[test]
fn test_category_filters_match_case_insensitively() {
    let defs = filter_definitions();

    let sarees = applicable_filters(&defs, &categories(&["SAREES"]));
    assert_eq!(names(&sarees), ["color", "occasion", "fabric"]);

    let kurtis = applicable_filters(&defs, &categories(&["kurtis", "pants"]));
    assert_eq!(names(&kurtis), ["color", "occasion", "neckline"]);
}

#[test]
fn test_panel_lists_builtins_first_and_only_active_values() {
    let defs = filter_definitions();
    let selected: SelectedFilters = [("category", categories(&["kurtis"]))]
        .into_iter()
        .collect();

    let panel = resolve_panel(&defs, &selected);
    let sections: Vec<_> = panel.sections.iter().map(|s| s.name.as_str()).collect();

    // neckline applies but has no active values
    assert_eq!(sections, ["category", "gender", "color", "occasion"]);
    assert!(panel.empty_hint.is_none());

    let category = &panel.sections[0];
    assert!(category.builtin);
    assert!(category.options.iter().any(|o| o.value == "kurtis" && o.selected));
}

#[test]
fn test_single_select_toggle_keeps_one_value() {
    let defs = filter_definitions();
    let mode = selection_mode(&defs, "fabric");
    assert_eq!(mode, SelectionMode::SingleSelect);

    let selected = SelectedFilters::new()
        .toggle_value("fabric", "silk", true, mode)
        .toggle_value("fabric", "nylon", true, mode);
    assert_eq!(selected.values("fabric"), ["nylon"]);

    let cleared = selected.toggle_value("fabric", "silk", false, mode);
    assert!(cleared.values("fabric").is_empty());
}

#[test]
fn test_multi_select_uncheck_of_absent_value_is_a_no_op() {
    let defs = filter_definitions();
    let mode = selection_mode(&defs, "color");

    let selected = SelectedFilters::new().toggle_value("color", "red", true, mode);
    let again = selected.toggle_value("color", "blue", false, mode);
    assert_eq!(again, selected);
}

#[test]
fn test_clear_all_covers_builtin_defined_and_present_keys() {
    let defs = filter_definitions();
    let selected: SelectedFilters = [
        ("fabric", vec!["silk".to_string()]),
        ("sleeve", vec!["long".to_string()]),
    ]
    .into_iter()
    .collect();

    let cleared = selected.cleared(&defs);
    for key in ["category", "gender", "size", "fabric", "neckline", "sleeve"] {
        assert!(cleared.values(key).is_empty(), "{key} not cleared");
    }
    let json = serde_json::to_value(&cleared).unwrap();
    assert!(json.get("neckline").is_some());
    assert!(json.get("sleeve").is_some());
}

#[test]
fn test_empty_hint_when_no_filter_is_in_scope() {
    let scoped: Vec<_> = filter_definitions()
        .into_iter()
        .filter(|d| d.scope != FilterScope::Global)
        .collect();

    let panel = resolve_panel(&scoped, &SelectedFilters::new());
    assert_eq!(panel.empty_hint, Some("Select a category to see filters"));

    let shirts: SelectedFilters = [("category", categories(&["shirts"]))]
        .into_iter()
        .collect();
    let panel = resolve_panel(&scoped, &shirts);
    assert_eq!(panel.empty_hint, Some("No filters configured for this category"));

    let sarees: SelectedFilters = [("category", categories(&["sarees"]))]
        .into_iter()
        .collect();
    assert!(resolve_panel(&scoped, &sarees).empty_hint.is_none());
}
