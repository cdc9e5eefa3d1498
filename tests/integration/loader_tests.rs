use super::*;
use fare_watcher::loader::load_filters_file;
use fare_watcher::models::TripType;
use fare_watcher::runner::{FilterStatus, Runner};
use fare_watcher::utils::error::AppError;
use std::io::Write;

const FILTERS: &str = r#"
[[filters]]
name = "A"
trip_type = "one_way"
origin = "Bucharest"
depart_from = "10-05-2025"
depart_to = "12-05-2025"
currency = "usd"
max_results = 25
max_budget = 27

[[filters]]
name = "Broken"
trip_type = "one_way"
origin = "Bucharest"
depart_from = "32-05-2025"
depart_to = "12-05-2025"
currency = "USD"
max_results = 25
max_budget = 27

[[filters]]
name = "Paused"
enabled = false
trip_type = "one_way"
origin = "Bucharest"
depart_from = "10-05-2025"
depart_to = "12-05-2025"
currency = "USD"
max_results = 25
max_budget = 27

[[filters]]
name = "New year"
trip_type = "return"
origin = "Cluj"
depart_from = 28
depart_to = 2
depart_month = "December"
depart_year = 2025
depart_to_month = 1
depart_to_year = 2026
return_from = "03/01/2026"
return_to = "06/01/2026"
max_days = 10
currency = "EUR"
max_results = 10
max_budget = 80
"#;

fn write_filters(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_filters_file_skips_invalid_and_disabled_rows() {
    let file = write_filters(FILTERS);
    let report = load_filters_file(file.path()).unwrap();

    let names: Vec<&str> = report.specs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["A", "New year"]);
    assert_eq!(report.disabled, 1);
    assert_eq!(report.rejected.len(), 1);
    assert!(matches!(
        &report.rejected[0],
        AppError::ConfigRowInvalid { row: 2, name, .. } if name == "Broken"
    ));

    let new_year = &report.specs[1];
    assert_eq!(new_year.departure.from, date(2025, 12, 28));
    assert_eq!(new_year.departure.to, date(2026, 1, 2));
    assert!(matches!(new_year.trip, TripType::Return { max_trip_days: Some(10), .. }));
}

#[test]
fn test_malformed_filters_file_is_an_error() {
    let file = write_filters("[[filters]\nname = ");
    assert!(matches!(load_filters_file(file.path()), Err(AppError::FilterFile(_))));
}

#[tokio::test]
async fn test_loaded_filters_run_past_bad_rows() {
    let file = write_filters(FILTERS);
    let loaded = load_filters_file(file.path()).unwrap();

    let config = get_test_config();
    let page = results_page(&[card("$20", &[("2025-05-10", "06:00", "BUC-LHR")])]);
    let site = ScriptedSite::new(date(2025, 5, 1))
        .with_scenario("Bucharest", Scenario::Results(page))
        .with_scenario("Cluj", Scenario::Empty);
    let notifier = RecordingNotifier::default();

    let report = Runner::new(&site, &notifier, &config).run_batch(&loaded.specs).await;

    assert_eq!(report.filters.len(), 2);
    assert_eq!(report.filters[0].status, FilterStatus::Notified);
    assert_eq!(report.filters[1].status, FilterStatus::Silent);
    assert_eq!(notifier.messages().len(), 1);

    // December to January spans two months, so both day cells are picked.
    let actions = site.actions();
    assert!(actions.contains(&"pick 28 December 2025".to_string()));
    assert!(actions.contains(&"pick 2 January 2026".to_string()));
}
