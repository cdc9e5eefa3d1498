use super::*;
use fare_watcher::config::TelegramConfig;
use fare_watcher::models::{DateRange, FilterSpec, TripType};
use fare_watcher::plugins::TelegramNotifier;
use fare_watcher::runner::{FilterStatus, Runner};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn one_way(name: &str, origin: &str, from: NaiveDate, to: NaiveDate) -> FilterSpec {
    FilterSpec {
        name: name.to_string(),
        trip: TripType::OneWay,
        origin: origin.to_string(),
        destination: None,
        departure: DateRange::new(from, to).unwrap(),
        currency: "USD".to_string(),
        max_results: 25,
        max_budget: 27,
    }
}

fn may_2025() -> NaiveDate {
    date(2025, 5, 1)
}

fn bucharest_page() -> String {
    results_page(&[
        card("$20", &[("2025-05-10", "06:00", "BUC-LHR")]),
        card("$10", &[("2025-05-09", "07:30", "BUC-PFO")]),
    ])
}

#[tokio::test]
async fn test_one_way_filter_sends_one_summary() {
    let config = get_test_config();
    let site = ScriptedSite::new(may_2025()).with_scenario("Bucharest", Scenario::Results(bucharest_page()));
    let notifier = RecordingNotifier::default();

    let runner = Runner::new(&site, &notifier, &config);
    let report = runner
        .run_batch(&[one_way("A", "Bucharest", date(2025, 5, 10), date(2025, 5, 12))])
        .await;

    assert_eq!(report.filters[0].status, FilterStatus::Notified);
    assert_eq!(report.filters[0].offers_found, 2);
    assert_eq!(report.filters[0].offers_kept, 1);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("<b>🔎 A</b>"));
    assert!(messages[0].contains("➡️ 💰 Price: <b>20 USD</b>"));
    assert!(messages[0].contains("BUC-LHR"));
    assert!(!messages[0].contains("PFO"));

    let actions = site.actions();
    assert!(actions.contains(&"pick 10 May 2025".to_string()));
    assert!(actions.contains(&"pick 12 May 2025".to_string()));
    assert!(actions.contains(&"select #currency USD".to_string()));
    assert!(actions.contains(&"select #limit 25".to_string()));
    assert!(actions.contains(&"fill #budget 27".to_string()));
    assert_eq!(actions.last().unwrap(), "click #submit");
}

#[tokio::test]
async fn test_offers_are_sorted_by_earliest_date() {
    let config = get_test_config();
    let page = results_page(&[
        card("$15", &[("2025-05-12", "09:00", "BUC-STN")]),
        card("$22", &[("2025-05-10", "06:00", "BUC-LHR")]),
    ]);
    let site = ScriptedSite::new(may_2025()).with_scenario("Bucharest", Scenario::Results(page));
    let notifier = RecordingNotifier::default();

    Runner::new(&site, &notifier, &config)
        .run_batch(&[one_way("A", "Bucharest", date(2025, 5, 10), date(2025, 5, 12))])
        .await;

    let message = &notifier.messages()[0];
    assert!(message.find("2025-05-10").unwrap() < message.find("2025-05-12").unwrap());
}

#[tokio::test]
async fn test_failing_filter_does_not_stop_the_batch() {
    let config = get_test_config();
    let site = ScriptedSite::new(may_2025()).with_scenario("Bucharest", Scenario::Results(bucharest_page()));
    let notifier = RecordingNotifier::default();

    // Thirteen months past the first visible month.
    let too_far = one_way("Far", "Bucharest", date(2026, 7, 1), date(2026, 7, 3));
    let report = Runner::new(&site, &notifier, &config)
        .run_batch(&[too_far, one_way("A", "Bucharest", date(2025, 5, 10), date(2025, 5, 12))])
        .await;

    assert!(matches!(&report.filters[0].status, FilterStatus::Failed(msg) if msg.contains("July 2026")));
    assert_eq!(report.filters[1].status, FilterStatus::Notified);
    assert_eq!(report.failed(), 1);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("<b>🔎 A</b>"));

    let screenshots = site.screenshots.lock().unwrap().clone();
    assert_eq!(screenshots.len(), 1);
    assert!(screenshots[0].to_string_lossy().contains("far_"));

    let advances = site
        .actions()
        .iter()
        .filter(|a| **a == format!("click {}", site.site.calendar_next))
        .count();
    assert_eq!(advances, 12);
}

#[tokio::test]
async fn test_results_timeout_fails_only_that_filter() {
    let config = get_test_config();
    let site = ScriptedSite::new(may_2025())
        .with_scenario("Nowhere", Scenario::Hang)
        .with_scenario("Bucharest", Scenario::Results(bucharest_page()));
    let notifier = RecordingNotifier::default();

    let report = Runner::new(&site, &notifier, &config)
        .run_batch(&[
            one_way("Slow", "Nowhere", date(2025, 5, 10), date(2025, 5, 12)),
            one_way("A", "Bucharest", date(2025, 5, 10), date(2025, 5, 12)),
        ])
        .await;

    assert!(
        matches!(&report.filters[0].status, FilterStatus::Failed(msg) if msg.contains("search results")),
        "{:?}",
        report.filters[0].status
    );
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn test_empty_results_send_nothing() {
    let config = get_test_config();
    let site = ScriptedSite::new(may_2025()).with_scenario("Bucharest", Scenario::Empty);
    let notifier = RecordingNotifier::default();

    let report = Runner::new(&site, &notifier, &config)
        .run_batch(&[one_way("A", "Bucharest", date(2025, 5, 10), date(2025, 5, 12))])
        .await;

    assert_eq!(report.filters[0].status, FilterStatus::Silent);
    assert!(notifier.messages().is_empty());
    assert!(site.screenshots.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_only_excluded_offers_send_nothing() {
    let config = get_test_config();
    let page = results_page(&[card("$10", &[("2025-05-10", "07:30", "BUC-PFO")])]);
    let site = ScriptedSite::new(may_2025()).with_scenario("Bucharest", Scenario::Results(page));
    let notifier = RecordingNotifier::default();

    let report = Runner::new(&site, &notifier, &config)
        .run_batch(&[one_way("A", "Bucharest", date(2025, 5, 10), date(2025, 5, 12))])
        .await;

    assert_eq!(report.filters[0].status, FilterStatus::Silent);
    assert_eq!(report.filters[0].offers_found, 1);
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn test_return_trip_applies_max_days_and_picks_both_ranges() {
    let config = get_test_config();
    let page = results_page(&[
        card(
            "€54.50",
            &[("May 10th", "06:00", "BUC-LTN"), ("May 15th", "20:00", "LTN-BUC")],
        ),
        card(
            "€31",
            &[("May 11th", "06:00", "BUC-LTN"), ("May 14th", "20:00", "LTN-BUC")],
        ),
    ]);
    let site = ScriptedSite::new(may_2025()).with_scenario("Bucharest", Scenario::Results(page));
    let notifier = RecordingNotifier::default();

    let spec = FilterSpec {
        name: "London".to_string(),
        trip: TripType::Return {
            return_range: DateRange::new(date(2025, 6, 2), date(2025, 6, 4)).unwrap(),
            max_trip_days: Some(5),
        },
        origin: "Bucharest".to_string(),
        destination: Some("London".to_string()),
        departure: DateRange::new(date(2025, 5, 10), date(2025, 5, 12)).unwrap(),
        currency: "EUR".to_string(),
        max_results: 50,
        max_budget: 120,
    };

    let report = Runner::new(&site, &notifier, &config).run_batch(&[spec]).await;
    assert_eq!(report.filters[0].offers_kept, 1);

    let message = &notifier.messages()[0];
    assert!(message.contains("🔁 💰 Price: <b>31 EUR</b>"));
    assert!(message.contains("🗓 4 days"));
    assert!(!message.contains("54.5"));

    let actions = site.actions();
    assert!(actions.contains(&"type #to-input London".to_string()));
    let origin_pick = format!("click {}", site.site.origin_suggestions);
    let destination_pick = format!("click {}", site.site.destination_suggestions);
    let position = |wanted: &str| actions.iter().position(|a| a == wanted).unwrap();
    assert!(position("type #from-input Bucharest") < position(&origin_pick));
    assert!(position(&origin_pick) < position("type #to-input London"));
    assert!(position("type #to-input London") < position(&destination_pick));
    assert!(actions.contains(&"click label[for='return']".to_string()));
    // June is the right pane when the picker opens on May.
    assert!(actions.contains(&"pick 2 June 2025".to_string()));
    assert!(actions.contains(&"pick 4 June 2025".to_string()));
}

#[tokio::test]
async fn test_missing_credentials_skip_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = get_test_config();
    let site = ScriptedSite::new(may_2025()).with_scenario("Bucharest", Scenario::Results(bucharest_page()));
    let notifier = TelegramNotifier::new(TelegramConfig {
        bot_token: None,
        chat_id: Some("42".to_string()),
        api_base: server.uri(),
        parse_mode: "HTML".to_string(),
    });

    let report = Runner::new(&site, &notifier, &config)
        .run_batch(&[one_way("A", "Bucharest", date(2025, 5, 10), date(2025, 5, 12))])
        .await;

    assert_eq!(report.filters[0].status, FilterStatus::Undelivered);
    assert_eq!(report.filters[0].messages_sent, 0);
}
