//! End-to-end results fetch: store row + event log blob → result record.

use chrono::NaiveDate;
use lift_core::{
    blob::MemoryBlobStore,
    clock::StudyClock,
    config::LiftConfig,
    error::LiftError,
    metric::Metric,
    store::{LiftStore, MemoryStudyStore, StudyStore},
    study::{GroupAssignment, Study},
    study_service::StudyService,
    types::{GroupName, StudyStatus},
};

const STUDY_ID: &str = "0f3c9a2b7d6e4c1a8b5f2e9d7c6b5a41";

fn config() -> LiftConfig {
    LiftConfig::default_test().with_clock(StudyClock::Fixed(date(2024, 5, 15)))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn study(control: i64, test: i64) -> Study {
    Study {
        id: STUDY_ID.into(),
        name: "Spring promo".into(),
        start_date: date(2024, 5, 1),
        end_date: date(2024, 5, 31),
        sample_size: 10,
        template_names: Some("spring_promo".into()),
        control_group_size: control,
        test_group_size: test,
        messages_count: 100,
        avg_message_cost: 0.05,
        status: StudyStatus::Active,
    }
}

/// Ten participants per arm. Phones are stored formatted, as they arrive
/// from the messaging layer.
fn seed_store(store: &MemoryStudyStore, control: i64, test: i64) {
    store.insert_study(&study(control, test)).unwrap();
    for i in 0..10 {
        store.insert_assignment(
            STUDY_ID,
            GroupAssignment::new(&format!("+1 (555) 100-00{i:02}"), GroupName::Control),
        );
        store.insert_assignment(
            STUDY_ID,
            GroupAssignment::new(&format!("+1 (555) 200-00{i:02}"), GroupName::Test),
        );
    }
}

fn event_log(rows: &[(&str, &str, &str)]) -> String {
    let mut csv = String::from("event_time,event_name,user_phone\n");
    for (time, name, phone) in rows {
        csv.push_str(&format!("{time},{name},{phone}\n"));
    }
    csv
}

fn blobs_with(csv: String) -> MemoryBlobStore {
    let cfg = config();
    let mut blobs = MemoryBlobStore::new();
    blobs.put(&cfg.bucket, &cfg.events_key, csv);
    blobs
}

/// 3 control and 6 test purchases in window, plus noise that must not count.
fn three_vs_six() -> String {
    let mut rows = vec![
        ("2024-05-02 10:00:00", "Purchase", "15551000000"),
        ("2024-05-03 10:00:00", "Purchase", "15551000001"),
        ("2024-05-04 10:00:00", "Purchase", "15551000002"),
    ];
    let test_times = [
        "2024-05-05 09:00:00",
        "2024-05-06 09:00:00",
        "2024-05-07 09:00:00",
        "2024-05-08 09:00:00",
        "2024-05-09 09:00:00",
        "2024-05-10 09:00:00",
    ];
    let test_phones = [
        "15552000000",
        "15552000001",
        "15552000002",
        "15552000003",
        "15552000004",
        "15552000005",
    ];
    for (t, p) in test_times.iter().zip(test_phones.iter()) {
        rows.push((t, "Purchase", p));
    }
    // noise: wrong event, out of window, unassigned participant
    rows.push(("2024-05-05 09:00:00", "AddToCart", "15551000005"));
    rows.push(("2024-06-02 09:00:00", "Purchase", "15551000006"));
    rows.push(("2024-05-05 09:00:00", "Purchase", "15559999999"));
    event_log(&rows)
}

#[test]
fn three_control_six_test_conversions() {
    let _ = env_logger::builder().is_test(true).try_init();
    let cfg = config();
    let store = MemoryStudyStore::new();
    seed_store(&store, 10, 10);
    let blobs = blobs_with(three_vs_six());

    let results = StudyService::new(&store, &blobs, &cfg)
        .study_results(STUDY_ID, "Purchase")
        .unwrap();

    assert_eq!(results.control_num_conversions, 3);
    assert_eq!(results.test_num_conversions, 6);
    assert_eq!(results.control_conversion_rate, 0.3);
    assert_eq!(results.test_conversion_rate, 0.6);
    assert_eq!(results.lift, Metric::Defined(100.0));
    assert_eq!(results.p_value, Metric::Defined(0.3687));
    assert_eq!(results.incremental_conversions, 3);
    // 0.05 * 100 / 3
    assert_eq!(results.cost_per_incremental_conversion, Metric::Defined(1.67));
    assert_eq!(results.control_conversion_rate_confidence_interval, [0.016, 0.584]);
    assert_eq!(results.test_conversion_rate_confidence_interval, [0.2964, 0.9036]);
}

#[test]
fn repeat_purchases_count_once() {
    let cfg = config();
    let store = MemoryStudyStore::new();
    seed_store(&store, 10, 10);
    let blobs = blobs_with(event_log(&[
        ("2024-05-02 10:00:00", "Purchase", "15551000000"),
        ("2024-05-02 10:00:00", "Purchase", "+1 555 100 0000"),
        ("2024-05-20 10:00:00", "Purchase", "15551000000"),
        ("2024-05-09 09:00:00", "Purchase", "15552000004"),
    ]));

    let results = StudyService::new(&store, &blobs, &cfg)
        .study_results(STUDY_ID, "Purchase")
        .unwrap();

    assert_eq!(results.control_num_conversions, 1);
    assert_eq!(results.test_num_conversions, 1);
    assert_eq!(results.lift, Metric::Defined(0.0));
    assert_eq!(results.cost_per_incremental_conversion, Metric::INFINITY);
}

#[test]
fn undefined_metrics_flow_through_to_json() {
    let cfg = config();
    let store = MemoryStudyStore::new();
    seed_store(&store, 10, 10);
    let blobs = blobs_with(event_log(&[(
        "2024-05-09 09:00:00",
        "Purchase",
        "15552000004",
    )]));

    let results = StudyService::new(&store, &blobs, &cfg)
        .study_results(STUDY_ID, "Purchase")
        .unwrap();
    assert_eq!(results.lift, Metric::INFINITY);

    let json = serde_json::to_value(&results).unwrap();
    assert_eq!(json["lift"], "Infinity");
    assert_eq!(json["start_date"], "2024-05-01");
    assert_eq!(json["test_num_conversions"], 1);
}

#[test]
fn empty_arm_aborts_at_fetching_data() {
    let cfg = config();
    let store = MemoryStudyStore::new();
    seed_store(&store, 0, 10);
    let blobs = blobs_with(three_vs_six());

    let err = StudyService::new(&store, &blobs, &cfg)
        .study_results(STUDY_ID, "Purchase")
        .unwrap_err();

    assert!(matches!(err.root(), LiftError::Data(_)));
    let msg = err.to_string();
    assert!(msg.contains("fetching data"), "got: {msg}");
    assert!(msg.contains(STUDY_ID), "got: {msg}");
    assert!(msg.contains("Group sizes must be greater than 0."), "got: {msg}");
}

#[test]
fn no_valid_conversions_aborts_the_fetch() {
    let cfg = config();
    let store = MemoryStudyStore::new();
    seed_store(&store, 10, 10);
    let blobs = blobs_with(three_vs_six());

    let err = StudyService::new(&store, &blobs, &cfg)
        .study_results(STUDY_ID, "Subscribe")
        .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("fetching valid conversion events (Subscribe)"), "got: {msg}");
    assert!(msg.contains("No valid conversions found."), "got: {msg}");
}

#[test]
fn missing_event_log_is_a_stage_error() {
    let cfg = config();
    let store = MemoryStudyStore::new();
    seed_store(&store, 10, 10);
    let blobs = MemoryBlobStore::new();

    let err = StudyService::new(&store, &blobs, &cfg)
        .study_results(STUDY_ID, "Purchase")
        .unwrap_err();
    assert!(matches!(err, LiftError::Stage { .. }));
    assert!(matches!(err.root(), LiftError::Data(_)));
}

#[test]
fn unknown_study_is_not_found() {
    let cfg = config();
    let store = MemoryStudyStore::new();
    let blobs = blobs_with(three_vs_six());

    let err = StudyService::new(&store, &blobs, &cfg)
        .study_results("nope", "Purchase")
        .unwrap_err();
    assert!(matches!(err, LiftError::NotFound { .. }));
}

#[test]
fn sqlite_store_gives_the_same_results() {
    let cfg = config();
    let store = LiftStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.insert_study(&study(0, 0)).unwrap();
    for i in 0..10 {
        store
            .assign_to_group(STUDY_ID, &format!("+1 (555) 100-00{i:02}"), GroupName::Control)
            .unwrap();
        store
            .assign_to_group(STUDY_ID, &format!("+1 (555) 200-00{i:02}"), GroupName::Test)
            .unwrap();
    }
    let blobs = blobs_with(three_vs_six());

    let results = StudyService::new(&store, &blobs, &cfg)
        .study_results(STUDY_ID, "Purchase")
        .unwrap();

    assert_eq!(results.control_group_size, 10);
    assert_eq!(results.test_group_size, 10);
    assert_eq!(results.control_num_conversions, 3);
    assert_eq!(results.test_num_conversions, 6);
    assert_eq!(results.p_value, Metric::Defined(0.3687));
}
