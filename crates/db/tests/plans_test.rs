//! Integration tests for daily plan storage.

use chrono::{NaiveDate, TimeZone, Utc};
use coach_db::Database;
use coach_types::{plan_doc_id, Achievement, DailyTrainingPlan};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

const USER: &str = "guillaume@example.com";

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

fn plan() -> DailyTrainingPlan {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
    let back: BTreeMap<String, Achievement> = ["Abs", "UpperBack"]
        .into_iter()
        .map(|drill| {
            (
                drill.to_string(),
                Achievement {
                    created_at: Some(now),
                    updated_at: Some(now),
                    ..Achievement::default()
                },
            )
        })
        .collect();
    DailyTrainingPlan {
        id: plan_doc_id(USER, day()),
        template_id: "default".to_string(),
        date: "2025-06-01".to_string(),
        repetitions: [("back".to_string(), back)].into_iter().collect(),
        created_at: Some(now),
        updated_at: Some(now),
        ..DailyTrainingPlan::default()
    }
}

#[tokio::test]
async fn test_plan_roundtrip() {
    let db = Database::new_in_memory().await.unwrap();
    let id = plan_doc_id(USER, day());

    assert!(db.get_plan(&id).await.unwrap().is_none());

    db.put_plan(USER, &plan()).await.unwrap();
    let stored = db.get_plan(&id).await.unwrap().expect("plan should exist");
    assert_eq!(stored, plan());
}

#[tokio::test]
async fn test_put_overwrites_existing_plan() {
    let db = Database::new_in_memory().await.unwrap();
    db.put_plan(USER, &plan()).await.unwrap();

    let mut replaced = plan();
    replaced.session_id = Some("sess-9".to_string());
    db.put_plan(USER, &replaced).await.unwrap();

    let stored = db.get_plan(&replaced.id).await.unwrap().unwrap();
    assert_eq!(stored.session_id.as_deref(), Some("sess-9"));
}

#[tokio::test]
async fn test_insert_if_absent_keeps_first_plan() {
    let db = Database::new_in_memory().await.unwrap();
    let mut first = plan();
    first.session_id = Some("first".to_string());
    let stored = db.insert_plan_if_absent(USER, &first).await.unwrap();
    assert_eq!(stored.session_id.as_deref(), Some("first"));

    let mut second = plan();
    second.session_id = Some("second".to_string());
    let stored = db.insert_plan_if_absent(USER, &second).await.unwrap();
    assert_eq!(stored.session_id.as_deref(), Some("first"));
}

#[tokio::test]
async fn test_update_merges_partial_payload() {
    let db = Database::new_in_memory().await.unwrap();
    db.put_plan(USER, &plan()).await.unwrap();

    let update: DailyTrainingPlan = serde_json::from_str(
        r#"{"sessionId":"sess-1","repetitions":{"back":{"Abs":{"repetition":2,"note":"ok"}}}}"#,
    )
    .unwrap();
    let later = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
    let id = plan_doc_id(USER, day());

    assert!(db.update_plan(&id, &update, later).await.unwrap());

    let stored = db.get_plan(&id).await.unwrap().unwrap();
    assert_eq!(stored.session_id.as_deref(), Some("sess-1"));
    assert_eq!(stored.repetitions["back"]["Abs"].repetition, 2);
    assert_eq!(stored.repetitions["back"]["Abs"].note, "ok");
    assert_eq!(stored.repetitions["back"]["UpperBack"].repetition, 0);
    assert_eq!(stored.updated_at, Some(later));
}

#[tokio::test]
async fn test_update_missing_plan_returns_false() {
    let db = Database::new_in_memory().await.unwrap();
    let missing = db
        .update_plan("nobody-2025-06-01", &DailyTrainingPlan::default(), Utc::now())
        .await
        .unwrap();
    assert!(!missing);

    // The rolled-back transaction must leave the connection usable.
    db.put_plan(USER, &plan()).await.unwrap();
    assert!(db.get_plan(&plan().id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_concurrent_updates_are_serialized() {
    let db = Database::new_in_memory().await.unwrap();
    db.put_plan(USER, &plan()).await.unwrap();
    let id = plan_doc_id(USER, day());

    let abs: DailyTrainingPlan =
        serde_json::from_str(r#"{"repetitions":{"back":{"Abs":{"repetition":3}}}}"#).unwrap();
    let upper: DailyTrainingPlan =
        serde_json::from_str(r#"{"repetitions":{"back":{"UpperBack":{"repetition":1}}}}"#)
            .unwrap();

    let (a, b) = tokio::join!(
        db.update_plan(&id, &abs, Utc::now()),
        db.update_plan(&id, &upper, Utc::now())
    );
    assert!(a.unwrap());
    assert!(b.unwrap());

    let stored = db.get_plan(&id).await.unwrap().unwrap();
    assert_eq!(stored.repetitions["back"]["Abs"].repetition, 3);
    assert_eq!(stored.repetitions["back"]["UpperBack"].repetition, 1);
}
