//! Integration tests for `/skip-times` and `/schedule`.

mod common;

use std::sync::atomic::Ordering;

use chrono::{TimeZone, Utc};
use serde_json::Value;

use anistream::schedule::ScheduleEntry;
use anistream::skip::{Interval, SkipInterval, SkipTimes};
use common::TestHarness;

#[tokio::test]
async fn health_is_ok() {
    let (_h, addr) = TestHarness::with_server().await;
    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn skip_times_are_served_camel_case() {
    let (h, addr) = TestHarness::with_server().await;
    h.skip.answers.lock().unwrap().insert(
        (21, 1),
        SkipTimes {
            found: true,
            results: vec![SkipInterval {
                interval: Interval {
                    start_time: 90.0,
                    end_time: 180.0,
                },
                skip_type: "op".into(),
                skip_id: None,
                episode_length: Some(1420.0),
            }],
        },
    );

    let body: Value = reqwest::get(format!("http://{addr}/skip-times/21/1"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["found"], true);
    assert_eq!(body["results"][0]["skipType"], "op");
    assert_eq!(body["results"][0]["interval"]["startTime"], 90.0);
}

#[tokio::test]
async fn not_found_is_cached() {
    let (h, addr) = TestHarness::with_server().await;
    for _ in 0..2 {
        let body: Value = reqwest::get(format!("http://{addr}/skip-times/5/99"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["found"], false);
    }
    assert_eq!(h.skip.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn upstream_failure_is_502_and_not_cached() {
    let (h, addr) = TestHarness::with_server().await;
    h.skip.fail.store(true, Ordering::SeqCst);

    for _ in 0..2 {
        let resp = reqwest::get(format!("http://{addr}/skip-times/5/1")).await.unwrap();
        assert_eq!(resp.status(), 502);
    }
    assert_eq!(h.skip.calls.load(Ordering::SeqCst), 2);

    h.skip.fail.store(false, Ordering::SeqCst);
    let resp = reqwest::get(format!("http://{addr}/skip-times/5/1")).await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn non_numeric_skip_path_is_rejected() {
    let (_h, addr) = TestHarness::with_server().await;
    let resp = reqwest::get(format!("http://{addr}/skip-times/abc/1")).await.unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn schedule_routes_thumbnails_through_image_proxy() {
    let (h, addr) = TestHarness::with_server().await;
    *h.schedule.entries.lock().unwrap() = vec![
        ScheduleEntry {
            title: "Frieren".into(),
            episode: Some(12),
            airing_time: Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap(),
            thumbnail: "https://img.example/frieren.webp".into(),
        },
        ScheduleEntry {
            title: "Other Day".into(),
            episode: Some(1),
            airing_time: Utc.with_ymd_and_hms(2024, 1, 16, 1, 0, 0).unwrap(),
            thumbnail: String::new(),
        },
    ];

    let url = format!("http://{addr}/schedule?date=2024-01-15");
    let body: Vec<Value> = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(body.len(), 1);
    assert_eq!(body[0]["title"], "Frieren");
    assert_eq!(body[0]["episode"], 12);
    assert_eq!(body[0]["airingTime"], "2024-01-15T14:30:00Z");
    assert_eq!(
        body[0]["thumbnail"],
        format!(
            "/image-proxy?url={}",
            urlencoding::encode("https://img.example/frieren.webp")
        )
    );

    // Second request is served from the cache.
    let _ = reqwest::get(&url).await.unwrap();
    assert_eq!(h.schedule.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn malformed_schedule_date_is_400() {
    let (_h, addr) = TestHarness::with_server().await;
    let resp = reqwest::get(format!("http://{addr}/schedule?date=15-01-2024"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "validation_error");
}
