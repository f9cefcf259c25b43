//! Integration tests for `/subtitle-proxy`.

mod common;

use wiremock::matchers::{header, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{config_for, TestHarness, REFERER};

const VTT: &str = "WEBVTT\n\n00:00:01.000 --> 00:00:03.000\nHello there\n";

fn subtitle_url(addr: std::net::SocketAddr, target: &str) -> String {
    format!("http://{addr}/subtitle-proxy?url={}", urlencoding::encode(target))
}

#[tokio::test]
async fn subtitles_pass_through_as_vtt() {
    let upstream = MockServer::start().await;
    Mock::given(path("/subs/en.vtt"))
        .and(header("referer", REFERER))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/octet-stream")
                .set_body_string(VTT),
        )
        .mount(&upstream)
        .await;

    let (_h, addr) = TestHarness::with_server_config(config_for(&upstream.uri())).await;
    let resp = reqwest::get(subtitle_url(addr, &format!("{}/subs/en.vtt", upstream.uri())))
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "text/vtt; charset=utf-8");
    assert_eq!(resp.text().await.unwrap(), VTT);
}

#[tokio::test]
async fn missing_subtitle_is_passed_through() {
    let upstream = MockServer::start().await;
    Mock::given(path("/subs/gone.vtt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&upstream)
        .await;

    let (_h, addr) = TestHarness::with_server_config(config_for(&upstream.uri())).await;
    let resp = reqwest::get(subtitle_url(addr, &format!("{}/subs/gone.vtt", upstream.uri())))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn relative_subtitle_url_is_rejected() {
    let (_h, addr) = TestHarness::with_server().await;
    let resp = reqwest::get(subtitle_url(addr, "/subs/en.vtt")).await.unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "validation_error");
}
