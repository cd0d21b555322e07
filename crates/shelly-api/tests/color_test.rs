#![allow(clippy::unwrap_used)]
// Integration tests for `ColorDevice` using wiremock.

use std::collections::HashMap;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shelly_api::{ColorDevice, DeviceEndpoint, Error, LedColor, PowerOnState, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ColorDevice) {
    let server = MockServer::start().await;
    let endpoint = DeviceEndpoint::new(server.uri(), None).unwrap();
    let device = ColorDevice::new(endpoint, &TransportConfig::default()).unwrap();
    (server, device)
}

async fn mount_ok(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ison": true })))
        .mount(server)
        .await;
}

async fn sent_query(server: &MockServer) -> Vec<HashMap<String, String>> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|req| req.url.query_pairs().into_owned().collect())
        .collect()
}

// ── Color reads ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_color_maps_fields() {
    let (server, device) = setup().await;

    Mock::given(method("GET"))
        .and(path("/color/0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ison": true,
            "mode": "color",
            "red": 10,
            "green": 20,
            "blue": 30,
            "white": 40,
            "gain": 50,
            "effect": 0,
            "transition": 500
        })))
        .mount(&server)
        .await;

    let color = device.get_color().await.unwrap();
    assert_eq!(
        color,
        LedColor {
            on: Some(true),
            ..LedColor::rgbw(10, 20, 30, 40).with_brightness(50)
        }
    );
}

#[tokio::test]
async fn test_is_on_reads_lights_channel() {
    let (server, device) = setup().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lights": [{ "ison": false, "red": 0, "green": 0, "blue": 0, "white": 0, "gain": 0 }]
        })))
        .mount(&server)
        .await;

    assert!(!device.is_on().await.unwrap());
}

#[tokio::test]
async fn test_get_light_settings() {
    let (server, device) = setup().await;

    Mock::given(method("GET"))
        .and(path("/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "mode": "color",
            "lights": [{
                "ison": true,
                "red": 255, "green": 0, "blue": 0, "white": 0, "gain": 80,
                "transition": 1500,
                "effect": 2,
                "default_state": "last",
                "auto_on": 0.0,
                "auto_off": 120.0,
                "btn_type": "edge",
                "btn_reverse": 0,
                "schedule": false
            }]
        })))
        .mount(&server)
        .await;

    let light = device.get_light_settings().await.unwrap();
    assert_eq!(light.transition, 1500);
    assert_eq!(light.effect, 2);
    assert_eq!(light.default_state, Some(PowerOnState::Last));
    assert!(light.auto_off.is_some_and(|secs| (secs - 120.0).abs() < f64::EPSILON));
}

// ── One-shot commands ───────────────────────────────────────────────

#[tokio::test]
async fn test_partial_color_sends_only_set_fields() {
    let (server, device) = setup().await;
    mount_ok(&server, "/color/0").await;

    let color = LedColor {
        red: Some(255),
        brightness: Some(40),
        ..LedColor::default()
    };
    device.set_color(&color).await.unwrap();

    let queries = sent_query(&server).await;
    assert_eq!(queries.len(), 1);
    let expected: HashMap<String, String> = [("red", "255"), ("gain", "40")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    assert_eq!(queries[0], expected);
}

#[tokio::test]
async fn test_on_with_color_includes_turn_and_timer() {
    let (server, device) = setup().await;
    mount_ok(&server, "/color/0").await;

    device
        .on_with_color(Some(1), Some(2), Some(3), Some(4), Some(100), Some(true), Some(60))
        .await
        .unwrap();

    let queries = sent_query(&server).await;
    assert_eq!(queries[0].get("turn").map(String::as_str), Some("on"));
    assert_eq!(queries[0].get("timer").map(String::as_str), Some("60"));
    assert_eq!(queries[0].get("white").map(String::as_str), Some("4"));
    assert_eq!(queries[0].len(), 7);
}

#[tokio::test]
async fn test_brightness_above_100_sends_nothing() {
    let (server, device) = setup().await;
    mount_ok(&server, "/color/0").await;

    let result = device
        .set_color(&LedColor::default().with_brightness(101))
        .await;

    assert!(
        matches!(result, Err(Error::InvalidArgument { field: "brightness", .. })),
        "expected InvalidArgument, got: {result:?}"
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_one_shot_transition() {
    let (server, device) = setup().await;

    Mock::given(method("GET"))
        .and(path("/color/0"))
        .and(query_param("transition", "750"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ison": true })))
        .expect(1)
        .mount(&server)
        .await;

    device.set_one_shot_transition(750).await.unwrap();
}

// ── Persistent settings ─────────────────────────────────────────────

#[tokio::test]
async fn test_effect_out_of_range_sends_nothing() {
    let (server, device) = setup().await;
    mount_ok(&server, "/settings/color/0").await;

    for bad in [4, -1, 99] {
        let result = device.set_color_effect(bad).await;
        assert!(
            matches!(result, Err(Error::InvalidArgument { field: "effect", .. })),
            "effect {bad}: got {result:?}"
        );
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_valid_effects_send_one_request_each() {
    let (server, device) = setup().await;
    mount_ok(&server, "/settings/color/0").await;

    for effect in 0..=3 {
        device.set_color_effect(effect).await.unwrap();
    }

    let queries = sent_query(&server).await;
    let effects: Vec<&str> = queries
        .iter()
        .filter_map(|q| q.get("effect").map(String::as_str))
        .collect();
    assert_eq!(effects, vec!["0", "1", "2", "3"]);
}

#[tokio::test]
async fn test_transition_bounds() {
    let (server, device) = setup().await;
    mount_ok(&server, "/settings/color/0").await;

    device.set_transition(5000).await.unwrap();
    assert!(device.set_transition(5001).await.is_err());
    assert!(device.set_transition(-5).await.is_err());

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_settings_setters_use_wire_values() {
    let (server, device) = setup().await;
    mount_ok(&server, "/settings/color/0").await;

    device
        .set_default_power_on_state(PowerOnState::Off)
        .await
        .unwrap();
    device.set_button_invert(true).await.unwrap();
    device.set_auto_off_time(90).await.unwrap();

    let queries = sent_query(&server).await;
    assert_eq!(queries[0].get("default_state").map(String::as_str), Some("off"));
    assert_eq!(queries[1].get("btn_reverse").map(String::as_str), Some("1"));
    assert_eq!(queries[2].get("auto_off").map(String::as_str), Some("90"));
}
