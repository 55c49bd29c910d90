//! Behavior-driven tests for upstream fetch resilience: retry on
//! throttling, terminal classification, and the session-filter fallback.

use leapgrid_core::domain::{Interval, Symbol};
use leapgrid_core::tradier::FetchError;
use leapgrid_tests::*;

use serde_json::json;
use time::macros::{date, datetime};

fn history_body() -> serde_json::Value {
    json!({
        "history": {
            "day": [
                {"date": "2026-02-19", "open": 508.0, "high": 512.0,
                 "low": 506.0, "close": 511.0, "volume": 41_000_000},
                {"date": "2026-02-20", "open": 510.0, "high": 514.0,
                 "low": 509.0, "close": 513.5, "volume": 38_500_000}
            ]
        }
    })
}

// =============================================================================
// Retry behavior
// =============================================================================

#[tokio::test]
async fn when_upstream_throttles_then_recovers_the_fetch_succeeds() {
    // Given: the first attempt is throttled, the second succeeds
    let script = Arc::new(
        ScriptedHttpClient::new().route(
            "/markets/history",
            vec![
                Ok(HttpResponse::with_status(429, "{}").with_header("Retry-After", "0")),
                Ok(HttpResponse::ok_json(history_body().to_string())),
            ],
        ),
    );
    let client = scripted_client(&script);
    let symbol = Symbol::parse("QQQ").expect("valid");

    // When: daily history is fetched
    let series = client
        .daily_history(&symbol, date!(2026 - 02 - 18), date!(2026 - 02 - 20))
        .await
        .expect("retry should recover");

    // Then: the series is complete and exactly one retry happened
    assert_eq!(series.len(), 2);
    assert_eq!(script.calls_matching("/markets/history"), 2);
}

#[tokio::test]
async fn when_transport_fails_transiently_the_fetch_recovers() {
    let script = Arc::new(
        ScriptedHttpClient::new().route(
            "/markets/history",
            vec![
                Err(HttpError::new("connection reset by peer")),
                Ok(HttpResponse::ok_json(history_body().to_string())),
            ],
        ),
    );
    let client = scripted_client(&script);
    let symbol = Symbol::parse("QQQ").expect("valid");

    let series = client
        .daily_history(&symbol, date!(2026 - 02 - 18), date!(2026 - 02 - 20))
        .await
        .expect("transient transport failure should recover");
    assert_eq!(series.len(), 2);
}

#[tokio::test]
async fn when_the_retry_budget_exhausts_the_last_error_is_reported() {
    // Given: the upstream answers 503 forever
    let script = Arc::new(ScriptedHttpClient::new().route(
        "/markets/history",
        vec![Ok(HttpResponse::with_status(503, "{}"))],
    ));
    let client = scripted_client(&script);
    let symbol = Symbol::parse("QQQ").expect("valid");

    let error = client
        .daily_history(&symbol, date!(2026 - 02 - 18), date!(2026 - 02 - 20))
        .await
        .expect_err("budget must exhaust");

    // Then: all attempts were spent and the last failure is named
    assert_eq!(script.calls_matching("/markets/history"), 3);
    match error {
        FetchError::Exhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(last.contains("503"), "last failure was {last}");
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
}

// =============================================================================
// Terminal classification
// =============================================================================

#[tokio::test]
async fn when_the_resource_is_missing_no_retry_is_attempted() {
    let script = Arc::new(ScriptedHttpClient::new().route(
        "/markets/history",
        vec![Ok(HttpResponse::with_status(404, "{}"))],
    ));
    let client = scripted_client(&script);
    let symbol = Symbol::parse("ZZZZT").expect("valid");

    let error = client
        .daily_history(&symbol, date!(2026 - 02 - 18), date!(2026 - 02 - 20))
        .await
        .expect_err("404 is terminal");

    assert!(matches!(error, FetchError::NotFound { .. }));
    assert_eq!(script.calls_matching("/markets/history"), 1);
}

#[tokio::test]
async fn when_credentials_are_rejected_the_error_is_terminal() {
    let script = Arc::new(ScriptedHttpClient::new().route(
        "/markets/history",
        vec![Ok(HttpResponse::with_status(401, "{}"))],
    ));
    let client = scripted_client(&script);
    let symbol = Symbol::parse("QQQ").expect("valid");

    let error = client
        .daily_history(&symbol, date!(2026 - 02 - 18), date!(2026 - 02 - 20))
        .await
        .expect_err("401 is terminal");

    assert!(matches!(error, FetchError::Unauthorized));
    assert_eq!(script.calls_matching("/markets/history"), 1);
}

// =============================================================================
// Empty payloads and session-filter fallback
// =============================================================================

#[tokio::test]
async fn when_history_is_empty_the_series_is_empty_not_an_error() {
    let script =
        Arc::new(ScriptedHttpClient::new().route_json("/markets/history", json!({"history": null})));
    let client = scripted_client(&script);
    let symbol = Symbol::parse("QQQ").expect("valid");

    let series = client
        .daily_history(&symbol, date!(2026 - 02 - 18), date!(2026 - 02 - 20))
        .await
        .expect("empty payload is not an error");
    assert!(series.is_empty());
}

#[tokio::test]
async fn when_the_open_session_is_empty_the_fetch_falls_back_to_all_sessions() {
    // Given: the strict session filter has no bars yet, the loose one does
    let script = Arc::new(
        ScriptedHttpClient::new()
            .route_json("session_filter=open", json!({"series": null}))
            .route_json(
                "session_filter=all",
                json!({
                    "series": {
                        "data": [
                            {"time": "2026-02-20T09:30:00", "open": 510.0, "high": 511.0,
                             "low": 509.5, "close": 510.8, "volume": 120_000},
                            {"time": "2026-02-20T09:35:00", "open": 510.8, "high": 512.0,
                             "low": 510.5, "close": 511.6, "volume": 95_000}
                        ]
                    }
                }),
            ),
    );
    let client = scripted_client(&script);
    let symbol = Symbol::parse("QQQ").expect("valid");

    // When: a session window is fetched
    let series = client
        .intraday_session(
            &symbol,
            Interval::FiveMinutes,
            datetime!(2026 - 02 - 20 09:30:00),
            datetime!(2026 - 02 - 20 10:00:00),
        )
        .await
        .expect("fallback succeeds");

    // Then: exactly one strict attempt, one loose attempt, bars from the loose one
    assert_eq!(series.bars.len(), 2);
    assert_eq!(script.calls_matching("session_filter=open"), 1);
    assert_eq!(script.calls_matching("session_filter=all"), 1);
}

#[tokio::test]
async fn when_both_session_filters_are_empty_the_result_is_an_empty_series() {
    let script = Arc::new(
        ScriptedHttpClient::new().route_json("/markets/timesales", json!({"series": null})),
    );
    let client = scripted_client(&script);
    let symbol = Symbol::parse("QQQ").expect("valid");

    let series = client
        .intraday_session(
            &symbol,
            Interval::FiveMinutes,
            datetime!(2026 - 02 - 20 09:30:00),
            datetime!(2026 - 02 - 20 10:00:00),
        )
        .await
        .expect("closed market is not an error");
    assert!(series.is_empty());
    assert_eq!(script.calls_matching("/markets/timesales"), 2);
}
