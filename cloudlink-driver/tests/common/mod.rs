//! Shared helpers for the mock-server driver tests.

#![allow(dead_code)]

use std::path::PathBuf;

use cloudlink_driver::DriverConfig;
use serde_json::Value;
use wiremock::MockServer;

/// Asserts that an `Option` is `Some` and unwraps it (fails the test otherwise).
#[macro_export]
macro_rules! require_some {
    ($expr:expr $(,)?) => {{
        let opt = $expr;
        assert!(opt.is_some(), "expected Some(..), got None");
        let Some(val) = opt else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let opt = $expr;
        assert!(opt.is_some(), "{}", format_args!($($msg)+));
        let Some(val) = opt else {
            return;
        };
        val
    }};
}

/// Asserts that a `Result` is `Ok` and unwraps it (fails the test otherwise).
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(
            res.is_ok(),
            "{}: {res:?}",
            format_args!($($msg)+)
        );
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

/// Loads `tests/fixtures/{provider}/{name}.json`.
///
/// Panics on a missing or invalid fixture, which is a broken test rather than
/// a driver failure.
pub fn fixture(provider: &str, name: &str) -> Value {
    fixture_with(provider, name, &[])
}

/// Loads a fixture after replacing `{PLACEHOLDER}` markers, e.g. URLs that
/// must point back at the mock server.
pub fn fixture_with(provider: &str, name: &str, substitutions: &[(&str, &str)]) -> Value {
    let path: PathBuf = [
        env!("CARGO_MANIFEST_DIR"),
        "tests",
        "fixtures",
        provider,
        &format!("{name}.json"),
    ]
    .iter()
    .collect();
    let mut text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read fixture {}: {e}", path.display()));
    for (marker, value) in substitutions {
        text = text.replace(marker, value);
    }
    serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("invalid JSON in fixture {}: {e}", path.display()))
}

/// Driver configuration pointed at the mock server.
pub fn config_for(server: &MockServer) -> DriverConfig {
    DriverConfig::builder().endpoint(server.uri()).build()
}

/// Like [`config_for`], with the endpoint under `path` (e.g. `/client/api`).
pub fn config_at(server: &MockServer, path: &str) -> DriverConfig {
    DriverConfig::builder()
        .endpoint(format!("{}{path}", server.uri()))
        .build()
}
