use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use homequote_cli::commands::input::EvaluateArgs;
use homequote_cli::commands::{config, doctor, eligibility, quote};
use homequote_core::domain::catalog::{
    CatalogSnapshot, DiscountType, DisplaySurface, Extra, FixedPrice, FrequencyDependencies,
    FrequencyRow, Industry, IndustryId, OccurrenceTime, ServiceCategory,
};
use homequote_core::pricing::eligibility::Audience;
use rust_decimal::Decimal;
use serde_json::{json, Value};

#[test]
fn config_attributes_env_source_and_redacts_token() {
    with_env(&[("HOMEQUOTE_BACKEND_API_TOKEN", "tok-supersecret")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 0);

        assert!(result.output.contains(
            "- backend.api_token = tok-*** (source: env (HOMEQUOTE_BACKEND_API_TOKEN))"
        ));
        assert!(result.output.contains("- server.port = 8080 (source: default)"));
        assert!(!result.output.contains("supersecret"));
    });
}

#[test]
fn config_returns_config_exit_code_when_invalid() {
    with_env(&[("HOMEQUOTE_BACKEND_TIMEOUT_SECS", "0")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 2);
        assert!(result.output.starts_with("config validation failed"));
        assert!(result.output.contains("backend.timeout_secs"));
    });
}

#[test]
fn doctor_reports_config_failure_and_skips_backend_checks() {
    with_env(&[("HOMEQUOTE_BACKEND_BASE_URL", "ftp://bookings.example.test")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 2);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][0]["name"], "config_validation");
        assert_eq!(report["checks"][0]["status"], "fail");
        assert_eq!(report["checks"][1]["status"], "skipped");
        assert_eq!(report["checks"][2]["status"], "skipped");
    });
}

#[test]
fn doctor_human_output_marks_each_check() {
    with_env(&[("HOMEQUOTE_SERVER_PORT", "0")], || {
        let result = doctor::run(false);

        assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
        assert!(result.output.contains("- [fail] config_validation:"));
        assert!(result.output.contains("- [skip] backend_connectivity:"));
    });
}

#[test]
fn quote_prices_draft_from_snapshot_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let args = EvaluateArgs {
        snapshot: write_json(dir.path(), "catalog.json", &json!(static_catalog())),
        draft: write_json(
            dir.path(),
            "draft.json",
            &json!({
                "service": "Standard Cleaning",
                "frequency": "Weekly",
                "extras": { "ex-oven": 2 }
            }),
        ),
        dependencies: None,
        audience: Audience::Customer,
    };

    let result = quote::run(&args);
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "quote");
    assert_eq!(payload["status"], "ok");
    assert_eq!(decimal(&payload["data"]["extras_total"]), Some(Decimal::from(40)));
    assert_eq!(decimal(&payload["data"]["final_amount"]), Some(Decimal::from(126)));
    assert_eq!(payload["data"]["trace"][0]["stage"], "base_price");
}

#[test]
fn quote_reports_input_error_for_malformed_draft() {
    let dir = tempfile::tempdir().expect("tempdir");
    let draft = dir.path().join("draft.json");
    fs::write(&draft, "not json").expect("write draft");
    let args = EvaluateArgs {
        snapshot: write_json(dir.path(), "catalog.json", &json!(static_catalog())),
        draft,
        dependencies: None,
        audience: Audience::Customer,
    };

    let result = quote::run(&args);
    assert_eq!(result.exit_code, 3);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "input");
    assert!(payload["message"].as_str().unwrap_or_default().contains("draft"));
}

#[test]
fn eligibility_fails_closed_until_dependencies_are_supplied() {
    let dir = tempfile::tempdir().expect("tempdir");
    let draft = json!({ "service": "Deep Cleaning", "frequency": "Weekly" });
    let mut args = EvaluateArgs {
        snapshot: write_json(dir.path(), "catalog.json", &json!(frequency_driven_catalog())),
        draft: write_json(dir.path(), "draft.json", &draft),
        dependencies: None,
        audience: Audience::Customer,
    };

    let closed = parse_payload(&eligibility::run(&args).output);
    assert_eq!(closed["data"]["eligibility"]["extras"], json!([]));
    assert_eq!(closed["data"]["eligibility"]["service_categories"], json!([]));

    let dependencies = FrequencyDependencies {
        service_categories: vec!["Deep Cleaning".to_string()],
        extras: vec!["ex-oven".to_string()],
        exclude_parameters: Vec::new(),
    };
    args.dependencies = Some(write_json(dir.path(), "deps.json", &json!(dependencies)));

    let result = eligibility::run(&args);
    assert_eq!(result.exit_code, 0);
    let open = parse_payload(&result.output);
    assert_eq!(open["data"]["eligibility"]["extras"], json!(["ex-oven"]));
    assert_eq!(open["data"]["eligibility"]["service_categories"], json!(["Deep Cleaning"]));
    assert_eq!(open["data"]["draft"]["frequency"], "Weekly");
}

fn oven() -> Extra {
    Extra {
        id: "ex-oven".to_string(),
        name: "Inside Oven".to_string(),
        price: Decimal::from(20),
        qty_based: true,
        display: [DisplaySurface::CustomerFrontend].into_iter().collect::<BTreeSet<_>>(),
        ..Default::default()
    }
}

fn weekly() -> FrequencyRow {
    FrequencyRow {
        id: "f-weekly".to_string(),
        name: "Weekly".to_string(),
        occurrence_time: OccurrenceTime::Recurring,
        discount: Some(Decimal::from(10)),
        discount_type: DiscountType::Percent,
        ..Default::default()
    }
}

fn static_catalog() -> CatalogSnapshot {
    let mut catalog = CatalogSnapshot::empty(Industry {
        id: IndustryId("ind-1".to_string()),
        name: "Home Cleaning".to_string(),
    });
    catalog.service_categories = vec![ServiceCategory {
        id: "sc-standard".to_string(),
        name: "Standard Cleaning".to_string(),
        selected_frequencies: ["Weekly".to_string()].into_iter().collect(),
        extras: ["ex-oven".to_string()].into_iter().collect(),
        service_category_price: Some(FixedPrice { enabled: true, price: Some(Decimal::from(100)) }),
        ..Default::default()
    }];
    catalog.frequencies = vec![weekly()];
    catalog.extras = vec![oven()];
    catalog
}

fn frequency_driven_catalog() -> CatalogSnapshot {
    let mut catalog = static_catalog();
    catalog.service_categories = vec![ServiceCategory {
        id: "sc-deep".to_string(),
        name: "Deep Cleaning".to_string(),
        service_category_frequency: true,
        selected_frequencies: ["Weekly".to_string()].into_iter().collect(),
        ..Default::default()
    }];
    catalog
}

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, value.to_string()).expect("write fixture");
    path
}

fn decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(raw) => raw.parse().ok(),
        Value::Number(number) => number.to_string().parse().ok(),
        _ => None,
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "HOMEQUOTE_BACKEND_BASE_URL",
        "HOMEQUOTE_BACKEND_API_TOKEN",
        "HOMEQUOTE_BACKEND_TIMEOUT_SECS",
        "HOMEQUOTE_BACKEND_BUSINESS_ID",
        "HOMEQUOTE_SERVER_BIND_ADDRESS",
        "HOMEQUOTE_SERVER_PORT",
        "HOMEQUOTE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "HOMEQUOTE_BOOKING_DEFAULT_AUDIENCE",
        "HOMEQUOTE_BOOKING_CURRENCY",
        "HOMEQUOTE_LOGGING_LEVEL",
        "HOMEQUOTE_LOGGING_FORMAT",
        "HOMEQUOTE_LOG_LEVEL",
        "HOMEQUOTE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
