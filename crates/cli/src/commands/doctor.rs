use homequote_backend::{BackendClient, HttpBackend};
use homequote_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use crate::commands::CommandResult;

const CONFIG_EXIT_CODE: u8 = 2;
const CHECK_FAILED_EXIT_CODE: u8 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = exit_code(&report);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn exit_code(report: &DoctorReport) -> u8 {
    let failed = |name: &str| {
        report.checks.iter().any(|check| check.name == name && check.status == CheckStatus::Fail)
    };
    if failed("config_validation") {
        CONFIG_EXIT_CODE
    } else if report.overall_status == CheckStatus::Fail {
        CHECK_FAILED_EXIT_CODE
    } else {
        0
    }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_backend_credentials(&config));
            checks.push(check_backend_connectivity(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["backend_credentials", "backend_connectivity"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_backend_credentials(config: &AppConfig) -> DoctorCheck {
    match &config.backend.api_token {
        Some(_) => DoctorCheck {
            name: "backend_credentials",
            status: CheckStatus::Pass,
            details: "bearer token configured".to_string(),
        },
        None => DoctorCheck {
            name: "backend_credentials",
            status: CheckStatus::Skipped,
            details: "no api token configured; requests are sent unauthenticated".to_string(),
        },
    }
}

fn check_backend_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "backend_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let backend = HttpBackend::new(&config.backend)
            .map_err(|error| format!("failed to build backend client: {error}"))?;
        backend
            .ping()
            .await
            .map_err(|error| format!("backend at `{}` unreachable: {error}", backend.base_url()))
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "backend_connectivity",
            status: CheckStatus::Pass,
            details: format!("reached `{}`", config.backend.base_url),
        },
        Err(error) => {
            DoctorCheck { name: "backend_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
