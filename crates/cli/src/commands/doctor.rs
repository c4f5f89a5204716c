use agebot_core::{
    config::{load_dotenv, AppConfig, LoadOptions},
    reply_for, CalendarDate, CommandEntry, FixedClock,
};
use secrecy::ExposeSecret;
use serde::Serialize;

use super::{escape_json, redact_token, CommandResult};

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
    if let Err(error) = load_dotenv(None) {
        return CommandResult::failure("doctor", "dotenv", error.to_string(), 1);
    }
    run_with(LoadOptions::default(), json_output)
}

pub fn run_with(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

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

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_slack_tokens(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "slack_token_readiness",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }
    checks.push(check_age_calculator());

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_slack_tokens(config: &AppConfig) -> DoctorCheck {
    let app_token = config.slack.app_token.expose_secret();
    let bot_token = config.slack.bot_token.expose_secret();

    // prefixes were already checked by AppConfig::validate
    DoctorCheck {
        name: "slack_token_readiness",
        status: CheckStatus::Pass,
        details: format!(
            "app token {} and bot token {} present",
            redact_token(app_token),
            redact_token(bot_token)
        ),
    }
}

/// Runs both command shapes against a pinned date.
fn check_age_calculator() -> DoctorCheck {
    let Some(today) = CalendarDate::from_ymd(2024, 5, 15) else {
        return DoctorCheck {
            name: "age_calculator",
            status: CheckStatus::Fail,
            details: "could not build reference date".to_string(),
        };
    };
    let clock = FixedClock(today);

    let samples = [
        (CommandEntry::Phrase, "1990-05-15", "Your age is 34."),
        (CommandEntry::CatchAll, "is 1990-05-17", "Your age is 33."),
    ];
    for (entry, input, expected) in samples {
        let reply = reply_for(entry, input, &clock);
        if reply != expected {
            return DoctorCheck {
                name: "age_calculator",
                status: CheckStatus::Fail,
                details: format!("{} entry replied `{reply}` to `{input}`", entry.label()),
            };
        }
    }

    DoctorCheck {
        name: "age_calculator",
        status: CheckStatus::Pass,
        details: "phrase and catch_all entries answer the reference dates".to_string(),
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

#[cfg(test)]
mod tests {
    use super::{check_age_calculator, CheckStatus};

    #[test]
    fn age_calculator_self_check_passes() {
        let check = check_age_calculator();
        assert_eq!(check.status, CheckStatus::Pass, "{}", check.details);
    }
}
