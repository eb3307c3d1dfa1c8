//! Subcommand implementations.
//!
//! Every command writes one JSON document to stdout. Logs go to stderr.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};

use gradewise_core::{extract_json, ClientReport, ErrorReport, GradingScale, RubricDescriptor};
use gradewise_runtime::{
    GradeRequest, GraderConfig, GradingOrchestrator, ProviderError, ProviderRegistry, RubricInput,
    SubmissionInput,
};

use crate::cli::{Cli, Command, Feedback, Scale};

pub async fn dispatch(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Grade {
            submission,
            rubric,
            feedback,
            client,
        } => {
            let config = load_config(cli.config.as_deref())?;
            grade(config, &submission, rubric.as_deref(), feedback, client).await
        }
        Command::Batch { submissions, rubric } => {
            let config = load_config(cli.config.as_deref())?;
            batch(config, &submissions, rubric.as_deref()).await
        }
        Command::Convert {
            score,
            scale,
            max_points,
            threshold,
        } => {
            print_json(&convert(score, scale, max_points, threshold))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Extract { input } => extract(&input),
        Command::Health => {
            let config = load_config(cli.config.as_deref())?;
            health(config).await
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<GraderConfig> {
    match path {
        Some(path) => {
            let config = GraderConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            Ok(config.with_env_overrides())
        }
        None => Ok(GraderConfig::from_env()),
    }
}

/// Structured rubric files are parsed; any other file is handed to the model as-is.
fn load_rubric(path: Option<&Path>) -> Result<RubricInput> {
    let Some(path) = path else {
        return Ok(RubricInput::default());
    };

    let structured = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "yaml" | "yml" | "json"))
        .unwrap_or(false);

    if structured {
        let rubric = RubricDescriptor::from_file(path)
            .with_context(|| format!("Failed to load rubric from {}", path.display()))?;
        Ok(RubricInput::Structured(rubric))
    } else {
        Ok(RubricInput::File(path.to_path_buf()))
    }
}

async fn grade(
    config: GraderConfig,
    submission: &str,
    rubric: Option<&Path>,
    feedback: Option<Feedback>,
    client: bool,
) -> Result<ExitCode> {
    let orchestrator = GradingOrchestrator::from_config(config)?;

    let submission = SubmissionInput::from_arg(submission);
    let mut request = GradeRequest::new(submission.clone()).with_rubric(load_rubric(rubric)?);
    if let Some(style) = feedback {
        request = request.with_feedback_style(style.into());
    }

    match orchestrator.grade(&request).await {
        Ok(result) if client => {
            print_json(&ClientReport::from_result(&result, submission_name(&submission), None))?;
            Ok(ExitCode::SUCCESS)
        }
        Ok(result) => {
            print_json(&result)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, "Grading failed");
            print_json(&e.to_error_report())?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn submission_name(submission: &SubmissionInput) -> String {
    match submission {
        SubmissionInput::File(path) => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        SubmissionInput::Text(_) => submission.label(),
    }
}

async fn batch(config: GraderConfig, submissions: &[String], rubric: Option<&Path>) -> Result<ExitCode> {
    let orchestrator = GradingOrchestrator::from_config(config)?;
    let rubric = load_rubric(rubric)?;

    let requests: Vec<GradeRequest> = submissions
        .iter()
        .map(|s| GradeRequest::new(SubmissionInput::from_arg(s.as_str())).with_rubric(rubric.clone()))
        .collect();

    let report = orchestrator.grade_batch(&requests).await;
    print_json(&report)?;

    Ok(if report.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn convert(score: f64, scale: Scale, max_points: f64, threshold: f64) -> Value {
    let scale = match scale {
        Scale::Numeric => GradingScale::numeric(max_points),
        Scale::Letter => GradingScale::letter(),
        Scale::PassFail => GradingScale::pass_fail(threshold),
    };
    let conversion = scale.convert(score);

    json!({
        "grading_scale": scale,
        "score_raw": conversion.score_raw,
        "percentage": conversion.percentage,
        "score_total": conversion.score_total,
        "grade_letter": conversion.grade_letter,
        "pass_fail": conversion.pass_fail,
    })
}

fn extract(input: &str) -> Result<ExitCode> {
    let content = read_input(input)?;
    match extract_json(&content) {
        Ok(value) => {
            print_json(&value)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            print_json(&ErrorReport::new(e.to_string()))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read stdin")?;
        return Ok(content);
    }

    let path = PathBuf::from(input);
    std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Provider status for `health`. `credential_configured` is `None` when the
/// provider type itself is unknown.
async fn provider_status(registry: &ProviderRegistry, config: &GraderConfig) -> Value {
    let (credential_configured, healthy, detail) = if !registry.has_provider(&config.provider) {
        (
            None,
            false,
            Some(format!("Unknown provider '{}'", config.provider)),
        )
    } else {
        match registry.create(&config.provider, &config.provider_config) {
            Ok(provider) => (Some(true), provider.health_check().await, None),
            Err(e @ ProviderError::NotConfigured(_)) => (Some(false), false, Some(e.to_string())),
            Err(e) => (Some(true), false, Some(e.to_string())),
        }
    };

    json!({
        "provider": config.provider,
        "model": config.model,
        "credential_configured": credential_configured,
        "healthy": healthy,
        "available_providers": registry.available_types(),
        "detail": detail,
    })
}

async fn health(config: GraderConfig) -> Result<ExitCode> {
    let status = provider_status(&ProviderRegistry::with_defaults(), &config).await;
    print_json(&status)?;

    Ok(if status["healthy"] == true {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
