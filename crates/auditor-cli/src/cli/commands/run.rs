use auditor_core::{persist, AuditConfig, AuditError, ConfigError, Orchestrator};
use serde_json::json;

use crate::cli::args::RunArgs;
use crate::exit_codes;

pub async fn run(args: RunArgs) -> anyhow::Result<i32> {
    let prepared = build_config(&args).and_then(|cfg| {
        let out = cfg.output.clone();
        Orchestrator::prepare(cfg).map(|(orchestrator, goals)| (orchestrator, goals, out))
    });
    let (orchestrator, goals, out) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            tracing::error!(error = %e, "config error");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let outcome = match orchestrator.run(&args.repo, &args.report, &goals).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "audit failed");
            return Ok(exit_code_for(&e));
        }
    };
    if let Err(e) = persist(&outcome, &out) {
        tracing::error!(error = %e, path = %out.display(), "audit failed");
        return Ok(exit_code_for(&e));
    }

    let summary = json!({
        "run_id": outcome.artifact.run_id,
        "total_evidences": outcome.artifact.total_evidences(),
        "skipped_collectors": outcome.artifact.skipped_collectors.len(),
        "backend": outcome.artifact.backend,
        "fell_back": outcome.artifact.fell_back,
        "artifact": out.display().to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(exit_codes::SUCCESS)
}

/// File config (or defaults) with CLI overrides applied. Settings are checked
/// here; the goal list is resolved once, by `Orchestrator::prepare`.
fn build_config(args: &RunArgs) -> Result<AuditConfig, ConfigError> {
    let mut cfg = match &args.config {
        Some(path) => AuditConfig::load(path)?,
        None => AuditConfig::default(),
    };
    if !args.goals.is_empty() {
        cfg.goals = args.goals.clone();
        cfg.rubric = None;
    }
    if let Some(rubric) = &args.rubric {
        cfg.rubric = Some(rubric.clone());
    }
    if let Some(backend) = args.backend {
        cfg.backend = backend;
    }
    if let Some(secs) = args.collector_timeout {
        cfg.collector_timeout_secs = secs;
    }
    if let Some(secs) = args.clone_timeout {
        cfg.clone_timeout_secs = secs;
    }
    if let Some(out) = &args.out {
        cfg.output = out.clone();
    }
    cfg.validate_settings()?;
    Ok(cfg)
}

fn exit_code_for(e: &AuditError) -> i32 {
    match e {
        AuditError::NoSources { .. } => exit_codes::RUN_FAILED,
        AuditError::Config(_) | AuditError::Artifact(_) | AuditError::Backend(_) => {
            exit_codes::CONFIG_ERROR
        }
    }
}
