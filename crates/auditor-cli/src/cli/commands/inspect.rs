use auditor_evidence::RunArtifact;

use crate::cli::args::InspectArgs;
use crate::exit_codes;

pub fn run(args: &InspectArgs) -> anyhow::Result<i32> {
    let artifact = match RunArtifact::read_json(&args.artifact) {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(
                error = %e,
                path = %args.artifact.display(),
                "cannot load artifact"
            );
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&artifact)?);
    } else {
        print!("{}", render_summary(&artifact));
    }
    Ok(exit_codes::SUCCESS)
}

fn render_summary(a: &RunArtifact) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "run {} [{}{}] {} -> {}\n",
        a.run_id,
        a.backend,
        if a.fell_back { ", fell back" } else { "" },
        a.started_at.to_rfc3339(),
        a.finished_at.to_rfc3339(),
    ));
    out.push_str(&format!("repository: {}\ndocument:   {}\n", a.repository, a.document));
    out.push_str(&format!(
        "{:<32} {:>9} {:>6} {:>8}\n",
        "goal", "evidences", "found", "mean_conf"
    ));
    for (goal, s) in &a.aggregated.summary {
        out.push_str(&format!(
            "{:<32} {:>9} {:>6} {:>8.2}\n",
            goal, s.evidences, s.found, s.mean_confidence
        ));
    }
    for s in &a.skipped_collectors {
        out.push_str(&format!(
            "skipped: {} on {} ({}): {}\n",
            s.collector, s.goal, s.reason, s.detail
        ));
    }
    out.push_str(&format!("total_evidences: {}\n", a.total_evidences()));
    out
}
