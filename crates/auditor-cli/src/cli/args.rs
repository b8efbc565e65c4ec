use auditor_core::BackendPreference;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "auditor",
    version,
    about = "Collect and aggregate audit evidence from a repository and its report"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run an audit and write the run artifact
    Run(RunArgs),
    /// Summarize a stored run artifact
    Inspect(InspectArgs),
    Version,
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Repository URL or local checkout path
    #[arg(long)]
    pub repo: String,

    /// Report document (PDF or text)
    #[arg(long)]
    pub report: PathBuf,

    /// Audit goal; repeatable. Overrides goals from the config file.
    #[arg(long = "goal", conflicts_with = "rubric")]
    pub goals: Vec<String>,

    /// Rubric file whose dimension ids become the goals
    #[arg(long)]
    pub rubric: Option<PathBuf>,

    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, env = "AUDITOR_BACKEND")]
    pub backend: Option<BackendPreference>,

    /// Per-collector timeout in seconds
    #[arg(long, env = "AUDITOR_COLLECTOR_TIMEOUT")]
    pub collector_timeout: Option<u64>,

    /// Repository clone timeout in seconds
    #[arg(long)]
    pub clone_timeout: Option<u64>,

    /// Artifact output path
    #[arg(long, env = "AUDITOR_OUT")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct InspectArgs {
    pub artifact: PathBuf,

    /// Print the full artifact as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_args_parse_repeated_goals_and_backend() {
        let cli = Cli::try_parse_from([
            "auditor",
            "run",
            "--repo",
            ".",
            "--report",
            "r.pdf",
            "--goal",
            "a",
            "--goal",
            "b",
            "--backend",
            "direct",
        ])
        .unwrap();
        let Command::Run(args) = cli.cmd else {
            panic!("expected run");
        };
        assert_eq!(args.goals, vec!["a", "b"]);
        assert_eq!(args.backend, Some(BackendPreference::Direct));
        assert_eq!(args.out, None);
    }

    #[test]
    fn unknown_backend_is_a_usage_error() {
        let res = Cli::try_parse_from([
            "auditor", "run", "--repo", ".", "--report", "r", "--backend", "warp",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn run_requires_both_sources() {
        assert!(Cli::try_parse_from(["auditor", "run", "--repo", "."]).is_err());
    }
}
