use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::SubmissionKind;

#[derive(Debug, Parser)]
#[command(
    name = "reliefline",
    version,
    about = "Offline-first relay between relief field teams and the emergency backend"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch connectivity and sync queued submissions until stopped
    Run,
    /// Submit a payload, queueing it if the backend cannot take it now
    Submit {
        #[arg(long, value_enum)]
        kind: KindArg,
        /// JSON object to submit
        #[arg(long)]
        payload: String,
    },
    /// Classify an emergency request text
    Classify {
        #[arg(long)]
        text: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        contact: Option<String>,
    },
    /// Classify a JSON array of texts in one backend call
    Batch {
        #[arg(long)]
        file: PathBuf,
    },
    /// Show frontend and backend health
    Health,
    /// List queued submissions
    Queue {
        /// Discard every queued submission instead of listing them
        #[arg(long)]
        clear: bool,
    },
    /// Run one sync pass now
    Sync,
}

impl Command {
    /// Whether the command acts on the online/offline state and so needs the
    /// startup connectivity check.
    pub fn needs_connectivity(&self) -> bool {
        matches!(self, Command::Run | Command::Submit { .. } | Command::Sync)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    HelpRequest,
    FieldReport,
    Communication,
}

impl From<KindArg> for SubmissionKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::HelpRequest => SubmissionKind::HelpRequest,
            KindArg::FieldReport => SubmissionKind::FieldReport,
            KindArg::Communication => SubmissionKind::Communication,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_submit_with_kebab_case_kind() {
        let cli = Cli::try_parse_from([
            "reliefline",
            "submit",
            "--kind",
            "field-report",
            "--payload",
            r#"{"note":"bridge out"}"#,
        ])
        .unwrap();
        match cli.command {
            Command::Submit { kind, payload } => {
                assert_eq!(SubmissionKind::from(kind), SubmissionKind::FieldReport);
                assert!(payload.contains("bridge out"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn only_network_commands_check_connectivity() {
        fn parse(args: &[&str]) -> Command {
            Cli::try_parse_from(args.iter().copied()).unwrap().command
        }
        assert!(parse(&["reliefline", "run"]).needs_connectivity());
        assert!(parse(&["reliefline", "sync"]).needs_connectivity());
        assert!(parse(&["reliefline", "submit", "--kind", "help-request", "--payload", "{}"])
            .needs_connectivity());
        assert!(!parse(&["reliefline", "queue"]).needs_connectivity());
        assert!(!parse(&["reliefline", "health"]).needs_connectivity());
        assert!(!parse(&["reliefline", "classify", "--text", "fire"]).needs_connectivity());
    }

    #[test]
    fn queue_accepts_clear_flag() {
        let cli = Cli::try_parse_from(["reliefline", "queue", "--clear"]).unwrap();
        assert!(matches!(cli.command, Command::Queue { clear: true }));
        let cli = Cli::try_parse_from(["reliefline", "queue"]).unwrap();
        assert!(matches!(cli.command, Command::Queue { clear: false }));
    }

    #[test]
    fn classify_requires_text() {
        assert!(Cli::try_parse_from(["reliefline", "classify"]).is_err());
    }
}
