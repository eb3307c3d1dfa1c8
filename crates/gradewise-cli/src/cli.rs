//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use gradewise_runtime::FeedbackStyle;

#[derive(Parser, Debug)]
#[command(name = "gradewise", version, about = "Rubric-driven grading with a generative model")]
pub struct Cli {
    /// Grader configuration file (YAML, or JSON by extension)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Grade one submission (file path or literal text)
    Grade {
        submission: String,

        /// Rubric file: .yaml/.yml/.json are structured, anything else is sent as-is
        #[arg(long)]
        rubric: Option<PathBuf>,

        #[arg(long, value_enum)]
        feedback: Option<Feedback>,

        /// Print the compact client report instead of the full result
        #[arg(long)]
        client: bool,
    },

    /// Grade several submissions in order
    Batch {
        #[arg(required = true)]
        submissions: Vec<String>,

        #[arg(long)]
        rubric: Option<PathBuf>,
    },

    /// Convert a raw 0-10 score onto a grading scale
    Convert {
        score: f64,

        #[arg(long, value_enum, default_value_t = Scale::Numeric)]
        scale: Scale,

        #[arg(long, default_value_t = gradewise_core::scale::DEFAULT_MAX_POINTS)]
        max_points: f64,

        /// Pass threshold as a percentage
        #[arg(long, default_value_t = gradewise_core::scale::DEFAULT_PASSING_THRESHOLD)]
        threshold: f64,
    },

    /// Extract the JSON object from a saved model reply ("-" reads stdin)
    Extract { input: String },

    /// Show provider, model and credential status
    Health,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feedback {
    Brief,
    Detailed,
}

impl From<Feedback> for FeedbackStyle {
    fn from(value: Feedback) -> Self {
        match value {
            Feedback::Brief => FeedbackStyle::Brief,
            Feedback::Detailed => FeedbackStyle::Detailed,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scale {
    Numeric,
    Letter,
    PassFail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grade() {
        let cli = Cli::parse_from([
            "gradewise",
            "grade",
            "essay.pdf",
            "--rubric",
            "rubric.yaml",
            "--feedback",
            "brief",
            "--client",
        ]);
        match cli.command {
            Command::Grade {
                submission,
                rubric,
                feedback,
                client,
            } => {
                assert_eq!(submission, "essay.pdf");
                assert_eq!(rubric, Some(PathBuf::from("rubric.yaml")));
                assert_eq!(feedback, Some(Feedback::Brief));
                assert!(client);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_convert_defaults() {
        let cli = Cli::parse_from(["gradewise", "convert", "7.5", "--scale", "pass-fail"]);
        match cli.command {
            Command::Convert {
                score,
                scale,
                max_points,
                threshold,
            } => {
                assert_eq!(score, 7.5);
                assert_eq!(scale, Scale::PassFail);
                assert_eq!(max_points, 10.0);
                assert_eq!(threshold, 70.0);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_batch_requires_submissions() {
        assert!(Cli::try_parse_from(["gradewise", "batch"]).is_err());
    }
}
