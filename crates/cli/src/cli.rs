use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand, ValueEnum};
use relnote_changelog::DEFAULT_MAX_LEFTOVERS;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "relnote")]
#[command(about = "Generate changelogs and version bumps from git history and pull requests")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(long, global = true, help = "Output logs in JSON format")]
    pub json: bool,

    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,

    #[arg(
        long,
        global = true,
        help = "Path to the repository root",
        default_value = "."
    )]
    pub root: PathBuf,

    #[arg(
        long,
        global = true,
        env = "GITHUB_REPOSITORY",
        help = "Repository used for links, as owner/name or a full URL",
        default_value = ""
    )]
    pub repo: String,

    #[arg(
        long,
        global = true,
        env = "GITHUB_SERVER_URL",
        help = "Base URL of the code host",
        default_value = "https://github.com"
    )]
    pub server_url: String,
}

impl Cli {
    /// Log format, with `--json` taking precedence.
    pub fn tracing_format(&self) -> TracingFormat {
        if self.json {
            TracingFormat::Json
        } else {
            self.log_format
        }
    }

    /// Base URL for pull request and commit links.
    pub fn repo_url(&self) -> String {
        let repo = self.repo.trim().trim_end_matches('/');
        if repo.is_empty() || repo.contains("://") {
            return repo.to_string();
        }
        format!("{}/{repo}", self.server_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The changelog as Markdown
    Markdown,
    /// The full result as JSON
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Print the changelog of the changes since a revision")]
    Generate {
        #[arg(long, help = "Base revision, usually the previous release tag")]
        since: String,
        #[arg(
            long,
            help = "Maximum number of uncategorized entries",
            default_value_t = DEFAULT_MAX_LEFTOVERS
        )]
        max_leftovers: usize,
        #[arg(long, help = "JSON file mapping commit hashes to pull request data")]
        pr_data: Option<PathBuf>,
        #[arg(long, help = "Output format", default_value = "markdown", value_enum)]
        format: OutputFormat,
    },
    #[command(about = "Print the version bump implied by the changes since a revision")]
    Bump {
        #[arg(long, help = "Base revision, usually the previous release tag")]
        since: String,
        #[arg(long, help = "Current version, to also print the next one")]
        current: Option<String>,
        #[arg(long, help = "JSON file mapping commit hashes to pull request data")]
        pr_data: Option<PathBuf>,
    },
    #[command(about = "Print the changelog section of a release")]
    Find {
        #[arg(long, help = "Changelog file", default_value = "CHANGELOG.md")]
        file: PathBuf,
        #[arg(help = "Release tag or version, e.g. v1.2.3")]
        tag: String,
        #[arg(long, help = "Fall back to the Unreleased section")]
        unreleased: bool,
    },
    #[command(about = "Add a release section on top of the changelog")]
    Prepend {
        #[arg(long, help = "Changelog file", default_value = "CHANGELOG.md")]
        file: PathBuf,
        #[arg(long, help = "Section title, usually the new version")]
        name: String,
        #[arg(long, help = "Generate the section body from the changes since this revision")]
        since: Option<String>,
        #[arg(
            long,
            help = "Maximum number of uncategorized entries",
            default_value_t = DEFAULT_MAX_LEFTOVERS
        )]
        max_leftovers: usize,
        #[arg(long, help = "JSON file mapping commit hashes to pull request data")]
        pr_data: Option<PathBuf>,
    },
    #[command(about = "Remove a release section from the changelog")]
    Remove {
        #[arg(long, help = "Changelog file", default_value = "CHANGELOG.md")]
        file: PathBuf,
        #[arg(long, help = "Section title to remove")]
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_generate_defaults() {
        let cli = parse(&["relnote", "generate", "--since", "v1.0.0", "--repo", "acme/widgets"]);
        match cli.command {
            Commands::Generate {
                ref since,
                max_leftovers,
                ref pr_data,
                format,
            } => {
                assert_eq!(since, "v1.0.0");
                assert_eq!(max_leftovers, DEFAULT_MAX_LEFTOVERS);
                assert!(pr_data.is_none());
                assert_eq!(format, OutputFormat::Markdown);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.level, LogLevel::Warn);
        assert_eq!(cli.tracing_format(), TracingFormat::Compact);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["relnote", "find", "v2.0.0", "--unreleased", "--level", "debug", "--json"]);
        assert_eq!(cli.level, LogLevel::Debug);
        assert!(cli.json);
        assert_eq!(cli.tracing_format(), TracingFormat::Json);
        assert!(matches!(cli.command, Commands::Find { unreleased: true, .. }));
    }

    #[test]
    fn test_since_is_required() {
        assert!(Cli::try_parse_from(["relnote", "bump"]).is_err());
    }

    #[test]
    fn test_repo_url() {
        let mut cli = parse(&["relnote", "remove", "--name", "1.0.0", "--repo", "acme/widgets"]);
        assert_eq!(cli.repo_url(), "https://github.com/acme/widgets");

        cli.server_url = "https://git.example.com/".to_string();
        assert_eq!(cli.repo_url(), "https://git.example.com/acme/widgets");

        cli.repo = "https://gitlab.com/acme/widgets/".to_string();
        assert_eq!(cli.repo_url(), "https://gitlab.com/acme/widgets");
    }
}
