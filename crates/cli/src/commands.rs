//! Subcommand implementations.
//!
//! Every command returns the text to print on stdout.

use crate::cli::{Cli, Commands, OutputFormat};
use relnote_changelog::{
    ChangelogGenerator, Changeset, Error, GeneratorConfig, GitHistory, HistorySource,
    PullRequestSource, ReleasePolicy, Result, StaticHistory, StaticPullRequests, TitleReferences,
    find_changeset,
    next_version, prepend_changeset, remove_changeset,
};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Repository settings shared by all commands.
#[derive(Debug, Clone)]
pub struct Context {
    pub root: PathBuf,
    pub repo_url: String,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            root: cli.root.clone(),
            repo_url: cli.repo_url(),
        }
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.root.join(file)
        }
    }

    async fn generator(&self, since: &str, pr_data: Option<&Path>) -> Result<ChangelogGenerator> {
        let history = GitHistory::new(&self.root);
        let (history, pull_requests): (Arc<dyn HistorySource>, Arc<dyn PullRequestSource>) =
            match pr_data {
                Some(path) => (
                    Arc::new(history),
                    Arc::new(StaticPullRequests::from_json_file(&self.resolve(path)).await?),
                ),
                None => {
                    // The correlator needs the commits up front, so reuse them as the history
                    let commits = history.commits(since, None).await?;
                    let references = TitleReferences::new(&commits);
                    (Arc::new(StaticHistory::new(commits)), Arc::new(references))
                }
            };

        Ok(ChangelogGenerator::new(
            history,
            pull_requests,
            ReleasePolicy::load(&self.root),
            GeneratorConfig::new(self.repo_url.clone()),
        ))
    }
}

/// Run the selected command.
pub async fn execute(context: &Context, command: Commands) -> Result<String> {
    match command {
        Commands::Generate {
            since,
            max_leftovers,
            pr_data,
            format,
        } => execute_generate(context, &since, max_leftovers, pr_data.as_deref(), format).await,
        Commands::Bump {
            since,
            current,
            pr_data,
        } => execute_bump(context, &since, current.as_deref(), pr_data.as_deref()).await,
        Commands::Find {
            file,
            tag,
            unreleased,
        } => execute_find(context, &file, &tag, unreleased).await,
        Commands::Prepend {
            file,
            name,
            since,
            max_leftovers,
            pr_data,
        } => {
            execute_prepend(
                context,
                &file,
                &name,
                since.as_deref(),
                max_leftovers,
                pr_data.as_deref(),
            )
            .await
        }
        Commands::Remove { file, name } => execute_remove(context, &file, &name).await,
    }
}

/// Execute the `generate` command.
pub async fn execute_generate(
    context: &Context,
    since: &str,
    max_leftovers: usize,
    pr_data: Option<&Path>,
    format: OutputFormat,
) -> Result<String> {
    let generator = context.generator(since, pr_data).await?;
    let result = generator.generate(since, max_leftovers).await?;
    match format {
        OutputFormat::Markdown => Ok(result.changelog.clone()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&*result)?),
    }
}

/// Execute the `bump` command.
pub async fn execute_bump(
    context: &Context,
    since: &str,
    current: Option<&str>,
    pr_data: Option<&Path>,
) -> Result<String> {
    let generator = context.generator(since, pr_data).await?;
    let bump = generator.determine_bump(since).await?;

    let mut output = bump.to_string();
    if let Some(current) = current {
        let next = next_version(current, bump)?;
        info!(%current, %next, %bump, "Calculated next version");
        let _ = write!(output, "\n{next}");
    }
    Ok(output)
}

/// Execute the `find` command.
pub async fn execute_find(context: &Context, file: &Path, tag: &str, unreleased: bool) -> Result<String> {
    let document = read_document(&context.resolve(file)).await?;
    find_changeset(&document, tag, unreleased)
        .map(|changeset| changeset.body)
        .ok_or_else(|| Error::changeset_not_found(tag))
}

/// Execute the `prepend` command.
pub async fn execute_prepend(
    context: &Context,
    file: &Path,
    name: &str,
    since: Option<&str>,
    max_leftovers: usize,
    pr_data: Option<&Path>,
) -> Result<String> {
    let path = context.resolve(file);
    let document = read_document(&path).await?;

    let body = match since {
        Some(since) => {
            let generator = context.generator(since, pr_data).await?;
            generator.generate(since, max_leftovers).await?.changelog.clone()
        }
        None => String::new(),
    };

    let updated = prepend_changeset(&document, &Changeset::new(name, body));
    write_document(&path, &updated).await?;
    info!(path = %path.display(), name, "Added changelog section");
    Ok(String::new())
}

/// Execute the `remove` command.
pub async fn execute_remove(context: &Context, file: &Path, name: &str) -> Result<String> {
    let path = context.resolve(file);
    let document = read_document(&path).await?;
    let updated = remove_changeset(&document, name);
    if updated == document {
        info!(path = %path.display(), name, "No changelog section to remove");
    } else {
        write_document(&path, &updated).await?;
        info!(path = %path.display(), name, "Removed changelog section");
    }
    Ok(String::new())
}

/// Read a changelog; a missing file reads as empty.
async fn read_document(path: &Path) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(Error::changelog_io_with_source(
            format!("Failed to read {}", path.display()),
            Some(path.to_path_buf()),
            e,
        )),
    }
}

async fn write_document(path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(path, content).await.map_err(|e| {
        Error::changelog_io_with_source(
            format!("Failed to write {}", path.display()),
            Some(path.to_path_buf()),
            e,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> Context {
        Context {
            root: dir.path().to_path_buf(),
            repo_url: "https://github.com/acme/widgets".to_string(),
        }
    }

    fn git(path: &Path, args: &[&str]) {
        let status = StdCommand::new("git")
            .args(args)
            .current_dir(path)
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    fn init_repo(dir: &TempDir) {
        let path = dir.path();
        git(path, &["init", "--initial-branch=main"]);
        git(path, &["config", "user.email", "test@example.com"]);
        git(path, &["config", "user.name", "Test User"]);
        git(path, &["config", "commit.gpgsign", "false"]);
    }

    fn commit(dir: &TempDir, file: &str, message: &str) {
        std::fs::write(dir.path().join(file), message).unwrap();
        git(dir.path(), &["add", file]);
        git(dir.path(), &["commit", "-m", message]);
    }

    #[tokio::test]
    async fn test_find_prepend_remove() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        std::fs::write(dir.path().join("CHANGELOG.md"), "# Changelog\n\n## 1.0.0\n\n- first\n").unwrap();
        let file = Path::new("CHANGELOG.md");

        execute_prepend(&ctx, file, "1.1.0", None, 10, None).await.unwrap();
        let body = execute_find(&ctx, file, "v1.1.0", false).await.unwrap();
        assert_eq!(body, "- No documented changes.");

        execute_remove(&ctx, file, "1.1.0").await.unwrap();
        let content = std::fs::read_to_string(dir.path().join("CHANGELOG.md")).unwrap();
        assert_eq!(content, "# Changelog\n\n## 1.0.0\n\n- first\n");

        let err = execute_find(&ctx, file, "v3.0.0", false).await.unwrap_err();
        assert!(matches!(err, Error::ChangesetNotFound { .. }));
    }

    #[tokio::test]
    async fn test_generate_and_bump_from_git() {
        let dir = TempDir::new().unwrap();
        init_repo(&dir);
        commit(&dir, "a.txt", "chore: initial");
        git(dir.path(), &["tag", "v1.0.0"]);
        commit(&dir, "b.txt", "feat: add widgets (#12)");
        commit(&dir, "c.txt", "fix: widget size (#13)");

        let ctx = context(&dir);
        let changelog = execute_generate(&ctx, "v1.0.0", 10, None, OutputFormat::Markdown)
            .await
            .unwrap();
        assert!(changelog.starts_with("### New Features ✨\n\n- feat: add widgets in [#12]"));
        assert!(changelog.contains("- fix: widget size in [#13](https://github.com/acme/widgets/pull/13)"));

        let json = execute_generate(&ctx, "v1.0.0", 10, None, OutputFormat::Json)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["bump_type"], "minor");
        assert_eq!(value["total_commits"], 2);

        let bump = execute_bump(&ctx, "v1.0.0", Some("v1.0.0"), None).await.unwrap();
        assert_eq!(bump, "minor\n1.1.0");
    }

    #[tokio::test]
    async fn test_bump_without_commits() {
        let dir = TempDir::new().unwrap();
        init_repo(&dir);
        commit(&dir, "a.txt", "chore: initial");
        git(dir.path(), &["tag", "v1.0.0"]);

        let err = execute_bump(&context(&dir), "v1.0.0", None, None).await.unwrap_err();
        assert!(matches!(err, Error::NoCommits { .. }));
    }
}
