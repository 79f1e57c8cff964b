mod cache;
mod fetch;
mod github;
mod overlay;
mod page;
mod query;
mod settings;
mod stats;
mod text;

use anyhow::{Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cache::{CacheStore, FileStorage};
use crate::github::{ApiError, GithubClient};
use crate::overlay::{NoticeLevel, Overlay};
use crate::settings::Settings;
use crate::stats::Scope;

#[derive(Parser)]
#[command(name = "contributor-stats", version)]
#[command(about = "Show a GitHub contributor's PR/issue history for the page you are looking at")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the stats widget for a pull request or issue URL
    Show {
        /// PR or issue URL, e.g. https://github.com/babel/babel-eslint/pull/1
        url: String,
        /// Bypass the cache: clear this contributor's entries and refetch
        #[arg(long)]
        sync: bool,
    },
    /// Validate an access token against the GitHub API and store it
    SetToken { token: String },
    /// Choose whether stats are fetched on private repositories
    ShowPrivate {
        #[arg(value_name = "ENABLED")]
        enabled: bool,
    },
    /// Remove cached contributor stats; the access token is kept
    ClearCache {
        /// Only remove entries for this contributor
        #[arg(long)]
        contributor: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Show { url, sync } => show(&url, sync).await,
        Commands::SetToken { token } => set_token(token).await,
        Commands::ShowPrivate { enabled } => set_show_private(enabled),
        Commands::ClearCache { contributor } => clear_cache(contributor.as_deref()),
    }
}

async fn show(url: &str, sync: bool) -> Result<()> {
    if !page::is_relevant_page(page::url_pathname(url)) {
        bail!("not a pull request or issue URL: {url}");
    }

    let settings = Settings::load()?;
    let Some(token) = settings.resolved_token() else {
        // Detected before any fetch; no API call is made.
        eprintln!(
            "warning: {}; add one with `contributor-stats set-token`",
            ApiError::MissingToken
        );
        return Ok(());
    };

    let client = GithubClient::new(token);
    let Some(info) = page::extract_context(&client, url).await? else {
        bail!("not a pull request or issue URL: {url}");
    };
    let Some(contributor) = info.contributor.clone() else {
        // Author byline not resolvable; skip without error.
        tracing::debug!(%url, "author not resolvable; skipping");
        eprintln!("could not resolve the author of {url}; nothing to show");
        return Ok(());
    };

    let mut overlay = Overlay::new(&contributor);
    overlay.mount();

    let now_ms = Utc::now().timestamp_millis();

    if repo_hidden(&client, &settings, &info).await {
        for scope in Scope::ALL {
            overlay.set_skipped(scope);
        }
        overlay.push_notice(
            NoticeLevel::Warning,
            "private repository; re-enable with `contributor-stats show-private true`",
        );
    } else {
        let cache = CacheStore::new(FileStorage::open(settings::cache_path()?)?);
        fetch::fetch_all(&client, &cache, &mut overlay, &contributor, &info, sync, now_ms).await;
    }

    print!("{}", overlay.render(now_ms));
    for notice in overlay.notices() {
        eprintln!("{}: {}", notice.level.as_str(), notice.message);
    }

    Ok(())
}

/// True when the repository is private and the settings say to stay out.
/// Private repos are included by default; the check only runs once the user
/// has opted out. A failed visibility check treats the repo as visible.
async fn repo_hidden<P: page::PageContext>(
    provider: &P,
    settings: &Settings,
    info: &page::PathInfo,
) -> bool {
    if settings.show_private_repos {
        return false;
    }
    let repo = info
        .repo_path
        .split_once('/')
        .map_or(info.repo_path.as_str(), |(_, repo)| repo);
    match provider.repo_is_private(&info.org, repo).await {
        Ok(private) => private,
        Err(e) => {
            tracing::warn!("visibility check failed: {e}");
            false
        }
    }
}

async fn set_token(token: String) -> Result<()> {
    let client = GithubClient::new(token.clone());
    if !client.validate_token().await? {
        bail!("GitHub rejected the token; check it and try again");
    }

    let mut settings = Settings::load()?;
    settings.access_token = Some(token);
    settings.save()?;
    println!("token saved");
    Ok(())
}

fn set_show_private(enabled: bool) -> Result<()> {
    let mut settings = Settings::load()?;
    settings.show_private_repos = enabled;
    settings.save()?;
    println!("show private repos: {enabled}");
    Ok(())
}

fn clear_cache(contributor: Option<&str>) -> Result<()> {
    let cache = CacheStore::new(FileStorage::open(settings::cache_path()?)?);
    let removed = cache.clear(contributor)?;

    if contributor.is_none() {
        // A full clear also resets settings, preserving the token.
        let mut settings = Settings::load()?;
        settings.reset_preserving_token();
        settings.save()?;
    }

    println!(
        "removed {removed} cached entr{}",
        if removed == 1 { "y" } else { "ies" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{PageContext, PathInfo};

    struct StubVisibility {
        private: bool,
        fail: bool,
    }

    impl PageContext for StubVisibility {
        async fn first_contributor(
            &self,
            _org: &str,
            _repo: &str,
            _number: u64,
        ) -> Result<Option<String>, ApiError> {
            Ok(None)
        }

        async fn repo_is_private(&self, _org: &str, _repo: &str) -> Result<bool, ApiError> {
            if self.fail {
                Err(ApiError::Api("boom".to_string()))
            } else {
                Ok(self.private)
            }
        }
    }

    fn info() -> PathInfo {
        PathInfo {
            contributor: Some("alice".to_string()),
            current_num: 10,
            repo_path: "babel/babel-eslint".to_string(),
            org: "babel".to_string(),
        }
    }

    #[tokio::test]
    async fn private_repos_are_included_by_default() {
        // Default settings never reach the visibility check at all.
        let provider = StubVisibility {
            private: true,
            fail: true,
        };
        assert!(!repo_hidden(&provider, &Settings::default(), &info()).await);
    }

    #[tokio::test]
    async fn opted_out_private_repo_is_hidden() {
        let settings = Settings {
            show_private_repos: false,
            ..Default::default()
        };

        let private = StubVisibility {
            private: true,
            fail: false,
        };
        assert!(repo_hidden(&private, &settings, &info()).await);

        let public = StubVisibility {
            private: false,
            fail: false,
        };
        assert!(!repo_hidden(&public, &settings, &info()).await);
    }

    #[tokio::test]
    async fn visibility_check_failure_treats_repo_as_visible() {
        let settings = Settings {
            show_private_repos: false,
            ..Default::default()
        };
        let provider = StubVisibility {
            private: true,
            fail: true,
        };
        assert!(!repo_hidden(&provider, &settings, &info()).await);
    }
}
