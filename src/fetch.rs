//! Per-scope fetch/cache/display coordination.
//!
//! Each scope resolves its own storage key and query parameters, consults the
//! cache, and only goes to the network when the record is missing, stale, or
//! a refresh was forced. The PR and issue counts for a scope are fetched
//! concurrently and merged into the prior record; the three scopes themselves
//! run as independent concurrent fetches with no ordering guarantee, each
//! landing in its own overlay slot.

use thiserror::Error;

use crate::cache::{CacheStore, Storage, StorageError};
use crate::github::{ApiError, IssueSearch};
use crate::overlay::{NoticeLevel, Overlay};
use crate::page::PathInfo;
use crate::query::{IssueKind, SearchQuery};
use crate::stats::{ContributorStats, Scope};
use crate::text;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Fetch one scope's stats, cache-first.
///
/// A fresh cached record (its `last_update` inside the TTL window) is
/// returned without touching the network, which is what bounds the system to
/// at most one fetch per TTL window per (contributor, scope). Errors are
/// never written to the cache.
pub async fn fetch_scope<A: IssueSearch, S: Storage>(
    api: &A,
    cache: &CacheStore<S>,
    contributor: &str,
    scope: Scope,
    info: &PathInfo,
    force: bool,
    now_ms: i64,
) -> Result<ContributorStats, FetchError> {
    let scope_key = scope.key(info);
    let cached = cache.get(contributor, &scope_key, now_ms)?;

    if !force && cached.is_fetched() {
        tracing::debug!(contributor, scope_key, "serving from cache");
        return Ok(cached);
    }

    let (repo, user) = match scope {
        Scope::Repo => (Some(info.repo_path.clone()), None),
        Scope::Org => (None, Some(info.org.clone())),
        Scope::Account => (None, None),
    };

    let pr_query = SearchQuery::count(IssueKind::Pr, contributor, repo.clone(), user.clone());
    let issue_query = SearchQuery::count(IssueKind::Issue, contributor, repo, user);

    let (prs, issues) = tokio::join!(
        api.search_issues(&pr_query),
        api.search_issues(&issue_query)
    );
    let (prs, issues) = (prs?, issues?);

    let mut stats = cached;
    stats.merge(ContributorStats {
        prs: Some(prs.total_count),
        first_pr_number: prs.first_number,
        last_update: Some(now_ms),
        ..Default::default()
    });
    stats.merge(ContributorStats {
        issues: Some(issues.total_count),
        first_issue_number: issues.first_number,
        last_update: Some(now_ms),
        ..Default::default()
    });

    cache.set(contributor, &scope_key, &stats)?;
    tracing::debug!(contributor, scope_key, ?stats, "fetched and cached");

    Ok(stats)
}

/// Fetch all three scopes concurrently and land the results in the overlay.
///
/// A forced refresh (the manual sync control) clears the contributor's cache
/// entries first, then refetches everything.
pub async fn fetch_all<A: IssueSearch, S: Storage>(
    api: &A,
    cache: &CacheStore<S>,
    overlay: &mut Overlay,
    contributor: &str,
    info: &PathInfo,
    force: bool,
    now_ms: i64,
) {
    if force {
        match cache.clear(Some(contributor)) {
            Ok(removed) => tracing::debug!(contributor, removed, "cleared cache before sync"),
            Err(e) => tracing::warn!("failed to clear cache before sync: {e}"),
        }
    }

    let (repo, org, account) = tokio::join!(
        fetch_scope(api, cache, contributor, Scope::Repo, info, force, now_ms),
        fetch_scope(api, cache, contributor, Scope::Org, info, force, now_ms),
        fetch_scope(api, cache, contributor, Scope::Account, info, force, now_ms),
    );

    for (scope, outcome) in [
        (Scope::Repo, repo),
        (Scope::Org, org),
        (Scope::Account, account),
    ] {
        apply_outcome(overlay, scope, info.current_num, outcome);
    }
}

fn apply_outcome(
    overlay: &mut Overlay,
    scope: Scope,
    current_num: u64,
    outcome: Result<ContributorStats, FetchError>,
) {
    match outcome {
        Ok(stats) => {
            overlay.set_counts(
                scope,
                text::format_text(stats.prs, stats.first_pr_number, current_num, scope),
                text::format_text(stats.issues, stats.first_issue_number, current_num, scope),
            );
            if let Some(ms) = stats.last_update {
                overlay.set_last_update(ms);
            }
        }
        Err(e) => {
            tracing::warn!(?scope, "scope fetch failed: {e}");
            overlay.set_error(scope);
            let (level, message) = notice_for(&e);
            overlay.push_notice(level, message);
        }
    }
}

// A missing token never reaches here; it is caught before any fetch starts.
fn notice_for(error: &FetchError) -> (NoticeLevel, String) {
    match error {
        FetchError::Api(ApiError::BadCredentials) => (
            NoticeLevel::Warning,
            "GitHub rejected the stored access token; save a new one with \
             `contributor-stats set-token`"
                .to_string(),
        ),
        other => (NoticeLevel::Error, other.to_string()),
    }
}
