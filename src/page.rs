//! Page adaptation: deciding whether a URL is a pull-request or issue page
//! and deriving the context the fetcher needs from it.
//!
//! Everything coupled to the host side (who authored the item, whether the
//! repository is private) sits behind the [`PageContext`] trait so that the
//! lookup mechanism lives in exactly one place.

use std::future::Future;

use crate::github::ApiError;

/// Context derived fresh from the URL on every invocation; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
    /// Username of the item's author, when the provider could resolve it.
    pub contributor: Option<String>,
    /// Number of the PR/issue being viewed.
    pub current_num: u64,
    /// `org/repo` path of the repository.
    pub repo_path: String,
    pub org: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Pull,
    Issue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub org: String,
    pub repo: String,
    pub number: u64,
    pub kind: ItemKind,
}

/// Provider of page-level facts the URL alone cannot supply.
pub trait PageContext {
    /// Username of the first contributor (the PR/issue author), or `None`
    /// when it cannot be resolved yet.
    fn first_contributor(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> impl Future<Output = Result<Option<String>, ApiError>> + Send;

    fn repo_is_private(
        &self,
        org: &str,
        repo: &str,
    ) -> impl Future<Output = Result<bool, ApiError>> + Send;
}

/// Strip scheme and host from a URL, leaving the pathname.
pub fn url_pathname(url: &str) -> &str {
    let rest = match url.split_once("://") {
        Some((_, rest)) => rest,
        None => return url,
    };
    match rest.find('/') {
        Some(idx) => &rest[idx..],
        None => "/",
    }
}

/// Matches `/org/repo/pull/N` and `/org/repo/issues/N`.
pub fn is_relevant_page(pathname: &str) -> bool {
    parse_item_path(pathname).is_some()
}

pub fn parse_item_path(pathname: &str) -> Option<ParsedPath> {
    let mut segments = pathname.trim_start_matches('/').split('/');
    let org = segments.next().filter(|s| !s.is_empty())?;
    let repo = segments.next().filter(|s| !s.is_empty())?;
    let kind = match segments.next()? {
        "pull" => ItemKind::Pull,
        "issues" => ItemKind::Issue,
        _ => return None,
    };
    let number = segments.next()?.parse().ok()?;

    Some(ParsedPath {
        org: org.to_string(),
        repo: repo.to_string(),
        number,
        kind,
    })
}

/// Resolve a URL into [`PathInfo`], asking the provider for the author byline.
///
/// Returns `Ok(None)` when the URL is not a PR/issue page. When the page is
/// relevant but the author cannot be resolved yet, the returned info carries
/// `contributor: None` and the caller skips initialization without error.
pub async fn extract_context<P: PageContext>(
    provider: &P,
    url: &str,
) -> Result<Option<PathInfo>, ApiError> {
    let Some(parsed) = parse_item_path(url_pathname(url)) else {
        return Ok(None);
    };
    tracing::debug!(kind = ?parsed.kind, number = parsed.number, "relevant page");

    let contributor = provider
        .first_contributor(&parsed.org, &parsed.repo, parsed.number)
        .await?;

    Ok(Some(PathInfo {
        contributor,
        current_num: parsed.number,
        repo_path: format!("{}/{}", parsed.org, parsed.repo),
        org: parsed.org,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubContext {
        contributor: Option<String>,
        private: bool,
    }

    impl PageContext for StubContext {
        async fn first_contributor(
            &self,
            _org: &str,
            _repo: &str,
            _number: u64,
        ) -> Result<Option<String>, ApiError> {
            Ok(self.contributor.clone())
        }

        async fn repo_is_private(&self, _org: &str, _repo: &str) -> Result<bool, ApiError> {
            Ok(self.private)
        }
    }

    #[test]
    fn relevant_pages() {
        assert!(is_relevant_page("/babel/babel-eslint/pull/3390"));
        assert!(is_relevant_page("/babel/babel-eslint/issues/1"));
        assert!(!is_relevant_page("/babel/babel-eslint"));
        assert!(!is_relevant_page("/babel/babel-eslint/pulls"));
        assert!(!is_relevant_page("/babel/babel-eslint/pull/abc"));
        assert!(!is_relevant_page("/"));
    }

    #[test]
    fn parse_extracts_org_repo_and_number() {
        let parsed = parse_item_path("/babel/babel-eslint/pull/3390").unwrap();
        assert_eq!(parsed.org, "babel");
        assert_eq!(parsed.repo, "babel-eslint");
        assert_eq!(parsed.number, 3390);
        assert_eq!(parsed.kind, ItemKind::Pull);
    }

    #[test]
    fn pathname_strips_scheme_and_host() {
        assert_eq!(
            url_pathname("https://github.com/babel/babel-eslint/pull/1"),
            "/babel/babel-eslint/pull/1"
        );
        assert_eq!(url_pathname("/babel/babel-eslint/pull/1"), "/babel/babel-eslint/pull/1");
        assert_eq!(url_pathname("https://github.com"), "/");
    }

    #[tokio::test]
    async fn context_for_issue_url() {
        let provider = StubContext {
            contributor: Some("alice".to_string()),
            private: false,
        };
        let info = extract_context(&provider, "https://github.com/babel/babel-eslint/issues/42")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.contributor.as_deref(), Some("alice"));
        assert_eq!(info.current_num, 42);
        assert_eq!(info.repo_path, "babel/babel-eslint");
        assert_eq!(info.org, "babel");
    }

    #[tokio::test]
    async fn irrelevant_url_yields_nothing() {
        let provider = StubContext {
            contributor: Some("alice".to_string()),
            private: false,
        };
        let info = extract_context(&provider, "https://github.com/babel/babel-eslint")
            .await
            .unwrap();
        assert!(info.is_none());
    }

    #[tokio::test]
    async fn missing_byline_leaves_contributor_unset() {
        let provider = StubContext {
            contributor: None,
            private: false,
        };
        let info = extract_context(&provider, "/babel/babel-eslint/pull/1")
            .await
            .unwrap()
            .unwrap();
        assert!(info.contributor.is_none());
    }
}
