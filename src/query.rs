//! Search query construction for `GET /search/issues`.
//!
//! The `q` parameter is assembled from `author:`/`repo:`/`user:`/`type:`/
//! `created:` clauses joined with `+`; absent fields are omitted. Identifiers
//! come from trusted URL parsing, so no validation beyond interpolation.

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    Pr,
    Issue,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::Pr => "pr",
            IssueKind::Issue => "issue",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub kind: Option<IssueKind>,
    pub author: Option<String>,
    pub repo: Option<String>,
    pub user: Option<String>,
    pub created: Option<String>,
    pub sort: Option<&'static str>,
    pub order: Option<&'static str>,
    pub per_page: Option<u32>,
}

impl SearchQuery {
    /// Query for a contributor's total count of PRs or issues in one scope.
    ///
    /// `repo` and `user` are mutually exclusive: repo scope supplies `repo`,
    /// org scope supplies `user`, account scope supplies neither. Sorting
    /// ascending by creation with `per_page=1` makes the first item the
    /// earliest one the contributor authored.
    pub fn count(
        kind: IssueKind,
        author: &str,
        repo: Option<String>,
        user: Option<String>,
    ) -> Self {
        SearchQuery {
            kind: Some(kind),
            author: Some(author.to_string()),
            repo,
            user,
            created: None,
            sort: Some("created"),
            order: Some("asc"),
            per_page: Some(1),
        }
    }

    /// Render the URL query-string portion, e.g.
    /// `q=+author:alice+repo:org/repo+type:pr&order=asc&per_page=1&sort=created`.
    pub fn query_string(&self) -> String {
        let mut out = String::from("q=");
        if let Some(author) = &self.author {
            let _ = write!(out, "+author:{author}");
        }
        if let Some(repo) = &self.repo {
            let _ = write!(out, "+repo:{repo}");
        }
        if let Some(user) = &self.user {
            let _ = write!(out, "+user:{user}");
        }
        if let Some(kind) = self.kind {
            let _ = write!(out, "+type:{}", kind.as_str());
        }
        if let Some(created) = &self.created {
            let _ = write!(out, "+created:{created}");
        }
        if let Some(order) = self.order {
            let _ = write!(out, "&order={order}");
        }
        if let Some(per_page) = self.per_page {
            let _ = write!(out, "&per_page={per_page}");
        }
        if let Some(sort) = self.sort {
            let _ = write!(out, "&sort={sort}");
        }
        out
    }
}
