use serde::{Deserialize, Serialize};

use crate::page::PathInfo;

/// Storage sub-key for account-wide stats, where no repo or org applies.
pub const SELF_SCOPE_KEY: &str = "__self";

/// Breadth over which contributor stats are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Repo,
    Org,
    Account,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Repo, Scope::Org, Scope::Account];

    pub fn label(self) -> &'static str {
        match self {
            Scope::Repo => "in this repo",
            Scope::Org => "in this org",
            Scope::Account => "in this account",
        }
    }

    /// Storage sub-key for this scope: `org/repo`, the org name, or `__self`.
    pub fn key(self, info: &PathInfo) -> String {
        match self {
            Scope::Repo => info.repo_path.clone(),
            Scope::Org => info.org.clone(),
            Scope::Account => SELF_SCOPE_KEY.to_string(),
        }
    }
}

/// Per-(contributor, scope) stats record.
///
/// A record with `last_update` unset has never been fetched. A record with
/// `last_update` set is complete and cacheable even when both counts are zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContributorStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_pr_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_issue_number: Option<u64>,
    /// Milliseconds since the epoch of the last successful fetch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<i64>,
}

impl ContributorStats {
    pub fn is_fetched(&self) -> bool {
        self.last_update.is_some()
    }

    /// Fold a partial update into this record. Fields the update leaves unset
    /// keep their previous value, so a PR-only fetch never erases cached
    /// issue counts (and vice versa).
    pub fn merge(&mut self, update: ContributorStats) {
        if update.prs.is_some() {
            self.prs = update.prs;
        }
        if update.issues.is_some() {
            self.issues = update.issues;
        }
        if update.first_pr_number.is_some() {
            self.first_pr_number = update.first_pr_number;
        }
        if update.first_issue_number.is_some() {
            self.first_issue_number = update.first_issue_number;
        }
        if let Some(ts) = update.last_update {
            self.last_update = Some(self.last_update.map_or(ts, |prev| prev.max(ts)));
        }
    }
}
