//! Terminal rendition of the stats widget: two headline counters for the
//! repo scope, a breakdown panel listing every scope, the relative
//! last-updated stamp, and any queued notices.

use std::fmt::Write as _;

use crate::stats::Scope;
use crate::text;

const STAT_PAD: usize = 3;
const LABEL_WIDTH: usize = 16;
const SYNC_HINT: &str = "run with --sync to refresh";

/// One counter cell of the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Loading,
    Text(String),
    Error,
    Skipped,
}

impl Cell {
    fn as_str(&self) -> &str {
        match self {
            Cell::Loading => "..",
            Cell::Text(s) => s,
            Cell::Error => "Error",
            Cell::Skipped => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

/// A one-line status message printed alongside the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ScopeSlot {
    prs: Cell,
    issues: Cell,
}

impl ScopeSlot {
    fn loading() -> Self {
        Self {
            prs: Cell::Loading,
            issues: Cell::Loading,
        }
    }
}

/// Widget state for one contributor on one page.
///
/// Scope slots are disjoint, so the three concurrent scope fetches each
/// update their own cells in any order.
pub struct Overlay {
    contributor: String,
    mounted: bool,
    repo: ScopeSlot,
    org: ScopeSlot,
    account: ScopeSlot,
    last_update: Option<i64>,
    notices: Vec<Notice>,
}

impl Overlay {
    pub fn new(contributor: &str) -> Self {
        Self {
            contributor: contributor.to_string(),
            mounted: false,
            repo: ScopeSlot::loading(),
            org: ScopeSlot::loading(),
            account: ScopeSlot::loading(),
            last_update: None,
            notices: Vec::new(),
        }
    }

    /// Idempotent mount: the first call installs the container, any repeat
    /// is a no-op. Returns whether this call installed it.
    pub fn mount(&mut self) -> bool {
        if self.mounted {
            return false;
        }
        self.mounted = true;
        true
    }

    fn slot_mut(&mut self, scope: Scope) -> &mut ScopeSlot {
        match scope {
            Scope::Repo => &mut self.repo,
            Scope::Org => &mut self.org,
            Scope::Account => &mut self.account,
        }
    }

    fn slot(&self, scope: Scope) -> &ScopeSlot {
        match scope {
            Scope::Repo => &self.repo,
            Scope::Org => &self.org,
            Scope::Account => &self.account,
        }
    }

    pub fn set_counts(&mut self, scope: Scope, pr_text: String, issue_text: String) {
        *self.slot_mut(scope) = ScopeSlot {
            prs: Cell::Text(pr_text),
            issues: Cell::Text(issue_text),
        };
    }

    pub fn set_error(&mut self, scope: Scope) {
        *self.slot_mut(scope) = ScopeSlot {
            prs: Cell::Error,
            issues: Cell::Error,
        };
    }

    pub fn set_skipped(&mut self, scope: Scope) {
        *self.slot_mut(scope) = ScopeSlot {
            prs: Cell::Skipped,
            issues: Cell::Skipped,
        };
    }

    /// Keep the newest freshness stamp seen across scopes.
    pub fn set_last_update(&mut self, ms: i64) {
        self.last_update = Some(self.last_update.map_or(ms, |prev| prev.max(ms)));
    }

    /// Queue a notice; an identical message already queued is not repeated.
    pub fn push_notice(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let notice = Notice {
            level,
            message: message.into(),
        };
        if !self.notices.contains(&notice) {
            self.notices.push(notice);
        }
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn render(&self, now_ms: i64) -> String {
        let mut out = String::new();

        let _ = writeln!(
            out,
            "{}  PRs: {}  Issues: {}",
            self.contributor,
            self.repo.prs.as_str(),
            self.repo.issues.as_str(),
        );

        for scope in Scope::ALL {
            out.push_str(&panel_row(scope, self.slot(scope)));
            out.push('\n');
        }

        let updated = match self.last_update {
            Some(ms) => format!("updated {}", text::format_ago(ms, now_ms)),
            None => "never updated".to_string(),
        };
        let _ = writeln!(out, "  {updated} ({SYNC_HINT})");

        out
    }
}

fn panel_row(scope: Scope, slot: &ScopeSlot) -> String {
    format!(
        "  {:<label$} {:>pad$} PRs  {:>pad$} issues",
        scope.label(),
        slot.prs.as_str(),
        slot.issues.as_str(),
        label = LABEL_WIDTH,
        pad = STAT_PAD,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_is_idempotent() {
        let mut overlay = Overlay::new("alice");
        assert!(overlay.mount());
        assert!(!overlay.mount());

        // Exactly one container header regardless of repeated mounts.
        let rendered = overlay.render(0);
        assert_eq!(rendered.matches("alice  PRs:").count(), 1);
    }

    #[test]
    fn render_shows_loading_placeholders() {
        let overlay = Overlay::new("alice");
        let rendered = overlay.render(0);
        assert!(rendered.contains("PRs: .."));
        assert!(rendered.contains("Issues: .."));
        assert!(rendered.contains("never updated"));
    }

    #[test]
    fn render_shows_counts_and_timestamp() {
        let mut overlay = Overlay::new("alice");
        overlay.set_counts(Scope::Repo, "First".to_string(), "3".to_string());
        overlay.set_counts(Scope::Org, "2".to_string(), "4".to_string());
        overlay.set_counts(Scope::Account, "10".to_string(), "12".to_string());
        overlay.set_last_update(0);

        let rendered = overlay.render(3 * 60 * 1000);
        assert!(rendered.contains("PRs: First"));
        assert!(rendered.contains("in this org"));
        assert!(rendered.contains("in this account"));
        assert!(rendered.contains("updated 3m ago"));
    }

    #[test]
    fn error_cells_render_per_scope() {
        let mut overlay = Overlay::new("alice");
        overlay.set_error(Scope::Org);
        let rendered = overlay.render(0);
        assert!(rendered.contains("in this org"));
        assert!(rendered.contains("Error"));
        // Repo scope untouched by the org failure.
        assert!(rendered.contains("PRs: .."));
    }

    #[test]
    fn skipped_scopes_render_dash_cells() {
        let mut overlay = Overlay::new("alice");
        for scope in Scope::ALL {
            overlay.set_skipped(scope);
        }

        let rendered = overlay.render(0);
        assert!(rendered.contains("alice  PRs: -  Issues: -"));
        assert_eq!(rendered.matches("- PRs").count(), 3);
        assert_eq!(rendered.matches("- issues").count(), 3);
    }

    #[test]
    fn last_update_keeps_newest() {
        let mut overlay = Overlay::new("alice");
        overlay.set_last_update(5_000);
        overlay.set_last_update(2_000);
        assert!(overlay.render(5_000).contains("updated <1m"));
    }

    #[test]
    fn duplicate_notices_collapse() {
        let mut overlay = Overlay::new("alice");
        overlay.push_notice(NoticeLevel::Error, "rate limited");
        overlay.push_notice(NoticeLevel::Error, "rate limited");
        overlay.push_notice(NoticeLevel::Warning, "token missing");
        assert_eq!(overlay.notices().len(), 2);
    }
}
