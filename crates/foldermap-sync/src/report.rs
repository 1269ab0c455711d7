//! Structured results of saving a container.

use std::path::{Path, PathBuf};

use foldermap_core::SyncIssue;
use serde::Serialize;

/// What happened to one child during a save.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "issue", rename_all = "snake_case")]
pub enum Outcome {
    Saved,
    Failed(SyncIssue),
    /// Not attempted because the save was canceled.
    Skipped,
}

/// Outcome of one child, with the nested report of a child container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildOutcome {
    pub key: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested: Option<Box<SaveReport>>,
}

impl ChildOutcome {
    pub fn new(key: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            key: key.into(),
            outcome,
            nested: None,
        }
    }

    /// Outcome of a child container, derived from its own report.
    pub fn container(key: impl Into<String>, report: SaveReport) -> Self {
        let outcome = if report.is_success() {
            if report.skipped_count() > 0 {
                Outcome::Skipped
            } else {
                Outcome::Saved
            }
        } else {
            let failed = report.failed_count();
            Outcome::Failed(match &report.error {
                Some(issue) if failed == 1 => issue.clone(),
                _ => SyncIssue::child_failed(&report.path, failed),
            })
        };

        Self {
            key: key.into(),
            outcome,
            nested: Some(Box::new(report)),
        }
    }
}

/// Result of saving a container.
///
/// Every child that was attempted appears with its own outcome, so a caller
/// can tell which siblings failed instead of a single collapsed flag.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SaveReport {
    /// Directory of the container.
    pub path: PathBuf,
    /// Failure of the container itself; children were not attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SyncIssue>,
    pub children: Vec<ChildOutcome>,
}

impl SaveReport {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            error: None,
            children: Vec::new(),
        }
    }

    /// Report for a container that could not be saved at all.
    pub fn failed(path: impl AsRef<Path>, issue: SyncIssue) -> Self {
        Self {
            error: Some(issue),
            ..Self::new(path)
        }
    }

    /// Check if the container and every descendant were saved.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
            && self
                .children
                .iter()
                .all(|child| !matches!(child.outcome, Outcome::Failed(_)))
    }

    /// Number of failed nodes in the whole subtree.
    pub fn failed_count(&self) -> usize {
        usize::from(self.error.is_some())
            + self
                .children
                .iter()
                .map(|child| match (&child.nested, &child.outcome) {
                    (Some(nested), _) => nested.failed_count(),
                    (None, Outcome::Failed(_)) => 1,
                    (None, _) => 0,
                })
                .sum::<usize>()
    }

    /// Number of leaves saved in the whole subtree.
    pub fn saved_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match (&child.nested, &child.outcome) {
                (Some(nested), _) => nested.saved_count(),
                (None, Outcome::Saved) => 1,
                (None, _) => 0,
            })
            .sum()
    }

    /// Number of nodes skipped in the whole subtree.
    pub fn skipped_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match (&child.nested, &child.outcome) {
                (Some(nested), _) => nested.skipped_count(),
                (None, Outcome::Skipped) => 1,
                (None, _) => 0,
            })
            .sum()
    }

    /// All failures in the subtree, depth first.
    pub fn issues(&self) -> Vec<&SyncIssue> {
        let mut issues = Vec::new();
        self.collect_issues(&mut issues);
        issues
    }

    fn collect_issues<'a>(&'a self, issues: &mut Vec<&'a SyncIssue>) {
        issues.extend(self.error.as_ref());
        for child in &self.children {
            match (&child.nested, &child.outcome) {
                (Some(nested), _) => nested.collect_issues(issues),
                (None, Outcome::Failed(issue)) => issues.push(issue),
                (None, _) => {}
            }
        }
    }

    /// Get a human-readable summary of the save.
    pub fn summary(&self) -> String {
        let mut summary = format!("Saved {} leaves", self.saved_count());
        let failed = self.failed_count();
        if failed > 0 {
            summary.push_str(&format!(", {failed} failed"));
        }
        let skipped = self.skipped_count();
        if skipped > 0 {
            summary.push_str(&format!(", {skipped} skipped"));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foldermap_core::IssueKind;

    fn issue(path: &str) -> SyncIssue {
        SyncIssue::new(path, "boom", IssueKind::Io)
    }

    #[test]
    fn test_counts_and_summary() {
        let mut nested = SaveReport::new("/cfg/sub");
        nested.children.push(ChildOutcome::new("c", Outcome::Saved));
        nested
            .children
            .push(ChildOutcome::new("d", Outcome::Failed(issue("/cfg/sub/d.ini"))));

        let mut report = SaveReport::new("/cfg");
        report.children.push(ChildOutcome::new("a", Outcome::Saved));
        report.children.push(ChildOutcome::container("sub", nested));
        report.children.push(ChildOutcome::new("e", Outcome::Skipped));

        assert!(!report.is_success());
        assert_eq!(report.saved_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.summary(), "Saved 2 leaves, 1 failed, 1 skipped");
        assert_eq!(report.issues()[0].path, PathBuf::from("/cfg/sub/d.ini"));

        match &report.children[1].outcome {
            Outcome::Failed(issue) => assert_eq!(issue.kind, IssueKind::ChildOperationFailed),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_failed_container() {
        let report = SaveReport::failed("/cfg", issue("/cfg"));
        assert!(!report.is_success());
        assert_eq!(report.failed_count(), 1);

        let child = ChildOutcome::container("cfg", report);
        assert_eq!(child.outcome, Outcome::Failed(issue("/cfg")));
    }

    #[test]
    fn test_serialize() {
        let mut report = SaveReport::new("/cfg");
        report.children.push(ChildOutcome::new("a", Outcome::Saved));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["children"][0]["outcome"]["status"], "saved");
        assert!(json.get("error").is_none());
    }
}
