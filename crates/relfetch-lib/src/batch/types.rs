use crate::release::RepoId;

/// Settled result of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub repo_id: RepoId,
    pub message: String,
    pub success: bool,
}

impl JobOutcome {
    pub fn succeeded(repo_id: RepoId, message: impl Into<String>) -> Self {
        Self {
            repo_id,
            message: message.into(),
            success: true,
        }
    }

    pub fn failed(repo_id: RepoId, message: impl Into<String>) -> Self {
        Self {
            repo_id,
            message: message.into(),
            success: false,
        }
    }
}

/// Outcomes of a batch, in the order the repositories were requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<JobOutcome>,
}

impl BatchReport {
    pub fn any_failed(&self) -> bool {
        self.outcomes.iter().any(|outcome| !outcome.success)
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn outcome(&self, repo_id: &RepoId) -> Option<&JobOutcome> {
        self.outcomes.iter().find(|outcome| &outcome.repo_id == repo_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let report = BatchReport {
            outcomes: vec![
                JobOutcome::succeeded(RepoId::new("a", "one"), "ok"),
                JobOutcome::failed(RepoId::new("b", "two"), "No release found"),
            ],
        };

        assert!(report.any_failed());
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.outcome(&RepoId::new("b", "two")).map(|o| o.message.as_str()),
            Some("No release found")
        );
    }

    #[test]
    fn test_empty_report_has_no_failures() {
        assert!(!BatchReport::default().any_failed());
    }
}
