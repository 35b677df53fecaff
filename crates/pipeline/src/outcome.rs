use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    Processed { rows: u64 },
    Skipped,
    Failed { reason: String },
}

/// What happened to one candidate file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub file_name: String,
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn processed(file_name: impl Into<String>, rows: u64) -> Self {
        Self {
            file_name: file_name.into(),
            status: FileStatus::Processed { rows },
        }
    }

    pub fn skipped(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            status: FileStatus::Skipped,
        }
    }

    pub fn failed(file_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            status: FileStatus::Failed {
                reason: reason.into(),
            },
        }
    }
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            FileStatus::Processed { .. } => write!(f, "File {} processed and saved.", self.file_name),
            FileStatus::Skipped => write!(
                f,
                "File {} has already been processed previously.",
                self.file_name
            ),
            FileStatus::Failed { reason } => write!(f, "File {} failed: {}", self.file_name, reason),
        }
    }
}

/// Ordered outcomes of one run, one per candidate file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub outcomes: Vec<FileOutcome>,
}

impl RunReport {
    pub fn push(&mut self, outcome: FileOutcome) {
        self.outcomes.push(outcome);
    }

    /// Human-readable log, in processing order.
    pub fn log_lines(&self) -> Vec<String> {
        self.outcomes.iter().map(ToString::to_string).collect()
    }

    pub fn processed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Processed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed { .. }))
    }

    pub fn rows_written(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                FileStatus::Processed { rows } => rows,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, pred: impl Fn(&FileStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_line_wording() {
        assert_eq!(
            FileOutcome::processed("a.csv", 3).to_string(),
            "File a.csv processed and saved."
        );
        assert_eq!(
            FileOutcome::skipped("b.csv").to_string(),
            "File b.csv has already been processed previously."
        );
        assert_eq!(
            FileOutcome::failed("c.json", "missing column: quantity").to_string(),
            "File c.json failed: missing column: quantity"
        );
    }

    #[test]
    fn report_counters() {
        let mut report = RunReport::default();
        report.push(FileOutcome::processed("a.csv", 3));
        report.push(FileOutcome::processed("b.csv", 2));
        report.push(FileOutcome::skipped("c.csv"));
        report.push(FileOutcome::failed("d.csv", "boom"));
        assert_eq!(report.processed(), 2);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.rows_written(), 5);
        assert_eq!(report.log_lines().len(), 4);
    }
}
