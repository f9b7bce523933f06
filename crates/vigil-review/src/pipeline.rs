use std::fmt;
use std::path::Path;

use serde::Serialize;
use vigil_core::{Finding, ReviewConfig, Severity, Verdict, VigilError};

use vigil_diff::group::{group_changes_by_line, FileChanges};
use vigil_diff::parser::FileDiff;
use vigil_diff::render::describe_group;

use crate::ollama::{ChatMessage, OllamaClient, Role};
use crate::prompt;

/// How the per-file model requests are awaited.
///
/// Both strategies dispatch every request concurrently and suspend until all
/// reach a terminal state; they differ in what a single failed request does
/// to the run.
///
/// # Examples
///
/// ```
/// use vigil_review::pipeline::AggregationMode;
///
/// assert_eq!(AggregationMode::for_run(true), AggregationMode::FailFast);
/// assert_eq!(AggregationMode::for_run(false), AggregationMode::SettleAll);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMode {
    /// The first per-file failure of any kind aborts the run.
    FailFast,
    /// Request failures fold into "no finding" for that file; only an
    /// unusable verdict aborts the run.
    SettleAll,
}

impl AggregationMode {
    /// Select the strategy for a run: verbose runs fail fast.
    pub fn for_run(verbose: bool) -> Self {
        if verbose {
            AggregationMode::FailFast
        } else {
            AggregationMode::SettleAll
        }
    }
}

/// Terminal outcome of one file's review task.
#[derive(Debug, Clone)]
enum FileReport {
    /// Verdict below threshold.
    Clean,
    /// Verdict at or above threshold.
    Finding(Finding),
}

/// Failure of one file's review task, tagged by blast radius.
#[derive(Debug)]
enum TaskFailure {
    /// Transport-level failure of a single request.
    Request(VigilError),
    /// Unusable verdict payload; poisons the whole run.
    Fatal(VigilError),
}

impl TaskFailure {
    fn into_error(self) -> VigilError {
        match self {
            TaskFailure::Request(e) | TaskFailure::Fatal(e) => e,
        }
    }
}

/// One assembled model request, pending dispatch.
struct ReviewJob {
    file: String,
    prompt: String,
}

/// Statistics about a review run.
///
/// # Examples
///
/// ```
/// use vigil_review::pipeline::ReviewStats;
///
/// let stats = ReviewStats {
///     files_reviewed: 3,
///     files_skipped: 1,
///     model_used: "llama3.2".into(),
/// };
/// assert_eq!(stats.files_reviewed, 3);
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    /// Number of files sent to the model.
    pub files_reviewed: usize,
    /// Number of files excluded by skip patterns.
    pub files_skipped: usize,
    /// Model identifier used for the review.
    pub model_used: String,
}

/// Result of a completed review run.
///
/// An empty findings list means the run passed.
///
/// # Examples
///
/// ```
/// use vigil_review::pipeline::{ReviewResult, ReviewStats};
///
/// let result = ReviewResult {
///     findings: vec![],
///     stats: ReviewStats {
///         files_reviewed: 0,
///         files_skipped: 0,
///         model_used: "llama3.2".into(),
///     },
/// };
/// assert!(result.findings.is_empty());
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    /// Verdicts that met or exceeded the severity threshold.
    pub findings: Vec<Finding>,
    /// Statistics about the run.
    pub stats: ReviewStats,
}

/// Review orchestrator: groups and renders the diff, assembles per-file
/// prompts, dispatches them concurrently, and filters verdicts against the
/// severity threshold.
pub struct ReviewPipeline {
    client: OllamaClient,
    model: String,
    config: ReviewConfig,
    mode: AggregationMode,
    verbose: bool,
}

impl ReviewPipeline {
    /// Create a new pipeline.
    ///
    /// `verbose` selects [`AggregationMode::FailFast`] and echoes raw model
    /// responses to stderr.
    pub fn new(client: OllamaClient, model: String, config: ReviewConfig, verbose: bool) -> Self {
        Self {
            client,
            model,
            config,
            mode: AggregationMode::for_run(verbose),
            verbose,
        }
    }

    /// Run a review over parsed diffs, reading file contents relative to
    /// `repo_root`.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Verdict`] when any response lacks a usable
    /// verdict, and [`VigilError::Model`] for request failures in fail-fast
    /// mode. Request failures in settle-all mode count as "no finding" for
    /// the affected file.
    pub async fn review(
        &self,
        repo_root: &Path,
        diffs: &[FileDiff],
    ) -> Result<ReviewResult, VigilError> {
        let grouped = group_changes_by_line(diffs);
        let skip = compile_skip_patterns(&self.config.skip_patterns);
        let (jobs, files_skipped) = assemble_jobs(&grouped, repo_root, &skip);
        let files_reviewed = jobs.len();

        let requests = jobs.iter().map(|job| self.review_file(job));
        let reports = match self.mode {
            AggregationMode::FailFast => futures::future::try_join_all(requests)
                .await
                .map_err(TaskFailure::into_error)?,
            AggregationMode::SettleAll => settle(futures::future::join_all(requests).await)?,
        };

        let findings = reports
            .into_iter()
            .filter_map(|report| match report {
                FileReport::Finding(finding) => Some(finding),
                FileReport::Clean => None,
            })
            .collect();

        Ok(ReviewResult {
            findings,
            stats: ReviewStats {
                files_reviewed,
                files_skipped,
                model_used: self.model.clone(),
            },
        })
    }

    async fn review_file(&self, job: &ReviewJob) -> Result<FileReport, TaskFailure> {
        let messages = vec![
            ChatMessage {
                role: Role::System,
                content: prompt::build_system_prompt(),
            },
            ChatMessage {
                role: Role::User,
                content: job.prompt.clone(),
            },
        ];

        // Context window sized to twice the prompt length in characters.
        let num_ctx = job.prompt.len() * 2;

        let response = self
            .client
            .chat(&self.model, messages, num_ctx)
            .await
            .map_err(TaskFailure::Request)?;

        if self.verbose {
            eprintln!("{response}");
        }

        let verdict = prompt::parse_verdict(&response).map_err(TaskFailure::Fatal)?;
        Ok(verdict_report(&job.file, verdict, self.config.fail_on))
    }
}

fn compile_skip_patterns(patterns: &[String]) -> Vec<glob::Pattern> {
    let mut compiled = Vec::new();
    for pattern in patterns {
        if let Ok(p) = glob::Pattern::new(pattern) {
            compiled.push(p);
        }
    }
    compiled
}

/// Build one job per file with at least one change group, skipping files
/// matching the skip patterns. Returns the jobs and the skipped-file count.
///
/// File contents are read relative to `repo_root`; unreadable files (deleted
/// in the working tree) contribute empty content rather than failing.
fn assemble_jobs(
    grouped: &[FileChanges],
    repo_root: &Path,
    skip: &[glob::Pattern],
) -> (Vec<ReviewJob>, usize) {
    let mut jobs = Vec::new();
    let mut files_skipped = 0;

    for entry in grouped {
        if entry.groups.is_empty() {
            continue;
        }

        let file = entry.path.to_string_lossy().to_string();
        if skip.iter().any(|p| p.matches(&file)) {
            files_skipped += 1;
            continue;
        }

        let descriptions: Vec<String> = entry
            .groups
            .iter()
            .map(|group| describe_group(group))
            .collect();
        let content = std::fs::read_to_string(repo_root.join(&entry.path)).unwrap_or_default();

        jobs.push(ReviewJob {
            prompt: prompt::build_file_prompt(&file, &content, &descriptions),
            file,
        });
    }

    (jobs, files_skipped)
}

fn verdict_report(file: &str, verdict: Verdict, threshold: Severity) -> FileReport {
    if verdict.severity.is_at_least(threshold) {
        FileReport::Finding(Finding {
            file: file.to_string(),
            reason: verdict.reason,
            severity: verdict.severity,
        })
    } else {
        FileReport::Clean
    }
}

fn settle(outcomes: Vec<Result<FileReport, TaskFailure>>) -> Result<Vec<FileReport>, VigilError> {
    let mut reports = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Ok(report) => reports.push(report),
            Err(TaskFailure::Fatal(e)) => return Err(e),
            Err(TaskFailure::Request(_)) => reports.push(FileReport::Clean),
        }
    }
    Ok(reports)
}

impl fmt::Display for ReviewResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Security Review")?;
        writeln!(f, "===============")?;
        writeln!(
            f,
            "Model: {} | Files reviewed: {} | Skipped: {} | Findings: {}\n",
            self.stats.model_used,
            self.stats.files_reviewed,
            self.stats.files_skipped,
            self.findings.len(),
        )?;

        if self.findings.is_empty() {
            writeln!(f, "No findings.")?;
        } else {
            for finding in &self.findings {
                writeln!(f, "[{}] {}: {}", finding.severity, finding.file, finding.reason)?;
                writeln!(f)?;
            }
        }

        Ok(())
    }
}

impl ReviewResult {
    /// Render the review result as markdown.
    ///
    /// # Examples
    ///
    /// ```
    /// use vigil_review::pipeline::{ReviewResult, ReviewStats};
    ///
    /// let result = ReviewResult {
    ///     findings: vec![],
    ///     stats: ReviewStats {
    ///         files_reviewed: 0,
    ///         files_skipped: 0,
    ///         model_used: "llama3.2".into(),
    ///     },
    /// };
    /// let md = result.to_markdown();
    /// assert!(md.contains("# Security Review"));
    /// ```
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Security Review\n\n");
        out.push_str(&format!(
            "**Model:** {} | **Files reviewed:** {} | **Skipped:** {} | **Findings:** {}\n\n",
            self.stats.model_used,
            self.stats.files_reviewed,
            self.stats.files_skipped,
            self.findings.len(),
        ));

        if self.findings.is_empty() {
            out.push_str("No findings.\n");
        } else {
            for finding in &self.findings {
                out.push_str(&format!(
                    "## {} — `{}`\n\n{}\n\n",
                    finding.severity, finding.file, finding.reason,
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_diff::parser::parse_unified_diff;

    fn verdict(severity: Severity) -> Verdict {
        Verdict {
            reason: "because".into(),
            severity,
        }
    }

    #[test]
    fn for_run_selects_mode_from_verbosity() {
        assert_eq!(AggregationMode::for_run(true), AggregationMode::FailFast);
        assert_eq!(AggregationMode::for_run(false), AggregationMode::SettleAll);
    }

    #[test]
    fn verdict_at_threshold_becomes_finding() {
        let report = verdict_report("a.rs", verdict(Severity::High), Severity::High);
        assert!(matches!(report, FileReport::Finding(_)));
    }

    #[test]
    fn verdict_below_threshold_is_clean() {
        let report = verdict_report("a.rs", verdict(Severity::Low), Severity::High);
        assert!(matches!(report, FileReport::Clean));
    }

    #[test]
    fn none_threshold_flags_everything() {
        for severity in Severity::CHAIN {
            let report = verdict_report("a.rs", verdict(severity), Severity::None);
            assert!(matches!(report, FileReport::Finding(_)));
        }
    }

    #[test]
    fn two_files_one_high_one_low_with_high_threshold() {
        let reports = vec![
            verdict_report("high.rs", verdict(Severity::High), Severity::High),
            verdict_report("low.rs", verdict(Severity::Low), Severity::High),
        ];
        let findings: Vec<_> = reports
            .into_iter()
            .filter_map(|r| match r {
                FileReport::Finding(f) => Some(f),
                FileReport::Clean => None,
            })
            .collect();

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].file, "high.rs");
    }

    #[test]
    fn settle_folds_request_failures_into_clean() {
        let outcomes = vec![
            Ok(FileReport::Finding(Finding {
                file: "a.rs".into(),
                reason: "bad".into(),
                severity: Severity::High,
            })),
            Err(TaskFailure::Request(VigilError::Model("timeout".into()))),
        ];
        let reports = settle(outcomes).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(matches!(reports[1], FileReport::Clean));
    }

    #[test]
    fn settle_propagates_verdict_failures() {
        let outcomes = vec![
            Ok(FileReport::Clean),
            Err(TaskFailure::Fatal(VigilError::Verdict("broken".into()))),
        ];
        let err = settle(outcomes).unwrap_err();
        assert!(matches!(err, VigilError::Verdict(_)));
    }

    #[test]
    fn assemble_jobs_builds_one_prompt_per_changed_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn a() {}\n").unwrap();

        let diff = "\
--- a/a.rs
+++ b/a.rs
@@ -1,1 +1,2 @@
 fn a() {}
+fn b() {}
";
        let grouped = group_changes_by_line(&parse_unified_diff(diff).unwrap());
        let (jobs, skipped) = assemble_jobs(&grouped, dir.path(), &[]);

        assert_eq!(jobs.len(), 1);
        assert_eq!(skipped, 0);
        assert_eq!(jobs[0].file, "a.rs");
        assert!(jobs[0].prompt.starts_with("Filename: a.rs\n"));
        assert!(jobs[0].prompt.contains("Content: fn a() {}\n"));
        assert!(jobs[0].prompt.contains("Added content: fn b() {} at line 2"));
    }

    #[test]
    fn assemble_jobs_skips_matching_patterns() {
        let dir = tempfile::tempdir().unwrap();

        let diff = "\
--- a/Cargo.lock
+++ b/Cargo.lock
@@ -1,1 +1,2 @@
 [[package]]
+name = \"x\"
";
        let grouped = group_changes_by_line(&parse_unified_diff(diff).unwrap());
        let skip = compile_skip_patterns(&["*.lock".into()]);
        let (jobs, skipped) = assemble_jobs(&grouped, dir.path(), &skip);

        assert!(jobs.is_empty());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn assemble_jobs_ignores_files_with_no_groups() {
        let dir = tempfile::tempdir().unwrap();

        let diff = "\
--- a/f.rs
+++ b/f.rs
@@ -1,2 +1,2 @@
 fn main() {
 }
";
        let grouped = group_changes_by_line(&parse_unified_diff(diff).unwrap());
        let (jobs, skipped) = assemble_jobs(&grouped, dir.path(), &[]);

        assert!(jobs.is_empty());
        assert_eq!(skipped, 0);
    }

    #[test]
    fn assemble_jobs_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();

        let diff = "\
--- a/gone.rs
+++ b/gone.rs
@@ -1,1 +0,0 @@
-fn gone() {}
";
        let grouped = group_changes_by_line(&parse_unified_diff(diff).unwrap());
        let (jobs, _) = assemble_jobs(&grouped, dir.path(), &[]);

        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].prompt.contains("Content: \n"));
    }

    #[test]
    fn compile_skip_patterns_drops_invalid_globs() {
        let compiled = compile_skip_patterns(&["[".into(), "*.lock".into()]);
        assert_eq!(compiled.len(), 1);
    }

    #[test]
    fn display_and_markdown_output() {
        let result = ReviewResult {
            findings: vec![Finding {
                file: "src/auth.rs".into(),
                reason: "hardcoded credentials".into(),
                severity: Severity::High,
            }],
            stats: ReviewStats {
                files_reviewed: 2,
                files_skipped: 1,
                model_used: "llama3.2".into(),
            },
        };

        let text = format!("{result}");
        assert!(text.contains("[HIGH] src/auth.rs: hardcoded credentials"));
        assert!(text.contains("Files reviewed: 2"));

        let md = result.to_markdown();
        assert!(md.contains("# Security Review"));
        assert!(md.contains("`src/auth.rs`"));
    }

    #[test]
    fn empty_result_reports_no_findings() {
        let result = ReviewResult {
            findings: vec![],
            stats: ReviewStats {
                files_reviewed: 0,
                files_skipped: 0,
                model_used: "llama3.2".into(),
            },
        };
        assert!(format!("{result}").contains("No findings."));
    }
}
