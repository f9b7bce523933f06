use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of a single line-level edit in a diff.
///
/// # Examples
///
/// ```
/// use vigil_core::ChangeKind;
///
/// let kind: ChangeKind = serde_json::from_str("\"insert\"").unwrap();
/// assert_eq!(kind, ChangeKind::Insert);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Line added in the new version.
    Insert,
    /// Line removed from the old version.
    Delete,
    /// Unchanged context line.
    Normal,
}

/// One line-level edit record from a parsed diff.
///
/// For inserts, `line` is the position in the new file; for deletes, the
/// position in the old file; for unchanged context, the position in the new
/// file.
///
/// # Examples
///
/// ```
/// use vigil_core::{Change, ChangeKind};
///
/// let change = Change {
///     kind: ChangeKind::Insert,
///     line: 5,
///     content: "let x = 1;".into(),
/// };
/// assert_eq!(change.line, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    /// Classification of the edit.
    pub kind: ChangeKind,
    /// Line number the edit applies to.
    pub line: u32,
    /// Text of the line, without the leading diff marker.
    pub content: String,
}

/// A single hunk from a unified diff, with its line-level changes.
///
/// # Examples
///
/// ```
/// use vigil_core::DiffHunk;
///
/// let hunk = DiffHunk {
///     old_start: 10,
///     old_lines: 5,
///     new_start: 10,
///     new_lines: 8,
///     changes: vec![],
/// };
/// assert_eq!(hunk.old_lines, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffHunk {
    /// Starting line in the old version.
    pub old_start: u32,
    /// Number of lines in the old version.
    pub old_lines: u32,
    /// Starting line in the new version.
    pub new_start: u32,
    /// Number of lines in the new version.
    pub new_lines: u32,
    /// Ordered line-level changes in this hunk.
    pub changes: Vec<Change>,
}

/// Severity of a security finding, from least to most severe.
///
/// The four levels form a total order: `NONE < LOW < MEDIUM < HIGH`. The
/// order is defined by [`Severity::CHAIN`]; a level's index in the chain is
/// its rank.
///
/// # Examples
///
/// ```
/// use vigil_core::Severity;
///
/// let s: Severity = serde_json::from_str("\"HIGH\"").unwrap();
/// assert_eq!(s, Severity::High);
/// assert!(s.is_at_least(Severity::Medium));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// No security concern.
    None,
    /// Minor concern, unlikely to be exploitable.
    Low,
    /// Plausible vulnerability with limited impact.
    Medium,
    /// Likely malicious or directly exploitable change.
    High,
}

impl Severity {
    /// The four levels in ascending order of severity.
    pub const CHAIN: [Severity; 4] = [
        Severity::None,
        Severity::Low,
        Severity::Medium,
        Severity::High,
    ];

    /// Returns `true` if `self` is at least as severe as `threshold`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vigil_core::Severity;
    ///
    /// assert!(Severity::High.is_at_least(Severity::Low));
    /// assert!(Severity::Medium.is_at_least(Severity::Medium));
    /// assert!(!Severity::None.is_at_least(Severity::Low));
    /// ```
    pub fn is_at_least(self, threshold: Severity) -> bool {
        self.rank() >= threshold.rank()
    }

    fn rank(self) -> usize {
        Self::CHAIN.iter().position(|&s| s == self).unwrap_or(0)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::None => write!(f, "NONE"),
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NONE" => Ok(Severity::None),
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// A model's classification of one file's changes.
///
/// # Examples
///
/// ```
/// use vigil_core::{Severity, Verdict};
///
/// let verdict: Verdict =
///     serde_json::from_str(r#"{"reason": "adds eval of user input", "severity": "HIGH"}"#)
///         .unwrap();
/// assert_eq!(verdict.severity, Severity::High);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Explanation of the suspicious change, or why it is benign.
    pub reason: String,
    /// Assessed impact level.
    pub severity: Severity,
}

/// A verdict whose severity met or exceeded the configured threshold.
///
/// # Examples
///
/// ```
/// use vigil_core::{Finding, Severity};
///
/// let finding = Finding {
///     file: "src/auth.rs".into(),
///     reason: "hardcoded credentials".into(),
///     severity: Severity::High,
/// };
/// assert_eq!(finding.file, "src/auth.rs");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Path of the file the finding applies to.
    pub file: String,
    /// The model's explanation.
    pub reason: String,
    /// Assessed impact level.
    pub severity: Severity,
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument
/// parsing.
///
/// # Examples
///
/// ```
/// use vigil_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_chain_is_ascending() {
        assert_eq!(
            Severity::CHAIN,
            [
                Severity::None,
                Severity::Low,
                Severity::Medium,
                Severity::High
            ]
        );
    }

    #[test]
    fn is_at_least_matches_chain_indices() {
        // For every pair (c, t), is_at_least is true iff index(c) >= index(t).
        for (ci, c) in Severity::CHAIN.iter().enumerate() {
            for (ti, t) in Severity::CHAIN.iter().enumerate() {
                assert_eq!(
                    c.is_at_least(*t),
                    ci >= ti,
                    "is_at_least({c}, {t}) disagrees with chain order"
                );
            }
        }
    }

    #[test]
    fn is_at_least_is_reflexive() {
        for s in Severity::CHAIN {
            assert!(s.is_at_least(s));
        }
    }

    #[test]
    fn high_dominates_everything() {
        for t in Severity::CHAIN {
            assert!(Severity::High.is_at_least(t));
        }
    }

    #[test]
    fn none_meets_only_none() {
        assert!(Severity::None.is_at_least(Severity::None));
        assert!(!Severity::None.is_at_least(Severity::Low));
        assert!(!Severity::None.is_at_least(Severity::Medium));
        assert!(!Severity::None.is_at_least(Severity::High));
    }

    #[test]
    fn everything_meets_none() {
        for s in Severity::CHAIN {
            assert!(s.is_at_least(Severity::None));
        }
    }

    #[test]
    fn severity_roundtrips_through_json() {
        let json = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(json, "\"HIGH\"");

        let parsed: Severity = serde_json::from_str("\"MEDIUM\"").unwrap();
        assert_eq!(parsed, Severity::Medium);
    }

    #[test]
    fn severity_from_str_is_case_insensitive() {
        assert_eq!("none".parse::<Severity>().unwrap(), Severity::None);
        assert_eq!("Low".parse::<Severity>().unwrap(), Severity::Low);
        assert_eq!("MEDIUM".parse::<Severity>().unwrap(), Severity::Medium);
        assert_eq!("high".parse::<Severity>().unwrap(), Severity::High);
        assert!("critical".parse::<Severity>().is_err());
    }

    #[test]
    fn verdict_deserializes_from_model_json() {
        let verdict: Verdict =
            serde_json::from_str(r#"{"reason": "looks fine", "severity": "NONE"}"#).unwrap();
        assert_eq!(verdict.severity, Severity::None);
        assert_eq!(verdict.reason, "looks fine");
    }

    #[test]
    fn verdict_rejects_unknown_severity() {
        let result: Result<Verdict, _> =
            serde_json::from_str(r#"{"reason": "x", "severity": "CRITICAL"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn change_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ChangeKind::Insert).unwrap(),
            "\"insert\""
        );
        assert_eq!(
            serde_json::to_string(&ChangeKind::Delete).unwrap(),
            "\"delete\""
        );
        assert_eq!(
            serde_json::to_string(&ChangeKind::Normal).unwrap(),
            "\"normal\""
        );
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "markdown".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn output_format_default_is_text() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }
}
