use std::collections::HashMap;
use std::path::PathBuf;

use vigil_core::{Change, ChangeKind};

use crate::parser::FileDiff;

/// Changes sharing one line number within a file, after discarding unchanged
/// context. Holds exactly one entry for a pure insert or delete, and two
/// (one insert + one delete) for a replacement.
pub type ChangeGroup = Vec<Change>;

/// The grouped changes for one file, keyed by the post-change path.
///
/// # Examples
///
/// ```
/// use vigil_diff::group::FileChanges;
/// use std::path::PathBuf;
///
/// let entry = FileChanges {
///     path: PathBuf::from("src/main.rs"),
///     groups: vec![],
/// };
/// assert!(entry.groups.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct FileChanges {
    /// The file's new path.
    pub path: PathBuf,
    /// Change groups in first-seen line order.
    pub groups: Vec<ChangeGroup>,
}

/// Group each file's insert/delete changes by line number.
///
/// For each file, all hunks' changes are flattened into one sequence,
/// unchanged context lines are dropped, and the remaining changes are grouped
/// by line number in first-occurrence order. A delete and an insert landing on
/// the same line number end up in one group, which the renderer treats as a
/// replacement.
///
/// Every input file appears in the output, even when no changes survive the
/// filter; such files keep an empty group list. No validation is performed.
///
/// # Examples
///
/// ```
/// use vigil_diff::group::group_changes_by_line;
/// use vigil_diff::parser::parse_unified_diff;
///
/// let diff = "--- a/f.rs\n\
///             +++ b/f.rs\n\
///             @@ -1,2 +1,2 @@\n\
///             -old\n\
///             +new\n\
///              tail\n";
/// let files = parse_unified_diff(diff).unwrap();
/// let grouped = group_changes_by_line(&files);
/// assert_eq!(grouped.len(), 1);
/// assert_eq!(grouped[0].groups.len(), 1);
/// assert_eq!(grouped[0].groups[0].len(), 2);
/// ```
pub fn group_changes_by_line(files: &[FileDiff]) -> Vec<FileChanges> {
    files
        .iter()
        .map(|file| {
            // First pass: flatten hunks and keep only inserts and deletes.
            let edits = file
                .hunks
                .iter()
                .flat_map(|hunk| &hunk.changes)
                .filter(|change| change.kind != ChangeKind::Normal);

            // Second pass: group by line number, preserving first-seen order.
            let mut groups: Vec<ChangeGroup> = Vec::new();
            let mut slot_by_line: HashMap<u32, usize> = HashMap::new();
            for change in edits {
                match slot_by_line.get(&change.line) {
                    Some(&slot) => groups[slot].push(change.clone()),
                    None => {
                        slot_by_line.insert(change.line, groups.len());
                        groups.push(vec![change.clone()]);
                    }
                }
            }

            FileChanges {
                path: file.new_path.clone(),
                groups,
            }
        })
        .collect()
}
