use vigil_core::{Change, ChangeKind};

/// Render one group of same-line changes as a descriptive sentence.
///
/// A single change renders as `"<Added|Deleted|Not changed> content: <text>
/// at line <n>"`. A pair consisting of one insert and one delete renders as a
/// replacement, using the inserted content first and the insert's line
/// number. Anything else — an empty group, three or more entries, or a pair
/// that is not one insert plus one delete — renders as the empty string.
///
/// Pure function; never fails.
///
/// # Examples
///
/// ```
/// use vigil_core::{Change, ChangeKind};
/// use vigil_diff::render::describe_group;
///
/// let group = vec![Change {
///     kind: ChangeKind::Insert,
///     line: 5,
///     content: "x".into(),
/// }];
/// assert_eq!(describe_group(&group), "Added content: x at line 5");
/// ```
pub fn describe_group(group: &[Change]) -> String {
    match group {
        [only] => {
            let verb = match only.kind {
                ChangeKind::Insert => "Added",
                ChangeKind::Delete => "Deleted",
                ChangeKind::Normal => "Not changed",
            };
            format!("{verb} content: {} at line {}", only.content, only.line)
        }
        [first, second] => {
            let inserted = [first, second]
                .into_iter()
                .find(|c| c.kind == ChangeKind::Insert);
            let deleted = [first, second]
                .into_iter()
                .find(|c| c.kind == ChangeKind::Delete);

            match (inserted, deleted) {
                (Some(ins), Some(del)) => format!(
                    "Replace content: {} with {} at line {}",
                    ins.content, del.content, ins.line
                ),
                _ => String::new(),
            }
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(kind: ChangeKind, line: u32, content: &str) -> Change {
        Change {
            kind,
            line,
            content: content.into(),
        }
    }

    #[test]
    fn single_insert() {
        let group = vec![change(ChangeKind::Insert, 5, "x")];
        assert_eq!(describe_group(&group), "Added content: x at line 5");
    }

    #[test]
    fn single_delete() {
        let group = vec![change(ChangeKind::Delete, 5, "y")];
        assert_eq!(describe_group(&group), "Deleted content: y at line 5");
    }

    #[test]
    fn single_normal_renders_not_changed() {
        // Unreachable after upstream filtering, but the verb table covers it.
        let group = vec![change(ChangeKind::Normal, 3, "z")];
        assert_eq!(describe_group(&group), "Not changed content: z at line 3");
    }

    #[test]
    fn replacement_uses_insert_content_first_and_insert_line() {
        let group = vec![
            change(ChangeKind::Insert, 5, "x"),
            change(ChangeKind::Delete, 5, "y"),
        ];
        assert_eq!(
            describe_group(&group),
            "Replace content: x with y at line 5"
        );
    }

    #[test]
    fn replacement_order_in_group_does_not_matter() {
        let group = vec![
            change(ChangeKind::Delete, 7, "old"),
            change(ChangeKind::Insert, 7, "new"),
        ];
        assert_eq!(
            describe_group(&group),
            "Replace content: new with old at line 7"
        );
    }

    #[test]
    fn empty_group_renders_empty() {
        assert_eq!(describe_group(&[]), "");
    }

    #[test]
    fn oversized_group_renders_empty() {
        let group = vec![
            change(ChangeKind::Insert, 1, "a"),
            change(ChangeKind::Delete, 1, "b"),
            change(ChangeKind::Insert, 1, "c"),
        ];
        assert_eq!(describe_group(&group), "");
    }

    #[test]
    fn pair_without_insert_and_delete_renders_empty() {
        let two_inserts = vec![
            change(ChangeKind::Insert, 1, "a"),
            change(ChangeKind::Insert, 1, "b"),
        ];
        assert_eq!(describe_group(&two_inserts), "");

        let two_deletes = vec![
            change(ChangeKind::Delete, 1, "a"),
            change(ChangeKind::Delete, 1, "b"),
        ];
        assert_eq!(describe_group(&two_deletes), "");
    }
}
