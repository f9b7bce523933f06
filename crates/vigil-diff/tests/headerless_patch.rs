use std::path::PathBuf;

use vigil_diff::group::group_changes_by_line;
use vigil_diff::parser::parse_unified_diff;
use vigil_diff::render::describe_group;

#[test]
fn parse_patch_without_git_header() {
    let diff = "\
--- /dev/null
+++ b/examples/bad_code.rs
@@ -0,0 +1,3 @@
+fn main() {
+    println!(\"hello\");
+}
";
    let files = parse_unified_diff(diff).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].new_path, PathBuf::from("examples/bad_code.rs"));
}

#[test]
fn headerless_patch_groups_and_renders() {
    let diff = "\
--- a/src/db.rs
+++ b/src/db.rs
@@ -8,3 +8,3 @@
 fn query(input: &str) {
-    let sql = sanitize(input);
+    let sql = input.to_string();
 }
";
    let files = parse_unified_diff(diff).unwrap();
    let grouped = group_changes_by_line(&files);

    assert_eq!(grouped.len(), 1);
    assert_eq!(grouped[0].groups.len(), 1);
    assert_eq!(
        describe_group(&grouped[0].groups[0]),
        "Replace content:     let sql = input.to_string(); with     let sql = sanitize(input); at line 9"
    );
}
