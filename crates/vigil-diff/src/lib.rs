//! Diff parsing, change grouping, and change description.
//!
//! Parses unified diffs into per-line change records, groups insert/delete
//! changes by line number per file, and renders each group as a sentence
//! suitable for a model prompt.

pub mod group;
pub mod parser;
pub mod render;
