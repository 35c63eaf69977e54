use super::scanner::{DirectorySnapshot, FileRecord};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a path relates across two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    OnlyInA,
    OnlyInB,
    SameInBoth,
    DifferInBoth,
}

/// What decides "same" for a path present on both sides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Size and mtime must be exactly equal
    #[default]
    Metadata,
    /// Metadata, then BLAKE3 content hash when the metadata matches
    Checksum,
}

/// One-way action for a classified path (A = source, B = destination)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Nothing to do
    Skip,
    /// Copy source over destination
    Copy,
    /// Remove from destination
    Delete,
}

impl SyncAction {
    pub fn for_category(category: Category) -> Self {
        match category {
            Category::OnlyInA | Category::DifferInBoth => SyncAction::Copy,
            Category::OnlyInB => SyncAction::Delete,
            Category::SameInBoth => SyncAction::Skip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub path: String,
    pub category: Category,
}

/// Classify the union of both snapshots' paths, sorted by path.
///
/// Equal size and mtime count as identical even if the bytes differ.
pub fn classify(a: &DirectorySnapshot, b: &DirectorySnapshot) -> Vec<Classified> {
    let keys: BTreeSet<&str> = a.paths().chain(b.paths()).collect();

    keys.into_iter()
        .map(|path| {
            let category = match (a.get(path), b.get(path)) {
                (Some(ra), Some(rb)) => {
                    if metadata_equal(ra, rb) {
                        Category::SameInBoth
                    } else {
                        Category::DifferInBoth
                    }
                }
                (Some(_), None) => Category::OnlyInA,
                (None, Some(_)) => Category::OnlyInB,
                (None, None) => unreachable!("key came from one of the snapshots"),
            };
            Classified {
                path: path.to_string(),
                category,
            }
        })
        .collect()
}

/// Classify with the given comparison. `Checksum` hashes both sides of every
/// metadata match and downgrades mismatches to `DifferInBoth`.
pub fn classify_with(
    comparison: Comparison,
    a: &mut DirectorySnapshot,
    b: &mut DirectorySnapshot,
) -> Result<Vec<Classified>> {
    let mut classified = classify(a, b);

    if comparison == Comparison::Checksum {
        for entry in classified
            .iter_mut()
            .filter(|c| c.category == Category::SameInBoth)
        {
            let hash_a = a.content_hash(&entry.path)?.map(str::to_owned);
            let hash_b = b.content_hash(&entry.path)?.map(str::to_owned);
            if hash_a != hash_b {
                tracing::debug!("Content differs despite equal metadata: {}", entry.path);
                entry.category = Category::DifferInBoth;
            }
        }
    }

    Ok(classified)
}

fn metadata_equal(a: &FileRecord, b: &FileRecord) -> bool {
    a.size == b.size && a.modified == b.modified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::scanner::collect;
    use filetime::{set_file_mtime, FileTime};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_at(path: &Path, contents: &str, secs: i64) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
        set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
    }

    fn category_of(classified: &[Classified], path: &str) -> Category {
        classified.iter().find(|c| c.path == path).unwrap().category
    }

    #[test]
    fn test_classify_all_categories() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();

        write_at(&a.path().join("only_a.txt"), "a", 1_000);
        write_at(&b.path().join("only_b.txt"), "b", 1_000);
        write_at(&a.path().join("same.txt"), "same", 2_000);
        write_at(&b.path().join("same.txt"), "same", 2_000);
        write_at(&a.path().join("sub/differ.txt"), "one", 3_000);
        write_at(&b.path().join("sub/differ.txt"), "one", 3_001);

        let classified = classify(&collect(a.path()).unwrap(), &collect(b.path()).unwrap());

        assert_eq!(classified.len(), 4);
        assert_eq!(category_of(&classified, "only_a.txt"), Category::OnlyInA);
        assert_eq!(category_of(&classified, "only_b.txt"), Category::OnlyInB);
        assert_eq!(category_of(&classified, "same.txt"), Category::SameInBoth);
        assert_eq!(category_of(&classified, "sub/differ.txt"), Category::DifferInBoth);
    }

    #[test]
    fn test_classify_sorted_by_path() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        write_at(&a.path().join("c.txt"), "c", 1);
        write_at(&b.path().join("a.txt"), "a", 1);
        write_at(&a.path().join("b.txt"), "b", 1);

        let classified = classify(&collect(a.path()).unwrap(), &collect(b.path()).unwrap());
        let paths: Vec<_> = classified.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_equal_metadata_hides_content_difference() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        write_at(&a.path().join("f.txt"), "abcd", 5_000);
        write_at(&b.path().join("f.txt"), "wxyz", 5_000);

        let classified = classify(&collect(a.path()).unwrap(), &collect(b.path()).unwrap());
        assert_eq!(category_of(&classified, "f.txt"), Category::SameInBoth);
    }

    #[test]
    fn test_checksum_mode_detects_content_difference() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        write_at(&a.path().join("f.txt"), "abcd", 5_000);
        write_at(&b.path().join("f.txt"), "wxyz", 5_000);
        write_at(&a.path().join("g.txt"), "same", 5_000);
        write_at(&b.path().join("g.txt"), "same", 5_000);

        let mut sa = collect(a.path()).unwrap();
        let mut sb = collect(b.path()).unwrap();
        let classified = classify_with(Comparison::Checksum, &mut sa, &mut sb).unwrap();

        assert_eq!(category_of(&classified, "f.txt"), Category::DifferInBoth);
        assert_eq!(category_of(&classified, "g.txt"), Category::SameInBoth);
        assert!(sa.get("g.txt").unwrap().content_hash.is_some());
    }

    #[test]
    fn test_metadata_mode_never_hashes() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        write_at(&a.path().join("f.txt"), "same", 5_000);
        write_at(&b.path().join("f.txt"), "same", 5_000);

        let mut sa = collect(a.path()).unwrap();
        let mut sb = collect(b.path()).unwrap();
        classify_with(Comparison::Metadata, &mut sa, &mut sb).unwrap();

        assert!(sa.get("f.txt").unwrap().content_hash.is_none());
        assert!(sb.get("f.txt").unwrap().content_hash.is_none());
    }

    #[test]
    fn test_one_way_action_mapping() {
        assert_eq!(SyncAction::for_category(Category::OnlyInA), SyncAction::Copy);
        assert_eq!(SyncAction::for_category(Category::DifferInBoth), SyncAction::Copy);
        assert_eq!(SyncAction::for_category(Category::OnlyInB), SyncAction::Delete);
        assert_eq!(SyncAction::for_category(Category::SameInBoth), SyncAction::Skip);
    }
}
