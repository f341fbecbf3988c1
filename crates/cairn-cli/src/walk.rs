//! Recursively expands the source paths given on the command line into a
//! flat list of archive candidates, applying exclude patterns along the way.

use std::path::{Path, PathBuf};

use cairn_catalog::model::EntryType;
use cairn_util::PatternList;

pub struct WalkEntry {
    pub archive_name: String,
    pub fs_path: PathBuf,
    pub entry_type: EntryType,
}

/// Walks `roots` depth-first, yielding every file and directory not matched
/// by `exclude`. Archive names are root-relative with `/` separators so
/// archives are portable across platforms.
pub fn walk(roots: &[PathBuf], exclude: &PatternList) -> std::io::Result<Vec<WalkEntry>> {
    let mut out = Vec::new();
    for root in roots {
        let base_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.to_string_lossy().into_owned());
        walk_one(root, &base_name, exclude, &mut out)?;
    }
    Ok(out)
}

fn walk_one(path: &Path, archive_name: &str, exclude: &PatternList, out: &mut Vec<WalkEntry>) -> std::io::Result<()> {
    if exclude.matches(archive_name) {
        return Ok(());
    }
    let metadata = std::fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        out.push(WalkEntry {
            archive_name: archive_name.to_string(),
            fs_path: path.to_path_buf(),
            entry_type: EntryType::Directory,
        });
        let mut children: Vec<_> = std::fs::read_dir(path)?.filter_map(|e| e.ok()).collect();
        children.sort_by_key(|e| e.file_name());
        for child in children {
            let child_name = format!("{archive_name}/{}", child.file_name().to_string_lossy());
            walk_one(&child.path(), &child_name, exclude, out)?;
        }
    } else if metadata.is_file() {
        out.push(WalkEntry {
            archive_name: archive_name.to_string(),
            fs_path: path.to_path_buf(),
            entry_type: EntryType::File,
        });
    } else if metadata.file_type().is_symlink() {
        out.push(WalkEntry {
            archive_name: archive_name.to_string(),
            fs_path: path.to_path_buf(),
            entry_type: EntryType::Link,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_a_directory_tree_depth_first() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), b"b").unwrap();

        let entries = walk(&[dir.path().to_path_buf()], &PatternList::new()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.archive_name.clone()).collect();
        let root_name = dir.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(names.contains(&format!("{root_name}/a.txt")));
        assert!(names.contains(&format!("{root_name}/sub/b.txt")));
    }

    #[test]
    fn excluded_paths_are_skipped() {
        use cairn_util::{Pattern, PatternType};
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("secret.key"), b"s").unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"k").unwrap();

        let mut exclude = PatternList::new();
        exclude.push(Pattern::parse("glob:*.key", PatternType::Glob).unwrap());

        let entries = walk(&[dir.path().to_path_buf()], &exclude).unwrap();
        assert!(entries.iter().all(|e| !e.archive_name.ends_with(".key")));
        assert!(entries.iter().any(|e| e.archive_name.ends_with("keep.txt")));
    }
}
