use crate::error::{FinjaError, Result};
use std::path::{Component, Path, PathBuf};

/// Store file; its directory is the root of the indexed tree.
pub const STORE_FILE: &str = "FINJA";

/// Optional list of paths to index instead of walking the tree.
pub const LIST_FILE: &str = "FINJA.lst";

/// True for the store file, the list file and the store's journal files.
pub fn is_state_file(name: &str) -> bool {
    name == LIST_FILE
        || name
            .strip_prefix(STORE_FILE)
            .map(|rest| rest.is_empty() || matches!(rest, "-journal" | "-wal" | "-shm"))
            .unwrap_or(false)
}

/// Find the tree root by walking up from `start` until a directory holding
/// the store file is found.
pub fn find_store_root(start: &Path) -> Result<PathBuf> {
    let start = start.canonicalize()?;
    let mut current = start.as_path();

    loop {
        if current.join(STORE_FILE).is_file() {
            return Ok(current.to_path_buf());
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }

    Err(FinjaError::StoreNotFound { start })
}

/// Express `path` relative to `base`. Both should be absolute and
/// normalized; the result uses `..` where `path` is outside `base`.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base_parts.len() {
        rel.push("..");
    }
    for part in &path_parts[common..] {
        rel.push(part.as_os_str());
    }

    if rel.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        rel
    }
}

/// Turn a line of the list file into a root-relative path. Absolute paths
/// under the root are made relative, `.` components are dropped.
pub fn list_entry_path(root: &Path, entry: &str) -> Option<PathBuf> {
    let entry = entry.trim();
    if entry.is_empty() {
        return None;
    }

    let path = Path::new(entry);
    let rel = if path.is_absolute() {
        relative_to(path, root)
    } else {
        path.to_path_buf()
    };

    let cleaned: PathBuf = rel
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    if cleaned.as_os_str().is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Key of a root-relative path in the file table: `/`-separated
pub fn store_key(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_key() {
        assert_eq!(store_key(Path::new("a/b/c.txt")), "a/b/c.txt");
        assert_eq!(store_key(Path::new("top")), "top");
    }

    #[test]
    fn test_state_files() {
        assert!(is_state_file("FINJA"));
        assert!(is_state_file("FINJA.lst"));
        assert!(is_state_file("FINJA-journal"));
        assert!(!is_state_file("FINJA.md"));
        assert!(!is_state_file("main.rs"));
    }

    #[test]
    fn test_relative_to() {
        let base = Path::new("/home/user/project");
        assert_eq!(
            relative_to(Path::new("/home/user/project/src/main.rs"), base),
            PathBuf::from("src/main.rs")
        );
        assert_eq!(
            relative_to(Path::new("/home/user/other/a.rs"), base),
            PathBuf::from("../other/a.rs")
        );
        assert_eq!(relative_to(base, base), PathBuf::from("."));
    }

    #[test]
    fn test_list_entry_path() {
        let root = Path::new("/srv/tree");
        assert_eq!(
            list_entry_path(root, "./src/lib.rs\n"),
            Some(PathBuf::from("src/lib.rs"))
        );
        assert_eq!(
            list_entry_path(root, "/srv/tree/docs/a.txt"),
            Some(PathBuf::from("docs/a.txt"))
        );
        assert_eq!(list_entry_path(root, "   "), None);
    }

    #[test]
    fn test_find_store_root_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::write(root.join(STORE_FILE), b"").unwrap();
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_store_root(&nested).unwrap(), root);
    }

    #[test]
    fn test_find_store_root_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_store_root(dir.path()).unwrap_err();
        assert!(matches!(err, FinjaError::StoreNotFound { .. }));
    }
}
