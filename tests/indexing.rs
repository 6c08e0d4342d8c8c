//! Library-level tests of indexing, incremental updates and search.

use finja::index::{IndexConfig, IndexReport, SettingKey, SCHEMA_VERSION};
use finja::output::{OutputOptions, ResultPrinter};
use finja::query::{SearchRequest, SearchResults};
use finja::{FinjaError, Session};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use termcolor::NoColor;

/// A directory tree to index, removed on drop
struct Tree {
    _dir: TempDir,
    root: PathBuf,
}

impl Tree {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("tree");
        fs::create_dir_all(&root).unwrap();
        let root = root.canonicalize().unwrap();
        Self { _dir: dir, root }
    }

    /// Write a file with an explicit modification time; fingerprints only
    /// have one-second resolution.
    fn write(&self, rel: &str, content: impl AsRef<[u8]>, mtime: u64) {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(mtime))
            .unwrap();
    }

    fn remove(&self, rel: &str) {
        fs::remove_file(self.root.join(rel)).unwrap();
    }

    fn session(&self) -> Session {
        self.session_with(IndexConfig::default())
    }

    fn session_with(&self, config: IndexConfig) -> Session {
        Session::create(&self.root, config).unwrap()
    }

    fn index(&self) -> IndexReport {
        self.session().run_index(false).unwrap()
    }
}

fn search(session: &mut Session, terms: &[&str], file_mode: bool) -> SearchResults {
    let request = SearchRequest {
        terms: terms.iter().map(|t| t.to_string()).collect(),
        file_mode,
        ..SearchRequest::default()
    };
    session.search(&request).unwrap().unwrap()
}

fn lines(session: &mut Session, terms: &[&str]) -> Vec<(String, i64)> {
    match search(session, terms, false) {
        SearchResults::Lines(lines) => lines.into_iter().map(|m| (m.path, m.line)).collect(),
        SearchResults::Files(_) => panic!("expected line matches"),
    }
}

fn files(session: &mut Session, terms: &[&str]) -> Vec<String> {
    match search(session, terms, true) {
        SearchResults::Files(files) => files.into_iter().map(|m| m.path).collect(),
        SearchResults::Lines(_) => panic!("expected file matches"),
    }
}

fn render(session: &mut Session, terms: &[&str], file_mode: bool, options: OutputOptions) -> String {
    let results = search(session, terms, file_mode);
    let terms: Vec<String> = terms.iter().map(|t| t.to_string()).collect();
    let root = session.root().to_path_buf();
    let mut printer = ResultPrinter::new(
        NoColor::new(Vec::new()),
        session.store(),
        &root,
        &root,
        &terms,
        options,
    );
    printer.print(&results).unwrap();
    String::from_utf8(printer.into_inner().into_inner()).unwrap()
}

/// Postings per path, with token ids
fn snapshot(session: &Session) -> BTreeMap<String, Vec<(i64, i64)>> {
    let store = session.store();
    store
        .files()
        .unwrap()
        .into_iter()
        .map(|f| (f.path.clone(), store.postings_of(f.id).unwrap()))
        .collect()
}

#[test]
fn test_reindexing_unchanged_tree_is_idempotent() {
    let tree = Tree::new();
    tree.write("a.txt", "alpha beta\ngamma\n", 1_000_000);
    tree.write("src/b.rs", "fn delta() {}\n", 1_000_000);

    let mut session = tree.session();
    let first = session.run_index(false).unwrap();
    assert_eq!(first.stats.files_indexed, 2);
    let before = snapshot(&session);
    let watermark = session.store().setting(SettingKey::MaxId).unwrap();

    let second = session.run_index(false).unwrap();
    assert_eq!(snapshot(&session), before);
    assert_eq!(session.store().setting(SettingKey::MaxId).unwrap(), watermark);

    // Fingerprints matched, nothing was hashed or rewritten
    assert_eq!(second.stats.files_hashed, 0);
    assert_eq!(second.stats.files_unchanged, 2);
    assert_eq!(second.stats.files_indexed, 0);
    assert_eq!(second.stats.passes, 1);
}

#[test]
fn test_compound_identifier_recall() {
    let tree = Tree::new();
    tree.write("a.txt", "foo_bar-baz.qux\n", 1_000_000);
    let mut session = tree.session();
    session.run_index(false).unwrap();

    for term in ["foo", "bar", "baz", "qux", "foo_bar", "bar-baz", "foo_bar-baz.qux"] {
        assert_eq!(lines(&mut session, &[term]), vec![("a.txt".to_string(), 1)], "{term}");
    }
}

#[test]
fn test_touched_file_is_hashed_but_not_rewritten() {
    let tree = Tree::new();
    tree.write("a.txt", "alpha\n", 1_000_000);
    tree.index();

    tree.write("a.txt", "alpha\n", 2_000_000);
    let report = tree.index();
    assert_eq!(report.stats.files_hashed, 1);
    assert_eq!(report.stats.files_unchanged, 1);
    assert_eq!(report.stats.files_indexed, 0);
}

#[test]
fn test_modified_file_is_reindexed() {
    let tree = Tree::new();
    tree.write("a.txt", "alpha\n", 1_000_000);
    tree.index();

    tree.write("a.txt", "omega\n", 2_000_000);
    let mut session = tree.session();
    let report = session.run_index(false).unwrap();
    assert_eq!(report.stats.files_indexed, 1);
    assert!(lines(&mut session, &["alpha"]).is_empty());
    assert_eq!(lines(&mut session, &["omega"]), vec![("a.txt".to_string(), 1)]);
}

#[test]
fn test_duplicates_share_hash_and_are_reported() {
    let tree = Tree::new();
    tree.write("a.txt", "alpha beta\n", 1_000_000);
    tree.write("b.txt", "alpha beta\n", 1_000_000);
    let mut session = tree.session();
    let report = session.run_index(false).unwrap();
    assert_eq!(report.stats.files_duplicate, 1);

    let rows = session.store().files().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].content_hash.is_some());
    assert_eq!(rows[0].content_hash, rows[1].content_hash);

    let out = render(&mut session, &["alpha"], true, OutputOptions::default());
    assert!(out.contains("a.txt\n"));
    assert!(out.contains("\tb.txt\n"));

    let out = render(&mut session, &["alpha"], false, OutputOptions::default());
    assert_eq!(out, ".:\na.txt:    1:alpha beta\nduplicates:\n\tb.txt\n");
}

#[test]
fn test_deleted_file_is_purged() {
    let tree = Tree::new();
    tree.write("a.txt", "alpha\n", 1_000_000);
    tree.write("c.txt", "gamma\n", 1_000_000);
    tree.index();

    tree.remove("a.txt");
    let mut session = tree.session();
    let report = session.run_index(false).unwrap();
    assert_eq!(report.stats.files_removed, 1);

    let paths: Vec<String> = session.store().files().unwrap().into_iter().map(|f| f.path).collect();
    assert_eq!(paths, vec!["c.txt"]);
    assert!(lines(&mut session, &["alpha"]).is_empty());
    assert_eq!(session.store().summary().unwrap().postings, 2);
}

#[test]
fn test_deleting_indexed_member_of_cluster_promotes_duplicate() {
    let tree = Tree::new();
    tree.write("a.txt", "alpha\n", 1_000_000);
    tree.write("b.txt", "alpha\n", 1_000_000);
    tree.write("c.txt", "gamma\n", 1_000_000);
    tree.index();

    tree.remove("a.txt");
    let mut session = tree.session();
    let report = session.run_index(false).unwrap();
    assert_eq!(report.stats.passes, 2);

    assert_eq!(lines(&mut session, &["alpha"]), vec![("b.txt".to_string(), 1)]);
    assert_eq!(lines(&mut session, &["gamma"]), vec![("c.txt".to_string(), 1)]);
}

#[test]
fn test_changing_cluster_member_reevaluates_cluster() {
    let tree = Tree::new();
    tree.write("a.txt", "alpha\n", 1_000_000);
    tree.write("b.txt", "alpha\n", 1_000_000);
    tree.write("c.txt", "alpha\n", 1_000_000);
    tree.index();

    tree.write("a.txt", "omega\n", 2_000_000);
    let mut session = tree.session();
    let report = session.run_index(false).unwrap();
    assert_eq!(report.stats.passes, 2);

    assert_eq!(lines(&mut session, &["omega"]), vec![("a.txt".to_string(), 1)]);
    // One of b and c owns the old content, the other is its duplicate
    let alpha = files(&mut session, &["alpha"]);
    assert_eq!(alpha.len(), 1);
    let out = render(&mut session, &["alpha"], true, OutputOptions::default());
    assert!(out.contains("b.txt"));
    assert!(out.contains("c.txt"));
    assert!(!out.contains("a.txt"));
}

#[test]
fn test_multi_term_and_search() {
    let tree = Tree::new();
    tree.write("a.txt", "one\nalpha and beta\n", 1_000_000);
    tree.write("b.txt", "alpha\nbeta\n", 1_000_000);
    tree.write("c.txt", "gamma\n", 1_000_000);
    let mut session = tree.session();
    session.run_index(false).unwrap();

    assert_eq!(lines(&mut session, &["alpha", "beta"]), vec![("a.txt".to_string(), 2)]);
    assert_eq!(files(&mut session, &["alpha", "beta"]), vec!["a.txt", "b.txt"]);
    assert!(files(&mut session, &["alpha", "gamma"]).is_empty());
}

#[test]
fn test_path_ignore_patterns() {
    let tree = Tree::new();
    tree.write("src/a.txt", "alpha\n", 1_000_000);
    tree.write("vendor/b.txt", "alpha beta\n", 1_000_000);
    let mut session = tree.session();
    session.run_index(false).unwrap();

    let request = SearchRequest {
        terms: vec!["alpha".into()],
        path_ignores: vec!["vendor".into()],
        ..SearchRequest::default()
    };
    let results = session.search(&request).unwrap().unwrap();
    assert_eq!(results.len(), 1);
}

#[test]
fn test_context_window_at_top_of_file() {
    let tree = Tree::new();
    tree.write("a.txt", "alpha\nsecond\nthird\nfourth\nfifth\n", 1_000_000);
    let mut session = tree.session();
    session.run_index(false).unwrap();

    let options = OutputOptions {
        context: 5,
        raw: false,
    };
    let out = render(&mut session, &["alpha"], false, options);
    assert_eq!(out, ".:\na.txt:    1\n|alpha\n|second\n|third\n");
}

#[test]
fn test_binary_file_registered_without_postings() {
    let tree = Tree::new();
    let mut bytes = b"alpha".to_vec();
    bytes.extend_from_slice(&[0u8; 64]);
    tree.write("blob.dat", &bytes, 1_000_000);

    let mut session = tree.session();
    let report = session.run_index(false).unwrap();
    assert_eq!(report.stats.files_binary, 1);
    assert_eq!(session.store().files().unwrap().len(), 1);
    assert!(lines(&mut session, &["alpha"]).is_empty());
}

#[test]
fn test_latin1_file_is_decoded() {
    let tree = Tree::new();
    let text = "Le caf\u{e9} est tr\u{e8}s bon \u{e0} Paris, gar\u{e7}on. D\u{e9}j\u{e0} vu.\n";
    let latin1: Vec<u8> = text.chars().map(|c| c as u32 as u8).collect();
    tree.write("fr.txt", &latin1, 1_000_000);

    let mut session = tree.session();
    session.run_index(false).unwrap();
    assert_eq!(lines(&mut session, &["paris"]), vec![("fr.txt".to_string(), 1)]);

    let row = session.store().find_file("fr.txt").unwrap().unwrap();
    assert_ne!(row.encoding.as_deref(), Some("UTF-8"));
}

#[test]
fn test_undecodable_file_keeps_row_without_postings() {
    let tree = Tree::new();
    let mut bytes = [0xB0u8, 0xA1, 0xC7, 0xD1].repeat(50);
    bytes.extend_from_slice(&[0xB0, 0x0A]);
    tree.write("kr.txt", &bytes, 1_000_000);
    tree.write("ok.txt", "alpha\n", 1_000_000);

    let mut session = tree.session();
    let report = session.run_index(false).unwrap();
    assert_eq!(report.stats.decode_failures, 1);
    assert_eq!(report.stats.files_indexed, 1);

    let row = session.store().find_file("kr.txt").unwrap().unwrap();
    assert_eq!(row.encoding.as_deref(), Some("EUC-KR"));
    assert!(session.store().postings_of(row.id).unwrap().is_empty());
    assert_eq!(lines(&mut session, &["alpha"]), vec![("ok.txt".to_string(), 1)]);
}

#[test]
fn test_line_that_no_longer_decodes_is_marked() {
    let tree = Tree::new();
    tree.write("a.txt", "alpha\n", 1_000_000);
    let mut session = tree.session();
    session.run_index(false).unwrap();

    // Same fingerprint, so the stale postings are still served
    tree.write("a.txt", [0xC3u8, 0x28, 0xFF, 0x0A], 1_000_000);
    let out = render(&mut session, &["alpha"], false, OutputOptions::default());
    assert_eq!(out, ".:\na.txt:    1:!! Bad encoding\n");
}

#[test]
fn test_indexed_file_becoming_duplicate_loses_postings() {
    let tree = Tree::new();
    tree.write("a.txt", "alpha\n", 1_000_000);
    tree.write("c.txt", "gamma\n", 1_000_000);
    let mut session = tree.session();
    session.run_index(false).unwrap();
    assert_eq!(lines(&mut session, &["gamma"]), vec![("c.txt".to_string(), 1)]);

    tree.write("c.txt", "alpha\n", 1_000_100);
    let report = session.run_index(false).unwrap();
    assert_eq!(report.stats.files_duplicate, 1);

    let row = session.store().find_file("c.txt").unwrap().unwrap();
    assert!(session.store().postings_of(row.id).unwrap().is_empty());
    assert_eq!(session.store().duplicates_of(row.id).unwrap(), vec!["a.txt"]);
    assert!(lines(&mut session, &["gamma"]).is_empty());
    assert_eq!(lines(&mut session, &["alpha"]), vec![("a.txt".to_string(), 1)]);
}

#[test]
fn test_carriage_return_and_form_feed_end_lines() {
    let tree = Tree::new();
    tree.write("mac.txt", "alpha\rbeta\rgamma\x0cdelta\n", 1_000_000);
    let mut session = tree.session();
    session.run_index(false).unwrap();

    assert!(lines(&mut session, &["alpha", "beta"]).is_empty());
    assert_eq!(lines(&mut session, &["delta"]), vec![("mac.txt".to_string(), 4)]);
    assert_eq!(files(&mut session, &["alpha", "delta"]), vec!["mac.txt"]);

    let out = render(&mut session, &["gamma"], false, OutputOptions::default());
    assert_eq!(out, ".:\nmac.txt:    3:gamma\n");
}

#[test]
fn test_batch_limit_resumes() {
    let tree = Tree::new();
    tree.write("a.txt", "alpha\n", 1_000_000);
    tree.write("b.txt", "beta\n", 1_000_000);
    tree.write("c.txt", "gamma\n", 1_000_000);

    let config = IndexConfig {
        batch_limit: 2,
        ..IndexConfig::default()
    };

    let mut session = tree.session_with(config.clone());
    let report = session.run_index(false).unwrap();
    assert!(report.batch_limit_reached);
    assert_eq!(report.stats.files_indexed, 2);
    assert!(session.store().find_file("c.txt").unwrap().is_none());
    drop(session);

    let mut session = tree.session_with(config);
    let report = session.run_index(false).unwrap();
    assert!(!report.batch_limit_reached);
    assert_eq!(report.stats.files_indexed, 1);
    assert_eq!(lines(&mut session, &["gamma"]), vec![("c.txt".to_string(), 1)]);
}

#[test]
fn test_list_file_replaces_walk() {
    let tree = Tree::new();
    tree.write("a.txt", "alpha\n", 1_000_000);
    tree.write("b.txt", "beta\n", 1_000_000);
    tree.write("FINJA.lst", "a.txt\nmissing.txt\n", 1_000_000);

    let mut session = tree.session();
    let report = session.run_index(false).unwrap();
    assert_eq!(report.stats.files_indexed, 1);
    assert_eq!(report.stats.files_skipped, 1);
    assert!(lines(&mut session, &["beta"]).is_empty());
}

#[test]
fn test_search_with_update() {
    let tree = Tree::new();
    tree.write("a.txt", "alpha\n", 1_000_000);
    tree.index();
    tree.write("b.txt", "alpha\n", 1_000_000);
    tree.write("a.txt", "omega\n", 2_000_000);

    let mut session = tree.session();
    let request = SearchRequest {
        terms: vec!["alpha".into()],
        update: true,
        ..SearchRequest::default()
    };
    let results = session.search(&request).unwrap().unwrap();
    let SearchResults::Lines(found) = results else {
        panic!("expected line matches");
    };
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].path, "b.txt");
}

#[test]
fn test_compact_keeps_results() {
    let tree = Tree::new();
    tree.write("a.txt", "alpha\n", 1_000_000);
    tree.index();
    tree.write("a.txt", "omega\n", 2_000_000);

    let mut session = tree.session();
    session.run_index(false).unwrap();
    let report = session.compact(false).unwrap();
    assert_eq!(report.tokens_removed, 1);
    assert_eq!(lines(&mut session, &["omega"]), vec![("a.txt".to_string(), 1)]);
}

#[test]
fn test_interpunct_setting_is_persisted() {
    let tree = Tree::new();
    tree.write("a.txt", "alpha\u{b7}beta\n", 1_000_000);

    let config = IndexConfig {
        interpunct: true,
        ..IndexConfig::default()
    };
    tree.session_with(config).run_index(false).unwrap();

    // Later sessions follow the stored setting, not the flag
    let mut session = tree.session();
    assert!(session.store().interpunct().unwrap());
    assert_eq!(lines(&mut session, &["beta"]), vec![("a.txt".to_string(), 1)]);
}

#[test]
fn test_version_mismatch_is_fatal() {
    let tree = Tree::new();
    tree.index();
    tree.session()
        .store()
        .set_setting(SettingKey::Version, SCHEMA_VERSION + 1)
        .unwrap();

    let err = Session::open(&tree.root, IndexConfig::default()).err().unwrap();
    assert!(matches!(err, FinjaError::VersionMismatch { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_discover_from_subdirectory() {
    let tree = Tree::new();
    tree.write("deep/nested/a.txt", "alpha\n", 1_000_000);
    tree.index();

    let session = Session::discover(&tree.root.join("deep/nested"), IndexConfig::default()).unwrap();
    assert_eq!(session.root(), tree.root.as_path());
}

#[test]
fn test_missing_store() {
    let tree = Tree::new();
    let err = Session::open(&tree.root, IndexConfig::default()).err().unwrap();
    assert!(matches!(err, FinjaError::StoreNotFound { .. }));
    assert!(!Path::new(&tree.root).join("FINJA").exists());
}
