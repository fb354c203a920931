//! Registry walker tests
//!
//! Plugin sources are local directories and local git repositories, so no
//! test needs network access.

use std::fs;

use tempfile::TempDir;

use super::*;

struct Fixture {
    temp: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("plugins")).unwrap();
        fs::create_dir_all(temp.path().join("workspaces")).unwrap();
        Self { temp }
    }

    fn root(&self) -> &Path {
        self.temp.path()
    }

    fn registry(&self) -> PathBuf {
        self.root().join("plugins")
    }

    fn workspaces(&self) -> PathBuf {
        self.root().join("workspaces")
    }

    fn add_entry(&self, file: &str, name: &str, repository: &str) {
        let path = self.registry().join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, format!("name: {name}\nrepository: {repository}\n")).unwrap();
    }

    /// Create a plugin source directory with the given manifest body
    fn add_source(&self, dir: &str, manifest: &str) -> PathBuf {
        let path = self.root().join("sources").join(dir);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("plugin.yaml"), manifest).unwrap();
        path
    }

    fn add_git_source(&self, dir: &str, manifest: &str) -> String {
        let path = self.add_source(dir, manifest);
        let repo = git2::Repository::init(&path).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("plugin.yaml")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
            .unwrap();
        format!("file://{}", path.display())
    }

    fn build(&self) -> Result<Vec<CatalogEntry>> {
        let fetcher = Fetcher::with_default_protocols();
        let validator = ManifestValidator::new();
        Walker::new(&fetcher, &validator, self.root())
            .with_workspace_base(self.workspaces())
            .build_catalog(&self.registry())
    }

    fn leftover_workspaces(&self) -> usize {
        fs::read_dir(self.workspaces()).unwrap().count()
    }
}

fn manifest(name: &str, output: bool) -> String {
    format!(
        "name: {name}\n\
         repository: https://example.com/{name}.git\n\
         maintainer: alice\n\
         summary: The {name} plugin\n\
         output: {output}\n"
    )
}

#[test]
fn test_git_entry_projects_manifest() {
    let fixture = Fixture::new();
    let url = fixture.add_git_source("foo.git", &manifest("foo", true));
    fixture.add_entry("foo.yaml", "foo", &url);

    let catalog = fixture.build().unwrap();
    assert_eq!(
        catalog,
        vec![CatalogEntry {
            name: "foo".to_string(),
            repository: "https://example.com/foo.git".to_string(),
            maintainer: "alice".to_string(),
            summary: "The foo plugin".to_string(),
            output: true,
        }]
    );
    assert_eq!(fixture.leftover_workspaces(), 0);
}

#[test]
fn test_entries_in_lexical_order_across_directories() {
    let fixture = Fixture::new();
    fixture.add_source("a", &manifest("a", false));
    fixture.add_source("b", &manifest("b", false));
    fixture.add_source("c", &manifest("c", true));
    fixture.add_entry("zz.yaml", "c", "./sources/c");
    fixture.add_entry("nested/b.yaml", "b", "./sources/b");
    fixture.add_entry("aa.yaml", "a", "./sources/a");

    let names: Vec<String> = fixture
        .build()
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(fixture.leftover_workspaces(), 0);
}

#[test]
fn test_duplicate_plugins_are_kept() {
    let fixture = Fixture::new();
    fixture.add_source("foo", &manifest("foo", false));
    fixture.add_entry("one.yaml", "foo", "./sources/foo");
    fixture.add_entry("two.yaml", "foo", "./sources/foo");

    assert_eq!(fixture.build().unwrap().len(), 2);
}

#[test]
fn test_empty_registry() {
    let fixture = Fixture::new();
    assert!(fixture.build().unwrap().is_empty());
}

#[test]
fn test_missing_registry_is_walk_error() {
    let fixture = Fixture::new();
    fs::remove_dir_all(fixture.registry()).unwrap();

    let err = fixture.build().unwrap_err();
    assert!(matches!(err, IndexError::Walk { .. }));
}

#[test]
fn test_validation_failure_aborts_walk() {
    let fixture = Fixture::new();
    fixture.add_source("good", &manifest("good", false));
    fixture.add_source("bad", "name: bad\nrepository: r\nsummary: s\n");
    fixture.add_entry("a.yaml", "good", "./sources/good");
    fixture.add_entry("b.yaml", "bad", "./sources/bad");

    let err = fixture.build().unwrap_err();
    match &err {
        IndexError::Entry { entry, stage, .. } => {
            assert!(entry.ends_with("b.yaml"));
            assert_eq!(*stage, Stage::Load);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(matches!(
        err.root(),
        IndexError::Validation { fields, .. } if fields == &vec!["maintainer".to_string()]
    ));
    assert_eq!(fixture.leftover_workspaces(), 0);
}

#[test]
fn test_unsupported_locator_aborts_walk() {
    let fixture = Fixture::new();
    fixture.add_entry("foo.yaml", "foo", "ftp://example.com/foo");

    let err = fixture.build().unwrap_err();
    assert!(matches!(err, IndexError::Entry { stage: Stage::Fetch, .. }));
    assert!(matches!(err.root(), IndexError::UnsupportedLocator { .. }));
    assert_eq!(fixture.leftover_workspaces(), 0);
}

#[test]
fn test_missing_source_aborts_walk() {
    let fixture = Fixture::new();
    fixture.add_entry("foo.yaml", "foo", "./sources/does-not-exist");

    let err = fixture.build().unwrap_err();
    assert!(matches!(err.root(), IndexError::Fetch { .. }));
    assert_eq!(fixture.leftover_workspaces(), 0);
}

#[test]
fn test_malformed_entry_is_decode_error() {
    let fixture = Fixture::new();
    fs::write(fixture.registry().join("broken.yaml"), "name: [oops\n").unwrap();

    let err = fixture.build().unwrap_err();
    assert!(matches!(err, IndexError::Entry { stage: Stage::Decode, .. }));
    assert!(matches!(err.root(), IndexError::Decode { .. }));
}

#[test]
fn test_entry_without_repository_is_decode_error() {
    let fixture = Fixture::new();
    fs::write(fixture.registry().join("foo.yaml"), "name: foo\nrepository: \"\"\n").unwrap();

    let err = fixture.build().unwrap_err();
    assert!(matches!(err.root(), IndexError::Decode { reason, .. } if reason.contains("must not be empty")));
}

#[test]
fn test_cancelled_walk_fails_without_leaking_workspaces() {
    let fixture = Fixture::new();
    fixture.add_source("foo", &manifest("foo", false));
    fixture.add_entry("foo.yaml", "foo", "./sources/foo");

    let fetcher = Fetcher::with_default_protocols();
    let validator = ManifestValidator::new();
    let cancel = Cancellation::new();
    cancel.cancel();

    let err = Walker::new(&fetcher, &validator, fixture.root())
        .with_workspace_base(fixture.workspaces())
        .with_cancellation(cancel)
        .build_catalog(&fixture.registry())
        .unwrap_err();
    assert!(matches!(err.root(), IndexError::Cancelled { .. }));
    assert_eq!(fixture.leftover_workspaces(), 0);
}

#[test]
fn test_entry_files_skips_directories() {
    let fixture = Fixture::new();
    fixture.add_entry("b.yaml", "b", "./b");
    fixture.add_entry("a/inner.yaml", "a", "./a");
    fs::create_dir_all(fixture.registry().join("empty-dir")).unwrap();

    let files = entry_files(&fixture.registry()).unwrap();
    let relative: Vec<PathBuf> = files
        .iter()
        .map(|f| f.strip_prefix(fixture.registry()).unwrap().to_path_buf())
        .collect();
    assert_eq!(
        relative,
        vec![PathBuf::from("a/inner.yaml"), PathBuf::from("b.yaml")]
    );
}
