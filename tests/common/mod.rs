//! Common test utilities for plugin-index integration tests

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// A scratch project with a registry directory, plugin sources and a private
/// temp directory the binary allocates its workspaces in
pub struct TestWorkspace {
    #[allow(dead_code)]
    pub temp: TempDir,
    /// Path to workspace root
    pub path: PathBuf,
}

impl TestWorkspace {
    /// Create a new test workspace
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        std::fs::create_dir_all(path.join("plugins")).expect("Failed to create registry");
        std::fs::create_dir_all(path.join("tmp")).expect("Failed to create tmp");
        Self { temp, path }
    }

    /// Write a file in workspace
    pub fn write_file(&self, path: &str, content: &str) {
        let file_path = self.path.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
    }

    /// Read a file from workspace
    pub fn read_file(&self, path: &str) -> String {
        std::fs::read_to_string(self.path.join(path)).expect("Failed to read file")
    }

    /// Check if a file exists in workspace
    pub fn file_exists(&self, path: &str) -> bool {
        self.path.join(path).exists()
    }

    /// Add a registry pointer file under `plugins/`
    pub fn add_entry(&self, file: &str, name: &str, repository: &str) {
        self.write_file(
            &format!("plugins/{file}"),
            &format!("name: {name}\nrepository: {repository}\n"),
        );
    }

    /// Create a plain source directory holding `plugin.yaml`
    pub fn add_source(&self, dir: &str, manifest: &str) -> PathBuf {
        self.write_file(&format!("sources/{dir}/plugin.yaml"), manifest);
        self.path.join("sources").join(dir)
    }

    /// Create a source directory committed as a git repository, returning its
    /// `file://` URL
    #[allow(dead_code)]
    pub fn add_git_source(&self, dir: &str, manifest: &str) -> String {
        let path = self.add_source(dir, manifest);
        let repo = git2::Repository::init(&path).expect("Failed to init repository");
        let mut index = repo.index().expect("Failed to open index");
        index
            .add_path(Path::new("plugin.yaml"))
            .expect("Failed to stage manifest");
        index.write().expect("Failed to write index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = repo.find_tree(tree_id).expect("Failed to find tree");
        let sig = git2::Signature::now("Test", "test@example.com").expect("Failed to sign");
        repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
            .expect("Failed to commit");
        format!("file://{}", path.display())
    }

    /// Number of workspaces the binary left behind in its temp directory
    pub fn leftover_workspaces(&self) -> usize {
        std::fs::read_dir(self.path.join("tmp"))
            .expect("Failed to read tmp")
            .count()
    }

    /// Command for the real binary, run from the workspace root with its own
    /// temp directory and no inherited configuration
    pub fn std_cmd(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(env!("CARGO_BIN_EXE_plugin-index"));
        cmd.current_dir(&self.path)
            .env("TMPDIR", self.path.join("tmp"))
            .env_remove("PLUGIN_INDEX_REGISTRY")
            .env_remove("PLUGIN_INDEX_WORKING_DIR")
            .env_remove("PLUGIN_INDEX_TIMEOUT")
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn cmd(&self) -> Command {
        Command::from_std(self.std_cmd())
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Manifest with every required field present
pub fn manifest(name: &str, output: bool) -> String {
    format!(
        "name: {name}\n\
         repository: https://example.com/{name}.git\n\
         maintainer: alice\n\
         summary: The {name} plugin\n\
         output: {output}\n"
    )
}
