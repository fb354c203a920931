//! Git protocol handler

use std::path::Path;

use super::Protocol;
use super::locator::{join_query, scheme, split_query};
use crate::cancel::Cancellation;
use crate::error::{IndexError, Result};
use crate::git::{self, CloneOptions};

/// Hosts whose `host/owner/repo` shorthand is expanded to an HTTPS git URL
const SHORTHAND_HOSTS: &[&str] = &["github.com", "gitlab.com"];

#[derive(Debug, Default, Clone, Copy)]
pub struct GitProtocol;

/// Expand `github.com/owner/repo[.git][/path...]` into
/// `https://github.com/owner/repo.git`. Segments past the repository become a
/// `//path` subdirectory suffix.
fn expand_shorthand(source: &str) -> Option<String> {
    let (base, params) = split_query(source);
    let (host, path) = base.split_once('/')?;
    if !SHORTHAND_HOSTS.contains(&host) {
        return None;
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return None;
    }
    let (owner, repo, rest) = (segments[0], segments[1], &segments[2..]);

    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    let mut url = format!("https://{host}/{owner}/{repo}.git");
    if !rest.is_empty() {
        url.push_str("//");
        url.push_str(&rest.join("/"));
    }
    if let Some(query) = join_query(&params) {
        url.push('?');
        url.push_str(&query);
    }
    Some(url)
}

fn has_git_suffix(source: &str) -> bool {
    let (base, _) = split_query(source);
    base.trim_end_matches('/').ends_with(".git")
}

/// Anchor `file://relative/repo.git` at `working_dir`, as the file handler does
fn resolve_file_url(source: &str, working_dir: &Path) -> String {
    let (base, params) = split_query(source);
    let path = base.trim_start_matches("file://");
    if Path::new(path).is_absolute() {
        return source.to_string();
    }

    let mut url = format!("file://{}", working_dir.join(path).display());
    if let Some(query) = join_query(&params) {
        url.push('?');
        url.push_str(&query);
    }
    url
}

fn parse_depth(value: &str, source: &str) -> Result<i32> {
    value
        .parse::<i32>()
        .ok()
        .filter(|depth| *depth > 0)
        .ok_or_else(|| IndexError::Fetch {
            locator: source.to_string(),
            reason: format!("invalid depth '{value}'"),
        })
}

impl Protocol for GitProtocol {
    fn name(&self) -> &'static str {
        "git"
    }

    fn detect(&self, source: &str, working_dir: &Path) -> Option<String> {
        if source.starts_with("git@") {
            return Some(source.to_string());
        }

        match scheme(source) {
            Some("ssh" | "git") => Some(source.to_string()),
            Some("http" | "https") => has_git_suffix(source).then(|| source.to_string()),
            Some("file") => has_git_suffix(source).then(|| resolve_file_url(source, working_dir)),
            Some(_) => None,
            None => expand_shorthand(source),
        }
    }

    fn fetch(&self, source: &str, destination: &Path, cancel: &Cancellation) -> Result<()> {
        let (url, params) = split_query(source);

        let mut git_ref = None;
        let mut depth = None;
        for (key, value) in &params {
            match key.as_str() {
                "ref" if !value.is_empty() => git_ref = Some(value.as_str()),
                "depth" => depth = Some(parse_depth(value, source)?),
                _ => tracing::debug!(param = %key, "ignoring unknown git parameter"),
            }
        }

        // A specific ref may not be reachable from a shallow default-branch clone
        let options = CloneOptions {
            depth: depth.or(if git_ref.is_none() { Some(1) } else { None }),
        };

        let repo = git::clone(url, destination, options, cancel)?;
        if let Some(git_ref) = git_ref {
            git::checkout_ref(&repo, git_ref, url)?;
        }
        Ok(())
    }
}
