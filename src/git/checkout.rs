//! Checkout of a requested ref in a freshly cloned repository

use git2::{Commit, Oid, Repository};

use crate::error::{IndexError, Result};

/// Resolve a reference name (branch, tag, or SHA) to a commit
fn resolve_reference<'a>(repo: &'a Repository, refname: &str) -> Option<Commit<'a>> {
    let candidates = [
        format!("refs/remotes/origin/{refname}"),
        format!("refs/tags/{refname}"),
        format!("refs/heads/{refname}"),
        refname.to_string(),
    ];

    let by_name = candidates.iter().find_map(|candidate| {
        repo.find_reference(candidate)
            .and_then(|reference| reference.peel_to_commit())
            .ok()
    });
    if by_name.is_some() {
        return by_name;
    }

    if let Ok(commit) = Oid::from_str(refname).and_then(|oid| repo.find_commit(oid)) {
        return Some(commit);
    }

    repo.revparse_single(refname)
        .and_then(|obj| obj.peel_to_commit())
        .ok()
}

/// Check out `refname` as a detached HEAD, forcing the working tree to match
pub fn checkout_ref(repo: &Repository, refname: &str, url: &str) -> Result<()> {
    let failed = |reason: String| IndexError::Fetch {
        locator: url.to_string(),
        reason,
    };

    let commit = resolve_reference(repo, refname)
        .ok_or_else(|| failed(format!("Could not resolve ref '{refname}'")))?;

    repo.set_head_detached(commit.id()).map_err(|e| {
        failed(format!(
            "Failed to checkout '{refname}': {}",
            e.message()
        ))
    })?;

    let mut checkout_builder = git2::build::CheckoutBuilder::new();
    checkout_builder.force();
    repo.checkout_head(Some(&mut checkout_builder))
        .map_err(|e| failed(format!("Failed to checkout '{refname}': {}", e.message())))?;

    tracing::debug!(git_ref = refname, sha = %commit.id(), "checked out ref");
    Ok(())
}
