//! Git operations backing the git protocol handler
//!
//! This module handles:
//! - Cloning repositories (HTTPS, SSH and file://), shallow when possible
//! - Resolving refs (branches, tags, SHAs) and checking them out
//! - Authentication via git's native credential system
//! - Translating libgit2 errors into short operator-facing reasons
//!
//! Authentication is delegated entirely to git's native system:
//! - SSH keys from ~/.ssh/ and the SSH agent
//! - Git credential helpers
//! - Environment variables (GIT_SSH_COMMAND, etc.)

mod auth;
mod checkout;
mod clone;
mod error;
mod url;

pub use checkout::checkout_ref;
pub use clone::{CloneOptions, clone};
