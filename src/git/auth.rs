//! Git authentication callbacks
//!
//! Credentials come from git's native sources, tried in this order:
//! - the SSH agent, then SSH keys in ~/.ssh/
//! - git credential helpers configured in the user's git config
//! - empty/anonymous user-pass for public HTTPS remotes
//!
//! libgit2 calls the credentials callback again after each rejected attempt,
//! so the callback gives up after [`MAX_ATTEMPTS`] instead of looping.

use git2::{Cred, CredentialType, Error, ErrorClass, ErrorCode, RemoteCallbacks};

const MAX_ATTEMPTS: usize = 4;

fn auth_failed(message: &str) -> Error {
    Error::new(ErrorCode::Auth, ErrorClass::Http, message)
}

fn ssh_key_credentials(username: &str) -> Result<Cred, Error> {
    let ssh_dir = dirs::home_dir().unwrap_or_default().join(".ssh");

    ["id_ed25519", "id_rsa", "id_ecdsa"]
        .iter()
        .map(|key| (ssh_dir.join(key), ssh_dir.join(format!("{key}.pub"))))
        .filter(|(private_key, _)| private_key.exists())
        .find_map(|(private_key, public_key)| {
            let public_key = public_key.exists().then_some(public_key.as_path());
            Cred::ssh_key(username, public_key, &private_key, None).ok()
        })
        .ok_or_else(|| auth_failed("SSH key not found"))
}

fn helper_credentials(url: &str, username: Option<&str>) -> Result<Cred, Error> {
    let config = git2::Config::open_default().or_else(|_| git2::Config::new())?;

    Cred::credential_helper(&config, url, username)
        .or_else(|_| Cred::userpass_plaintext(username.unwrap_or(""), ""))
        .map_err(|_| auth_failed("authentication failed"))
}

/// Install the credentials callback on `callbacks`
pub fn setup_auth_callbacks(callbacks: &mut RemoteCallbacks<'_>) {
    let mut attempts = 0;
    callbacks.credentials(move |url, username_from_url, allowed_types| {
        attempts += 1;
        if attempts > MAX_ATTEMPTS {
            return Err(auth_failed("authentication failed"));
        }
        tracing::debug!(url, attempt = attempts, "git requested credentials");

        if allowed_types.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }

        if allowed_types.contains(CredentialType::SSH_KEY) {
            let username = username_from_url.unwrap_or("git");
            return Cred::ssh_key_from_agent(username).or_else(|_| ssh_key_credentials(username));
        }

        if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
            return helper_credentials(url, username_from_url);
        }

        Err(auth_failed("no supported credential type"))
    });
}
