//! Translation of libgit2 errors into short reasons for the operator

use git2::{Error, ErrorClass};

/// Interpret a git2 error as a user-friendly reason.
///
/// Patterns are checked in order; more specific ones come first.
pub fn interpret_git_error(err: &Error) -> String {
    let message = err.message().to_lowercase();
    let class = err.class();

    let matches_any = |needles: &[&str]| needles.iter().any(|n| message.contains(n));

    if matches_any(&[
        "not found",
        "404",
        "too many redirects",
        "authentication replays",
    ]) {
        "Repository not found".to_string()
    } else if matches_any(&["authentication", "credentials"]) {
        "Authentication failed".to_string()
    } else if matches_any(&["permission denied", "access denied"]) {
        "Permission denied".to_string()
    } else if matches_any(&["connection", "network", "timeout", "timed out"]) {
        "Network error".to_string()
    } else {
        match class {
            ErrorClass::Http if message.contains("certificate") => "Certificate error".to_string(),
            ErrorClass::Http if message.contains("ssl") => "SSL error".to_string(),
            ErrorClass::Http => format!("HTTP error: {}", err.message()),
            ErrorClass::Ssh => format!("SSH error: {}", err.message()),
            _ => err.message().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use git2::ErrorCode;

    use super::*;

    fn git_error(class: ErrorClass, message: &str) -> Error {
        Error::new(ErrorCode::GenericError, class, message)
    }

    #[test]
    fn test_not_found() {
        let err = git_error(ErrorClass::Http, "unexpected http status code: 404");
        assert_eq!(interpret_git_error(&err), "Repository not found");
    }

    #[test]
    fn test_authentication() {
        let err = git_error(ErrorClass::Ssh, "Failed to authenticate: bad credentials");
        assert_eq!(interpret_git_error(&err), "Authentication failed");
    }

    #[test]
    fn test_network() {
        let err = git_error(ErrorClass::Net, "failed to resolve address: connection refused");
        assert_eq!(interpret_git_error(&err), "Network error");
    }

    #[test]
    fn test_http_certificate() {
        let err = git_error(ErrorClass::Http, "the SSL certificate is invalid");
        assert_eq!(interpret_git_error(&err), "Certificate error");
    }

    #[test]
    fn test_ssh_fallback_keeps_message() {
        let err = git_error(ErrorClass::Ssh, "handshake failed");
        assert_eq!(interpret_git_error(&err), "SSH error: handshake failed");
    }

    #[test]
    fn test_other_class_uses_message() {
        let err = git_error(ErrorClass::Odb, "object missing");
        assert_eq!(interpret_git_error(&err), "object missing");
    }
}
