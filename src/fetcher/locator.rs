//! Locator parsing
//!
//! A locator has the shape `[<forced>::]<source>[//<subdir>][?<query>]`:
//! - `forced` names the protocol handler to use, bypassing detection
//! - `subdir` selects a directory inside the fetched tree
//! - `query` carries handler parameters such as `ref=v1.0.0`

use std::path::{Component, Path};

use crate::error::{IndexError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub forced: Option<String>,
    /// Source handed to the protocol handler, query string included
    pub source: String,
    pub subdir: Option<String>,
}

impl Locator {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(IndexError::UnsupportedLocator {
                locator: input.to_string(),
            });
        }

        let (forced, rest) = split_forced(input);
        let (source, subdir) = split_subdir(rest);

        if let Some(subdir) = &subdir {
            validate_subdir(subdir, input)?;
        }

        Ok(Self {
            forced: forced.map(str::to_string),
            source,
            subdir,
        })
    }
}

/// Split a `name::` prefix off the locator. The name must be alphanumeric so
/// Windows drive letters and SCP-style git URLs are never mistaken for it.
fn split_forced(input: &str) -> (Option<&str>, &str) {
    match input.split_once("::") {
        Some((name, rest))
            if !name.is_empty()
                && !rest.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            (Some(name), rest)
        }
        _ => (None, input),
    }
}

/// Split a `//subdir` suffix off the source, keeping any query string on the
/// source. The `//` of a URL scheme separator is not a subdir marker.
pub fn split_subdir(input: &str) -> (String, Option<String>) {
    let (scheme, rest) = match input.find("://") {
        Some(idx) => input.split_at(idx + 3),
        None => ("", input),
    };
    let (body, query) = match rest.split_once('?') {
        Some((body, query)) => (body, Some(query)),
        None => (rest, None),
    };

    // Skip a leading slash so `file:///abs` keeps its root
    let search_from = usize::from(body.starts_with('/'));
    let Some(idx) = body[search_from..].find("//").map(|i| i + search_from) else {
        return (input.to_string(), None);
    };

    let subdir = body[idx + 2..].trim_matches('/');
    let mut source = format!("{scheme}{}", &body[..idx]);
    if let Some(query) = query {
        source.push('?');
        source.push_str(query);
    }
    let subdir = (!subdir.is_empty()).then(|| subdir.to_string());
    (source, subdir)
}

pub fn validate_subdir(subdir: &str, locator: &str) -> Result<()> {
    let escapes = Path::new(subdir)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(IndexError::Fetch {
            locator: locator.to_string(),
            reason: format!("subdirectory '{subdir}' escapes the fetched tree"),
        });
    }
    Ok(())
}

/// Split a source into its base and `key=value` query parameters
pub fn split_query(source: &str) -> (&str, Vec<(String, String)>) {
    let Some((base, query)) = source.split_once('?') else {
        return (source, Vec::new());
    };
    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect();
    (base, params)
}

/// Rebuild a query string from parameters, `None` when empty
pub fn join_query(params: &[(String, String)]) -> Option<String> {
    if params.is_empty() {
        return None;
    }
    let joined = params
        .iter()
        .map(|(k, v)| {
            if v.is_empty() {
                k.clone()
            } else {
                format!("{k}={v}")
            }
        })
        .collect::<Vec<_>>()
        .join("&");
    Some(joined)
}

/// URL scheme of a source (`https` for `https://...`), if it has one
pub fn scheme(source: &str) -> Option<&str> {
    let (scheme, _) = source.split_once("://")?;
    let valid = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}
