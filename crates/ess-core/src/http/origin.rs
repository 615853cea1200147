//! Endpoint resolution against the backend origin

use crate::error::{EssError, EssResult};
use url::Url;

/// Resolve `endpoint` against `base`.
///
/// Relative endpoints are appended to the base path, so a base of
/// `https://hr.example.com/ess` and `/api/goals` give
/// `https://hr.example.com/ess/api/goals`. Absolute URLs are accepted only
/// when they share the base origin.
pub fn resolve_endpoint(base: &Url, endpoint: &str) -> EssResult<Url> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(EssError::invalid_input_field(
            "Endpoint must not be empty",
            "endpoint",
        ));
    }

    let resolved = match Url::parse(endpoint) {
        Ok(absolute) => absolute,
        Err(url::ParseError::RelativeUrlWithoutBase) => join_relative(base, endpoint),
        Err(e) => return Err(e.into()),
    };

    if resolved.origin() != base.origin() {
        return Err(EssError::ForeignOrigin {
            url: display_origin(&resolved),
        });
    }
    Ok(resolved)
}

fn join_relative(base: &Url, endpoint: &str) -> Url {
    let (path, query) = match endpoint.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (endpoint, None),
    };

    let mut url = base.clone();
    url.set_path(&format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    ));
    url.set_query(query);
    url.set_fragment(None);
    url
}

fn display_origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}
