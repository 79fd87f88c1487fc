use std::path::Path;

use url::Url;

/// Make free text usable as a single path segment: every `/` becomes `-`.
pub fn sanitize(name: &str) -> String {
    name.replace('/', "-")
}

/// File name at the end of a URL path, query and fragment ignored. Empty when
/// the path ends in `/`. Strings that are not absolute URLs are treated as
/// filesystem paths.
pub fn basename(location: &str) -> String {
    match Url::parse(location) {
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.last())
            .unwrap_or_default()
            .to_string(),
        Err(_) => Path::new(location)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

/// Same location with its extension swapped for `.svg`.
/// `https://x/a/b.png` -> `https://x/a/b.svg`, `a/b` -> `a/b.svg`.
pub fn svg_variant(location: &str) -> String {
    match Url::parse(location) {
        Ok(mut url) => {
            let path = Path::new(url.path()).with_extension("svg");
            url.set_path(&path.to_string_lossy());
            url.to_string()
        }
        Err(_) => Path::new(location)
            .with_extension("svg")
            .to_string_lossy()
            .into_owned(),
    }
}

// ── Tests ──
