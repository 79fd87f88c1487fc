//! Best-effort scanner for data embedded in inline `<script>` payloads.
//!
//! This is a line-oriented token matcher, not a JavaScript or JSON parser.
//! It assumes the payload is pretty-printed with one `"key": value` pair per
//! line. Minified or otherwise reshaped payloads degrade to an empty or
//! partial result and never to an error.

const SLIDER_MARKERS: [&str; 4] = ["imageFolder", "imagePath", "imageName", "imageSequence"];
const SECTION_MARKER: &str = "\"xads_5sectionid\"";

const IMAGE_PATH_KEY: &str = "imagePath:";
const IMAGE_NAME_KEY: &str = "imageName:";

/// First script carrying the slider image descriptors.
pub fn find_slider_payload<S: AsRef<str>>(scripts: &[S]) -> Option<&str> {
    scripts
        .iter()
        .map(AsRef::as_ref)
        .find(|text| SLIDER_MARKERS.iter().all(|m| text.contains(m)))
}

/// First script carrying the section usage list.
pub fn find_section_payload<S: AsRef<str>>(scripts: &[S]) -> Option<&str> {
    scripts
        .iter()
        .map(AsRef::as_ref)
        .find(|text| text.contains(SECTION_MARKER))
}

/// Pair every `imagePath` line with the `imageName` line at the same position
/// and join them into image URLs. Extra paths or names are dropped.
pub fn extract_slider_images(payload: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut names = Vec::new();

    for line in payload.lines().filter(|l| !l.is_empty()) {
        // skip array/object openers and assignments
        if !line.contains(':') || line.contains('[') || line.contains('=') {
            continue;
        }
        let token: String = line
            .chars()
            .filter(|c| !matches!(c, '"' | ',' | '\t' | ' '))
            .collect();
        if let Some(path) = token.split(IMAGE_PATH_KEY).nth(1) {
            paths.push(path.to_string());
        }
        if let Some(name) = token.split(IMAGE_NAME_KEY).nth(1) {
            names.push(name.to_string());
        }
    }

    paths
        .iter()
        .zip(names.iter())
        .map(|(path, name)| join_path(path, name))
        .collect()
}

/// Section ids in payload order, duplicates kept.
pub fn extract_section_ids(payload: &str) -> Vec<String> {
    payload
        .lines()
        .map(|line| line.replace(['\t', ' '], ""))
        .filter(|token| token.contains(SECTION_MARKER))
        .filter_map(|token| {
            let value = token.split(':').nth(1)?;
            Some(value.trim_end_matches(',').replace('"', ""))
        })
        .collect()
}

fn join_path(base: &str, name: &str) -> String {
    if name.starts_with('/') || base.is_empty() {
        name.to_string()
    } else if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

// ── Tests ──
