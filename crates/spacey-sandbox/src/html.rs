// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Script references in HTML entries and URL-to-file mapping

use regex::Regex;
use spacey_resolve::path::normalize_path;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use url::Url;

static SCRIPT_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<script\b[^>]*?\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("script pattern is valid")
});

/// `src` attributes of every `<script>` tag, in document order
pub fn script_sources(html: &str) -> Vec<String> {
    SCRIPT_SRC
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Whether a reference points at another host
pub fn is_remote(src: &str) -> bool {
    src.starts_with("//") || Url::parse(src).is_ok_and(|url| url.has_host())
}

/// Map a URL onto a file under `base_dir`
///
/// Only the pathname is used: query and fragment are dropped, percent
/// escapes are decoded and the result is joined onto `base_dir`.
pub fn url_to_path(base_dir: &Path, url: &str) -> PathBuf {
    let pathname = match Url::parse(url) {
        Ok(parsed) if parsed.has_host() => parsed.path().to_string(),
        _ => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let decoded = urlencoding::decode(&pathname)
        .map(|p| p.into_owned())
        .unwrap_or(pathname);
    normalize_path(&base_dir.join(decoded.trim_start_matches('/')))
}

/// Files of the local scripts an HTML file references
pub fn local_scripts(html_path: &Path, html: &str) -> Vec<PathBuf> {
    let dir = html_path.parent().unwrap_or(Path::new("/"));
    script_sources(html)
        .iter()
        .filter(|src| !is_remote(src))
        .map(|src| url_to_path(dir, src))
        .collect()
}
