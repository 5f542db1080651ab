//! Mapping of request URLs onto paths under the output directory.
//!
//! The passes run in a fixed order: allow-list replacement, dash collapse,
//! slash collapse, `..` replacement, trailing slash trim. Reordering them
//! changes the output for corner cases: `-..-` ends up as `---` because the
//! dashes written by the `..` pass are never collapsed again.

use std::borrow::Cow;
use std::path::PathBuf;

use percent_encoding::{percent_decode_str, percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::{Host, Url};

use crate::Result;

/// Path used when the request targets the site root.
pub const INDEX_PATH: &str = "/index";

/// Bytes escaped when a path has to be re-encoded: everything except
/// unreserved characters and the sub-delimiters legal in a path.
const PATH_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b'/')
    .remove(b':')
    .remove(b';')
    .remove(b'=')
    .remove(b'@');

/// Builds the on-disk location for `request_url` below `output_dir`.
///
/// The result is `<output_dir>/<hostname><escaped path>` with every character
/// outside `[A-Za-z0-9_.%/-]` replaced by `-`. Query strings and fragments are
/// not part of the path.
pub fn make_filepath(output_dir: &str, request_url: &str) -> Result<PathBuf> {
    let url = Url::parse(request_url)?;

    let mut request_path = if url.cannot_be_a_base() {
        Cow::Borrowed("")
    } else {
        escaped_path(url.path())
    };
    if request_path == "/" {
        request_path = Cow::Borrowed(INDEX_PATH);
    }

    let raw = format!("{}/{}{}", output_dir, hostname(&url), request_path);
    Ok(PathBuf::from(sanitize_path(&raw)))
}

/// The parser leaves some characters raw (`|`, `^`) that are not valid in an
/// escaped path. A path containing any of them is decoded and re-escaped as a
/// whole; every other path is kept as the parser wrote it.
fn escaped_path(path: &str) -> Cow<'_, str> {
    if path.bytes().all(is_valid_escaped) {
        return Cow::Borrowed(path);
    }
    let decoded: Vec<u8> = percent_decode_str(path).collect();
    Cow::Owned(percent_encode(&decoded, PATH_ESCAPE).to_string())
}

fn is_valid_escaped(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'_' | b'.' | b'~' | b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+'
                | b',' | b';' | b'=' | b':' | b'@' | b'[' | b']' | b'%' | b'/'
        )
}

/// Hostname without port, and without brackets for IPv6 literals.
fn hostname(url: &Url) -> String {
    match url.host() {
        Some(Host::Ipv6(addr)) => addr.to_string(),
        Some(host) => host.to_string(),
        None => String::new(),
    }
}

/// Runs the ordered sanitization passes over an already composed path.
pub fn sanitize_path(raw: &str) -> String {
    let allowed: String = raw
        .chars()
        .map(|c| if is_allowed(c) { c } else { '-' })
        .collect();

    let dashes = collapse_runs(&allowed, '-');
    let slashes = collapse_runs(&dashes, '/');
    let no_parent = slashes.replace("..", "-");

    match no_parent.strip_suffix('/') {
        Some(trimmed) => trimmed.to_string(),
        None => no_parent,
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '%' | '/' | '-')
}

fn collapse_runs(input: &str, target: char) -> String {
    let mut out = String::with_capacity(input.len());
    let mut previous = None;
    for c in input.chars() {
        if c == target && previous == Some(target) {
            continue;
        }
        out.push(c);
        previous = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_str(output: &str, url: &str) -> String {
        make_filepath(output, url)
            .expect("valid url")
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn root_path_becomes_index() {
        assert_eq!(
            path_str("out", "https://example.com/"),
            "out/example.com/index"
        );
        assert_eq!(path_str("out", "https://example.com"), "out/example.com/index");
    }

    #[test]
    fn space_is_percent_escaped_by_the_parser() {
        // '%' is in the allow-list, so the parser's escape survives untouched.
        assert_eq!(
            path_str("out", "https://example.com/foo bar.html"),
            "out/example.com/foo%20bar.html"
        );
    }

    #[test]
    fn pipe_and_caret_are_percent_escaped() {
        assert_eq!(
            path_str("out", "https://example.com/a|b^c.js"),
            "out/example.com/a%7Cb%5Ec.js"
        );
    }

    #[test]
    fn path_needing_escape_is_reescaped_as_a_whole() {
        assert_eq!(
            path_str("out", "https://example.com/a|(b)"),
            "out/example.com/a%7C%28b%29"
        );
        assert_eq!(escaped_path("/a(b)"), "/a(b)");
    }

    #[test]
    fn disallowed_characters_become_single_dashes() {
        assert_eq!(
            path_str("out", "https://example.com/a~b!!c/d;e=f"),
            "out/example.com/a-b-c/d-e-f"
        );
    }

    #[test]
    fn query_and_fragment_are_ignored() {
        assert_eq!(
            path_str("out", "https://example.com/app.js?v=1#top"),
            "out/example.com/app.js"
        );
    }

    #[test]
    fn port_is_not_part_of_hostname() {
        assert_eq!(
            path_str("out", "http://example.com:8080/x/y.css"),
            "out/example.com/x/y.css"
        );
    }

    #[test]
    fn ipv6_host_loses_brackets_and_colons() {
        assert_eq!(path_str("out", "http://[::1]/a"), "out/-1/a");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(
            path_str("out", "https://example.com/dir/"),
            "out/example.com/dir"
        );
    }

    #[test]
    fn repeated_slashes_collapse() {
        assert_eq!(
            path_str("out", "https://example.com//a///b"),
            "out/example.com/a/b"
        );
        assert_eq!(path_str("out/", "https://example.com/a"), "out/example.com/a");
    }

    #[test]
    fn double_dots_are_replaced_after_collapsing() {
        assert_eq!(sanitize_path("out/a/../b"), "out/a/-/b");
        assert_eq!(sanitize_path("out/a/.~~./b"), "out/a/.-./b");
        assert_eq!(sanitize_path("out/a/..../b"), "out/a/--/b");
        assert_eq!(sanitize_path("out/a-..-b"), "out/a---b");
    }

    #[test]
    fn non_ascii_characters_are_replaced() {
        assert_eq!(sanitize_path("out/ex/caf\u{e9}"), "out/ex/caf-");
    }

    #[test]
    fn opaque_urls_have_no_path() {
        assert_eq!(path_str("out", "data:text/plain,hello"), "out");
    }

    #[test]
    fn invalid_url_is_an_error() {
        assert!(make_filepath("out", "not a url").is_err());
    }

    #[test]
    fn sanitized_paths_stay_inside_the_allow_list() {
        let urls = [
            "https://example.com/../../etc/passwd",
            "https://example.com/%2e%2e/%2e%2e/secret",
            "https://example.com/a//..//b/",
            "https://ex-ample.com/\u{1F600}/emoji",
            "https://example.com/a b/c\td",
            "https://example.com/....//....",
            "http://user:pw@example.com:81/x?y=z",
        ];

        for url in urls {
            let path = path_str("out", url);
            assert!(!path.contains(".."), "{url} -> {path}");
            assert!(!path.contains("//"), "{url} -> {path}");
            assert!(
                path.chars().all(is_allowed),
                "{url} -> {path} has disallowed characters"
            );
        }
    }
}
