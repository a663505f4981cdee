// src/security/sanitizer.rs
//! Untrusted input sanitization
//!
//! Filenames, paths and URLs that come from users or network responses pass
//! through here before they reach the filesystem or the network layer.
//! The lookup tables are built once on first use and never mutated.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Substituted when a name is empty before or after sanitization.
pub const DEFAULT_FILENAME: &str = "unnamed_file";
/// Maximum length of a sanitized filename, in characters.
pub const MAX_FILENAME_CHARS: usize = 200;
/// Maximum accepted URL length, in characters.
pub const MAX_URL_CHARS: usize = 2048;

/// Hosts accepted by [`validate_url`]. `www.` variants are accepted too.
pub const DEFAULT_ALLOWED_DOMAINS: [&str; 5] =
    ["youtube.com", "youtu.be", "twitch.tv", "tiktok.com", "vm.tiktok.com"];

const RESERVED_DEVICE_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Control characters 0x00-0x1F plus the characters Windows rejects in names.
static FORBIDDEN_CHARS: Lazy<HashSet<char>> = Lazy::new(|| {
    let mut set: HashSet<char> = (0u8..=0x1F).map(char::from).collect();
    set.extend(['<', '>', ':', '"', '|', '?', '*', '/', '\\']);
    set
});

static RESERVED_STEMS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| RESERVED_DEVICE_NAMES.iter().copied().collect());

static URL_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)^https?://[^\s<>"]+$"#).unwrap());

// scheme, optional userinfo, then the host up to port/path/query/fragment
static URL_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://(?:[^/?#@]*@)?([^/?#:]+)").unwrap());

fn is_control(c: char) -> bool {
    (c as u32) < 0x20
}

fn is_reserved(name: &str) -> bool {
    let upper = name.to_uppercase();
    if RESERVED_STEMS.contains(upper.as_str()) {
        return true;
    }
    match upper.split_once('.') {
        Some((stem, _)) => RESERVED_STEMS.contains(stem),
        None => false,
    }
}

fn trim_name(name: &str) -> &str {
    name.trim().trim_end_matches(|c: char| c == '.' || c.is_whitespace())
}

fn cap_length(name: &str) -> String {
    let capped: String = name.chars().take(MAX_FILENAME_CHARS).collect();
    trim_name(&capped).to_string()
}

/// Produce a filename that is safe to create on any mainstream filesystem.
///
/// Forbidden characters become `_`; surrounding whitespace and trailing dots
/// are removed in any interleaving; the result is capped at
/// [`MAX_FILENAME_CHARS`] characters. Windows device names (`CON`,
/// `com1.txt`, ...) are checked on the trimmed name and get a leading `_`.
pub fn sanitize_filename(name: &str) -> String {
    if name.is_empty() {
        return DEFAULT_FILENAME.to_string();
    }

    let replaced: String = name
        .chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let mut result = cap_length(trim_name(&replaced));
    if result.is_empty() {
        return DEFAULT_FILENAME.to_string();
    }

    if is_reserved(&result) {
        result.insert(0, '_');
        // the leading `_` keeps the stem unreserved through a second cut
        result = cap_length(&result);
    }
    result
}

/// Textual scrub of a path: control characters removed, separators unified
/// to the platform separator, every `../` and `..\` sequence deleted.
///
/// This does not canonicalize against the filesystem or resolve symlinks.
/// Callers that need containment must still check the resolved path is
/// inside their root.
pub fn sanitize_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    let sep = std::path::MAIN_SEPARATOR;
    let mut out: String = path
        .chars()
        .filter(|c| !is_control(*c))
        .map(|c| if c == '/' || c == '\\' { sep } else { c })
        .collect();

    // removal can splice a new sequence together ("....//"), so repeat until stable
    let traversal = format!("..{}", sep);
    while out.contains(&traversal) {
        out = out.replace(&traversal, "");
    }

    let trailing = format!("{}..", sep);
    if out == ".." {
        out.clear();
    } else if out.ends_with(&trailing) {
        out.truncate(out.len() - 2);
    }
    out
}

/// Validate a URL against [`DEFAULT_ALLOWED_DOMAINS`].
pub fn validate_url(url: &str) -> bool {
    validate_url_with(url, &DEFAULT_ALLOWED_DOMAINS)
}

/// Accept only `http(s)` URLs without whitespace, quotes or angle brackets
/// whose host is one of `allowed_domains` (or its `www.` subdomain).
pub fn validate_url_with<S: AsRef<str>>(url: &str, allowed_domains: &[S]) -> bool {
    if url.is_empty() || url.chars().count() > MAX_URL_CHARS {
        return false;
    }
    if !URL_SHAPE.is_match(url) {
        return false;
    }

    let Some(host) = URL_HOST.captures(url).and_then(|c| c.get(1)) else {
        return false;
    };
    let host = host.as_str().to_ascii_lowercase();
    let bare = host.strip_prefix("www.").unwrap_or(&host);

    allowed_domains.iter().any(|d| {
        let d = d.as_ref().trim();
        host.eq_ignore_ascii_case(d) || bare.eq_ignore_ascii_case(d)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_gets_default() {
        assert_eq!(sanitize_filename(""), DEFAULT_FILENAME);
    }

    #[test]
    fn test_forbidden_chars_replaced_one_for_one() {
        assert_eq!(sanitize_filename("a<b>c:d\"e|f?g*h/i\\j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_filename("tab\there\x1f"), "tab_here_");
    }

    #[test]
    fn test_reserved_names_prefixed() {
        assert_eq!(sanitize_filename("CON"), "_CON");
        assert_eq!(sanitize_filename("con.txt"), "_con.txt");
        assert_eq!(sanitize_filename("Lpt9.log"), "_Lpt9.log");
        assert_eq!(sanitize_filename("CONSOLE.txt"), "CONSOLE.txt");
        assert_eq!(sanitize_filename("COM10"), "COM10");
    }

    #[test]
    fn test_trailing_dots_and_whitespace() {
        assert_eq!(sanitize_filename("  report.pdf...  "), "report.pdf");
        assert_eq!(sanitize_filename("..."), DEFAULT_FILENAME);
        assert_eq!(sanitize_filename("   "), DEFAULT_FILENAME);
    }

    #[test]
    fn test_reserved_check_after_trim() {
        assert_eq!(sanitize_filename("CON "), "_CON");
        assert_eq!(sanitize_filename(" con.txt"), "_con.txt");
        assert_eq!(sanitize_filename("LPT1 ."), "_LPT1");
        assert_eq!(sanitize_filename("nul..."), "_nul");
    }

    #[test]
    fn test_cut_never_ends_in_dot() {
        let name = format!("{}.{}", "a".repeat(MAX_FILENAME_CHARS - 1), "bbbbb");
        let out = sanitize_filename(&name);
        assert_eq!(out, "a".repeat(MAX_FILENAME_CHARS - 1));
        assert!(!out.ends_with('.'));
    }

    #[test]
    fn test_reserved_prefix_respects_cap() {
        let name = format!("com1.{}", "x".repeat(MAX_FILENAME_CHARS));
        let out = sanitize_filename(&name);
        assert!(out.starts_with("_com1."));
        assert_eq!(out.chars().count(), MAX_FILENAME_CHARS);
    }

    #[test]
    fn test_length_capped() {
        let long = "a".repeat(300);
        assert_eq!(sanitize_filename(&long).chars().count(), MAX_FILENAME_CHARS);
        let wide = "é".repeat(300);
        assert_eq!(sanitize_filename(&wide).chars().count(), MAX_FILENAME_CHARS);
    }

    #[test]
    fn test_result_is_a_copy() {
        let input = String::from("clip.mp4");
        let out = sanitize_filename(&input);
        assert_eq!(out, input);
        assert_ne!(out.as_ptr(), input.as_ptr());
    }

    #[test]
    fn test_path_traversal_removed() {
        let sep = std::path::MAIN_SEPARATOR;
        assert_eq!(sanitize_path("..\\..\\etc\\passwd"), format!("etc{}passwd", sep));
        assert_eq!(sanitize_path("a/../b"), format!("a{}b", sep));
    }

    #[test]
    fn test_path_spliced_traversal_removed() {
        let out = sanitize_path("....//....\\\\secret");
        assert!(!out.contains(&format!("..{}", std::path::MAIN_SEPARATOR)));
    }

    #[test]
    fn test_path_control_chars_removed_before_traversal_scan() {
        let out = sanitize_path(".\x01./x");
        assert_eq!(out, "x");
    }

    #[test]
    fn test_path_trailing_parent() {
        let sep = std::path::MAIN_SEPARATOR;
        assert_eq!(sanitize_path("dir/.."), format!("dir{}", sep));
        assert_eq!(sanitize_path(".."), "");
        assert_eq!(sanitize_path(""), "");
    }

    #[test]
    fn test_url_allow_list() {
        assert!(validate_url("https://www.youtube.com/watch?v=abc"));
        assert!(validate_url("http://youtu.be/abc"));
        assert!(validate_url("HTTPS://WWW.TWITCH.TV/someone"));
        assert!(validate_url("https://vm.tiktok.com/ZM123/"));
        assert!(validate_url("https://youtube.com:443/watch?v=abc"));
    }

    #[test]
    fn test_url_rejections() {
        assert!(!validate_url(""));
        assert!(!validate_url("ftp://youtube.com"));
        assert!(!validate_url("https://evil.com"));
        assert!(!validate_url("https://youtube.com.evil.com/watch"));
        assert!(!validate_url("https://youtube.com@evil.com/"));
        assert!(!validate_url("https://evil.com/?next=https://youtube.com"));
        assert!(!validate_url("https://www.youtube.com/watch?v=a b"));
        assert!(!validate_url("https://www.youtube.com/\"onload"));
        assert!(!validate_url("https://m.youtube.com/watch?v=abc"));
    }

    #[test]
    fn test_url_too_long() {
        let url = format!("https://youtube.com/{}", "a".repeat(MAX_URL_CHARS));
        assert!(!validate_url(&url));
        assert!(!validate_url(&"x".repeat(3000)));
    }

    #[test]
    fn test_url_custom_domains() {
        assert!(validate_url_with("https://cdn.example.org/x", &["cdn.example.org"]));
        assert!(!validate_url_with("https://youtube.com/x", &["cdn.example.org"]));
    }
}
