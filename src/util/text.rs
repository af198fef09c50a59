use std::path::MAIN_SEPARATOR;

/// 路徑結尾可能出現的分隔符號
const PATH_SEPARATORS: &[char] = &['/', '\\'];

/// Trims surrounding whitespace and returns an owned copy.
pub fn trim(s: &str) -> String {
    s.trim().to_string()
}

/// Normalises the trailing separators of a directory path to exactly one.
///
/// An empty input stays empty so the caller can still report it as missing.
///
/// # Example
///
/// ```
/// assert_eq!(normalize_dir("/srv/prices//"), "/srv/prices/");
/// ```
pub fn normalize_dir(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }

    let mut dir = s.trim_end_matches(PATH_SEPARATORS).to_string();
    dir.push(if s.ends_with('\\') { '\\' } else { MAIN_SEPARATOR });
    dir
}
