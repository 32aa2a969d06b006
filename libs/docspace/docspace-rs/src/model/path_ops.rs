//! Path helpers for the slash-separated, space-relative paths the remote
//! store uses. The space root is the empty path.

pub const SEPARATOR: char = '/';

/// Drops leading, trailing and repeated separators.
pub fn normalize(path: &str) -> String {
    path.split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn join(base: &str, name: &str) -> String {
    qualified_path(&normalize(base), &normalize(name))
}

/// Full path of `key` inside the folder at `path`. Root-level keys get no
/// separator prefix.
pub fn qualified_path(path: &str, key: &str) -> String {
    let path = normalize(path);
    if path.is_empty() {
        normalize(key)
    } else {
        format!("{path}{SEPARATOR}{}", normalize(key))
    }
}

pub fn basename(path: &str) -> String {
    let path = normalize(path);
    match path.rsplit_once(SEPARATOR) {
        Some((_, name)) => name.to_string(),
        None => path,
    }
}

pub fn parent(path: &str) -> String {
    let path = normalize(path);
    match path.rsplit_once(SEPARATOR) {
        Some((parent, _)) => parent.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn normalize_trims_and_collapses() {
        assert_eq!(normalize("/a//b/"), "a/b");
        assert_eq!(normalize("///"), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn qualified_root_items_have_no_prefix() {
        assert_eq!(qualified_path("", "a.txt"), "a.txt");
        assert_eq!(qualified_path("/", "a.txt"), "a.txt");
        assert_eq!(qualified_path("docs/2024", "a.txt"), "docs/2024/a.txt");
    }

    #[test]
    fn basename_and_parent() {
        assert_eq!(basename("docs/2024/a.txt"), "a.txt");
        assert_eq!(parent("docs/2024/a.txt"), "docs/2024");
        assert_eq!(basename("a.txt"), "a.txt");
        assert_eq!(parent("a.txt"), "");
    }

    #[test]
    fn join_uses_one_separator() {
        assert_eq!(join("reports/", "/q1"), "reports/q1");
        assert_eq!(join("", "q1"), "q1");
    }
}
