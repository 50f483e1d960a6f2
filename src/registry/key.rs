//! Helpers over `/`-delimited registry paths

const PATH_SEPARATOR: char = '/';

/// Joins a parent path and a child name
pub fn child_path(parent: &str, child: &str) -> String {
    format!("{}{}{}", parent.trim_end_matches(PATH_SEPARATOR), PATH_SEPARATOR, child)
}

/// Name of the immediate child of `parent` on the way to `key`
pub fn child_name<'a>(key: &'a str, parent: &str) -> Option<&'a str> {
    let parent = parent.trim_end_matches(PATH_SEPARATOR);
    let rest = key.strip_prefix(parent)?.strip_prefix(PATH_SEPARATOR)?;
    rest.split(PATH_SEPARATOR).next().filter(|name| !name.is_empty())
}

/// Whether `key` is `watched` itself or lies below it
pub fn is_under(key: &str, watched: &str) -> bool {
    let watched = watched.trim_end_matches(PATH_SEPARATOR);
    if watched.is_empty() {
        return true;
    }
    key == watched
        || key
            .strip_prefix(watched)
            .is_some_and(|rest| rest.starts_with(PATH_SEPARATOR))
}
