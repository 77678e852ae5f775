/// Split the comma separated URL field into trimmed, non-empty entries.
pub fn split_urls(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

/// Base name of a file path with the extension stripped.
///
/// Both `/` and `\` are treated as separators since the downloader prints
/// platform paths.
pub fn item_name_from_path(path: &str) -> Option<String> {
    let file_name = path.rsplit(['/', '\\']).next()?;
    let stem = match file_name.rfind('.') {
        Some(idx) => &file_name[..idx],
        None => file_name,
    };
    let stem = stem.trim();
    (!stem.is_empty()).then(|| stem.to_string())
}
