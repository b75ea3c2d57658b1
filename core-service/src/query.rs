//! Input cleanup for search queries and exported file names.

/// Longest query sent to a search provider, in characters.
pub const MAX_QUERY_CHARS: usize = 100;

const STRIPPED: &[char] = &['<', '>', '[', ']', '{', '}', '\\', '|'];

/// Strips markup-like characters, trims, and truncates to
/// [`MAX_QUERY_CHARS`] characters.
///
/// The result may be empty; callers decide whether that is an error.
pub fn sanitize_query(query: &str) -> String {
    let stripped: String = query.chars().filter(|c| !STRIPPED.contains(c)).collect();
    stripped.trim().chars().take(MAX_QUERY_CHARS).collect()
}

/// File name used when exporting a song: every character outside
/// `[A-Za-z0-9]` becomes `_`, and `.mp3` is appended.
pub fn export_file_name(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{stem}.mp3")
}
