//! Filename encoding for cache keys

/// Turn a backend ID into a single path component
///
/// The ID is percent-encoded, with `.` escaped as well, so the result
/// never contains a separator and never names `.` or `..`. The encoding
/// is one-to-one: two different IDs always get two different names. The
/// empty ID maps to `%`, which no encoded ID can produce.
///
/// # Examples
///
/// ```
/// use laudiolin::utils::id_to_filename;
///
/// assert_eq!(id_to_filename("dQw4w9WgXcQ"), "dQw4w9WgXcQ");
/// assert_eq!(id_to_filename("spotify:track/42"), "spotify%3Atrack%2F42");
/// ```
pub fn id_to_filename(id: &str) -> String {
    if id.is_empty() {
        return "%".to_string();
    }

    urlencoding::encode(id).replace('.', "%2E")
}
