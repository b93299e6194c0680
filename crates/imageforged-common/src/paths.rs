//! Upload allow-list and filename helpers.
//!
//! Uploads are accepted only when both the filename extension and the declared
//! content type belong to the supported image set. Filenames coming from
//! clients are sanitized before they are reused for converted output.

use unicode_normalization::UnicodeNormalization;

/// File extensions accepted for upload.
const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "avif"];

/// Declared content types accepted for upload.
const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/webp",
    "image/avif",
];

/// Check an upload against the allow-list.
///
/// The extension after the last `.` (case-insensitive) and the declared
/// content type (parameters such as `; charset=` ignored) must both match.
///
/// # Examples
///
/// ```
/// use imageforged_common::paths::is_allowed_upload;
///
/// assert!(is_allowed_upload("photo.PNG", "image/png"));
/// assert!(!is_allowed_upload("photo.png", "text/plain"));
/// assert!(!is_allowed_upload("photo.gif", "image/png"));
/// assert!(!is_allowed_upload("photo", "image/png"));
/// ```
pub fn is_allowed_upload(filename: &str, content_type: &str) -> bool {
    let extension_ok = filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false);

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    extension_ok && ALLOWED_MIME_TYPES.contains(&mime.as_str())
}

/// Reduce a client-supplied filename to a safe, flat ASCII name.
///
/// Accented characters are folded to their ASCII base (NFKD) and any other
/// non-ASCII character is dropped. Path separators become spaces, whitespace
/// runs collapse to `_`, every
/// character outside `[A-Za-z0-9_.-]` is dropped, and leading/trailing `.` and
/// `_` are trimmed. The result may be empty.
///
/// # Examples
///
/// ```
/// use imageforged_common::paths::secure_filename;
///
/// assert_eq!(secure_filename("My Photo.png"), "My_Photo.png");
/// assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
/// assert_eq!(secure_filename("C:\\Users\\me\\pic.jpg"), "C_Users_me_pic.jpg");
/// assert_eq!(secure_filename("café.png"), "cafe.png");
/// ```
pub fn secure_filename(filename: &str) -> String {
    let flattened: String = filename
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// Split off the final extension of a filename.
///
/// A dot at position zero does not start an extension, so `.hidden` has no
/// extension.
///
/// # Examples
///
/// ```
/// use imageforged_common::paths::split_extension;
///
/// assert_eq!(split_extension("photo.tar.gz"), ("photo.tar", Some("gz")));
/// assert_eq!(split_extension("photo"), ("photo", None));
/// assert_eq!(split_extension(".hidden"), (".hidden", None));
/// ```
pub fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => (&filename[..idx], Some(&filename[idx + 1..])),
        _ => (filename, None),
    }
}
