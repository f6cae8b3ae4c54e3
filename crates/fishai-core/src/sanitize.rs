//! Upload file-name sanitization

/// Name used when sanitization leaves nothing usable.
pub const DEFAULT_FILE_NAME: &str = "upload.jpg";

/// Longest sanitized name kept, in bytes.
pub const MAX_FILE_NAME_LEN: usize = 128;

/// Reduce an untrusted file name to `[A-Za-z0-9_.-]`.
///
/// Every other character becomes `_`, so path separators and control
/// characters cannot survive. Runs of dots are collapsed to a single dot,
/// which removes `..` components. Names that end up empty or made only of
/// dots fall back to [`DEFAULT_FILE_NAME`].
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len().min(MAX_FILE_NAME_LEN));

    for ch in name.chars() {
        let mapped = if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-') {
            ch
        } else {
            '_'
        };

        if mapped == '.' && out.ends_with('.') {
            continue;
        }
        if out.len() == MAX_FILE_NAME_LEN {
            break;
        }
        out.push(mapped);
    }

    if out.chars().all(|c| c == '.') {
        return DEFAULT_FILE_NAME.to_string();
    }
    out
}
