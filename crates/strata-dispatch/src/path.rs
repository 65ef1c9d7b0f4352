/// Normalized path that selects the batch executor.
pub const BATCH_PATH: &str = "/batch";

/// Rewrite `path` relative to the server root and guarantee a leading `/`.
///
/// The root prefix is stripped at most once and nothing else is touched: no
/// decoding, no validation.
pub fn normalize(path: &str, server_root: &str) -> String {
    let relative = path.strip_prefix(server_root).unwrap_or(path);
    if relative.starts_with('/') {
        relative.to_string()
    } else {
        format!("/{relative}")
    }
}
