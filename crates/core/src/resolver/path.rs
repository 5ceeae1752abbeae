//! Request path decomposition.

use symserve_api::SymbolRequest;

/// Compressed-file redirect requested by debuggers (`foo.pd_`).
pub const COMPRESSED_FILE_SUFFIX: &str = "_";
/// Symbol-server file pointer (`file.ptr`).
pub const FILE_POINTER_SUFFIX: &str = "ptr";

/// What a request path asks for, before any index access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKind {
    /// The application root itself.
    IndexProbe,
    /// Compressed or pointer file, never served.
    BlockedSuffix,
    /// Not of the `{file}/{signature}` shape.
    Malformed,
    Symbol(SymbolRequest),
}

/// Collapses runs of `/` into a single separator.
pub fn normalize(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        normalized.push(c);
    }
    normalized
}

/// Classifies a request path relative to `prefix` (which starts and ends with `/`).
///
/// The prefix may be preceded by a deployment context path.
pub fn classify(path: &str, prefix: &str) -> PathKind {
    let path = normalize(path);
    let root = prefix.trim_end_matches('/');

    if path.trim_end_matches('/').ends_with(root) {
        return PathKind::IndexProbe;
    }

    if path.ends_with(COMPRESSED_FILE_SUFFIX) || path.ends_with(FILE_POINTER_SUFFIX) {
        return PathKind::BlockedSuffix;
    }

    let Some(start) = path.find(prefix) else {
        return PathKind::Malformed;
    };
    let rest = &path[start + prefix.len()..];

    let Some((file_name, tail)) = rest.split_once('/') else {
        return PathKind::Malformed;
    };
    let signature = tail.split('/').next().unwrap_or_default();

    match SymbolRequest::new(file_name, signature) {
        Some(request) => PathKind::Symbol(request),
        None => PathKind::Malformed,
    }
}
