use axum::http::HeaderMap;

pub const UPLOAD_KEY_HEADER: &str = "x-upload-key";
/// Header name used by older collectors.
pub const LEGACY_KEY_HEADER: &str = "x-api-key";

/// Upload key sent by the caller, preferring `X-Upload-Key` over `X-API-Key`.
/// Non-UTF-8 header values count as absent.
pub fn provided_upload_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(UPLOAD_KEY_HEADER)
        .or_else(|| headers.get(LEGACY_KEY_HEADER))
        .and_then(|v| v.to_str().ok())
}
