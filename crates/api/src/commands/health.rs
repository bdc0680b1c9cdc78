//! Liveness probe

/// Always answers `OK`.
pub async fn healthz() -> &'static str {
    "OK"
}
