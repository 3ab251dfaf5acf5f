/// Error types shared across MCP server crates.
///
/// Failures in infrastructure shared by every server (currently Redis). Application errors
/// live in each server crate.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("redis not configured, degrading gracefully")]
    RedisUnavailable,
}
