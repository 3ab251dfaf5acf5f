#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("catalog parse error: {0}")]
    CatalogParse(#[from] serde_json::Error),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
}
