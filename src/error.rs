use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing failed: {0}")]
    Xml(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No usable {kind} for {druid}")]
    MissingMetadata { druid: String, kind: &'static str },

    #[error("No catalog record for {druid} (catalog key {catalog_key})")]
    MissingCatalogRecord { druid: String, catalog_key: String },

    #[error("Merge policy requires a catalog key, but {druid} has none")]
    CatalogKeyRequired { druid: String },

    #[error("Metadata source error: {message}")]
    Source { message: String },

    #[error("Solr error: {message}")]
    Solr { message: String },

    #[error("Notification failed: {0}")]
    Notify(String),
}

impl From<quick_xml::Error> for IndexerError {
    fn from(e: quick_xml::Error) -> Self {
        IndexerError::Xml(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IndexerError>;
