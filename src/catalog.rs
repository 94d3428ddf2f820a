//! Built-in topic catalog.
//!
//! The default catalog ships inside the binary. A `catalog_path` in the
//! config file replaces it with an on-disk document of the same shape.
//! Any failure here is a startup error: there is no fallback catalog.
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::topic::{Topic, TopicDocument};

/// Catalog compiled into the binary.
const BUNDLED_CATALOG: &str = include_str!("../assets/ifac_tcs.json");

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

// ============================================================================
// Loading
// ============================================================================

/// Parse a catalog document into its topics, preserving order.
pub fn parse(json: &str) -> Result<Vec<Topic>, CatalogError> {
    Ok(TopicDocument::from_json(json)?.tcs)
}

/// Topics from the catalog compiled into the binary.
pub fn bundled() -> Result<Vec<Topic>, CatalogError> {
    parse(BUNDLED_CATALOG)
}

/// Load the catalog, from `override_path` when given, else the bundled one.
pub async fn load(override_path: Option<&Path>) -> Result<Vec<Topic>, CatalogError> {
    let topics = match override_path {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| CatalogError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            let topics = parse(&json)?;
            tracing::info!(path = %path.display(), topics = topics.len(), "Loaded catalog from file");
            topics
        }
        None => {
            let topics = bundled()?;
            tracing::info!(topics = topics.len(), "Loaded bundled catalog");
            topics
        }
    };
    Ok(topics)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_parses() {
        let topics = bundled().unwrap();
        assert!(!topics.is_empty());
        assert!(topics.iter().all(|t| !t.code.is_empty() && !t.items.is_empty()));
    }

    #[test]
    fn test_bundled_codes_are_unique() {
        let topics = bundled().unwrap();
        let mut codes: Vec<&str> = topics.iter().map(|t| t.code.as_str()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), topics.len());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse("not json").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
        assert!(err.to_string().contains("Invalid catalog JSON"));
    }

    #[tokio::test]
    async fn test_load_without_override_uses_bundled() {
        let topics = load(None).await.unwrap();
        assert_eq!(topics, bundled().unwrap());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = std::env::temp_dir().join("ifac_catalog_test_file");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("catalog.json");
        std::fs::write(
            &path,
            r#"{"tcs":[{"code":"A-1","name":"Alpha","items":["x","y"],"keywords":""}]}"#,
        )
        .unwrap();

        let topics = load(Some(&path)).await.unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].code, "A-1");
        assert_eq!(topics[0].items, vec!["x", "y"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_load_missing_file_is_fatal() {
        let path = Path::new("/tmp/ifac_catalog_test_nonexistent.json");
        let err = load(Some(path)).await.unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_fatal() {
        let dir = std::env::temp_dir().join("ifac_catalog_test_corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("catalog.json");
        std::fs::write(&path, r#"{"tcs": [{"code": 1}]}"#).unwrap();

        let err = load(Some(&path)).await.unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));

        std::fs::remove_dir_all(&dir).ok();
    }
}
