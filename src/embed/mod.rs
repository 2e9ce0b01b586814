mod cache;
mod embedder;
mod hash;

pub use cache::{CacheStats, CachedEmbedder};
pub use embedder::{FastEmbedder, ModelType};
pub use hash::{HashEmbedder, DEFAULT_HASH_DIMENSIONS};

use anyhow::Result;
use std::fmt;

use crate::error::SearchError;

/// Turns text into a dense vector.
pub trait EmbeddingProvider {
    fn embed(&mut self, text: &str) -> crate::error::Result<Vec<f32>>;

    fn dimensions(&self) -> usize;

    /// Identifies the vector space; a store built by another model is reset
    fn model_name(&self) -> &str;
}

/// Embedding backend selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    FastEmbed(ModelType),
    Hash(usize),
    None,
}

impl EmbeddingBackend {
    /// Parse `none`, `hash`, `hash:<dims>`, or a fastembed model alias/name
    pub fn parse(spec: &str) -> crate::error::Result<Self> {
        let spec = spec.trim();
        match spec {
            "" | "none" | "off" => return Ok(Self::None),
            "hash" => return Ok(Self::Hash(DEFAULT_HASH_DIMENSIONS)),
            _ => {}
        }

        if let Some(dims) = spec.strip_prefix("hash:") {
            return match dims.parse::<usize>() {
                Ok(d) if d > 0 => Ok(Self::Hash(d)),
                _ => Err(SearchError::Config(format!(
                    "Invalid hash embedder dimensions: {}",
                    dims
                ))),
            };
        }

        ModelType::parse(spec).map(Self::FastEmbed).ok_or_else(|| {
            SearchError::Config(format!(
                "Unknown embedding backend '{}' (expected none, hash[:dims], bge-small, minilm-l6, bge-base or mxbai-large)",
                spec
            ))
        })
    }
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FastEmbed(model) => write!(f, "fastembed ({})", model.name()),
            Self::Hash(dims) => write!(f, "hash ({} dims)", dims),
            Self::None => write!(f, "none"),
        }
    }
}

/// Instantiate the provider for a backend; `None` means no vector signal.
pub fn create_provider(backend: EmbeddingBackend) -> Result<Option<Box<dyn EmbeddingProvider>>> {
    let provider: Box<dyn EmbeddingProvider> = match backend {
        EmbeddingBackend::FastEmbed(model) => Box::new(FastEmbedder::with_model(model)?),
        EmbeddingBackend::Hash(dims) => Box::new(HashEmbedder::new(dims)),
        EmbeddingBackend::None => return Ok(None),
    };
    Ok(Some(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backends() {
        assert_eq!(EmbeddingBackend::parse("none").unwrap(), EmbeddingBackend::None);
        assert_eq!(
            EmbeddingBackend::parse("hash").unwrap(),
            EmbeddingBackend::Hash(256)
        );
        assert_eq!(
            EmbeddingBackend::parse("hash:64").unwrap(),
            EmbeddingBackend::Hash(64)
        );
        assert_eq!(
            EmbeddingBackend::parse("bge-small").unwrap(),
            EmbeddingBackend::FastEmbed(ModelType::BGESmallENV15)
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(matches!(
            EmbeddingBackend::parse("hash:0"),
            Err(SearchError::Config(_))
        ));
        assert!(EmbeddingBackend::parse("hash:x").is_err());
        assert!(EmbeddingBackend::parse("word2vec").is_err());
    }

    #[test]
    fn test_create_offline_providers() {
        assert!(create_provider(EmbeddingBackend::None).unwrap().is_none());

        let provider = create_provider(EmbeddingBackend::Hash(16)).unwrap().unwrap();
        assert_eq!(provider.dimensions(), 16);
        assert_eq!(provider.model_name(), "hash-16");
    }
}
