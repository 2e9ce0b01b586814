use anyhow::{anyhow, Result};
use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};

use super::EmbeddingProvider;
use crate::error::SearchError;
use crate::info_print;

/// Local ONNX models available through fastembed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelType {
    /// BGE Small EN v1.5 - 384 dimensions, good balance of speed/quality
    #[default]
    BGESmallENV15,
    /// All-MiniLM-L6-v2 - 384 dimensions, fast and efficient
    AllMiniLML6V2,
    /// BGE Base EN v1.5 - 768 dimensions, higher quality
    BGEBaseENV15,
    /// mxbai-embed-large-v1 - 1024 dimensions, best quality
    MxbaiEmbedLargeV1,
}

impl ModelType {
    pub const ALL: [ModelType; 4] = [
        Self::BGESmallENV15,
        Self::AllMiniLML6V2,
        Self::BGEBaseENV15,
        Self::MxbaiEmbedLargeV1,
    ];

    /// Accepts the short alias (`bge-small`) or the full model name
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.short_name() == name || m.name().eq_ignore_ascii_case(name))
    }

    pub fn to_fastembed_model(&self) -> FastEmbedModel {
        match self {
            Self::BGESmallENV15 => FastEmbedModel::BGESmallENV15,
            Self::AllMiniLML6V2 => FastEmbedModel::AllMiniLML6V2,
            Self::BGEBaseENV15 => FastEmbedModel::BGEBaseENV15,
            Self::MxbaiEmbedLargeV1 => FastEmbedModel::MxbaiEmbedLargeV1,
        }
    }

    pub fn dimensions(&self) -> usize {
        match self {
            Self::BGESmallENV15 => 384,
            Self::AllMiniLML6V2 => 384,
            Self::BGEBaseENV15 => 768,
            Self::MxbaiEmbedLargeV1 => 1024,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BGESmallENV15 => "BAAI/bge-small-en-v1.5",
            Self::AllMiniLML6V2 => "sentence-transformers/all-MiniLM-L6-v2",
            Self::BGEBaseENV15 => "BAAI/bge-base-en-v1.5",
            Self::MxbaiEmbedLargeV1 => "mixedbread-ai/mxbai-embed-large-v1",
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Self::BGESmallENV15 => "bge-small",
            Self::AllMiniLML6V2 => "minilm-l6",
            Self::BGEBaseENV15 => "bge-base",
            Self::MxbaiEmbedLargeV1 => "mxbai-large",
        }
    }
}

/// Embedding model backed by the fastembed library
pub struct FastEmbedder {
    model: TextEmbedding,
    model_type: ModelType,
}

impl FastEmbedder {
    pub fn with_model(model_type: ModelType) -> Result<Self> {
        info_print!(
            "Loading embedding model: {} ({} dims)",
            model_type.name(),
            model_type.dimensions()
        );

        let model = TextEmbedding::try_new(
            InitOptions::new(model_type.to_fastembed_model()).with_show_download_progress(true),
        )
        .map_err(|e| anyhow!("Failed to initialize embedding model: {}", e))?;

        Ok(Self { model, model_type })
    }
}

impl EmbeddingProvider for FastEmbedder {
    fn embed(&mut self, text: &str) -> crate::error::Result<Vec<f32>> {
        let embeddings = self
            .model
            .embed(vec![text], None)
            .map_err(|e| SearchError::Embedding(e.to_string()))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::Embedding("No embedding generated".to_string()))
    }

    fn dimensions(&self) -> usize {
        self.model_type.dimensions()
    }

    fn model_name(&self) -> &str {
        self.model_type.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_dimensions() {
        assert_eq!(ModelType::BGESmallENV15.dimensions(), 384);
        assert_eq!(ModelType::AllMiniLML6V2.dimensions(), 384);
        assert_eq!(ModelType::BGEBaseENV15.dimensions(), 768);
        assert_eq!(ModelType::MxbaiEmbedLargeV1.dimensions(), 1024);
    }

    #[test]
    fn test_parse_aliases_and_full_names() {
        assert_eq!(ModelType::parse("bge-small"), Some(ModelType::BGESmallENV15));
        assert_eq!(ModelType::parse("minilm-l6"), Some(ModelType::AllMiniLML6V2));
        assert_eq!(
            ModelType::parse("BAAI/bge-base-en-v1.5"),
            Some(ModelType::BGEBaseENV15)
        );
        assert_eq!(ModelType::parse("gpt"), None);
        assert_eq!(ModelType::default(), ModelType::BGESmallENV15);
    }

    #[test]
    #[ignore] // Requires model download
    fn test_embed_single_text() {
        let mut embedder = FastEmbedder::with_model(ModelType::default()).unwrap();
        let embedding = embedder.embed("Hello, world!").unwrap();

        assert_eq!(embedding.len(), 384);
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.1);
    }
}
