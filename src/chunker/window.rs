use super::{ChunkRecord, ContentKind};
use crate::config::ChunkingConfig;
use serde::{Deserialize, Serialize};

/// Sliding window geometry in lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub size: usize,
    pub overlap: usize,
}

impl Window {
    pub const fn new(size: usize, overlap: usize) -> Self {
        Self { size, overlap }
    }

    /// How far the window moves after each chunk; always at least one line.
    pub fn stride(&self) -> usize {
        let size = self.size.max(1);
        let overlap = self.overlap.min(size - 1);
        size - overlap
    }
}

/// Line-window chunker with per-kind window sizes
#[derive(Debug, Clone)]
pub struct WindowChunker {
    code: Window,
    config: Window,
    doc: Window,
}

impl WindowChunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            code: config.code,
            config: config.config,
            doc: config.doc,
        }
    }

    pub fn window_for(&self, kind: ContentKind) -> Window {
        match kind {
            ContentKind::Code => self.code,
            ContentKind::Config => self.config,
            ContentKind::Doc => self.doc,
        }
    }

    /// Split one file's text into ordered, overlapping chunks.
    ///
    /// Whitespace-only windows are dropped but still advance the offset. A
    /// file where every window was dropped yields one chunk spanning the
    /// whole file so it still owns a chunk id.
    pub fn chunk(&self, path: &str, text: &str, kind: ContentKind) -> Vec<ChunkRecord> {
        let window = self.window_for(kind);
        let size = window.size.max(1);
        let stride = window.stride();

        let lines: Vec<&str> = text.lines().collect();
        let total = lines.len();
        let mut chunks = Vec::new();

        let mut start = 0;
        while start < total {
            let end = (start + size).min(total);
            let body = lines[start..end].join("\n");

            if !body.trim().is_empty() {
                chunks.push(ChunkRecord::new(path, kind, start + 1, end, body));
            }

            if end == total {
                break;
            }
            start += stride;
        }

        if chunks.is_empty() {
            chunks.push(ChunkRecord::new(
                path,
                kind,
                1,
                total.max(1),
                lines.join("\n"),
            ));
        }

        chunks
    }
}

impl Default for WindowChunker {
    fn default() -> Self {
        Self::new(&ChunkingConfig::default())
    }
}
