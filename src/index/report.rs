use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::time::Duration;

/// Counters collected over one indexing run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed: Duration,
    pub backend: String,
    pub metadata_available: bool,
    pub full_rebuild: bool,

    pub files_scanned: usize,
    pub files_added: usize,
    pub files_changed: usize,
    pub files_deleted: usize,
    pub files_unchanged: usize,
    pub files_failed: usize,

    pub chunks_added: usize,
    pub chunks_removed: usize,
    pub chunks_total: usize,

    pub embeddings_computed: usize,
    pub embeddings_reused: usize,
    pub embeddings_failed: usize,
    pub vector_store_reset: bool,

    pub orphans_removed: usize,
    pub lexical_repaired: usize,
    pub vectors_repaired: usize,
}

impl RunReport {
    /// True when the run touched nothing
    pub fn is_noop(&self) -> bool {
        self.files_added == 0
            && self.files_changed == 0
            && self.files_deleted == 0
            && self.orphans_removed == 0
            && self.lexical_repaired == 0
            && self.vectors_repaired == 0
            && !self.vector_store_reset
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let yes_no = |b: bool| if b { "yes" } else { "no" };

        let _ = writeln!(md, "# codeseek index report\n");
        if let Some(started) = self.started_at {
            let _ = writeln!(md, "- Started: {}", started.to_rfc3339());
        }
        let _ = writeln!(md, "- Elapsed: {:.2}s", self.elapsed.as_secs_f64());
        let _ = writeln!(md, "- Embedding backend: {}", self.backend);
        let _ = writeln!(md, "- Metadata service: {}", if self.metadata_available { "available" } else { "unavailable" });
        let _ = writeln!(md, "- Full rebuild: {}", yes_no(self.full_rebuild));

        let _ = writeln!(md, "\n## Files\n");
        let _ = writeln!(md, "| scanned | added | changed | deleted | unchanged | failed |");
        let _ = writeln!(md, "|---|---|---|---|---|---|");
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} | {} | {} |",
            self.files_scanned,
            self.files_added,
            self.files_changed,
            self.files_deleted,
            self.files_unchanged,
            self.files_failed
        );

        let _ = writeln!(md, "\n## Chunks\n");
        let _ = writeln!(md, "- Added: {}", self.chunks_added);
        let _ = writeln!(md, "- Removed: {}", self.chunks_removed);
        let _ = writeln!(md, "- Total: {}", self.chunks_total);

        let _ = writeln!(md, "\n## Embeddings\n");
        let _ = writeln!(md, "- Computed: {}", self.embeddings_computed);
        let _ = writeln!(md, "- Reused: {}", self.embeddings_reused);
        let _ = writeln!(md, "- Failed: {}", self.embeddings_failed);
        let _ = writeln!(md, "- Vector store reset: {}", yes_no(self.vector_store_reset));

        if self.orphans_removed + self.lexical_repaired + self.vectors_repaired > 0 {
            let _ = writeln!(md, "\n## Reconcile\n");
            let _ = writeln!(md, "- Orphans removed: {}", self.orphans_removed);
            let _ = writeln!(md, "- Lexical entries restored: {}", self.lexical_repaired);
            let _ = writeln!(md, "- Vectors restored: {}", self.vectors_repaired);
        }

        md
    }
}
