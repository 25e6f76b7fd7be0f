//! Deterministic segmentation of bio entries into size-bounded chunks.

mod text;

pub use text::chunk_text;

use biograph_core::{BioEntry, BioEntryType, ChunkMetadata};
use serde::{Deserialize, Serialize};
use text::char_len;

/// Hard upper bound on a chunk's character length.
pub const DEFAULT_MAX_CHARS: usize = 350;
/// Chunks below this length merge into a neighbor instead of standing alone.
pub const DEFAULT_MIN_CHARS: usize = 50;
/// Trailing characters carried from a closed chunk into the next one.
pub const DEFAULT_OVERLAP: usize = 50;

/// Segmentation options.
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    /// Hard upper bound on chunk length in characters (best-effort for a
    /// single over-length sentence).
    pub max_chars: usize,
    /// Minimum standalone chunk length in characters.
    pub min_chars: usize,
    /// Character overlap between consecutive chunks.
    pub overlap: usize,
    /// Prefer sentence boundaries over fixed character windows.
    pub preserve_sentences: bool,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            min_chars: DEFAULT_MIN_CHARS,
            overlap: DEFAULT_OVERLAP,
            preserve_sentences: true,
        }
    }
}

/// One chunk produced by a segmentation run.
///
/// Chunks live only for the duration of an indexing run; they are embedded,
/// persisted as records, and discarded.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk text, including any carried overlap and title prefix.
    pub text: String,
    /// 0-based order within the source entry.
    pub position: usize,
    /// Provenance and ranking metadata.
    pub metadata: ChunkMetadata,
}

/// Per-entry summary produced alongside its chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySummary {
    /// Source entry identifier.
    pub entry_id: String,
    /// Source entry category.
    pub entry_type: BioEntryType,
    /// Display label of the category.
    pub entry_type_name: String,
    /// Source entry title, if any.
    pub title: Option<String>,
    /// Character length of the original content.
    pub original_length: usize,
    /// Number of chunks produced.
    pub chunk_count: usize,
    /// Per-type analysis weight.
    pub analysis_weight: f32,
    /// Tags copied from the entry.
    pub tags: Vec<String>,
}

/// Chunks and summary for a single entry.
#[derive(Debug, Clone)]
pub struct SegmentedEntry {
    /// Ordered chunks.
    pub chunks: Vec<Chunk>,
    /// Entry summary.
    pub summary: EntrySummary,
}

/// Aggregate statistics over a multi-entry segmentation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentStats {
    /// Entries received.
    pub total_entries: usize,
    /// Entries that produced at least one chunk.
    pub processed_entries: usize,
    /// Chunks produced across all entries.
    pub total_chunks: usize,
    /// Characters across all chunks.
    pub total_chars: usize,
    /// Average chunk size in characters, rounded down.
    pub avg_chunk_size: usize,
}

/// Full result of segmenting a list of entries.
#[derive(Debug, Clone, Default)]
pub struct SegmentedCorpus {
    /// All chunks, in entry order then position order.
    pub chunks: Vec<Chunk>,
    /// One summary per processed entry.
    pub entries: Vec<EntrySummary>,
    /// Aggregate statistics.
    pub stats: SegmentStats,
}

/// Segment one bio entry into chunks with provenance metadata.
///
/// The entry title (when present) is prefixed as `[title] content` so every
/// chunk keeps topical context after splitting. Each chunk's weight is the
/// entry's declared weight multiplied by the per-type analysis weight.
///
/// Returns `None` for entries with empty content; callers skip these without
/// failing the batch.
pub fn chunk_bio_entry(entry: &BioEntry, options: &ChunkOptions) -> Option<SegmentedEntry> {
    let content = entry.content.trim();
    if content.is_empty() {
        return None;
    }

    let title = entry
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty());
    let text = match title {
        Some(title) => format!("[{title}] {content}"),
        None => content.to_owned(),
    };

    let pieces = chunk_text(&text, options);
    if pieces.is_empty() {
        return None;
    }

    let weight = entry.weight * entry.entry_type.analysis_weight();
    let total_chunks = pieces.len();

    let chunks = pieces
        .into_iter()
        .enumerate()
        .map(|(position, chunk_text)| Chunk {
            metadata: ChunkMetadata {
                source_entry_id: entry.id.clone(),
                source_type: entry.entry_type,
                source_type_name: entry.entry_type.display_name().to_owned(),
                title: title.map(str::to_owned),
                tags: entry.tags.clone(),
                weight,
                char_length: char_len(&chunk_text),
                total_chunks,
            },
            position,
            text: chunk_text,
        })
        .collect();

    Some(SegmentedEntry {
        chunks,
        summary: EntrySummary {
            entry_id: entry.id.clone(),
            entry_type: entry.entry_type,
            entry_type_name: entry.entry_type.display_name().to_owned(),
            title: title.map(str::to_owned),
            original_length: char_len(content),
            chunk_count: total_chunks,
            analysis_weight: entry.entry_type.analysis_weight(),
            tags: entry.tags.clone(),
        },
    })
}

/// Segment a list of entries, concatenating chunks and summaries.
///
/// Individual entries never fail the batch: entries with empty content are
/// silently excluded from `processed_entries`.
pub fn chunk_bio_entries(entries: &[BioEntry], options: &ChunkOptions) -> SegmentedCorpus {
    let mut corpus = SegmentedCorpus::default();
    corpus.stats.total_entries = entries.len();

    for entry in entries {
        let Some(segmented) = chunk_bio_entry(entry, options) else {
            continue;
        };
        corpus.stats.processed_entries += 1;
        corpus.chunks.extend(segmented.chunks);
        corpus.entries.push(segmented.summary);
    }

    corpus.stats.total_chunks = corpus.chunks.len();
    corpus.stats.total_chars = corpus
        .chunks
        .iter()
        .map(|chunk| chunk.metadata.char_length)
        .sum();
    if corpus.stats.total_chunks > 0 {
        corpus.stats.avg_chunk_size = corpus.stats.total_chars / corpus.stats.total_chunks;
    }

    corpus
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_entry(content: &str) -> BioEntry {
        BioEntry::new("entry-1", BioEntryType::Policy, content)
            .with_title("교육")
            .with_weight(0.8)
    }

    #[test]
    fn test_title_prefixed_into_chunk_text() {
        let entry = policy_entry("교육 예산을 확대하겠습니다.");
        let segmented = chunk_bio_entry(&entry, &ChunkOptions::default()).unwrap();
        assert_eq!(segmented.chunks.len(), 1);
        assert!(segmented.chunks[0].text.starts_with("[교육] "));
    }

    #[test]
    fn test_chunk_weight_combines_entry_and_type_weight() {
        let entry = policy_entry("교육 예산을 확대하겠습니다.");
        let segmented = chunk_bio_entry(&entry, &ChunkOptions::default()).unwrap();
        let expected = 0.8 * BioEntryType::Policy.analysis_weight();
        assert!((segmented.chunks[0].metadata.weight - expected).abs() < f32::EPSILON);
    }

    #[test]
    fn test_empty_content_yields_none() {
        let entry = policy_entry("   ");
        assert!(chunk_bio_entry(&entry, &ChunkOptions::default()).is_none());
    }

    #[test]
    fn test_metadata_positions_and_totals() {
        let sentence = format!("{}.", "교".repeat(99));
        let entry = policy_entry(&vec![sentence; 5].join(" "));
        let segmented = chunk_bio_entry(&entry, &ChunkOptions::default()).unwrap();

        assert!(segmented.chunks.len() >= 2);
        for (idx, chunk) in segmented.chunks.iter().enumerate() {
            assert_eq!(chunk.position, idx);
            assert_eq!(chunk.metadata.total_chunks, segmented.chunks.len());
            assert_eq!(chunk.metadata.source_entry_id, "entry-1");
            assert_eq!(chunk.metadata.source_type, BioEntryType::Policy);
        }
        assert_eq!(segmented.summary.chunk_count, segmented.chunks.len());
    }

    #[test]
    fn test_batch_skips_empty_entries_without_failing() {
        let entries = vec![
            policy_entry("유효한 첫 항목입니다."),
            policy_entry(""),
            BioEntry::new("entry-3", BioEntryType::Vision, "지역의 미래를 준비합니다."),
        ];
        let corpus = chunk_bio_entries(&entries, &ChunkOptions::default());

        assert_eq!(corpus.stats.total_entries, 3);
        assert_eq!(corpus.stats.processed_entries, 2);
        assert_eq!(corpus.entries.len(), 2);
        assert_eq!(corpus.stats.total_chunks, corpus.chunks.len());
        assert!(corpus.stats.avg_chunk_size > 0);
    }

    #[test]
    fn test_empty_batch_has_zeroed_stats() {
        let corpus = chunk_bio_entries(&[], &ChunkOptions::default());
        assert_eq!(corpus.stats.total_entries, 0);
        assert_eq!(corpus.stats.avg_chunk_size, 0);
        assert!(corpus.chunks.is_empty());
    }
}
