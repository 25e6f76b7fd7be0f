use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a biographical entry, as declared by the profile subsystem.
///
/// The variant set is closed on this side: wire values outside the known set
/// deserialize to [`BioEntryType::Other`] rather than failing the whole
/// document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BioEntryType {
    /// Free-form self introduction.
    SelfIntroduction,
    /// Policy position or pledge.
    Policy,
    /// Legislative activity.
    Legislation,
    /// Concrete achievement.
    Achievement,
    /// Career and background.
    Experience,
    /// Forward-looking vision statement.
    Vision,
    /// Unrecognized entry type.
    #[serde(other)]
    Other,
}

impl BioEntryType {
    /// Per-type analysis weight applied on top of the entry's declared weight.
    ///
    /// Unrecognized types fall back to 0.5.
    pub fn analysis_weight(self) -> f32 {
        match self {
            Self::SelfIntroduction => 1.0,
            Self::Policy | Self::Vision => 0.9,
            Self::Legislation | Self::Achievement => 0.8,
            Self::Experience => 0.7,
            Self::Other => 0.5,
        }
    }

    /// Human-readable label shown in chunk metadata.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::SelfIntroduction => "자기소개",
            Self::Policy => "정책·공약",
            Self::Legislation => "입법활동",
            Self::Achievement => "주요성과",
            Self::Experience => "경력사항",
            Self::Vision => "비전",
            Self::Other => "기타",
        }
    }
}

/// One biographical entry supplied by the profile subsystem.
///
/// The indexing pipeline only reads these; ownership stays with the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BioEntry {
    /// Stable entry identifier.
    pub id: String,
    /// Entry category.
    pub entry_type: BioEntryType,
    /// Optional title, prefixed into chunk text for topical context.
    pub title: Option<String>,
    /// Raw entry text.
    pub content: String,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Caller-declared importance in [0, 1].
    pub weight: f32,
}

impl BioEntry {
    /// Create an entry with default weight 1.0 and no title or tags.
    pub fn new(id: impl Into<String>, entry_type: BioEntryType, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entry_type,
            title: None,
            content: content.into(),
            tags: Vec::new(),
            weight: 1.0,
        }
    }

    /// Attach a title.
    #[must_use]
    pub fn with_title<T: Into<String>>(mut self, title: T) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Override the declared weight.
    #[must_use]
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }
}

/// A versioned snapshot of one owner's biographical entries.
///
/// `version` increases monotonically whenever entries change and is the sole
/// staleness signal trusted by the indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BioDocument {
    /// Monotonic document version.
    pub version: u64,
    /// Current entries.
    pub entries: Vec<BioEntry>,
}

/// Provenance and ranking metadata carried by every chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Identifier of the source entry.
    pub source_entry_id: String,
    /// Category of the source entry.
    pub source_type: BioEntryType,
    /// Display label of the source type.
    pub source_type_name: String,
    /// Source entry title, if any.
    pub title: Option<String>,
    /// Tags copied from the source entry.
    pub tags: Vec<String>,
    /// Combined importance: entry weight × per-type analysis weight.
    pub weight: f32,
    /// Chunk length in characters.
    pub char_length: usize,
    /// Total number of chunks produced from the source entry.
    pub total_chunks: usize,
}

/// A persisted chunk with its embedding, one generation of one owner's index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunkRecord {
    /// Owner of the index.
    pub owner_id: String,
    /// Chunk text as embedded.
    pub chunk_text: String,
    /// Embedding vector, fixed dimensionality (768).
    pub embedding: Vec<f32>,
    /// Category of the source entry.
    pub source_type: BioEntryType,
    /// Identifier of the source entry.
    pub source_entry_id: String,
    /// 0-based chunk order within the source entry.
    pub source_position: usize,
    /// Full provenance metadata.
    pub metadata: ChunkMetadata,
    /// Generation this record belongs to.
    pub bio_version: u64,
    /// When the record was staged.
    pub created_at: DateTime<Utc>,
}

/// Aggregate statistics over one indexing generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Total characters across all chunks.
    pub total_chars: usize,
    /// Average chunk size in characters, rounded down.
    pub avg_chunk_size: usize,
}

/// Per-owner index metadata, the authority on index freshness.
///
/// `bio_version` here always equals the `bio_version` stamped on every
/// sibling [`IndexedChunkRecord`]; it is written only after the records are
/// durably committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Owner of the index.
    pub owner_id: String,
    /// Completion time of the last successful run.
    pub last_indexed_at: DateTime<Utc>,
    /// Generation of the current records.
    pub bio_version: u64,
    /// Number of records actually written in the current generation.
    pub chunk_count: usize,
    /// Number of entries that produced at least one chunk.
    pub entries_count: usize,
    /// Aggregate statistics.
    pub stats: IndexStats,
}

/// Normalized, never-null projection of an owner's index state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatus {
    /// Owner the status describes.
    pub owner_id: String,
    /// Whether any generation exists for this owner.
    pub indexed: bool,
    /// Records in the current generation (0 when absent).
    pub chunk_count: usize,
    /// Current generation (0 when absent).
    pub bio_version: u64,
    /// Completion time of the last run, if any.
    pub last_indexed_at: Option<DateTime<Utc>>,
    /// Entries covered by the current generation.
    pub entries_count: usize,
    /// Aggregate statistics (zeroed when absent).
    pub stats: IndexStats,
}

impl IndexStatus {
    /// Status for an owner that was never indexed.
    pub fn absent<T: Into<String>>(owner_id: T) -> Self {
        Self {
            owner_id: owner_id.into(),
            indexed: false,
            chunk_count: 0,
            bio_version: 0,
            last_indexed_at: None,
            entries_count: 0,
            stats: IndexStats::default(),
        }
    }
}

impl From<IndexMeta> for IndexStatus {
    fn from(meta: IndexMeta) -> Self {
        Self {
            owner_id: meta.owner_id,
            indexed: true,
            chunk_count: meta.chunk_count,
            bio_version: meta.bio_version,
            last_indexed_at: Some(meta.last_indexed_at),
            entries_count: meta.entries_count,
            stats: meta.stats,
        }
    }
}
