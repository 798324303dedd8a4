//! Store-independent item name -> category reference dataset.
//!
//! # Responsibility
//! - Parse and index the bundled (or file-provided) classification table.
//! - Hold one process-wide, read-only instance installed at startup.
//!
//! # Invariants
//! - A dataset is immutable once built; lookups take `&self` only.
//! - The process-wide instance is installed at most once; re-init with the
//!   same source is a no-op, a different source is rejected.
//! - Phrases are stored normalized (trimmed, lowercased); the first
//!   occurrence of a duplicated phrase wins.

use crate::model::store::normalize_item_key;
use log::info;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const BUILTIN_DATASET_JSON: &str = include_str!("data/reference_items.json");

static GLOBAL_DATASET: OnceCell<InstalledDataset> = OnceCell::new();

struct InstalledDataset {
    source: ReferenceSource,
    dataset: Arc<ReferenceDataset>,
}

/// Where the process-wide dataset is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
    /// Dataset compiled into the crate.
    Builtin,
    /// JSON file on disk.
    Path(PathBuf),
}

/// Errors from dataset loading and installation.
#[derive(Debug)]
pub enum ReferenceDatasetError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    /// Entry at `index` has a blank phrase or category label.
    InvalidEntry { index: usize },
    AlreadyInitialized {
        active: ReferenceSource,
        requested: ReferenceSource,
    },
}

impl Display for ReferenceDatasetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read reference dataset `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid reference dataset json: {err}"),
            Self::InvalidEntry { index } => {
                write!(f, "reference dataset entry {index} has a blank name or category")
            }
            Self::AlreadyInitialized { active, requested } => write!(
                f,
                "reference dataset already initialized from {active:?}; refusing to switch to {requested:?}"
            ),
        }
    }
}

impl Error for ReferenceDatasetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::InvalidEntry { .. } => None,
            Self::AlreadyInitialized { .. } => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    name: String,
    category: String,
}

/// One indexed phrase and its category label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEntry {
    pub phrase: String,
    pub category: String,
}

/// Immutable phrase index used as the classification fallback.
#[derive(Debug, Clone, Default)]
pub struct ReferenceDataset {
    entries: Vec<ReferenceEntry>,
    exact: HashMap<String, usize>,
}

impl ReferenceDataset {
    /// Parses a JSON array of `{"name", "category"}` objects.
    pub fn from_json_str(json: &str) -> Result<Self, ReferenceDatasetError> {
        let raw: Vec<RawEntry> =
            serde_json::from_str(json).map_err(ReferenceDatasetError::Parse)?;
        Self::from_pairs(raw.into_iter().map(|entry| (entry.name, entry.category)))
    }

    /// Builds a dataset from `(phrase, category)` pairs in priority order.
    pub fn from_pairs<I, N, C>(pairs: I) -> Result<Self, ReferenceDatasetError>
    where
        I: IntoIterator<Item = (N, C)>,
        N: AsRef<str>,
        C: AsRef<str>,
    {
        let mut dataset = Self::default();
        for (index, (name, category)) in pairs.into_iter().enumerate() {
            let phrase = normalize_item_key(name.as_ref());
            let category = category.as_ref().trim();
            if phrase.is_empty() || category.is_empty() {
                return Err(ReferenceDatasetError::InvalidEntry { index });
            }
            if dataset.exact.contains_key(&phrase) {
                continue;
            }
            dataset.exact.insert(phrase.clone(), dataset.entries.len());
            dataset.entries.push(ReferenceEntry {
                phrase,
                category: category.to_string(),
            });
        }
        Ok(dataset)
    }

    /// Reads a JSON dataset file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ReferenceDatasetError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ReferenceDatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Dataset shipped with the crate.
    pub fn builtin() -> Result<Self, ReferenceDatasetError> {
        Self::from_json_str(BUILTIN_DATASET_JSON)
    }

    pub fn load(source: &ReferenceSource) -> Result<Self, ReferenceDatasetError> {
        match source {
            ReferenceSource::Builtin => Self::builtin(),
            ReferenceSource::Path(path) => Self::load_from_path(path),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    /// Finds the category label for an item name.
    ///
    /// Match order:
    /// 1. exact phrase;
    /// 2. longest phrase contained in the name at word boundaries (a plural
    ///    `s`/`es` after the phrase still counts), earliest entry on ties;
    /// 3. first phrase that starts with the whole name.
    pub fn lookup(&self, item_name: &str) -> Option<&ReferenceEntry> {
        let key = normalize_item_key(item_name);
        if key.is_empty() {
            return None;
        }

        if let Some(index) = self.exact.get(&key) {
            return self.entries.get(*index);
        }

        let mut best: Option<&ReferenceEntry> = None;
        for entry in &self.entries {
            if !contains_phrase(&key, &entry.phrase) {
                continue;
            }
            if best.map_or(true, |current| entry.phrase.len() > current.phrase.len()) {
                best = Some(entry);
            }
        }
        if best.is_some() {
            return best;
        }

        self.entries
            .iter()
            .find(|entry| entry.phrase.starts_with(key.as_str()))
    }
}

fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    haystack.match_indices(phrase).any(|(index, _)| {
        let starts_word = haystack[..index]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        starts_word && ends_word(&haystack[index + phrase.len()..])
    })
}

fn ends_word(rest: &str) -> bool {
    let at_boundary = |value: &str| value.chars().next().map_or(true, |c| !c.is_alphanumeric());
    if at_boundary(rest) {
        return true;
    }
    ["es", "s"]
        .iter()
        .filter_map(|suffix| rest.strip_prefix(suffix))
        .any(at_boundary)
}

/// Installs the process-wide dataset from `source`.
///
/// # Errors
/// - Loading errors from [`ReferenceDataset::load`].
/// - `AlreadyInitialized` when a dataset from another source is active.
pub fn init_reference_dataset(
    source: ReferenceSource,
) -> Result<Arc<ReferenceDataset>, ReferenceDatasetError> {
    let installed = GLOBAL_DATASET.get_or_try_init(|| {
        let dataset = ReferenceDataset::load(&source)?;
        info!(
            "event=reference_dataset_init module=classify status=ok source={:?} entries={}",
            source,
            dataset.len()
        );
        Ok::<_, ReferenceDatasetError>(InstalledDataset {
            source: source.clone(),
            dataset: Arc::new(dataset),
        })
    })?;

    if installed.source != source {
        return Err(ReferenceDatasetError::AlreadyInitialized {
            active: installed.source.clone(),
            requested: source,
        });
    }
    Ok(Arc::clone(&installed.dataset))
}

/// Returns the process-wide dataset, if initialized.
pub fn reference_dataset() -> Option<Arc<ReferenceDataset>> {
    GLOBAL_DATASET
        .get()
        .map(|installed| Arc::clone(&installed.dataset))
}
