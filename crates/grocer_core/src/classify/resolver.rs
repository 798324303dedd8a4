//! Category resolution for free-text item names.
//!
//! # Responsibility
//! - Pick the category label an item is filed under when it is added.
//!
//! # Invariants
//! - Resolution never fails: storage or data problems degrade to
//!   `DEFAULT_CATEGORY_NAME` and are logged.
//! - Precedence is store override, then reference dataset, then default.

use crate::classify::reference::ReferenceDataset;
use crate::model::store::{normalize_item_key, StoreId, DEFAULT_CATEGORY_NAME};
use crate::repo::category_repo::CategoryRepository;
use log::{debug, warn};
use uuid::Uuid;

/// Which rule produced a category label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorySource {
    StoreOverride,
    Reference,
    Default,
}

/// Resolved category label and the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryResolution {
    pub name: String,
    pub source: CategorySource,
}

impl CategoryResolution {
    fn default_label() -> Self {
        Self {
            name: DEFAULT_CATEGORY_NAME.to_string(),
            source: CategorySource::Default,
        }
    }
}

/// Resolves item names against store overrides and the reference dataset.
pub struct CategoryResolver<'a, C: CategoryRepository> {
    categories: &'a C,
    dataset: &'a ReferenceDataset,
}

impl<'a, C: CategoryRepository> CategoryResolver<'a, C> {
    pub fn new(categories: &'a C, dataset: &'a ReferenceDataset) -> Self {
        Self {
            categories,
            dataset,
        }
    }

    /// Returns the category label for `item_name` in `store_id`.
    pub fn resolve(&self, item_name: &str, store_id: StoreId) -> CategoryResolution {
        let key = normalize_item_key(item_name);

        if let Some(resolution) = self.store_override(&key, store_id) {
            return resolution;
        }

        if let Some(entry) = self.dataset.lookup(&key) {
            debug!(
                "event=category_resolve module=classify status=ok source=reference store_id={store_id}"
            );
            return CategoryResolution {
                name: entry.category.clone(),
                source: CategorySource::Reference,
            };
        }

        debug!(
            "event=category_resolve module=classify status=ok source=default store_id={store_id}"
        );
        CategoryResolution::default_label()
    }

    /// `None` means "no override, keep going"; `Some` ends resolution, even
    /// when the override points at a category that no longer resolves.
    fn store_override(&self, key: &str, store_id: StoreId) -> Option<CategoryResolution> {
        let settings = match self.categories.item_category_settings(store_id) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(
                    "event=category_resolve module=classify status=error store_id={store_id} error_code=settings_unreadable error={err}"
                );
                return None;
            }
        };

        let raw_id = settings.override_for(key)?;
        let Ok(category_id) = Uuid::parse_str(raw_id) else {
            warn!(
                "event=category_resolve module=classify status=error store_id={store_id} error_code=override_id_invalid"
            );
            return Some(CategoryResolution::default_label());
        };

        match self.categories.get_store_category(category_id) {
            Ok(Some(category)) if category.store_id == store_id => Some(CategoryResolution {
                name: category.name,
                source: CategorySource::StoreOverride,
            }),
            Ok(_) => {
                warn!(
                    "event=category_resolve module=classify status=error store_id={store_id} category_id={category_id} error_code=override_category_missing"
                );
                Some(CategoryResolution::default_label())
            }
            Err(err) => {
                warn!(
                    "event=category_resolve module=classify status=error store_id={store_id} category_id={category_id} error_code=override_lookup_failed error={err}"
                );
                Some(CategoryResolution::default_label())
            }
        }
    }
}
