use super::{Filter, MetadataRow, MetadataStore, StoreError};

/// Metadata store over rows held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadataStore {
    rows: Vec<MetadataRow>,
}

impl InMemoryMetadataStore {
    pub fn new(rows: Vec<MetadataRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<MetadataRow> for InMemoryMetadataStore {
    fn from_iter<I: IntoIterator<Item = MetadataRow>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn select(&self, filter: &Filter<'_>) -> Result<Vec<MetadataRow>, StoreError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect())
    }
}
