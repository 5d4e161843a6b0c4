//! In-memory [`RemoteStore`] implementation for testing and local runs.
//!
//! Rows live in a `BTreeMap` behind `std::sync::RwLock`. Archived rows are
//! kept but hidden from [`query`](RemoteStore::query), mirroring how the
//! hosted table soft-deletes pages.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;

use super::{BookProperties, RemoteRow, RemoteStore, StoreResult};

struct StoredRow {
    row: RemoteRow,
    archived: bool,
}

/// In-memory remote table.
pub struct InMemoryStore {
    rows: RwLock<BTreeMap<String, StoredRow>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    /// Seed a row as if it had been written by an earlier run (or by hand).
    ///
    /// Returns the row id.
    pub fn seed(&self, row: RemoteRow) -> String {
        let id = row.id.clone();
        self.rows
            .write()
            .unwrap()
            .insert(id.clone(), StoredRow { row, archived: false });
        id
    }

    /// Number of rows that have not been archived.
    pub fn live_count(&self) -> usize {
        self.rows.read().unwrap().values().filter(|r| !r.archived).count()
    }

    /// Number of archived rows.
    pub fn archived_count(&self) -> usize {
        self.rows.read().unwrap().values().filter(|r| r.archived).count()
    }

    /// Look up a row by id, including archived rows.
    pub fn get(&self, id: &str) -> Option<RemoteRow> {
        self.rows.read().unwrap().get(id).map(|r| r.row.clone())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(id: &str) -> StoreError {
    StoreError::Protocol {
        status: Some(404),
        body: format!("row {} not found", id),
    }
}

fn to_row(id: String, properties: &BookProperties) -> RemoteRow {
    RemoteRow {
        id,
        title: Some(properties.title.clone()),
        average: Some(properties.average),
        favorites: Some(f64::from(properties.favorites)),
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn query(&self) -> StoreResult<Vec<RemoteRow>> {
        let rows = self.rows.read().unwrap();
        Ok(rows
            .values()
            .filter(|r| !r.archived)
            .map(|r| r.row.clone())
            .collect())
    }

    async fn create(&self, properties: &BookProperties) -> StoreResult<RemoteRow> {
        let row = to_row(Uuid::new_v4().to_string(), properties);
        self.rows.write().unwrap().insert(
            row.id.clone(),
            StoredRow {
                row: row.clone(),
                archived: false,
            },
        );
        Ok(row)
    }

    async fn update(&self, id: &str, properties: &BookProperties) -> StoreResult<RemoteRow> {
        let mut rows = self.rows.write().unwrap();
        match rows.get_mut(id) {
            Some(stored) if !stored.archived => {
                stored.row = to_row(id.to_string(), properties);
                Ok(stored.row.clone())
            }
            _ => Err(not_found(id)),
        }
    }

    async fn archive(&self, id: &str) -> StoreResult<RemoteRow> {
        let mut rows = self.rows.write().unwrap();
        match rows.get_mut(id) {
            Some(stored) => {
                stored.archived = true;
                Ok(stored.row.clone())
            }
            None => Err(not_found(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(title: &str, average: f64, favorites: u32) -> BookProperties {
        BookProperties {
            title: title.to_string(),
            average,
            favorites,
        }
    }

    #[tokio::test]
    async fn create_then_query() {
        let store = InMemoryStore::new();
        let created = store.create(&props("Dune", 4.5, 2)).await.unwrap();
        let rows = store.query().await.unwrap();
        assert_eq!(rows, vec![created.clone()]);
        assert_eq!(created.title.as_deref(), Some("Dune"));
        assert_eq!(created.favorites, Some(2.0));
    }

    #[tokio::test]
    async fn update_replaces_properties() {
        let store = InMemoryStore::new();
        let created = store.create(&props("Dune", 4.0, 1)).await.unwrap();
        store
            .update(&created.id, &props("Dune", 4.5, 2))
            .await
            .unwrap();
        let row = store.get(&created.id).unwrap();
        assert_eq!(row.average, Some(4.5));
        assert_eq!(row.favorites, Some(2.0));
    }

    #[tokio::test]
    async fn archive_hides_row() {
        let store = InMemoryStore::new();
        let created = store.create(&props("Dune", 4.0, 1)).await.unwrap();
        store.archive(&created.id).await.unwrap();
        assert!(store.query().await.unwrap().is_empty());
        assert_eq!(store.archived_count(), 1);
        assert_eq!(store.live_count(), 0);
    }

    #[tokio::test]
    async fn unknown_id_is_protocol_error() {
        let store = InMemoryStore::new();
        let err = store.update("missing", &props("Dune", 4.0, 1)).await.unwrap_err();
        assert!(!err.is_transient());
        assert!(matches!(err, StoreError::Protocol { status: Some(404), .. }));
        assert!(store.archive("missing").await.is_err());
    }
}
