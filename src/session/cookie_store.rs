//! Backing store for the `tower-sessions` cookie layer.
//!
//! Records only map a browser cookie to a [`SessionStore`](super::SessionStore)
//! key. They carry an inactivity expiry and are purged by
//! [`ExpiredDeletion::delete_expired`] on the same sweep that evicts idle
//! sessions, so neither map outlives the other.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tower_sessions::cookie::time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store;
use tower_sessions::{ExpiredDeletion, SessionStore as CookieSessionStore};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct CookieRecordStore {
    records: Arc<Mutex<HashMap<Id, Record>>>,
}

impl CookieRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records currently held, expired or not
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

fn is_active(record: &Record) -> bool {
    record.expiry_date > OffsetDateTime::now_utc()
}

#[async_trait]
impl CookieSessionStore for CookieRecordStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let mut records = self.records.lock();
        while records.contains_key(&record.id) {
            record.id = Id::default();
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.records.lock().insert(record.id, record.clone());
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        Ok(self
            .records
            .lock()
            .get(session_id)
            .filter(|record| is_active(record))
            .cloned())
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.records.lock().remove(session_id);
        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for CookieRecordStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| is_active(record));
        let removed = before - records.len();
        if removed > 0 {
            debug!(removed, remaining = records.len(), "Deleted expired cookie records");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_sessions::cookie::time::Duration;

    fn record(expires_in: Duration) -> Record {
        Record {
            id: Id::default(),
            data: Default::default(),
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_expired_records_are_deleted() {
        let store = CookieRecordStore::new();
        let mut live = record(Duration::minutes(30));
        let mut stale = record(Duration::seconds(-1));
        store.create(&mut live).await.unwrap();
        store.create(&mut stale).await.unwrap();
        assert_eq!(store.len(), 2);

        store.delete_expired().await.unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.load(&live.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_record_not_loaded() {
        let store = CookieRecordStore::new();
        let mut stale = record(Duration::seconds(-1));
        store.create(&mut stale).await.unwrap();

        assert!(store.load(&stale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = CookieRecordStore::new();
        let mut live = record(Duration::minutes(5));
        store.create(&mut live).await.unwrap();

        store.delete(&live.id).await.unwrap();
        assert!(store.is_empty());
    }
}
