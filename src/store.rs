use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{trace, warn};

use crate::db::now_timestamp;
use crate::errors::{AppError, AppResult};
use crate::models::{ApprovalStamp, RemoteReviews};

/// Durable moderation flags, listing mappings and cached place payloads.
///
/// Every statement runs under the one connection mutex, so at most one store
/// operation executes at a time. No operation touches more than one table.
#[derive(Clone)]
pub struct ReviewStore {
    db: Arc<Mutex<Connection>>,
}

impl ReviewStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.db)
    }

    pub fn set_approval(&self, id: i64, approved: bool) -> AppResult<()> {
        self.set_approval_at(id, approved, now_timestamp())
    }

    pub(crate) fn set_approval_at(&self, id: i64, approved: bool, updated_at: i64) -> AppResult<()> {
        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO approvals (id, approved, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                approved = excluded.approved,
                updated_at = excluded.updated_at",
            params![id, approved, updated_at],
        )?;
        trace!(target: "review_store", id, approved, "approval recorded");
        Ok(())
    }

    pub fn list_approved(&self) -> AppResult<Vec<i64>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare("SELECT id FROM approvals WHERE approved = 1 ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// Approved ids with their last write time. Callers must not depend on
    /// the order.
    pub fn list_approved_with_timestamps(&self) -> AppResult<Vec<ApprovalStamp>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare("SELECT id, updated_at FROM approvals WHERE approved = 1")?;
        let stamps = stmt
            .query_map([], |row| {
                Ok(ApprovalStamp {
                    id: row.get(0)?,
                    updated_at: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stamps)
    }

    pub fn set_place_mapping(&self, listing: &str, place_id: &str) -> AppResult<()> {
        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO place_mappings (listing, place_id) VALUES (?1, ?2)
            ON CONFLICT(listing) DO UPDATE SET place_id = excluded.place_id",
            params![listing, place_id],
        )?;
        trace!(target: "review_store", listing, place_id, "place mapping stored");
        Ok(())
    }

    pub fn get_place_mapping(&self, listing: &str) -> AppResult<Option<String>> {
        let conn = self.db.lock();
        let place_id: Option<Option<String>> = conn
            .query_row(
                "SELECT place_id FROM place_mappings WHERE listing = ?1",
                [listing],
                |row| row.get(0),
            )
            .optional()?;
        Ok(place_id.flatten())
    }

    /// Hard delete; a missing listing is a no-op. Returns whether a row was
    /// removed.
    pub fn delete_place_mapping(&self, listing: &str) -> AppResult<bool> {
        let conn = self.db.lock();
        let removed = conn.execute("DELETE FROM place_mappings WHERE listing = ?1", [listing])?;
        Ok(removed > 0)
    }

    pub fn set_google_cache(&self, place_id: &str, payload: &RemoteReviews) -> AppResult<()> {
        self.set_google_cache_at(place_id, payload, now_timestamp())
    }

    pub(crate) fn set_google_cache_at(
        &self,
        place_id: &str,
        payload: &RemoteReviews,
        fetched_at: i64,
    ) -> AppResult<()> {
        let encoded = serde_json::to_string(payload)?;
        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO google_cache (place_id, payload, fetched_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(place_id) DO UPDATE SET
                payload = excluded.payload,
                fetched_at = excluded.fetched_at",
            params![place_id, encoded, fetched_at],
        )?;
        Ok(())
    }

    /// Cached payload for `place_id`, or `None` when missing, older than
    /// `ttl_secs`, or no longer decodable.
    pub fn get_google_cache(&self, place_id: &str, ttl_secs: i64) -> AppResult<Option<RemoteReviews>> {
        self.get_google_cache_at(place_id, ttl_secs, now_timestamp())
    }

    pub(crate) fn get_google_cache_at(
        &self,
        place_id: &str,
        ttl_secs: i64,
        now: i64,
    ) -> AppResult<Option<RemoteReviews>> {
        let row: Option<(Option<String>, Option<i64>)> = {
            let conn = self.db.lock();
            conn.query_row(
                "SELECT payload, fetched_at FROM google_cache WHERE place_id = ?1",
                [place_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(AppError::from)?
        };

        let Some((payload, fetched_at)) = row else {
            return Ok(None);
        };
        let fetched_at = fetched_at.unwrap_or(0);
        if now - fetched_at > ttl_secs {
            trace!(target: "review_store", place_id, fetched_at, ttl_secs, "cache entry stale");
            return Ok(None);
        }

        let Some(payload) = payload else {
            return Ok(None);
        };
        match serde_json::from_str::<RemoteReviews>(&payload) {
            Ok(decoded) => Ok(Some(decoded)),
            Err(err) => {
                warn!(target: "review_store", place_id, error = %err, "discarding undecodable cache payload");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::bootstrap;
    use crate::models::{PlaceSummary, Review};
    use tempfile::{tempdir, TempDir};

    fn open_store() -> (TempDir, ReviewStore) {
        let dir = tempdir().unwrap();
        let ctx = bootstrap(dir.path(), "store.db").unwrap();
        (dir, ReviewStore::new(Arc::new(Mutex::new(ctx.connection))))
    }

    fn sample_payload() -> RemoteReviews {
        RemoteReviews {
            reviews: vec![Review {
                id: Some(-1),
                listing: Some("Shoreditch Loft".into()),
                review_type: None,
                channel: "Google".into(),
                date: Some("a week ago".into()),
                review_text: Some("Spotless".into()),
                categories: Default::default(),
                rating: Some(5),
                status: Some("published".into()),
                guest_name: Some("Ana".into()),
            }],
            place: PlaceSummary {
                name: Some("Shoreditch Loft".into()),
                address: Some("1 Test St".into()),
            },
        }
    }

    fn approval_rows(store: &ReviewStore, id: i64) -> i64 {
        let conn = store.connection();
        let count: i64 = conn
            .lock()
            .query_row("SELECT COUNT(*) FROM approvals WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .unwrap();
        count
    }

    #[test]
    fn approval_upsert_is_idempotent() {
        let (_dir, store) = open_store();
        store.set_approval(7, true).unwrap();
        let first = store.list_approved_with_timestamps().unwrap();
        store.set_approval(7, true).unwrap();
        let second = store.list_approved_with_timestamps().unwrap();

        assert_eq!(store.list_approved().unwrap(), vec![7]);
        assert_eq!(approval_rows(&store, 7), 1);
        assert!(second[0].updated_at >= first[0].updated_at);
    }

    #[test]
    fn approval_overwrites_flag_and_timestamp() {
        let (_dir, store) = open_store();
        store.set_approval_at(3, true, 100).unwrap();
        store.set_approval_at(4, true, 100).unwrap();
        store.set_approval_at(3, false, 200).unwrap();

        assert_eq!(store.list_approved().unwrap(), vec![4]);
        assert_eq!(approval_rows(&store, 3), 1);

        store.set_approval_at(3, true, 300).unwrap();
        let mut stamps = store.list_approved_with_timestamps().unwrap();
        stamps.sort_by_key(|stamp| stamp.id);
        assert_eq!(
            stamps,
            vec![
                ApprovalStamp { id: 3, updated_at: 300 },
                ApprovalStamp { id: 4, updated_at: 100 },
            ]
        );
    }

    #[test]
    fn place_mapping_round_trip_and_overwrite() {
        let (_dir, store) = open_store();
        store.set_place_mapping("Loft", "P1").unwrap();
        assert_eq!(store.get_place_mapping("Loft").unwrap().as_deref(), Some("P1"));

        store.set_place_mapping("Loft", "P2").unwrap();
        assert_eq!(store.get_place_mapping("Loft").unwrap().as_deref(), Some("P2"));

        let conn = store.connection();
        let count: i64 = conn
            .lock()
            .query_row(
                "SELECT COUNT(*) FROM place_mappings WHERE listing = 'Loft'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn deleting_mapping_is_idempotent() {
        let (_dir, store) = open_store();
        store.set_place_mapping("Loft", "P1").unwrap();
        assert!(store.delete_place_mapping("Loft").unwrap());
        assert!(!store.delete_place_mapping("Loft").unwrap());
        assert_eq!(store.get_place_mapping("Loft").unwrap(), None);
        assert!(!store.delete_place_mapping("unknown").unwrap());
    }

    #[test]
    fn cache_entry_expires_after_ttl() {
        let (_dir, store) = open_store();
        let payload = sample_payload();
        store.set_google_cache_at("ChIJ1", &payload, 1_000).unwrap();

        for ttl in [0, 60, 86_400] {
            assert_eq!(
                store.get_google_cache_at("ChIJ1", ttl, 1_000 + ttl).unwrap(),
                Some(payload.clone())
            );
            assert_eq!(store.get_google_cache_at("ChIJ1", ttl, 1_001 + ttl).unwrap(), None);
        }
    }

    #[test]
    fn fresh_write_revives_stale_entry() {
        let (_dir, store) = open_store();
        let payload = sample_payload();
        store.set_google_cache_at("ChIJ1", &payload, 0).unwrap();
        assert_eq!(store.get_google_cache("ChIJ1", 60).unwrap(), None);

        store.set_google_cache("ChIJ1", &payload).unwrap();
        assert_eq!(store.get_google_cache("ChIJ1", 60).unwrap(), Some(payload));
    }

    #[test]
    fn missing_or_corrupt_cache_is_absent() {
        let (_dir, store) = open_store();
        assert_eq!(store.get_google_cache("nowhere", 86_400).unwrap(), None);

        let conn = store.connection();
        conn.lock()
            .execute(
                "INSERT INTO google_cache (place_id, payload, fetched_at) VALUES ('bad', '{not json', ?1)",
                [now_timestamp()],
            )
            .unwrap();
        assert_eq!(store.get_google_cache("bad", 86_400).unwrap(), None);
    }
}
