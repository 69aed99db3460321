use async_trait::async_trait;
use dashmap::DashMap;
use pinhole_core::error::{StorageError, StorageResult};
use pinhole_core::repository::{Page, Repository, UrlListing, UrlRecord};
use pinhole_core::shortcode::ShortCode;

/// In-memory implementation of the repository seam using DashMap.
///
/// DashMap's sharded locks let concurrent creators and resolvers touch
/// different buckets without blocking each other.
///
/// Semantics of the uniqueness constraint: a code is claimed while an
/// unexpired record holds it, active or not. Expired records read as free
/// and are replaced on insert; [`get`][Repository::get] still returns them
/// so the service layer can distinguish "expired" from "never issued".
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    entries: DashMap<String, UrlRecord>,
}

impl MemoryRepository {
    /// Creates an empty in-memory repository.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Creates a repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity),
        }
    }

    /// Number of stored records, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn insert(&self, record: UrlRecord) -> StorageResult<()> {
        let key = record.code.as_str().to_owned();

        // Check-and-insert: reject while an unexpired record claims the code.
        let existing = self.entries.get(&key);
        if let Some(ref e) = existing {
            if !e.is_expired() {
                return Err(StorageError::Conflict(key));
            }
            // Expired entry. Drop the read guard, then replace below.
            drop(existing);
        }

        self.entries.insert(key, record);
        Ok(())
    }

    async fn get(&self, code: &ShortCode) -> StorageResult<Option<UrlRecord>> {
        Ok(self.entries.get(code.as_str()).map(|e| e.clone()))
    }

    async fn exists(&self, code: &ShortCode) -> StorageResult<bool> {
        Ok(self
            .entries
            .get(code.as_str())
            .is_some_and(|e| !e.is_expired()))
    }

    async fn find_by_target(&self, target_url: &str) -> StorageResult<Option<UrlRecord>> {
        // Full scan; the in-memory backend keeps no secondary index.
        Ok(self
            .entries
            .iter()
            .find(|e| e.is_resolvable() && e.target_url == target_url)
            .map(|e| e.clone()))
    }

    async fn list(&self, page: Page, is_active: Option<bool>) -> StorageResult<UrlListing> {
        let size = page.size.max(1);
        let number = page.number.max(1);

        let mut records: Vec<UrlRecord> = self
            .entries
            .iter()
            .filter(|e| is_active.is_none_or(|want| e.is_active == want))
            .map(|e| e.clone())
            .collect();

        // Newest first; ties broken by code for a stable order.
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.code.as_str().cmp(b.code.as_str()))
        });

        let total = records.len();
        let pages = total.div_ceil(size);
        let records = records
            .into_iter()
            .skip((number - 1) * size)
            .take(size)
            .collect();

        Ok(UrlListing {
            records,
            total,
            page: number,
            size,
            pages,
        })
    }

    async fn increment_clicks(&self, code: &ShortCode) -> StorageResult<bool> {
        let Some(mut entry) = self.entries.get_mut(code.as_str()) else {
            return Ok(false);
        };

        entry.click_count += 1;
        entry.last_accessed_at = Some(jiff::Timestamp::now());
        Ok(true)
    }

    async fn deactivate(&self, code: &ShortCode) -> StorageResult<bool> {
        let Some(mut entry) = self.entries.get_mut(code.as_str()) else {
            return Ok(false);
        };

        entry.is_active = false;
        Ok(true)
    }

    async fn delete(&self, code: &ShortCode) -> StorageResult<bool> {
        Ok(self.entries.remove(code.as_str()).is_some())
    }

    async fn purge_expired(&self) -> StorageResult<usize> {
        let mut purged = 0;
        self.entries.retain(|_, record| {
            if record.is_expired() {
                purged += 1;
                false
            } else {
                true
            }
        });
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::{SignedDuration, Timestamp};

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn record(s: &str, url: &str) -> UrlRecord {
        UrlRecord::new(code(s), url)
    }

    fn expired_record(s: &str, url: &str) -> UrlRecord {
        let mut r = record(s, url);
        r.expires_at = Some(Timestamp::now() - SignedDuration::from_secs(1));
        r
    }

    #[tokio::test]
    async fn insert_and_get() {
        let repo = MemoryRepository::new();
        repo.insert(record("abc234", "https://example.com"))
            .await
            .unwrap();

        let found = repo.get(&code("abc234")).await.unwrap().unwrap();
        assert_eq!(found.target_url, "https://example.com");
        assert_eq!(found.click_count, 0);
        assert!(found.is_active);
    }

    #[tokio::test]
    async fn get_nonexistent() {
        let repo = MemoryRepository::new();
        assert!(repo.get(&code("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_conflict_on_claimed_code() {
        let repo = MemoryRepository::new();
        repo.insert(record("abc234", "https://example.com"))
            .await
            .unwrap();

        let err = repo
            .insert(record("abc234", "https://other.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn deactivated_code_stays_claimed() {
        let repo = MemoryRepository::new();
        repo.insert(record("abc234", "https://example.com"))
            .await
            .unwrap();
        assert!(repo.deactivate(&code("abc234")).await.unwrap());

        // The record no longer resolves but its code is not reusable.
        assert!(repo.exists(&code("abc234")).await.unwrap());
        let err = repo
            .insert(record("abc234", "https://other.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn insert_over_expired_entry() {
        let repo = MemoryRepository::new();
        repo.insert(expired_record("abc234", "https://old.com"))
            .await
            .unwrap();

        repo.insert(record("abc234", "https://new.com"))
            .await
            .unwrap();

        let found = repo.get(&code("abc234")).await.unwrap().unwrap();
        assert_eq!(found.target_url, "https://new.com");
    }

    #[tokio::test]
    async fn expired_code_reads_as_free_but_record_survives() {
        let repo = MemoryRepository::new();
        repo.insert(expired_record("abc234", "https://example.com"))
            .await
            .unwrap();

        assert!(!repo.exists(&code("abc234")).await.unwrap());
        // The row is still readable so callers can answer "expired".
        let found = repo.get(&code("abc234")).await.unwrap().unwrap();
        assert!(found.is_expired());
    }

    #[tokio::test]
    async fn increment_clicks_updates_counters() {
        let repo = MemoryRepository::new();
        repo.insert(record("abc234", "https://example.com"))
            .await
            .unwrap();

        assert!(repo.increment_clicks(&code("abc234")).await.unwrap());
        assert!(repo.increment_clicks(&code("abc234")).await.unwrap());

        let found = repo.get(&code("abc234")).await.unwrap().unwrap();
        assert_eq!(found.click_count, 2);
        assert!(found.last_accessed_at.is_some());
    }

    #[tokio::test]
    async fn increment_clicks_on_missing_code() {
        let repo = MemoryRepository::new();
        assert!(!repo.increment_clicks(&code("nope")).await.unwrap());
    }

    #[tokio::test]
    async fn find_by_target_skips_unresolvable_records() {
        let repo = MemoryRepository::new();
        repo.insert(expired_record("aaa234", "https://example.com"))
            .await
            .unwrap();
        repo.insert(record("bbb234", "https://example.com"))
            .await
            .unwrap();

        let mut inactive = record("ccc234", "https://inactive.com");
        inactive.is_active = false;
        repo.insert(inactive).await.unwrap();

        let found = repo
            .find_by_target("https://example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.code.as_str(), "bbb234");

        assert!(repo
            .find_by_target("https://inactive.com")
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .find_by_target("https://unknown.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn delete_existing_and_missing() {
        let repo = MemoryRepository::new();
        repo.insert(record("abc234", "https://example.com"))
            .await
            .unwrap();

        assert!(repo.delete(&code("abc234")).await.unwrap());
        assert!(repo.get(&code("abc234")).await.unwrap().is_none());
        assert!(!repo.delete(&code("abc234")).await.unwrap());
    }

    #[tokio::test]
    async fn list_paginates_newest_first() {
        let repo = MemoryRepository::new();
        let base = Timestamp::now();
        for i in 0..5u64 {
            let mut r = record(&format!("cde{i:03}"), &format!("https://example{i}.com"));
            // Spread creation times so the ordering is deterministic.
            r.created_at = base - SignedDuration::from_secs(60 * (5 - i as i64));
            repo.insert(r).await.unwrap();
        }

        let listing = repo
            .list(
                Page {
                    number: 1,
                    size: 2,
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(listing.total, 5);
        assert_eq!(listing.pages, 3);
        assert_eq!(listing.records.len(), 2);
        // Highest index was created last, so it lists first.
        assert_eq!(listing.records[0].code.as_str(), "cde004");
        assert_eq!(listing.records[1].code.as_str(), "cde003");

        let last = repo
            .list(
                Page {
                    number: 3,
                    size: 2,
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(last.records.len(), 1);
        assert_eq!(last.records[0].code.as_str(), "cde000");
    }

    #[tokio::test]
    async fn list_filters_by_active_flag() {
        let repo = MemoryRepository::new();
        repo.insert(record("aaa234", "https://a.com")).await.unwrap();
        repo.insert(record("bbb234", "https://b.com")).await.unwrap();
        repo.deactivate(&code("bbb234")).await.unwrap();

        let active = repo
            .list(
                Page {
                    number: 1,
                    size: 10,
                },
                Some(true),
            )
            .await
            .unwrap();
        assert_eq!(active.total, 1);
        assert_eq!(active.records[0].code.as_str(), "aaa234");

        let inactive = repo
            .list(
                Page {
                    number: 1,
                    size: 10,
                },
                Some(false),
            )
            .await
            .unwrap();
        assert_eq!(inactive.total, 1);
        assert_eq!(inactive.records[0].code.as_str(), "bbb234");
    }

    #[tokio::test]
    async fn purge_expired_removes_only_expired() {
        let repo = MemoryRepository::new();
        repo.insert(expired_record("aaa234", "https://a.com"))
            .await
            .unwrap();
        repo.insert(expired_record("bbb234", "https://b.com"))
            .await
            .unwrap();
        repo.insert(record("ccc234", "https://c.com")).await.unwrap();

        assert_eq!(repo.purge_expired().await.unwrap(), 2);
        assert_eq!(repo.len(), 1);
        assert!(repo.get(&code("ccc234")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_inserts_land() {
        use std::sync::Arc;

        let repo = Arc::new(MemoryRepository::new());
        let mut handles = vec![];

        for i in 0..10u64 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.insert(record(
                    &format!("code{i:02}"),
                    &format!("https://example{i}.com"),
                ))
                .await
                .unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..10u64 {
            let found = repo
                .get(&code(&format!("code{i:02}")))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(found.target_url, format!("https://example{i}.com"));
        }
    }
}
