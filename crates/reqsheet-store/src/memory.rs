//! In-memory request store
//!
//! Each document sits behind its own `tokio::sync::Mutex`; the map of
//! documents is only locked long enough to find or insert an entry, so a
//! slow writer on one request never blocks others.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};

use crate::error::{StoreError, StoreResult};
use crate::model::{Request, RequestStatus, Submission};
use crate::store::{apply_patch, apply_submission, prepare_new, sort_newest_first, RequestStore};

/// A document slot; `None` once deleted
type Slot = Arc<Mutex<Option<Request>>>;

/// Request store kept in process memory
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Slot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with existing documents (kept as they are)
    pub fn with_requests(requests: impl IntoIterator<Item = Request>) -> Self {
        let documents = requests
            .into_iter()
            .map(|r| (r.id.clone(), Arc::new(Mutex::new(Some(r)))))
            .collect();
        Self {
            documents: RwLock::new(documents),
        }
    }

    async fn slot(&self, id: &str) -> StoreResult<Slot> {
        self.documents
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Read-modify-write of one document under its lock
    ///
    /// `change` edits a copy; the stored document is replaced only when it
    /// succeeds.
    async fn modify<F>(&self, id: &str, change: F) -> StoreResult<Request>
    where
        F: FnOnce(&mut Request) -> StoreResult<()> + Send,
    {
        let slot = self.slot(id).await?;
        let mut guard = slot.lock().await;
        let current = guard.as_ref().ok_or_else(|| {
            StoreError::Conflict(format!("request {} was deleted concurrently", id))
        })?;

        let mut updated = current.clone();
        change(&mut updated)?;
        *guard = Some(updated.clone());
        Ok(updated)
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn list(&self) -> StoreResult<Vec<Request>> {
        let slots: Vec<Slot> = self.documents.read().await.values().cloned().collect();
        let mut requests = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(request) = slot.lock().await.clone() {
                requests.push(request);
            }
        }
        sort_newest_first(&mut requests);
        Ok(requests)
    }

    async fn get(&self, id: &str) -> StoreResult<Request> {
        let slot = self.slot(id).await?;
        let request = slot.lock().await.clone();
        request.ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create(&self, request: Request, created_by: &str) -> StoreResult<Request> {
        let mut documents = self.documents.write().await;
        let request = prepare_new(
            request,
            created_by,
            documents.keys().map(String::as_str),
            Utc::now(),
        )?;
        if documents.contains_key(&request.id) {
            return Err(StoreError::Conflict(format!(
                "request {} already exists",
                request.id
            )));
        }

        documents.insert(request.id.clone(), Arc::new(Mutex::new(Some(request.clone()))));
        tracing::info!(id = %request.id, "request created");
        Ok(request)
    }

    async fn add_submission(&self, id: &str, submission: Submission) -> StoreResult<Request> {
        let department = submission.department.clone();
        let updated = self
            .modify(id, |request| apply_submission(request, submission, Utc::now()))
            .await?;
        tracing::info!(id, department = %department, "submission added");
        Ok(updated)
    }

    async fn update_status(&self, id: &str, status: RequestStatus) -> StoreResult<Request> {
        self.modify(id, |request| {
            request.status = status;
            Ok(())
        })
        .await
    }

    async fn update(&self, id: &str, patch: Map<String, Value>) -> StoreResult<Request> {
        self.modify(id, |request| {
            *request = apply_patch(request, patch)?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let slot = self.slot(id).await?;
        // Wait for in-flight writers before removing
        let mut guard = slot.lock().await;
        if guard.take().is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.documents.write().await.remove(id);
        tracing::info!(id, "request deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReminderFrequency, Reminders};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let first = store
            .create(Request::new("One", ["A"]), "alice")
            .await
            .unwrap();
        let second = store
            .create(Request::new("Two", ["A"]), "alice")
            .await
            .unwrap();

        assert_eq!(first.id, "REQ-001");
        assert_eq!(second.id, "REQ-002");
        assert_eq!(store.get("REQ-002").await.unwrap().title, "Two");
    }

    #[tokio::test]
    async fn test_create_with_taken_id_conflicts() {
        let store = MemoryStore::new();
        let mut request = Request::new("One", ["A"]);
        request.id = "REQ-010".into();
        store.create(request.clone(), "alice").await.unwrap();

        let result = store.create(request, "bob").await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_missing_request() {
        let store = MemoryStore::new();
        assert!(matches!(store.get("REQ-001").await, Err(StoreError::NotFound(_))));
        let result = store
            .add_submission("REQ-001", Submission::new("HR", Vec::new()))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete("REQ-001").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_update_leaves_document() {
        let store = MemoryStore::new();
        let created = store
            .create(Request::new("One", ["A"]), "alice")
            .await
            .unwrap();

        let patch = json!({"title": ""}).as_object().unwrap().clone();
        let result = store.update(&created.id, patch).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert_eq!(store.get(&created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_lists_open_requests_with_reminders() {
        let store = MemoryStore::new();
        let mut with_reminders = Request::new("Weekly stock", ["A"]);
        with_reminders.reminders = Some(Reminders {
            enabled: true,
            frequency: ReminderFrequency::Weekly,
        });
        let open = store.create(with_reminders.clone(), "alice").await.unwrap();
        let closed = store.create(with_reminders, "alice").await.unwrap();
        store
            .update_status(&closed.id, RequestStatus::Completed)
            .await
            .unwrap();
        store
            .create(Request::new("No reminders", ["A"]), "alice")
            .await
            .unwrap();

        let ids: Vec<String> = store
            .list_active_reminders()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![open.id]);
    }

    #[tokio::test]
    async fn test_exhausted_id_range_conflicts() {
        let store = MemoryStore::new();
        let mut last = Request::new("Last", ["A"]);
        last.id = "REQ-18446744073709551615".into();
        store.create(last, "alice").await.unwrap();

        let result = store.create(Request::new("Next", ["A"]), "alice").await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_status_and_delete() {
        let store = MemoryStore::new();
        let created = store
            .create(Request::new("One", ["A"]), "alice")
            .await
            .unwrap();

        let updated = store
            .update_status(&created.id, RequestStatus::Completed)
            .await
            .unwrap();
        assert_eq!(updated.status, RequestStatus::Completed);

        store.delete(&created.id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }
}
