//! The persistence contract
//!
//! Every write is a read-modify-write of one document performed while
//! holding that document's lock, so two writers racing on the same ID
//! cannot lose each other's update. Different IDs never block each other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};
use crate::model::{next_request_id, Request, RequestStatus, Submission};

/// Document store for requests, keyed by request ID
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// All requests, newest first
    async fn list(&self) -> StoreResult<Vec<Request>>;

    /// One request
    async fn get(&self, id: &str) -> StoreResult<Request>;

    /// Store a new request
    ///
    /// The store assigns `status`, `submissions`, `createdBy` and
    /// `createdAt`. An empty ID is replaced by the next free `REQ-NNN`;
    /// an ID already in use is a conflict.
    async fn create(&self, request: Request, created_by: &str) -> StoreResult<Request>;

    /// Append a submission, stamping its `createdAt`
    async fn add_submission(&self, id: &str, submission: Submission) -> StoreResult<Request>;

    /// Change the status
    async fn update_status(&self, id: &str, status: RequestStatus) -> StoreResult<Request>;

    /// Shallow-merge `patch` into the document; the ID never changes
    async fn update(&self, id: &str, patch: Map<String, Value>) -> StoreResult<Request>;

    /// Remove a request
    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// Open requests with reminders switched on, newest first
    async fn list_active_reminders(&self) -> StoreResult<Vec<Request>> {
        let mut requests = self.list().await?;
        requests.retain(Request::has_active_reminders);
        Ok(requests)
    }
}

/// Fill in the server-assigned fields of a new request
pub(crate) fn prepare_new<'a, I>(
    mut request: Request,
    created_by: &str,
    existing_ids: I,
    now: DateTime<Utc>,
) -> StoreResult<Request>
where
    I: IntoIterator<Item = &'a str>,
{
    request.validate()?;
    if request.id.trim().is_empty() {
        request.id = next_request_id(existing_ids);
    }
    request.status = RequestStatus::InProgress;
    request.submissions.clear();
    request.created_by = Some(created_by.to_string());
    request.created_at = Some(now);
    Ok(request)
}

/// Append `submission` to `request`
pub(crate) fn apply_submission(
    request: &mut Request,
    mut submission: Submission,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    if submission.department.trim().is_empty() {
        return Err(StoreError::Validation(
            "submission department must not be empty".into(),
        ));
    }
    submission.created_at = Some(now);
    request.submissions.push(submission);
    Ok(())
}

/// Shallow-merge `patch` over `request`, keeping its ID
///
/// The merged document must still be a valid request; otherwise the
/// original is returned untouched through the error.
pub(crate) fn apply_patch(request: &Request, patch: Map<String, Value>) -> StoreResult<Request> {
    let mut document = match serde_json::to_value(request)? {
        Value::Object(map) => map,
        _ => return Err(StoreError::Validation("request is not a JSON object".into())),
    };
    for (key, value) in patch {
        document.insert(key, value);
    }
    document.insert("id".to_string(), Value::String(request.id.clone()));

    let merged: Request = serde_json::from_value(Value::Object(document))?;
    merged.validate()?;
    Ok(merged)
}

/// Newest first; documents without a timestamp sort last
pub(crate) fn sort_newest_first(requests: &mut [Request]) {
    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
