//! The persisted request document
//!
//! A request is stored as one JSON document. Field names are camelCase on
//! the wire; fields this crate does not know about are kept in
//! [`Request::extra`] and written back unchanged.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use reqsheet_core::{GridModel, Provenance};

use crate::error::{StoreError, StoreResult};
use crate::notice::is_valid_email;

/// One grid row as stored: column name to value
pub type RowData = Map<String, Value>;

/// Prefix of generated request IDs
pub const REQUEST_ID_PREFIX: &str = "REQ-";

/// File format the recipients are asked to respond in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequestFormat {
    #[default]
    Excel,
    Word,
    #[serde(rename = "PDF")]
    Pdf,
}

/// Lifecycle state of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequestStatus {
    #[default]
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

/// How often reminders go out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderFrequency {
    Hourly,
    #[default]
    Daily,
    /// Every other day
    Alternate,
    Weekly,
}

impl ReminderFrequency {
    /// Time between two reminders
    pub fn interval(self) -> Duration {
        match self {
            ReminderFrequency::Hourly => Duration::hours(1),
            ReminderFrequency::Daily => Duration::days(1),
            ReminderFrequency::Alternate => Duration::days(2),
            ReminderFrequency::Weekly => Duration::weeks(1),
        }
    }
}

/// Reminder settings of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reminders {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub frequency: ReminderFrequency,
}

impl Reminders {
    /// When the next reminder after `last` is due, if reminders are on
    pub fn next_after(&self, last: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.enabled.then(|| last + self.frequency.interval())
    }
}

/// A template document attached to a request (content is a data URL)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFile {
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub content: String,
}

/// Rows contributed by one department
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub department: String,
    #[serde(default)]
    pub rows: Vec<RowData>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_file: Option<Value>,
    /// Set by the store when the submission is appended
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// A submission holding the given rows
    pub fn new(department: impl Into<String>, rows: Vec<RowData>) -> Self {
        Self {
            department: department.into(),
            rows,
            completed: false,
            response_file: None,
            created_at: None,
        }
    }

    /// Mark the submission as the department's final answer
    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }

    /// A submission from every row of `grid` that was not part of the template
    pub fn from_grid(department: impl Into<String>, grid: &GridModel) -> Self {
        let rows = grid
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| !matches!(row.provenance(), Some(Provenance::Template)))
            .filter_map(|(index, _)| row_data(grid, index))
            .collect();
        Self::new(department, rows)
    }
}

/// A data request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub departments: Vec<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub format: RequestFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub initial_rows: Vec<RowData>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders: Option<Reminders>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_file: Option<TemplateFile>,
    /// Fields not modelled above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Request {
    /// A new request with the given title and grid columns
    pub fn new<I, S>(title: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: String::new(),
            title: title.into(),
            departments: Vec::new(),
            emails: Vec::new(),
            format: RequestFormat::default(),
            deadline: None,
            instructions: String::new(),
            columns: columns.into_iter().map(Into::into).collect(),
            initial_rows: Vec::new(),
            submissions: Vec::new(),
            status: RequestStatus::default(),
            created_by: None,
            created_at: None,
            reminders: None,
            template_content: None,
            email_subject: None,
            email_body: None,
            template_file: None,
            extra: Map::new(),
        }
    }

    /// Check the fields a store relies on
    pub fn validate(&self) -> StoreResult<()> {
        if self.title.trim().is_empty() {
            return Err(StoreError::Validation("title must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.is_empty() {
                return Err(StoreError::Validation("column names must not be empty".into()));
            }
            if !seen.insert(column.as_str()) {
                return Err(StoreError::Validation(format!(
                    "duplicate column '{}'",
                    column
                )));
            }
        }

        if let Some(bad) = self.emails.iter().find(|e| !is_valid_email(e)) {
            return Err(StoreError::Validation(format!("invalid e-mail '{}'", bad)));
        }
        Ok(())
    }

    /// Reminders are switched on and the request is still open
    pub fn has_active_reminders(&self) -> bool {
        self.status != RequestStatus::Completed
            && self.reminders.map_or(false, |r| r.enabled)
    }

    /// When the next reminder after `last` is due, if any
    pub fn next_reminder_after(&self, last: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.has_active_reminders() {
            return None;
        }
        self.reminders.and_then(|r| r.next_after(last))
    }

    /// Numeric part of a generated ID (`REQ-007` is 7)
    pub fn id_number(&self) -> Option<u64> {
        parse_request_id(&self.id)
    }

    /// Rebuild the editing grid: template rows first, then each
    /// submission's rows, each tagged with where it came from
    ///
    /// Values for names that are not columns of the request are ignored.
    pub fn to_grid(&self) -> StoreResult<GridModel> {
        let mut grid = GridModel::with_columns(self.columns.iter().cloned())?;

        for row in &self.initial_rows {
            push_row(&mut grid, row, Provenance::Template)?;
        }
        for submission in &self.submissions {
            for row in &submission.rows {
                push_row(&mut grid, row, Provenance::submission(&submission.department))?;
            }
        }
        Ok(grid)
    }

    /// Replace the template rows with the rows of `grid`
    pub fn set_initial_rows(&mut self, grid: &GridModel) {
        self.columns = grid.column_names().into_iter().map(String::from).collect();
        self.initial_rows = (0..grid.row_count())
            .filter_map(|index| row_data(grid, index))
            .collect();
    }
}

/// Parse the number out of a `REQ-NNN` ID
pub fn parse_request_id(id: &str) -> Option<u64> {
    let digits = id.strip_prefix(REQUEST_ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Next free `REQ-NNN` ID: one past the highest existing number
///
/// IDs not in `REQ-NNN` form are ignored. The number is zero-padded to
/// three digits and grows beyond that when needed.
pub fn next_request_id<'a, I>(existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing
        .into_iter()
        .filter_map(parse_request_id)
        .max()
        .unwrap_or(0);
    format!("{}{:03}", REQUEST_ID_PREFIX, max.saturating_add(1))
}

/// Text of a stored value as a grid cell
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn push_row(grid: &mut GridModel, row: &RowData, provenance: Provenance) -> StoreResult<()> {
    let values: Vec<(String, String)> = row
        .iter()
        .filter(|(name, _)| grid.has_column(name))
        .map(|(name, value)| (name.clone(), cell_text(value)))
        .collect();
    grid.push_record(values, Some(provenance))?;
    Ok(())
}

fn row_data(grid: &GridModel, index: usize) -> Option<RowData> {
    let record = grid.record_at(index)?;
    Some(
        record
            .into_iter()
            .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Request {
        serde_json::from_value(json!({
            "id": "REQ-004",
            "title": "Office supplies",
            "departments": ["Finance", "HR"],
            "emails": ["a@example.com"],
            "format": "PDF",
            "columns": ["Item", "Qty"],
            "initialRows": [{"Item": "Paper", "Qty": 10}],
            "submissions": [
                {"department": "HR", "rows": [{"Item": "Pens", "Qty": "3", "Note": "x"}], "completed": true}
            ],
            "status": "In Progress",
            "reminders": {"enabled": true, "frequency": "alternate"},
            "priority": "high"
        }))
        .unwrap()
    }

    #[test]
    fn test_document_round_trip_keeps_unknown_fields() {
        let request = sample();
        assert_eq!(request.format, RequestFormat::Pdf);
        assert_eq!(request.extra.get("priority"), Some(&json!("high")));

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["priority"], json!("high"));
        assert_eq!(value["status"], json!("In Progress"));
        assert_eq!(value["initialRows"][0]["Qty"], json!(10));
        assert_eq!(value["reminders"]["frequency"], json!("alternate"));
    }

    #[test]
    fn test_to_grid_tags_provenance() {
        let grid = sample().to_grid().unwrap();

        assert_eq!(grid.column_names(), vec!["Item", "Qty"]);
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.get(0, "Qty").unwrap(), "10");
        assert_eq!(grid.get(1, "Item").unwrap(), "Pens");
        assert_eq!(grid.row(0).unwrap().provenance(), Some(&Provenance::Template));
        assert_eq!(
            grid.row(1).unwrap().provenance(),
            Some(&Provenance::submission("HR"))
        );
    }

    #[test]
    fn test_submission_from_grid_skips_template_rows() {
        let mut grid = sample().to_grid().unwrap();
        grid.add_row(None).unwrap();
        grid.set_cell(2, "Item", "Stapler").unwrap();

        let submission = Submission::from_grid("Finance", &grid);
        assert_eq!(submission.rows.len(), 2);
        assert_eq!(submission.rows[1]["Item"], json!("Stapler"));
        assert_eq!(submission.rows[1]["Qty"], json!(""));
    }

    #[test]
    fn test_next_request_id() {
        assert_eq!(next_request_id(Vec::<&str>::new()), "REQ-001");
        assert_eq!(next_request_id(["REQ-002", "REQ-010", "custom"]), "REQ-011");
        assert_eq!(next_request_id(["REQ-999"]), "REQ-1000");
        assert_eq!(next_request_id(["REQ-", "REQ-x1"]), "REQ-001");
        // The highest number is reused; the store then reports a conflict
        assert_eq!(
            next_request_id(["REQ-18446744073709551615"]),
            "REQ-18446744073709551615"
        );
    }

    #[test]
    fn test_active_reminders() {
        let mut request = sample();
        assert!(request.has_active_reminders());

        request.status = RequestStatus::Completed;
        assert!(!request.has_active_reminders());
        assert_eq!(request.next_reminder_after(Utc::now()), None);

        let mut request = sample();
        request.reminders = Some(Reminders {
            enabled: false,
            frequency: ReminderFrequency::Daily,
        });
        assert!(!request.has_active_reminders());

        request.reminders = None;
        assert!(!request.has_active_reminders());
    }

    #[test]
    fn test_validate() {
        let mut request = Request::new("Budget", ["A", "B"]);
        assert!(request.validate().is_ok());

        request.columns.push("A".into());
        assert!(matches!(request.validate(), Err(StoreError::Validation(_))));

        let mut request = Request::new("Budget", ["A"]);
        request.emails.push("not-an-email".into());
        assert!(matches!(request.validate(), Err(StoreError::Validation(_))));

        let request = Request::new("  ", ["A"]);
        assert!(matches!(request.validate(), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_reminder_schedule() {
        let start = DateTime::parse_from_rfc3339("2024-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let reminders = Reminders {
            enabled: true,
            frequency: ReminderFrequency::Alternate,
        };
        assert_eq!(
            reminders.next_after(start).unwrap().to_rfc3339(),
            "2024-03-03T09:00:00+00:00"
        );
        assert_eq!(Reminders::default().next_after(start), None);
    }
}
