//! In-memory campaign log.

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use super::error::ToolError;

/// One entry of the campaign log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignLogEntry {
    pub id: u64,
    pub title: String,
    pub content: String,
    /// Session date, `YYYY-MM-DD`.
    pub date: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only campaign log shared by the log tools.
#[derive(Debug, Default)]
pub struct CampaignLog {
    entries: RwLock<Vec<CampaignLogEntry>>,
}

impl CampaignLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. `date` defaults to today.
    pub fn create(
        &self,
        title: &str,
        content: &str,
        date: Option<&str>,
    ) -> Result<CampaignLogEntry, ToolError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ToolError::invalid_arguments("title must not be empty"));
        }

        let date = match date.map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| {
                    ToolError::invalid_arguments(format!("date '{raw}' is not YYYY-MM-DD: {e}"))
                })?
                .to_string(),
            None => Utc::now().date_naive().to_string(),
        };

        let mut entries = self.entries.write();
        let entry = CampaignLogEntry {
            id: entries.len() as u64 + 1,
            title: title.to_string(),
            content: content.to_string(),
            date,
            created_at: Utc::now(),
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    /// Most recently created entry.
    pub fn last(&self) -> Result<CampaignLogEntry, ToolError> {
        self.entries
            .read()
            .last()
            .cloned()
            .ok_or_else(|| ToolError::not_found("the campaign log is empty"))
    }

    /// Up to `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<CampaignLogEntry> {
        self.entries.read().iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
