//! JSON output formatting.

use serde::Serialize;
use serde_json::json;

use crate::error::RepsyncError;
use crate::features::sync::QueueEntry;

/// Format queued entries as JSON.
///
/// # Errors
///
/// Returns `RepsyncError::Parse` if JSON serialization fails.
pub fn format_entries_json(entries: &[QueueEntry], total: usize) -> Result<String, RepsyncError> {
    let output = json!({
        "count": entries.len(),
        "total": total,
        "items": entries
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Generic JSON formatter for any serializable type.
///
/// # Errors
///
/// Returns `RepsyncError::Parse` if JSON serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, RepsyncError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::features::sync::{EntryId, Operation};

    #[test]
    fn test_entries_json_shape() {
        let entry = QueueEntry::new(
            EntryId::from("w1"),
            Operation::log_workout("pushups", 20),
            Utc::now(),
        );
        let text = format_entries_json(&[entry], 4).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["count"], 1);
        assert_eq!(value["total"], 4);
        assert_eq!(value["items"][0]["id"], "w1");
        assert_eq!(value["items"][0]["operation"]["type"], "pushups");
        assert_eq!(value["items"][0]["status"], "pending");
    }
}
