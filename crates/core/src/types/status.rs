//! Account roles and order status timelines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::LineItemId;

/// Account role chosen at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Buys parts; the only role this client places orders for.
    #[default]
    Buyer,
    /// Lists parts for sale.
    Seller,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buyer => write!(f, "buyer"),
            Self::Seller => write!(f, "seller"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// One status change recorded by the backend for an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub status: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A status event tagged with the line it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub line: Option<LineItemId>,
    pub product_title: Option<String>,
    pub status: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Status events ordered newest first.
///
/// Events without a timestamp are treated as happening now, so they sort
/// ahead of every dated event. Ties keep their input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusTimeline(Vec<TimelineEntry>);

impl StatusTimeline {
    /// Build a timeline from entries in any order.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = TimelineEntry>) -> Self {
        let mut entries: Vec<TimelineEntry> = entries.into_iter().collect();
        entries.sort_by_key(|e| std::cmp::Reverse(e.updated_at.unwrap_or(DateTime::<Utc>::MAX_UTC)));
        Self(entries)
    }

    /// All entries, newest first.
    #[must_use]
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.0
    }

    /// The most recent entry, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&TimelineEntry> {
        self.0.first()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for StatusTimeline {
    type Item = TimelineEntry;
    type IntoIter = std::vec::IntoIter<TimelineEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(status: &str, at: Option<&str>) -> TimelineEntry {
        TimelineEntry {
            line: None,
            product_title: None,
            status: status.to_string(),
            updated_at: at.map(|s| s.parse().unwrap()),
        }
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!("buyer".parse::<Role>().unwrap(), Role::Buyer);
        assert_eq!(Role::Seller.to_string(), "seller");
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_timeline_sorted_newest_first() {
        let timeline = StatusTimeline::from_entries([
            entry("Pending", Some("2025-03-01T10:00:00Z")),
            entry("Delivered", Some("2025-03-05T10:00:00Z")),
            entry("Shipped", Some("2025-03-03T10:00:00Z")),
        ]);
        let statuses: Vec<_> = timeline.entries().iter().map(|e| e.status.as_str()).collect();
        assert_eq!(statuses, ["Delivered", "Shipped", "Pending"]);
        assert_eq!(timeline.latest().unwrap().status, "Delivered");
    }

    #[test]
    fn test_undated_event_sorts_first() {
        let timeline = StatusTimeline::from_entries([
            entry("Pending", Some("2025-03-01T10:00:00Z")),
            entry("Processing", None),
        ]);
        assert_eq!(timeline.latest().unwrap().status, "Processing");
    }

    #[test]
    fn test_status_event_deserializes_camel_case() {
        let event: StatusEvent =
            serde_json::from_str(r#"{"status":"Shipped","updatedAt":"2025-03-03T10:00:00Z"}"#)
                .unwrap();
        assert_eq!(event.status, "Shipped");
        assert!(event.updated_at.is_some());
    }
}
