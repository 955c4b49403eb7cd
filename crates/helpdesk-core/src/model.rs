//! Ticket records as read from the report view.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Closed-date value the view uses for "not closed yet".
pub const CLOSED_DATE_SENTINEL: &str = "1900-01-01";

/// Canonical status derived from the raw composite status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Pending,
    Canceled,
    InProgress,
    Request,
    Resolved,
    Sending,
    RePending,
    Rejected,
}

impl TicketStatus {
    /// Raw status strings with a known mapping.
    pub const KNOWN_RAW: [(&'static str, Self); 9] = [
        ("PENDING", Self::Pending),
        ("FINISHED,MANAGER(APPROVE),IT(PENDING)", Self::Pending),
        ("FINISHED,MANAGER(APPROVE),IT(CANCEL)", Self::Canceled),
        ("FINISHED,MANAGER(APPROVE),IT(IN PROGRESS)", Self::InProgress),
        ("REQUEST", Self::Request),
        ("FINISHED,MANAGER(APPROVE),IT(RESOLVE)", Self::Resolved),
        ("FINISHED,MANAGER(APPROVE),IT(SENDING)", Self::Sending),
        ("FINISHED,MANAGER(APPROVE),IT(REPENDING)", Self::RePending),
        ("REJECT,MANAGER(REJECT)", Self::Rejected),
    ];

    /// Normalize a raw status. Unknown values are `Pending`, never an error.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        Self::KNOWN_RAW
            .iter()
            .find(|(known, _)| *known == raw)
            .map_or(Self::Pending, |(_, status)| *status)
    }

    /// Raw strings that normalize to `self`.
    pub fn raw_values(self) -> impl Iterator<Item = &'static str> {
        Self::KNOWN_RAW
            .iter()
            .filter(move |(_, status)| *status == self)
            .map(|(raw, _)| *raw)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Canceled => "CANCELED",
            Self::InProgress => "IN_PROGRESS",
            Self::Request => "REQUEST",
            Self::Resolved => "RESOLVED",
            Self::Sending => "SENDING",
            Self::RePending => "RE_PENDING",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket priority. Values outside HIGH/MEDIUM/LOW are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    High,
    Medium,
    Low,
    Other(String),
}

impl Priority {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for Priority {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "HIGH" => Self::High,
            "MEDIUM" => Self::Medium,
            "LOW" => Self::Low,
            _ => Self::Other(raw),
        }
    }
}

impl From<Priority> for String {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Priority {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Employee who raised the ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requester {
    pub id: String,
    pub display_name: String,
    pub position: String,
    pub department: String,
    pub branch: String,
}

/// IT staff member handling the ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supporter {
    pub display_name: String,
    pub position: String,
}

/// One row of the report view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRecord {
    pub id: i64,
    pub number: String,
    pub category: String,
    pub priority: Priority,
    pub raw_status: String,
    pub status: TicketStatus,
    pub title: String,
    pub description: String,
    pub requester: Requester,
    pub supporter: Supporter,
    pub created_at: DateTime<Utc>,
    pub closed_date: Option<NaiveDate>,
}

/// Interpret the view's closed-date column.
///
/// The sentinel and blank values mean "not closed". Values carrying a time
/// part (`2024-03-01 00:00:00`, `2024-03-01T00:00:00`) keep only the date.
///
/// # Errors
///
/// Returns the parse error when the value is neither blank, the sentinel,
/// nor a date.
pub fn normalize_closed_date(raw: Option<&str>) -> Result<Option<NaiveDate>, chrono::ParseError> {
    let Some(raw) = raw.map(str::trim) else {
        return Ok(None);
    };
    let date_part = raw.split([' ', 'T']).next().unwrap_or_default();
    if date_part.is_empty() || date_part == CLOSED_DATE_SENTINEL {
        return Ok(None);
    }
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map(Some)
}
