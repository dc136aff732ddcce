//! Core types for the Car Finder API

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Response header carrying the server-assigned conversation id
pub const CONVERSATION_ID_HEADER: &str = "X-Conversation-ID";

/// Opaque server-assigned conversation correlator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Wrap a raw id. Blank ids are rejected.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == id.len() {
            Some(Self(id))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of a chat request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Serialized as `null` until the server has assigned an id
    pub conversation_id: Option<ConversationId>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, conversation_id: Option<ConversationId>) -> Self {
        Self {
            message: message.into(),
            conversation_id,
        }
    }
}

/// JSON payload of a single `data: ` frame.
///
/// Every field is optional; the server sends `{"content": ...}` for text
/// deltas, `{"event": ...}` for side effects and `{"error": ...}` when the
/// completion backend fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FramePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preference_id: Option<String>,
}

/// One entry of a stored conversation transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

// ============================================================================
// Alerts
// ============================================================================

/// Dealer selling a listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dealer {
    pub name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
}

impl Dealer {
    /// "City, ST", skipping whichever half is missing
    pub fn location(&self) -> String {
        match (self.city.as_deref(), self.state.as_deref()) {
            (Some(city), Some(state)) => format!("{}, {}", city, state),
            (Some(city), None) => city.to_string(),
            (None, Some(state)) => state.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// Vehicle listing attached to an alert
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub vin: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub trim: Option<String>,
    #[serde(default)]
    pub mileage: Option<u64>,
    #[serde(default)]
    pub exterior_color: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub listing_url: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub dealer: Dealer,
}

impl Listing {
    /// Year, make and model joined by spaces, skipping missing parts
    pub fn title(&self) -> String {
        let year = self.year.map(|y| y.to_string());
        [year.as_deref(), self.make.as_deref(), self.model.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A listing that matched one of the user's saved preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    /// Similarity in `[0, 1]`
    pub similarity_score: f64,
    pub listing: Listing,
    #[serde(default, deserialize_with = "utc_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "utc_timestamp")]
    pub viewed_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn is_unseen(&self) -> bool {
        self.viewed_at.is_none()
    }

    /// Similarity as a whole percentage
    pub fn match_percent(&self) -> u8 {
        match_percent(self.similarity_score)
    }
}

/// Query parameters for the alerts feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub limit: u32,
    pub offset: u32,
    pub only_unseen: bool,
}

impl FeedQuery {
    pub const MAX_LIMIT: u32 = 200;

    /// Clamp `limit` into the range the server accepts
    pub fn normalized(mut self) -> Self {
        self.limit = self.limit.clamp(1, Self::MAX_LIMIT);
        self
    }
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            user_id: None,
            limit: 50,
            offset: 0,
            only_unseen: false,
        }
    }
}

/// Aggregate alert counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertStats {
    pub total_alerts: u64,
    pub unseen_alerts: u64,
    #[serde(default)]
    pub alerts_by_day: BTreeMap<String, u64>,
}

/// Response to marking an alert as viewed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkViewed {
    pub status: String,
    #[serde(default, deserialize_with = "utc_timestamp")]
    pub viewed_at: Option<DateTime<Utc>>,
}

/// Accepts RFC 3339 timestamps and offset-less ones, which the server writes
/// for UTC columns.
fn utc_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {:?}: {}", raw, e)))
}

// ============================================================================
// Display helpers
// ============================================================================

/// Format a dollar amount with thousands separators and no cents
pub fn format_price(price: Option<f64>) -> String {
    match price {
        Some(p) if p.is_finite() => {
            let rounded = p.round();
            let sign = if rounded < 0.0 { "-" } else { "" };
            format!("{}${}", sign, group_thousands(rounded.abs() as u64))
        }
        _ => "Price not available".to_string(),
    }
}

/// Format a mileage with thousands separators
pub fn format_mileage(mileage: Option<u64>) -> String {
    match mileage {
        Some(m) => format!("{} miles", group_thousands(m)),
        None => "Mileage not available".to_string(),
    }
}

/// Convert a `[0, 1]` similarity score into a rounded percentage
pub fn match_percent(score: f64) -> u8 {
    if !score.is_finite() {
        return 0;
    }
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
