//! Ticket models for the Zendesk API.
//!
//! A [`Ticket`] keeps the typed fields the bridge works with and every other
//! field Zendesk returns, so flattening it back to JSON loses nothing.
//! Fields computed locally (see [`crate::enrich`]) are stored separately and
//! merged in by [`Ticket::to_map`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::common::null_as_default;
use crate::error::BridgeError;

/// Status value Zendesk uses for closed tickets.
pub const STATUS_CLOSED: &str = "closed";

/// A custom field value on a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    /// Remote-assigned field id.
    pub id: u64,

    /// Field value (string, number, bool, list or null depending on the field type).
    #[serde(default)]
    pub value: Value,
}

/// A Zendesk ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique ticket id.
    pub id: u64,

    /// Subject line.
    #[serde(default)]
    pub subject: Option<String>,

    /// First comment body.
    #[serde(default)]
    pub description: Option<String>,

    /// `new`, `open`, `pending`, `hold`, `solved` or `closed`.
    #[serde(default)]
    pub status: Option<String>,

    /// `low`, `normal`, `high` or `urgent`.
    #[serde(default)]
    pub priority: Option<String>,

    /// End user who asked for support.
    #[serde(default)]
    pub requester_id: Option<u64>,

    /// User who submitted the ticket.
    #[serde(default)]
    pub submitter_id: Option<u64>,

    /// Agent the ticket is assigned to.
    #[serde(default)]
    pub assignee_id: Option<u64>,

    /// Brand the ticket is filed under.
    #[serde(default)]
    pub brand_id: Option<u64>,

    /// `user_<id>` of the local user who filed the ticket.
    #[serde(default)]
    pub external_id: Option<String>,

    /// Custom field values.
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_fields: Vec<CustomField>,

    /// Creation timestamp (ISO 8601).
    #[serde(default)]
    pub created_at: Option<String>,

    /// Last update timestamp (ISO 8601).
    #[serde(default)]
    pub updated_at: Option<String>,

    /// Every other field returned by Zendesk, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// Fields joined on locally.
    #[serde(skip)]
    derived: Map<String, Value>,
}

impl Ticket {
    /// Creates a ticket with only an id; mostly useful in tests.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            subject: None,
            description: None,
            status: None,
            priority: None,
            requester_id: None,
            submitter_id: None,
            assignee_id: None,
            brand_id: None,
            external_id: None,
            custom_fields: Vec::new(),
            created_at: None,
            updated_at: None,
            extra: Map::new(),
            derived: Map::new(),
        }
    }

    /// Returns the subject or a placeholder.
    pub fn display_subject(&self) -> &str {
        self.subject.as_deref().unwrap_or("(No subject)")
    }

    /// Returns the status or "unknown".
    pub fn display_status(&self) -> &str {
        self.status.as_deref().unwrap_or("unknown")
    }

    /// Returns true if the status is exactly `closed`.
    pub fn is_closed(&self) -> bool {
        self.status.as_deref() == Some(STATUS_CLOSED)
    }

    /// Returns the value of a custom field, if the ticket carries it.
    pub fn custom_field_value(&self, field_id: u64) -> Option<&Value> {
        self.custom_fields
            .iter()
            .find(|field| field.id == field_id)
            .map(|field| &field.value)
    }

    /// Stores a locally derived field, replacing any previous value.
    pub fn set_derived(&mut self, field: impl Into<String>, value: Value) {
        self.derived.insert(field.into(), value);
    }

    /// Returns a locally derived field.
    pub fn derived(&self, field: &str) -> Option<&Value> {
        self.derived.get(field)
    }

    /// Returns all locally derived fields.
    pub fn derived_fields(&self) -> &Map<String, Value> {
        &self.derived
    }

    /// Flattens the ticket into a plain JSON object.
    ///
    /// Contains every remote field and every derived field. A derived field
    /// with the same name as a remote one wins.
    pub fn to_map(&self) -> Result<Map<String, Value>, BridgeError> {
        let mut map = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            other => {
                return Err(BridgeError::validation(format!(
                    "ticket {} did not serialize to an object: {}",
                    self.id, other
                )))
            }
        };

        for (field, value) in &self.derived {
            map.insert(field.clone(), value.clone());
        }

        Ok(map)
    }
}

/// Response wrapper for single ticket operations.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketResponse {
    /// The ticket.
    pub ticket: Ticket,
}

/// Result of creating a ticket: the ticket and the audit Zendesk recorded.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedTicket {
    /// The created ticket.
    pub ticket: Ticket,

    /// Audit trail of the creation, returned as-is.
    #[serde(default)]
    pub audit: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_json() -> Value {
        json!({
            "id": 35436,
            "subject": "Help, my printer is on fire!",
            "status": "open",
            "priority": "normal",
            "requester_id": 20978392,
            "submitter_id": 20978392,
            "assignee_id": 235323,
            "external_id": "user_42",
            "custom_fields": [{"id": 27642, "value": "Billing"}],
            "created_at": "2020-01-01T00:00:00Z",
            "updated_at": "2020-01-02T00:00:00Z",
            "tags": ["printer", "fire"],
            "url": "https://acme.zendesk.com/api/v2/tickets/35436.json"
        })
    }

    #[test]
    fn test_ticket_deserialize_keeps_unknown_fields() {
        let ticket: Ticket = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(ticket.id, 35436);
        assert_eq!(ticket.requester_id, Some(20978392));
        assert_eq!(ticket.extra.get("tags"), Some(&json!(["printer", "fire"])));
        assert!(ticket.derived_fields().is_empty());
    }

    #[test]
    fn test_ticket_null_custom_fields() {
        let ticket: Ticket =
            serde_json::from_value(json!({"id": 1, "custom_fields": null})).unwrap();
        assert!(ticket.custom_fields.is_empty());
    }

    #[test]
    fn test_custom_field_value() {
        let ticket: Ticket = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(ticket.custom_field_value(27642), Some(&json!("Billing")));
        assert_eq!(ticket.custom_field_value(1), None);
    }

    #[test]
    fn test_to_map_includes_remote_and_derived_fields() {
        let mut ticket: Ticket = serde_json::from_value(sample_json()).unwrap();
        ticket.set_derived("app", json!("Billing"));

        let map = ticket.to_map().unwrap();
        for (key, value) in sample_json().as_object().unwrap() {
            assert_eq!(map.get(key), Some(value), "field {}", key);
        }
        assert_eq!(map.get("app"), Some(&json!("Billing")));
    }

    #[test]
    fn test_is_closed() {
        let mut ticket = Ticket::new(1);
        assert!(!ticket.is_closed());
        ticket.status = Some("closed".to_string());
        assert!(ticket.is_closed());
        assert_eq!(ticket.display_subject(), "(No subject)");
    }
}
