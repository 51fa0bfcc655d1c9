//! Joins locally derived fields onto tickets and flattens them for display.
//!
//! An [`EnrichmentSpec`] is an ordered list of `(field, Derivation)` pairs.
//! Each derivation is either a function of the whole ticket or of its id,
//! picked when the spec is built.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::BridgeError;
use crate::models::{parse_external_id, Ticket};

/// Field holding the close timestamp.
pub const FIELD_CLOSED_AT: &str = "closed_at";

/// Field holding the application name custom field value.
pub const FIELD_APP: &str = "app";

/// Field holding the local user id.
pub const FIELD_USER_ID: &str = "user_id";

type TicketFn = Box<dyn Fn(&Ticket) -> Value + Send + Sync>;
type IdFn = Box<dyn Fn(u64) -> Value + Send + Sync>;

/// How a derived field is computed.
pub enum Derivation {
    /// Computed from the whole ticket.
    FromTicket(TicketFn),
    /// Computed from the ticket id only.
    FromId(IdFn),
}

impl Derivation {
    /// Evaluates the derivation for one ticket.
    pub fn apply(&self, ticket: &Ticket) -> Value {
        match self {
            Derivation::FromTicket(f) => f(ticket),
            Derivation::FromId(f) => f(ticket.id),
        }
    }
}

impl fmt::Debug for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Derivation::FromTicket(_) => f.write_str("FromTicket(..)"),
            Derivation::FromId(_) => f.write_str("FromId(..)"),
        }
    }
}

/// Ordered set of derived fields to join onto tickets.
#[derive(Debug, Default)]
pub struct EnrichmentSpec {
    entries: Vec<(String, Derivation)>,
}

impl EnrichmentSpec {
    /// Creates an empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// The fields every ticket listing carries: `closed_at`, `app`, `user_id`.
    pub fn standard(app_field_id: Option<u64>) -> Self {
        Self::new()
            .from_ticket(FIELD_CLOSED_AT, |ticket| {
                ticket_closed_at(ticket).map_or(Value::Null, Value::from)
            })
            .from_ticket(FIELD_APP, move |ticket| {
                ticket_app(ticket, app_field_id)
                    .cloned()
                    .unwrap_or(Value::Null)
            })
            .from_ticket(FIELD_USER_ID, |ticket| {
                system_user_id(ticket).map_or(Value::Null, Value::from)
            })
    }

    /// Adds a field computed from the whole ticket.
    pub fn from_ticket<F>(mut self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Ticket) -> Value + Send + Sync + 'static,
    {
        self.entries
            .push((field.into(), Derivation::FromTicket(Box::new(f))));
        self
    }

    /// Adds a field computed from the ticket id.
    pub fn from_id<F>(mut self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(u64) -> Value + Send + Sync + 'static,
    {
        self.entries
            .push((field.into(), Derivation::FromId(Box::new(f))));
        self
    }

    /// Returns the field names in registration order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(field, _)| field.as_str())
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no fields are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Applies every derivation in `spec` to every ticket, in place.
pub fn join_params_to_tickets(tickets: &mut [Ticket], spec: &EnrichmentSpec) {
    for ticket in tickets.iter_mut() {
        for (field, derivation) in &spec.entries {
            let value = derivation.apply(ticket);
            ticket.set_derived(field.clone(), value);
        }
    }
}

/// Flattens tickets into plain JSON objects, keeping remote and derived fields.
pub fn tickets_as_array(tickets: &[Ticket]) -> Result<Vec<Map<String, Value>>, BridgeError> {
    tickets.iter().map(Ticket::to_map).collect()
}

/// Returns `updated_at` for closed tickets, `None` otherwise.
pub fn ticket_closed_at(ticket: &Ticket) -> Option<&str> {
    if ticket.is_closed() {
        ticket.updated_at.as_deref()
    } else {
        None
    }
}

/// Returns the value of the application name custom field.
pub fn ticket_app(ticket: &Ticket, app_field_id: Option<u64>) -> Option<&Value> {
    app_field_id.and_then(|field_id| ticket.custom_field_value(field_id))
}

/// Returns the local user id encoded in the ticket's external id.
///
/// Malformed external ids yield `None` and are logged.
pub fn system_user_id(ticket: &Ticket) -> Option<u64> {
    let external_id = ticket.external_id.as_deref().filter(|id| !id.is_empty())?;

    let parsed = parse_external_id(external_id);
    if parsed.is_none() {
        tracing::warn!(
            ticket_id = ticket.id,
            external_id = %external_id,
            "Ticket has a malformed external_id"
        );
    }
    parsed
}
