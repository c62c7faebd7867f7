//! Per-call caller context.

use uuid::Uuid;

/// Actor name recorded in history when the caller is not identified.
pub const ANONYMOUS_ACTOR: &str = "anonymous";

/// Identity and correlation data supplied by whoever invokes the repository.
///
/// Both fields are optional: background jobs have no actor, and not every
/// caller propagates a trace id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerContext {
    /// The acting user, attributed in audit history.
    pub actor: Option<String>,
    /// Correlation id copied onto every returned outcome.
    pub trace_id: Option<Uuid>,
}

impl CallerContext {
    /// Creates a context for the given actor and trace id.
    #[must_use]
    pub fn new(actor: impl Into<String>, trace_id: Uuid) -> Self {
        Self {
            actor: Some(actor.into()),
            trace_id: Some(trace_id),
        }
    }

    /// A context with neither actor nor trace id.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The actor name to record in history.
    #[must_use]
    pub fn actor_or_anonymous(&self) -> &str {
        self.actor.as_deref().unwrap_or(ANONYMOUS_ACTOR)
    }
}
