//! Uniform result envelope returned by every repository operation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a repository operation.
///
/// The set is closed; callers branch on it instead of on errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Unclassified outcome.
    Unknown,
    /// The operation completed.
    Success,
    /// The request was malformed.
    InvalidRequest,
    /// A lookup found no entity.
    EntityIsNull,
    /// The entity changed underneath the caller.
    EntityIsChanged,
    /// The operation is not allowed for this input (e.g. save with an id).
    InvalidOperation,
    /// The collection is too large to return unpaginated.
    TooManyRecords,
    /// A collection read matched nothing.
    CollectionIsEmpty,
    /// The supplied version does not match the stored one.
    InvalidVersion,
    /// The targeted entity does not exist.
    NotFound,
}

impl Status {
    /// Stable numeric code of the status.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Unknown => -1,
            Self::Success => 1,
            Self::InvalidRequest => 2,
            Self::EntityIsNull => 3,
            Self::EntityIsChanged => 4,
            Self::InvalidOperation => 5,
            Self::TooManyRecords => 6,
            Self::CollectionIsEmpty => 7,
            Self::InvalidVersion => 8,
            Self::NotFound => 9,
        }
    }
}

/// Pagination metadata attached to collection reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Page number the read was asked for (zero-based).
    pub offset: i64,
    /// Page size the read was served with.
    pub limit: i64,
    /// Total number of matching documents.
    pub total_count: i64,
}

impl Pagination {
    /// Creates pagination metadata.
    #[must_use]
    pub fn new(offset: i64, limit: i64, total_count: i64) -> Self {
        Self {
            offset,
            limit,
            total_count,
        }
    }
}

/// Result of one repository operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome<T> {
    /// What happened.
    pub status: Status,
    /// Payload, if any.
    pub data: Option<T>,
    /// Pagination metadata for collection reads.
    pub pagination: Option<Pagination>,
    /// Correlation id of the calling context.
    pub trace_id: Option<Uuid>,
    /// Human-readable detail.
    pub description: Option<String>,
    /// Error messages for the caller.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl<T> Outcome<T> {
    /// Creates an outcome with the given status and nothing else.
    #[must_use]
    pub fn new(status: Status) -> Self {
        Self {
            status,
            data: None,
            pagination: None,
            trace_id: None,
            description: None,
            errors: Vec::new(),
        }
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }

    /// Sets pagination metadata.
    #[must_use]
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Sets the trace id.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: Option<Uuid>) -> Self {
        self.trace_id = trace_id;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the error list.
    #[must_use]
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }

    /// Returns `true` if the status is `Success`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}
