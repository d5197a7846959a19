//! Task model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CategoryId, Entity};
use crate::error::{Error, Result};
use crate::util::now_millis;

entity_id!(
    /// A unique identifier for a task, using UUID v7 (time-sortable)
    TaskId
);

/// Priority levels for tasks, ordered `Low < Medium < High`
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Wire representation
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(Error::InvalidData(format!("unknown priority '{other}'"))),
        }
    }
}

/// A task owned by the signed-in user
///
/// Serialized with the document field names used by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier, never changes after creation
    pub id: TaskId,
    /// Display title (non-empty)
    pub title: String,
    /// Optional free-form description
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_completed: bool,
    /// Weak reference to a category; never an ownership edge
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Creation timestamp (immutable)
    pub created_at: DateTime<Utc>,
    /// Last update timestamp, advanced on every write
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new, incomplete, medium-priority task
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: TaskId::new(),
            title: title.into(),
            description: None,
            priority: Priority::default(),
            due_date: None,
            is_completed: false,
            category_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub const fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    #[must_use]
    pub const fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Advance `updated_at` to now, never moving it backwards.
    pub fn touch(&mut self) {
        self.stamp_updated(now_millis());
    }

    /// Flip the completion flag and advance `updated_at`.
    pub fn toggle_completion(&mut self) {
        self.is_completed = !self.is_completed;
        self.touch();
    }

    /// Incomplete and past its due date
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed && self.due_date.is_some_and(|due| due < now)
    }

    /// Case-insensitive substring match against title and description.
    ///
    /// An empty (or whitespace-only) query matches every task.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        self.title.to_lowercase().contains(&query)
            || self
                .description
                .as_deref()
                .is_some_and(|description| description.to_lowercase().contains(&query))
    }
}

impl Entity for Task {
    type Id = TaskId;

    const COLLECTION: &'static str = "tasks";
    const KIND: &'static str = "task";

    fn id(&self) -> TaskId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidData("task title cannot be empty".into()));
        }
        if self.updated_at < self.created_at {
            return Err(Error::InvalidData(format!(
                "task {} was updated before it was created",
                self.id
            )));
        }
        Ok(())
    }

    fn stamp_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.updated_at).max(self.created_at);
    }
}
