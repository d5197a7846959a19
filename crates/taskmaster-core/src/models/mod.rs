//! Data models for TaskMaster

/// Declare a UUID v7 (time-sortable) identifier newtype.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Create a new unique identifier
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// Wrap an existing UUID
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Get the string representation of this ID
            #[must_use]
            pub fn as_str(&self) -> String {
                self.0.to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self(uuid::Uuid::parse_str(s)?))
            }
        }
    };
}

mod category;
mod entity;
mod sync_conflict;
mod sync_status;
mod task;

pub(crate) use entity::sort_newest_first;

pub use category::{Category, CategoryId};
pub use entity::Entity;
pub use sync_conflict::{detect_task_conflicts, ConflictResolution, SyncConflict, TaskConflict};
pub use sync_status::SyncStatus;
pub use task::{Priority, Task, TaskId};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ids_parse_from_display_form() {
        let task_id = TaskId::new();
        assert_eq!(task_id.to_string().parse::<TaskId>().unwrap(), task_id);

        let category_id = CategoryId::new();
        assert_eq!(
            category_id.to_string().parse::<CategoryId>().unwrap(),
            category_id
        );
    }

    #[test]
    fn test_ids_reject_malformed_input() {
        assert!("not-a-uuid".parse::<TaskId>().is_err());
        assert!("".parse::<CategoryId>().is_err());
    }
}
