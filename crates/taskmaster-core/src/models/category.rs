//! Category model

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::Entity;
use crate::error::{Error, Result};
use crate::util::now_millis;

entity_id!(
    /// A unique identifier for a category
    CategoryId
);

/// A user-owned grouping for tasks
///
/// Tasks reference categories weakly: deleting a category leaves any task
/// pointing at it with a dangling `category_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Hex colour such as `#FF5733`
    #[serde(rename = "colorHex")]
    pub color: String,
    /// Icon identifier understood by the presentation layer
    #[serde(rename = "iconName")]
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

impl Category {
    #[must_use]
    pub fn new(name: impl Into<String>, color: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            id: CategoryId::new(),
            name: name.into(),
            color: color.into(),
            icon: icon.into(),
            created_at: now_millis(),
        }
    }
}

fn hex_color_regex() -> &'static Regex {
    static HEX_COLOR: OnceLock<Regex> = OnceLock::new();
    HEX_COLOR
        .get_or_init(|| Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("Invalid regex"))
}

impl Entity for Category {
    type Id = CategoryId;

    const COLLECTION: &'static str = "categories";
    const KIND: &'static str = "category";

    fn id(&self) -> CategoryId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidData("category name cannot be empty".into()));
        }
        if !hex_color_regex().is_match(self.color.trim()) {
            return Err(Error::InvalidData(format!(
                "category color '{}' is not a hex color",
                self.color
            )));
        }
        Ok(())
    }
}
