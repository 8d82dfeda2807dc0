//! Category model

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A category within a workspace; names are unique per workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "id_categoria")]
    pub id: Option<i64>,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "id_workspace")]
    pub workspace_id: i64,
}

impl Category {
    pub fn new(name: impl Into<String>, workspace_id: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            workspace_id,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("category name must not be empty".into()));
        }
        if self.workspace_id <= 0 {
            return Err(Error::InvalidInput(
                "category requires a valid workspace id".into(),
            ));
        }
        Ok(())
    }
}
