//! Workspace model

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A workspace grouping tasks and categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(rename = "id_workspace")]
    pub id: Option<i64>,
    #[serde(rename = "nome")]
    pub name: String,
    /// Shared team workspace rather than a personal one
    #[serde(rename = "equipe", default)]
    pub team: bool,
    /// Email of the creating user
    #[serde(rename = "criador")]
    pub creator: String,
}

impl Workspace {
    pub fn new(name: impl Into<String>, creator: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            team: false,
            creator: creator.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("workspace name must not be empty".into()));
        }
        if self.creator.trim().is_empty() {
            return Err(Error::InvalidInput("workspace requires a creator".into()));
        }
        Ok(())
    }
}
