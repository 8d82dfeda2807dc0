//! Comment model

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A comment left on a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "id_comentario")]
    pub id: Option<i64>,
    /// Author's email
    pub email: String,
    #[serde(rename = "id_tarefa")]
    pub task_id: i64,
    #[serde(rename = "descricao")]
    pub body: String,
    #[serde(rename = "data_criacao", default)]
    pub created_at: Option<String>,
    #[serde(rename = "data_atualizacao", default)]
    pub updated_at: Option<String>,
}

impl Comment {
    pub fn new(email: impl Into<String>, task_id: i64, body: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: None,
            email: email.into(),
            task_id,
            body: body.into(),
            created_at: Some(now.clone()),
            updated_at: Some(now),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(Error::InvalidInput("comment requires an author email".into()));
        }
        if self.task_id <= 0 {
            return Err(Error::InvalidInput("comment requires a valid task id".into()));
        }
        if self.body.trim().is_empty() {
            return Err(Error::InvalidInput("comment body must not be empty".into()));
        }
        Ok(())
    }
}
