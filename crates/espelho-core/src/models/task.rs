//! Task model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Task priority; server default is `media`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "alta")]
    High,
    #[default]
    #[serde(rename = "media")]
    Medium,
    #[serde(rename = "baixa")]
    Low,
    #[serde(rename = "urgente")]
    Urgent,
}

impl Priority {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "alta",
            Self::Medium => "media",
            Self::Low => "baixa",
            Self::Urgent => "urgente",
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
        match s {
            "alta" => Ok(Self::High),
            "media" => Ok(Self::Medium),
            "baixa" => Ok(Self::Low),
            "urgente" => Ok(Self::Urgent),
            other => Err(Error::InvalidInput(format!("unknown priority: {other}"))),
        }
    }
}

/// Task workflow status; server default is `a_fazer`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[serde(rename = "a_fazer")]
    Todo,
    #[serde(rename = "em_andamento")]
    InProgress,
    #[serde(rename = "concluido")]
    Done,
    #[serde(rename = "atrasada")]
    Late,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "a_fazer",
            Self::InProgress => "em_andamento",
            Self::Done => "concluido",
            Self::Late => "atrasada",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "a_fazer" => Ok(Self::Todo),
            "em_andamento" => Ok(Self::InProgress),
            "concluido" => Ok(Self::Done),
            "atrasada" => Ok(Self::Late),
            other => Err(Error::InvalidInput(format!("unknown status: {other}"))),
        }
    }
}

/// Recurrence interval for repeating tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recurrence {
    #[serde(rename = "diaria")]
    Daily,
    #[serde(rename = "semanal")]
    Weekly,
    #[serde(rename = "mensal")]
    Monthly,
}

impl Recurrence {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "diaria",
            Self::Weekly => "semanal",
            Self::Monthly => "mensal",
        }
    }
}

impl FromStr for Recurrence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "diaria" => Ok(Self::Daily),
            "semanal" => Ok(Self::Weekly),
            "mensal" => Ok(Self::Monthly),
            other => Err(Error::InvalidInput(format!("unknown recurrence: {other}"))),
        }
    }
}

/// A task in a workspace.
///
/// Snapshot payloads embed the owning workspace id and linked category ids;
/// locally those live in junction tables and are filled back in on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "id_tarefa")]
    pub id: Option<i64>,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
    /// Due date as received from the server (ISO 8601 text)
    #[serde(rename = "data_fim", default)]
    pub due_date: Option<String>,
    #[serde(rename = "data_criacao", default)]
    pub created_at: Option<String>,
    #[serde(rename = "prioridade", default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
    #[serde(rename = "concluida", default)]
    pub completed: bool,
    #[serde(rename = "recorrente", default)]
    pub recurring: bool,
    #[serde(rename = "recorrencia", default)]
    pub recurrence: Option<Recurrence>,
    #[serde(rename = "id_usuario")]
    pub user_id: i64,
    #[serde(rename = "id_workspace", default)]
    pub workspace_id: Option<i64>,
    #[serde(rename = "categorias", default)]
    pub category_ids: Vec<i64>,
}

impl Task {
    /// Create a new local task with server defaults applied
    pub fn new(title: impl Into<String>, user_id: i64) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: String::new(),
            due_date: None,
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            priority: Priority::default(),
            status: Status::default(),
            completed: false,
            recurring: false,
            recurrence: None,
            user_id,
            workspace_id: None,
            category_ids: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput("task title must not be empty".into()));
        }
        if self.user_id <= 0 {
            return Err(Error::InvalidInput("task requires a valid user id".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_gets_server_defaults() {
        let task = Task::new("Buy milk", 1);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.status, Status::Todo);
        assert!(!task.completed);
        assert!(task.id.is_none());
    }

    #[test]
    fn deserialization_defaults_missing_optionals() {
        let task: Task =
            serde_json::from_str(r#"{"id_tarefa": 5, "titulo": "T", "id_usuario": 1}"#).unwrap();
        assert_eq!(task.description, "");
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.status, Status::Todo);
        assert!(!task.completed);
        assert!(task.category_ids.is_empty());
    }

    #[test]
    fn validate_rejects_blank_title() {
        let task = Task::new("   ", 1);
        assert!(task.validate().is_err());
    }

    #[test]
    fn validate_rejects_missing_user() {
        let task = Task::new("Buy milk", 0);
        assert!(task.validate().is_err());
    }
}
