//! Pending-operation model for the mutation log

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Kind of local mutation recorded in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpType {
    #[serde(rename = "CREATE")]
    Create,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
}

impl OpType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!("unknown op type: {other}"))),
        }
    }
}

/// Mirrored entity kind, with its wire name and local table mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "usuario")]
    User,
    #[serde(rename = "workspace")]
    Workspace,
    #[serde(rename = "categoria")]
    Category,
    #[serde(rename = "tarefa")]
    Task,
    #[serde(rename = "comentario")]
    Comment,
    #[serde(rename = "anexo")]
    Attachment,
}

impl EntityKind {
    /// All kinds, in snapshot insert order (parents before children)
    pub const ALL: [Self; 6] = [
        Self::User,
        Self::Workspace,
        Self::Category,
        Self::Task,
        Self::Comment,
        Self::Attachment,
    ];

    /// Wire name carried in pending operations
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "usuario",
            Self::Workspace => "workspace",
            Self::Category => "categoria",
            Self::Task => "tarefa",
            Self::Comment => "comentario",
            Self::Attachment => "anexo",
        }
    }

    /// Local mirrored table backing this kind
    pub const fn table(self) -> &'static str {
        match self {
            Self::User => "usuarios",
            Self::Workspace => "workspace",
            Self::Category => "categorias",
            Self::Task => "tarefas",
            Self::Comment => "comentarios",
            Self::Attachment => "anexos_tarefa",
        }
    }

    /// Primary-key column of the mirrored table
    pub const fn id_column(self) -> &'static str {
        match self {
            Self::User => "id_usuario",
            Self::Workspace => "id_workspace",
            Self::Category => "id_categoria",
            Self::Task => "id_tarefa",
            Self::Comment => "id_comentario",
            Self::Attachment => "id_anexo",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "usuario" => Ok(Self::User),
            "workspace" => Ok(Self::Workspace),
            "categoria" => Ok(Self::Category),
            "tarefa" => Ok(Self::Task),
            "comentario" => Ok(Self::Comment),
            "anexo" => Ok(Self::Attachment),
            other => Err(Error::InvalidInput(format!("unknown entity kind: {other}"))),
        }
    }
}

/// One local mutation awaiting server acknowledgement.
///
/// Field names match the push wire contract exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// Unique operation id (UUID v7, time-sortable)
    pub op_id: String,
    pub op_type: OpType,
    pub entity: EntityKind,
    pub entity_id: i64,
    /// Serialized entity state at mutation time
    pub payload: serde_json::Value,
    /// Monotonic client timestamp (Unix ms); defines upload order
    pub client_ts: i64,
    /// Failed upload cycles this op has been part of; advisory only
    #[serde(default)]
    pub retry_count: u32,
}

impl PendingOperation {
    pub fn new(
        op_type: OpType,
        entity: EntityKind,
        entity_id: i64,
        payload: serde_json::Value,
        client_ts: i64,
    ) -> Self {
        Self {
            op_id: Uuid::now_v7().to_string(),
            op_type,
            entity,
            entity_id,
            payload,
            client_ts,
            retry_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_ids_are_unique() {
        let first = PendingOperation::new(
            OpType::Create,
            EntityKind::Task,
            1,
            serde_json::json!({}),
            1,
        );
        let second = PendingOperation::new(
            OpType::Update,
            EntityKind::Task,
            1,
            serde_json::json!({}),
            2,
        );
        assert_ne!(first.op_id, second.op_id);
    }

    #[test]
    fn wire_shape_matches_contract() {
        let op = PendingOperation::new(
            OpType::Create,
            EntityKind::Task,
            7,
            serde_json::json!({"titulo": "Buy milk"}),
            1_700_000_000_000,
        );
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["op_type"], "CREATE");
        assert_eq!(value["entity"], "tarefa");
        assert_eq!(value["entity_id"], 7);
        assert_eq!(value["payload"]["titulo"], "Buy milk");
        assert_eq!(value["retry_count"], 0);
    }

    #[test]
    fn entity_kind_round_trips_through_str() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
    }
}
