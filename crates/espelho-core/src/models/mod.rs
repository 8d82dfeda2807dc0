//! Data models for Espelho
//!
//! Mirrored entity records use the server's Portuguese wire/column names via
//! serde renames; Rust identifiers stay English.

mod attachment;
mod category;
mod comment;
mod operation;
mod task;
mod user;
mod workspace;

pub use attachment::{Attachment, FileType};
pub use category::Category;
pub use comment::Comment;
pub use operation::{EntityKind, OpType, PendingOperation};
pub use task::{Priority, Recurrence, Status, Task};
pub use user::User;
pub use workspace::Workspace;

use crate::error::Result;

/// A mirrored entity of any kind, used to dispatch store writes.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    User(User),
    Workspace(Workspace),
    Category(Category),
    Task(Task),
    Comment(Comment),
    Attachment(Attachment),
}

impl Record {
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::User(_) => EntityKind::User,
            Self::Workspace(_) => EntityKind::Workspace,
            Self::Category(_) => EntityKind::Category,
            Self::Task(_) => EntityKind::Task,
            Self::Comment(_) => EntityKind::Comment,
            Self::Attachment(_) => EntityKind::Attachment,
        }
    }

    pub const fn id(&self) -> Option<i64> {
        match self {
            Self::User(user) => user.id,
            Self::Workspace(workspace) => workspace.id,
            Self::Category(category) => category.id,
            Self::Task(task) => task.id,
            Self::Comment(comment) => comment.id,
            Self::Attachment(attachment) => attachment.id,
        }
    }

    pub(crate) fn set_id(&mut self, id: i64) {
        match self {
            Self::User(user) => user.id = Some(id),
            Self::Workspace(workspace) => workspace.id = Some(id),
            Self::Category(category) => category.id = Some(id),
            Self::Task(task) => task.id = Some(id),
            Self::Comment(comment) => comment.id = Some(id),
            Self::Attachment(attachment) => attachment.id = Some(id),
        }
    }

    /// Validate required fields for this entity kind
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::User(user) => user.validate(),
            Self::Workspace(workspace) => workspace.validate(),
            Self::Category(category) => category.validate(),
            Self::Task(task) => task.validate(),
            Self::Comment(comment) => comment.validate(),
            Self::Attachment(attachment) => attachment.validate(),
        }
    }

    /// Rebuild a record from a logged payload
    pub fn from_payload(kind: EntityKind, payload: &serde_json::Value) -> Result<Self> {
        Ok(match kind {
            EntityKind::User => Self::User(serde_json::from_value(payload.clone())?),
            EntityKind::Workspace => Self::Workspace(serde_json::from_value(payload.clone())?),
            EntityKind::Category => Self::Category(serde_json::from_value(payload.clone())?),
            EntityKind::Task => Self::Task(serde_json::from_value(payload.clone())?),
            EntityKind::Comment => Self::Comment(serde_json::from_value(payload.clone())?),
            EntityKind::Attachment => Self::Attachment(serde_json::from_value(payload.clone())?),
        })
    }

    /// Serialize the entity state for a pending-operation payload
    pub fn to_payload(&self) -> Result<serde_json::Value> {
        let value = match self {
            Self::User(user) => serde_json::to_value(user),
            Self::Workspace(workspace) => serde_json::to_value(workspace),
            Self::Category(category) => serde_json::to_value(category),
            Self::Task(task) => serde_json::to_value(task),
            Self::Comment(comment) => serde_json::to_value(comment),
            Self::Attachment(attachment) => serde_json::to_value(attachment),
        }?;
        Ok(value)
    }
}

impl From<User> for Record {
    fn from(value: User) -> Self {
        Self::User(value)
    }
}

impl From<Workspace> for Record {
    fn from(value: Workspace) -> Self {
        Self::Workspace(value)
    }
}

impl From<Category> for Record {
    fn from(value: Category) -> Self {
        Self::Category(value)
    }
}

impl From<Task> for Record {
    fn from(value: Task) -> Self {
        Self::Task(value)
    }
}

impl From<Comment> for Record {
    fn from(value: Comment) -> Self {
        Self::Comment(value)
    }
}

impl From<Attachment> for Record {
    fn from(value: Attachment) -> Self {
        Self::Attachment(value)
    }
}
