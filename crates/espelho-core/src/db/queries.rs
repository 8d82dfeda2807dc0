//! Read-only projections for the presentation layer
//!
//! Never mutates and never triggers a sync; callers needing freshness must
//! invoke the sync path explicitly first.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::{Attachment, Category, Comment, Task, User, Workspace};

use super::store::{
    load_task_links, parse_attachment, parse_category, parse_comment, parse_task, parse_user,
    parse_workspace, ATTACHMENT_COLUMNS, CATEGORY_COLUMNS, COMMENT_COLUMNS, TASK_COLUMNS,
    USER_COLUMNS, WORKSPACE_COLUMNS,
};
use super::{LocalStore, Mirrored};

/// A task enriched with its linked categories
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDetail {
    pub task: Mirrored<Task>,
    pub categories: Vec<Category>,
}

/// Row counts per mirrored table plus the mutation log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub users: u64,
    pub workspaces: u64,
    pub categories: u64,
    pub tasks: u64,
    pub comments: u64,
    pub attachments: u64,
    pub pending_operations: u64,
}

impl TableCounts {
    /// Total mirrored rows, excluding the mutation log
    pub const fn mirrored_total(&self) -> u64 {
        self.users
            + self.workspaces
            + self.categories
            + self.tasks
            + self.comments
            + self.attachments
    }
}

/// Read-only query surface over a [`LocalStore`]
pub struct QueryFacade<'a> {
    store: &'a LocalStore,
}

impl<'a> QueryFacade<'a> {
    pub const fn new(store: &'a LocalStore) -> Self {
        Self { store }
    }

    /// Tasks owned by a user, newest first
    pub fn tasks_by_user(&self, user_id: i64) -> Result<Vec<Mirrored<Task>>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tarefas WHERE id_usuario = ?1
                 ORDER BY updated_at DESC, id_tarefa DESC"
            ))?;
            let tasks = stmt
                .query_map(params![user_id], parse_task)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            fill_links(conn, tasks)
        })
    }

    /// Tasks linked to a workspace, newest first
    pub fn tasks_by_workspace(&self, workspace_id: i64) -> Result<Vec<Mirrored<Task>>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {columns} FROM tarefas t
                 JOIN tarefa_workspace tw ON t.id_tarefa = tw.id_tarefa
                 WHERE tw.id_workspace = ?1
                 ORDER BY t.updated_at DESC, t.id_tarefa DESC",
                columns = qualified(TASK_COLUMNS, "t")
            ))?;
            let tasks = stmt
                .query_map(params![workspace_id], parse_task)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            fill_links(conn, tasks)
        })
    }

    /// One task with its linked categories
    pub fn task_by_id(&self, task_id: i64) -> Result<Option<TaskDetail>> {
        self.store.with_conn(|conn| {
            let mirrored = conn
                .query_row(
                    &format!("SELECT {TASK_COLUMNS} FROM tarefas WHERE id_tarefa = ?1"),
                    params![task_id],
                    parse_task,
                )
                .optional()?;

            let Some(mut mirrored) = mirrored else {
                return Ok(None);
            };
            load_task_links(conn, &mut mirrored.record)?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {columns} FROM categorias c
                 JOIN tarefa_categoria tc ON c.id_categoria = tc.id_categoria
                 WHERE tc.id_tarefa = ?1
                 ORDER BY c.nome",
                columns = qualified(CATEGORY_COLUMNS, "c")
            ))?;
            let categories = stmt
                .query_map(params![task_id], parse_category)?
                .collect::<rusqlite::Result<Vec<_>>>()?
                .into_iter()
                .map(|m| m.record)
                .collect();

            Ok(Some(TaskDetail {
                task: mirrored,
                categories,
            }))
        })
    }

    /// Workspaces a user belongs to
    pub fn workspaces_by_user(&self, email: &str) -> Result<Vec<Mirrored<Workspace>>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {columns} FROM workspace w
                 JOIN usuario_workspace uw ON w.id_workspace = uw.id_workspace
                 WHERE uw.email = ?1
                 ORDER BY w.nome",
                columns = qualified(WORKSPACE_COLUMNS, "w")
            ))?;
            let workspaces = stmt
                .query_map(params![email], parse_workspace)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(workspaces)
        })
    }

    pub fn categories_by_workspace(&self, workspace_id: i64) -> Result<Vec<Mirrored<Category>>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CATEGORY_COLUMNS} FROM categorias WHERE id_workspace = ?1 ORDER BY nome"
            ))?;
            let categories = stmt
                .query_map(params![workspace_id], parse_category)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(categories)
        })
    }

    /// Comments on a task in creation order
    pub fn comments_by_task(&self, task_id: i64) -> Result<Vec<Mirrored<Comment>>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COMMENT_COLUMNS} FROM comentarios WHERE id_tarefa = ?1
                 ORDER BY id_comentario"
            ))?;
            let comments = stmt
                .query_map(params![task_id], parse_comment)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(comments)
        })
    }

    pub fn attachments_by_task(&self, task_id: i64) -> Result<Vec<Mirrored<Attachment>>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ATTACHMENT_COLUMNS} FROM anexos_tarefa WHERE id_tarefa = ?1
                 ORDER BY id_anexo"
            ))?;
            let attachments = stmt
                .query_map(params![task_id], parse_attachment)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(attachments)
        })
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<Mirrored<User>>> {
        self.store.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM usuarios WHERE email = ?1"),
                    params![email],
                    parse_user,
                )
                .optional()?)
        })
    }

    /// Per-table row counts
    pub fn table_counts(&self) -> Result<TableCounts> {
        self.store.with_conn(|conn| {
            Ok(TableCounts {
                users: count(conn, "usuarios")?,
                workspaces: count(conn, "workspace")?,
                categories: count(conn, "categorias")?,
                tasks: count(conn, "tarefas")?,
                comments: count(conn, "comentarios")?,
                attachments: count(conn, "anexos_tarefa")?,
                pending_operations: count(conn, "pending_operations")?,
            })
        })
    }

    /// Whether any snapshot or local write has populated the mirror
    pub fn has_local_data(&self) -> Result<bool> {
        Ok(self.table_counts()?.mirrored_total() > 0)
    }
}

fn count(conn: &Connection, table: &str) -> Result<u64> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(u64::try_from(count).unwrap_or(0))
}

fn fill_links(
    conn: &Connection,
    mut tasks: Vec<Mirrored<Task>>,
) -> Result<Vec<Mirrored<Task>>> {
    for task in &mut tasks {
        load_task_links(conn, &mut task.record)?;
    }
    Ok(tasks)
}

/// Prefix every column in a comma-separated list with a table alias
fn qualified(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|column| format!("{alias}.{}", column.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
