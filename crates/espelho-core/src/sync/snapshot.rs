//! Snapshot replace: pull fresh server state wholesale
//!
//! The incoming payload is authoritative. Application is all-or-nothing: a
//! failed apply leaves the previous mirror fully intact, so the UI keeps
//! showing the last known-good state.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::db::store::{clear_mirror, stamp_last_sync};
use crate::db::LocalStore;
use crate::error::{Error, Result};
use crate::models::{Attachment, Category, Comment, EntityKind, Task, User, Workspace};
use crate::util::unix_millis_now;

/// Full-state export from the server, keyed by entity kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub workspaces: Vec<Workspace>,
    #[serde(rename = "categorias", default)]
    pub categories: Vec<Category>,
    #[serde(rename = "tarefas", default)]
    pub tasks: Vec<Task>,
    #[serde(rename = "comentarios", default)]
    pub comments: Vec<Comment>,
    #[serde(rename = "anexos", default)]
    pub attachments: Vec<Attachment>,
    #[serde(rename = "usuarios", default)]
    pub users: Vec<User>,
    /// Acting user; keys the derived user–workspace memberships
    pub user_email: String,
}

/// Row counts written by one snapshot apply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotStats {
    pub users: usize,
    pub workspaces: usize,
    pub categories: usize,
    pub tasks: usize,
    pub comments: usize,
    pub attachments: usize,
}

impl SnapshotStats {
    pub const fn total(&self) -> usize {
        self.users
            + self.workspaces
            + self.categories
            + self.tasks
            + self.comments
            + self.attachments
    }
}

/// Replaces the local mirror with a server snapshot inside one transaction
pub struct SnapshotApplier<'a> {
    store: &'a LocalStore,
}

impl<'a> SnapshotApplier<'a> {
    pub const fn new(store: &'a LocalStore) -> Self {
        Self { store }
    }

    /// Apply the snapshot, committing only if every step succeeds.
    ///
    /// Pending operations are untouched: local edits are still owed to the
    /// server regardless of what the snapshot contained.
    pub fn apply(&self, snapshot: &Snapshot) -> Result<SnapshotStats> {
        let now = unix_millis_now();

        let stats = self.store.with_tx(|tx| {
            clear_mirror(tx)?;

            for user in &snapshot.users {
                replace_user(tx, user, now)?;
            }
            for workspace in &snapshot.workspaces {
                let id = replace_workspace(tx, workspace, now)?;
                // every workspace in the snapshot belongs to the acting user
                tx.execute(
                    "INSERT OR IGNORE INTO usuario_workspace (email, id_workspace) VALUES (?1, ?2)",
                    params![snapshot.user_email, id],
                )?;
            }
            for category in &snapshot.categories {
                replace_category(tx, category, now)?;
            }
            for task in &snapshot.tasks {
                replace_task(tx, task, now)?;
            }
            for comment in &snapshot.comments {
                replace_comment(tx, comment, now)?;
            }
            for attachment in &snapshot.attachments {
                replace_attachment(tx, attachment, now)?;
            }

            for kind in EntityKind::ALL {
                stamp_last_sync(tx, kind.table(), now)?;
            }

            Ok(SnapshotStats {
                users: snapshot.users.len(),
                workspaces: snapshot.workspaces.len(),
                categories: snapshot.categories.len(),
                tasks: snapshot.tasks.len(),
                comments: snapshot.comments.len(),
                attachments: snapshot.attachments.len(),
            })
        })?;

        tracing::info!(total = stats.total(), "snapshot applied");
        Ok(stats)
    }
}

fn require_id(kind: EntityKind, id: Option<i64>) -> Result<i64> {
    id.ok_or_else(|| Error::InvalidInput(format!("snapshot {kind} record is missing its id")))
}

// Snapshot rows keep their server identity: row id = server id, dirty = 0.

fn replace_user(conn: &Connection, user: &User, now: i64) -> Result<()> {
    let id = require_id(EntityKind::User, user.id)?;
    conn.execute(
        "INSERT OR REPLACE INTO usuarios
         (id_usuario, email, senha, telefone, nome, pontos, server_id, dirty, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?1, 0, ?7)",
        params![
            id,
            user.email,
            user.password_hash,
            user.phone,
            user.name,
            user.points,
            now
        ],
    )?;
    Ok(())
}

fn replace_workspace(conn: &Connection, workspace: &Workspace, now: i64) -> Result<i64> {
    let id = require_id(EntityKind::Workspace, workspace.id)?;
    conn.execute(
        "INSERT OR REPLACE INTO workspace
         (id_workspace, nome, equipe, criador, server_id, dirty, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?1, 0, ?5)",
        params![id, workspace.name, workspace.team, workspace.creator, now],
    )?;
    Ok(id)
}

fn replace_category(conn: &Connection, category: &Category, now: i64) -> Result<()> {
    let id = require_id(EntityKind::Category, category.id)?;
    conn.execute(
        "INSERT OR REPLACE INTO categorias
         (id_categoria, nome, id_workspace, server_id, dirty, updated_at)
         VALUES (?1, ?2, ?3, ?1, 0, ?4)",
        params![id, category.name, category.workspace_id, now],
    )?;
    Ok(())
}

fn replace_task(conn: &Connection, task: &Task, now: i64) -> Result<()> {
    let id = require_id(EntityKind::Task, task.id)?;
    conn.execute(
        "INSERT OR REPLACE INTO tarefas
         (id_tarefa, titulo, descricao, data_fim, data_criacao, prioridade, status,
          concluida, recorrente, recorrencia, id_usuario, server_id, dirty, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?1, 0, ?12)",
        params![
            id,
            task.title,
            task.description,
            task.due_date,
            task.created_at,
            task.priority.as_str(),
            task.status.as_str(),
            task.completed,
            task.recurring,
            task.recurrence.map(|r| r.as_str()),
            task.user_id,
            now
        ],
    )?;

    // junction rows re-derived from the relationships embedded in the payload;
    // referenced workspace/category ids are not checked against the snapshot
    if let Some(workspace_id) = task.workspace_id {
        conn.execute(
            "INSERT OR IGNORE INTO tarefa_workspace (id_tarefa, id_workspace) VALUES (?1, ?2)",
            params![id, workspace_id],
        )?;
    }
    for category_id in &task.category_ids {
        conn.execute(
            "INSERT OR IGNORE INTO tarefa_categoria (id_tarefa, id_categoria) VALUES (?1, ?2)",
            params![id, category_id],
        )?;
    }
    Ok(())
}

fn replace_comment(conn: &Connection, comment: &Comment, now: i64) -> Result<()> {
    let id = require_id(EntityKind::Comment, comment.id)?;
    conn.execute(
        "INSERT OR REPLACE INTO comentarios
         (id_comentario, email, id_tarefa, descricao, data_criacao, data_atualizacao,
          server_id, dirty, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?1, 0, ?7)",
        params![
            id,
            comment.email,
            comment.task_id,
            comment.body,
            comment.created_at,
            comment.updated_at,
            now
        ],
    )?;
    Ok(())
}

fn replace_attachment(conn: &Connection, attachment: &Attachment, now: i64) -> Result<()> {
    let id = require_id(EntityKind::Attachment, attachment.id)?;
    conn.execute(
        "INSERT OR REPLACE INTO anexos_tarefa
         (id_anexo, id_tarefa, tipo_arquivo, nome_arquivo, nome_original, tamanho_arquivo,
          caminho_arquivo, data_upload, data_atualizacao, server_id, dirty, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?1, 0, ?10)",
        params![
            id,
            attachment.task_id,
            attachment.file_type.as_str(),
            attachment.file_name,
            attachment.original_name,
            attachment.size_bytes,
            attachment.path,
            attachment.uploaded_at,
            attachment.updated_at,
            now
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::QueryFacade;
    use crate::models::Task;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn setup() -> LocalStore {
        LocalStore::open_in_memory().unwrap()
    }

    fn sample_snapshot() -> Snapshot {
        serde_json::from_value(json!({
            "user_email": "a@b.c",
            "workspaces": [
                {"id_workspace": 2, "nome": "Projects", "equipe": false, "criador": "a@b.c"}
            ],
            "categorias": [
                {"id_categoria": 3, "nome": "urgent", "id_workspace": 2}
            ],
            "tarefas": [
                {"id_tarefa": 5, "titulo": "Task five", "id_usuario": 1,
                 "id_workspace": 2, "categorias": [3]}
            ],
            "comentarios": [
                {"id_comentario": 8, "email": "a@b.c", "id_tarefa": 5, "descricao": "hi"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn apply_populates_mirror_and_links() {
        let store = setup();
        let stats = SnapshotApplier::new(&store)
            .apply(&sample_snapshot())
            .unwrap();
        assert_eq!(stats.total(), 4);

        let facade = QueryFacade::new(&store);
        let tasks = facade.tasks_by_workspace(2).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].record.id, Some(5));
        assert!(!tasks[0].dirty);
        assert_eq!(tasks[0].server_id, Some(5));

        let detail = facade.task_by_id(5).unwrap().unwrap();
        assert_eq!(detail.categories.len(), 1);
        assert_eq!(detail.categories[0].name, "urgent");

        let workspaces = facade.workspaces_by_user("a@b.c").unwrap();
        assert_eq!(workspaces.len(), 1);
    }

    #[test]
    fn apply_defaults_missing_optional_fields() {
        let store = setup();
        SnapshotApplier::new(&store)
            .apply(&sample_snapshot())
            .unwrap();

        let facade = QueryFacade::new(&store);
        let task = facade.task_by_id(5).unwrap().unwrap().task.record;
        assert_eq!(task.description, "");
        assert_eq!(task.priority.as_str(), "media");
        assert_eq!(task.status.as_str(), "a_fazer");
        assert!(!task.completed);
    }

    #[test]
    fn apply_is_idempotent() {
        let store = setup();
        let applier = SnapshotApplier::new(&store);
        applier.apply(&sample_snapshot()).unwrap();
        let first = dump_state(&store);

        applier.apply(&sample_snapshot()).unwrap();
        assert_eq!(dump_state(&store), first);
    }

    #[test]
    fn apply_replaces_prior_mirror_wholesale() {
        let store = setup();
        store.create(Task::new("Local-only", 1)).unwrap();

        SnapshotApplier::new(&store)
            .apply(&sample_snapshot())
            .unwrap();

        let facade = QueryFacade::new(&store);
        let counts = facade.table_counts().unwrap();
        assert_eq!(counts.tasks, 1);
        // local edits are still owed to the server
        assert_eq!(counts.pending_operations, 1);
    }

    #[test]
    fn malformed_record_rolls_back_entirely() {
        let store = setup();
        SnapshotApplier::new(&store)
            .apply(&sample_snapshot())
            .unwrap();

        let broken: Snapshot = serde_json::from_value(json!({
            "user_email": "a@b.c",
            "workspaces": [{"nome": "No id", "criador": "a@b.c"}]
        }))
        .unwrap();

        let err = SnapshotApplier::new(&store).apply(&broken).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        // prior mirror fully intact
        let facade = QueryFacade::new(&store);
        assert_eq!(facade.table_counts().unwrap().tasks, 1);
        assert!(facade.task_by_id(5).unwrap().is_some());
    }

    #[test]
    fn task_referencing_absent_workspace_is_still_stored() {
        let store = setup();
        let snapshot: Snapshot = serde_json::from_value(json!({
            "user_email": "a@b.c",
            "tarefas": [
                {"id_tarefa": 9, "titulo": "Orphan", "id_usuario": 1, "id_workspace": 77}
            ]
        }))
        .unwrap();

        SnapshotApplier::new(&store).apply(&snapshot).unwrap();

        let facade = QueryFacade::new(&store);
        assert!(facade.task_by_id(9).unwrap().is_some());
        assert_eq!(facade.tasks_by_workspace(77).unwrap().len(), 1);
    }

    // dumps entity state without bookkeeping timestamps or junction rowids,
    // which legitimately differ between two applies of the same snapshot
    fn dump_state(store: &LocalStore) -> Vec<String> {
        let tables = [
            ("usuarios", "id_usuario, email, senha, telefone, nome, pontos, server_id, dirty"),
            ("workspace", "id_workspace, nome, equipe, criador, server_id, dirty"),
            ("categorias", "id_categoria, nome, id_workspace, server_id, dirty"),
            (
                "tarefas",
                "id_tarefa, titulo, descricao, data_fim, data_criacao, prioridade, status, \
                 concluida, recorrente, recorrencia, id_usuario, server_id, dirty",
            ),
            (
                "comentarios",
                "id_comentario, email, id_tarefa, descricao, data_criacao, data_atualizacao, \
                 server_id, dirty",
            ),
            (
                "anexos_tarefa",
                "id_anexo, id_tarefa, tipo_arquivo, nome_arquivo, nome_original, \
                 tamanho_arquivo, caminho_arquivo, data_upload, data_atualizacao, \
                 server_id, dirty",
            ),
            ("usuario_workspace", "email, id_workspace"),
            ("tarefa_workspace", "id_tarefa, id_workspace"),
            ("tarefa_categoria", "id_tarefa, id_categoria"),
        ];

        store
            .with_conn(|conn| {
                let mut rows = Vec::new();
                for (table, columns) in tables {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {columns} FROM {table} ORDER BY 1, 2"
                    ))?;
                    let column_count = stmt.column_count();
                    let table_rows = stmt
                        .query_map([], |row| {
                            let mut parts = vec![table.to_string()];
                            for i in 0..column_count {
                                let value: rusqlite::types::Value = row.get(i)?;
                                parts.push(format!("{value:?}"));
                            }
                            Ok(parts.join("|"))
                        })?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows.extend(table_rows);
                }
                Ok(rows)
            })
            .unwrap()
    }
}
