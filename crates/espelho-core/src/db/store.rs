//! Local store: mirrored entity rows plus the mutation log
//!
//! Every local mutation writes the entity row and appends exactly one
//! pending operation inside one transaction; no partial write is ever
//! visible.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::models::{
    Attachment, Category, Comment, EntityKind, OpType, PendingOperation, Record, Task, User,
    Workspace,
};
use crate::util::unix_millis_now;

use super::{mutation_log, Database};

/// A mirrored row: the entity record plus its local sync metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Mirrored<T> {
    pub record: T,
    /// Server identity, set when the row came from a snapshot
    pub server_id: Option<i64>,
    /// Row carries local changes not yet acknowledged by the server
    pub dirty: bool,
    /// Last local write (Unix ms)
    pub updated_at: i64,
}

/// Per-table sync metadata row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSync {
    pub table_name: String,
    pub last_sync: Option<i64>,
    pub pending_sync: bool,
}

/// Issues strictly increasing client timestamps (Unix ms).
///
/// Seeded from the highest logged timestamp so restart preserves order even
/// when the wall clock regresses.
struct MutationClock {
    last: Mutex<i64>,
}

impl MutationClock {
    const fn new(seed: i64) -> Self {
        Self {
            last: Mutex::new(seed),
        }
    }

    fn next(&self) -> i64 {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let now = unix_millis_now();
        *last = now.max(*last + 1);
        *last
    }
}

/// Transactional embedded storage for mirrored entities, the mutation log,
/// and sync metadata
pub struct LocalStore {
    db: Database,
    clock: MutationClock,
}

impl LocalStore {
    /// Open the store at the given path, creating schema if absent
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_database(Database::open(path)?)
    }

    /// Open an in-memory store (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_database(Database::open_in_memory()?)
    }

    fn from_database(db: Database) -> Result<Self> {
        let seed = db.with_conn(mutation_log::max_client_ts)?;
        Ok(Self {
            db,
            clock: MutationClock::new(seed),
        })
    }

    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        self.db.with_conn(f)
    }

    pub(crate) fn with_tx<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        self.db.with_tx(f)
    }

    /// Create a mirrored entity locally; returns the generated local id
    pub fn create(&self, record: impl Into<Record>) -> Result<i64> {
        self.apply_local_mutation(OpType::Create, record.into())
    }

    /// Update a mirrored entity locally; the record must carry its id
    pub fn update(&self, record: impl Into<Record>) -> Result<i64> {
        self.apply_local_mutation(OpType::Update, record.into())
    }

    /// Delete a mirrored entity locally.
    ///
    /// The row disappears immediately; the logged operation persists until
    /// the server acknowledges it.
    pub fn delete(&self, kind: EntityKind, id: i64) -> Result<()> {
        self.mutate(OpType::Delete, kind, None, Some(id)).map(|_| ())
    }

    /// Apply one local mutation: entity write plus log append, atomically.
    ///
    /// Returns the entity id (generated for CREATE).
    pub fn apply_local_mutation(&self, op_type: OpType, record: Record) -> Result<i64> {
        let kind = record.kind();
        let id = record.id();
        match op_type {
            OpType::Create => self.mutate(op_type, kind, Some(record), None),
            OpType::Update => {
                let id = id.ok_or_else(|| {
                    Error::InvalidInput(format!("update of {kind} requires an id"))
                })?;
                self.mutate(op_type, kind, Some(record), Some(id))
            }
            OpType::Delete => {
                let id = id.ok_or_else(|| {
                    Error::InvalidInput(format!("delete of {kind} requires an id"))
                })?;
                self.mutate(op_type, kind, None, Some(id))
            }
        }
    }

    fn mutate(
        &self,
        op_type: OpType,
        kind: EntityKind,
        record: Option<Record>,
        id: Option<i64>,
    ) -> Result<i64> {
        if let Some(record) = &record {
            record.validate()?;
        }
        let client_ts = self.clock.next();

        self.db.with_tx(|tx| {
            let (entity_id, logged) = match op_type {
                OpType::Create => {
                    let mut record = record
                        .ok_or_else(|| Error::InvalidInput("create requires a record".into()))?;
                    let entity_id = insert_record(tx, &record, client_ts)?;
                    record.set_id(entity_id);
                    (entity_id, record)
                }
                OpType::Update => {
                    let record = record
                        .ok_or_else(|| Error::InvalidInput("update requires a record".into()))?;
                    let entity_id =
                        id.ok_or_else(|| Error::InvalidInput("update requires an id".into()))?;
                    update_record(tx, &record, client_ts)?;
                    (entity_id, record)
                }
                OpType::Delete => {
                    let entity_id =
                        id.ok_or_else(|| Error::InvalidInput("delete requires an id".into()))?;
                    // capture the row before removal so the payload reflects
                    // entity state at mutation time
                    let current = read_record(tx, kind, entity_id)?.ok_or_else(|| {
                        Error::NotFound(format!("{kind} {entity_id}"))
                    })?;
                    delete_record(tx, kind, entity_id)?;
                    (entity_id, current)
                }
            };

            let op = PendingOperation::new(
                op_type,
                kind,
                entity_id,
                logged.to_payload()?,
                client_ts,
            );
            mutation_log::enqueue(tx, &op)?;
            mark_pending(tx, kind.table())?;

            tracing::debug!(op = %op_type, entity = %kind, id = entity_id, "local mutation logged");
            Ok(entity_id)
        })
    }

    /// All pending operations in upload order
    pub fn pending_operations(&self) -> Result<Vec<PendingOperation>> {
        self.db.with_conn(mutation_log::list_pending)
    }

    /// Remove one acknowledged operation; absent ids are a no-op
    pub fn remove_operation(&self, op_id: &str) -> Result<()> {
        self.db.with_conn(|conn| mutation_log::remove(conn, op_id))
    }

    /// Record one more failed upload cycle for the given operations
    pub fn bump_retry(&self, op_ids: &[String]) -> Result<()> {
        self.db
            .with_conn(|conn| mutation_log::bump_retry(conn, op_ids))
    }

    pub fn pending_count(&self) -> Result<u64> {
        self.db.with_conn(mutation_log::count)
    }

    /// Stamp tables as synced after a successful upload
    pub(crate) fn mark_tables_synced(&self, tables: &[&str], now: i64) -> Result<()> {
        self.db.with_conn(|conn| {
            for table in tables {
                mark_synced(conn, table, now)?;
            }
            Ok(())
        })
    }

    /// Per-table sync metadata
    pub fn sync_status(&self) -> Result<Vec<TableSync>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT table_name, last_sync, pending_sync FROM sync_metadata ORDER BY table_name",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(TableSync {
                        table_name: row.get(0)?,
                        last_sync: row.get(1)?,
                        pending_sync: row.get::<_, i64>(2)? != 0,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Wipe all mirrored and junction tables.
    ///
    /// The mutation log survives: pending local edits are still owed to the
    /// server. Used before snapshot application and on explicit reset.
    pub fn clear(&self) -> Result<()> {
        self.db.with_tx(|tx| {
            clear_mirror(tx)?;
            tx.execute("UPDATE sync_metadata SET last_sync = NULL", [])?;
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Row access shared with the query facade and the snapshot applier
// ---------------------------------------------------------------------------

pub(crate) const USER_COLUMNS: &str =
    "id_usuario, email, senha, telefone, nome, pontos, server_id, dirty, updated_at";
pub(crate) const WORKSPACE_COLUMNS: &str =
    "id_workspace, nome, equipe, criador, server_id, dirty, updated_at";
pub(crate) const CATEGORY_COLUMNS: &str =
    "id_categoria, nome, id_workspace, server_id, dirty, updated_at";
pub(crate) const TASK_COLUMNS: &str =
    "id_tarefa, titulo, descricao, data_fim, data_criacao, prioridade, status, concluida, \
     recorrente, recorrencia, id_usuario, server_id, dirty, updated_at";
pub(crate) const COMMENT_COLUMNS: &str =
    "id_comentario, email, id_tarefa, descricao, data_criacao, data_atualizacao, \
     server_id, dirty, updated_at";
pub(crate) const ATTACHMENT_COLUMNS: &str =
    "id_anexo, id_tarefa, tipo_arquivo, nome_arquivo, nome_original, tamanho_arquivo, \
     caminho_arquivo, data_upload, data_atualizacao, server_id, dirty, updated_at";

fn parse_enum<T: std::str::FromStr<Err = Error>>(
    idx: usize,
    value: String,
) -> rusqlite::Result<T> {
    value.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<Mirrored<User>> {
    Ok(Mirrored {
        record: User {
            id: Some(row.get(0)?),
            email: row.get(1)?,
            password_hash: row.get(2)?,
            phone: row.get(3)?,
            name: row.get(4)?,
            points: row.get(5)?,
        },
        server_id: row.get(6)?,
        dirty: row.get::<_, i64>(7)? != 0,
        updated_at: row.get(8)?,
    })
}

pub(crate) fn parse_workspace(row: &rusqlite::Row<'_>) -> rusqlite::Result<Mirrored<Workspace>> {
    Ok(Mirrored {
        record: Workspace {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            team: row.get::<_, i64>(2)? != 0,
            creator: row.get(3)?,
        },
        server_id: row.get(4)?,
        dirty: row.get::<_, i64>(5)? != 0,
        updated_at: row.get(6)?,
    })
}

pub(crate) fn parse_category(row: &rusqlite::Row<'_>) -> rusqlite::Result<Mirrored<Category>> {
    Ok(Mirrored {
        record: Category {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            workspace_id: row.get(2)?,
        },
        server_id: row.get(3)?,
        dirty: row.get::<_, i64>(4)? != 0,
        updated_at: row.get(5)?,
    })
}

pub(crate) fn parse_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Mirrored<Task>> {
    let recurrence: Option<String> = row.get(9)?;
    Ok(Mirrored {
        record: Task {
            id: Some(row.get(0)?),
            title: row.get(1)?,
            description: row.get(2)?,
            due_date: row.get(3)?,
            created_at: row.get(4)?,
            priority: parse_enum(5, row.get(5)?)?,
            status: parse_enum(6, row.get(6)?)?,
            completed: row.get::<_, i64>(7)? != 0,
            recurring: row.get::<_, i64>(8)? != 0,
            recurrence: recurrence.map(|value| parse_enum(9, value)).transpose()?,
            user_id: row.get(10)?,
            // junction-backed fields are filled in by load_task_links
            workspace_id: None,
            category_ids: Vec::new(),
        },
        server_id: row.get(11)?,
        dirty: row.get::<_, i64>(12)? != 0,
        updated_at: row.get(13)?,
    })
}

pub(crate) fn parse_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Mirrored<Comment>> {
    Ok(Mirrored {
        record: Comment {
            id: Some(row.get(0)?),
            email: row.get(1)?,
            task_id: row.get(2)?,
            body: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        },
        server_id: row.get(6)?,
        dirty: row.get::<_, i64>(7)? != 0,
        updated_at: row.get(8)?,
    })
}

pub(crate) fn parse_attachment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Mirrored<Attachment>> {
    Ok(Mirrored {
        record: Attachment {
            id: Some(row.get(0)?),
            task_id: row.get(1)?,
            file_type: parse_enum(2, row.get(2)?)?,
            file_name: row.get(3)?,
            original_name: row.get(4)?,
            size_bytes: row.get(5)?,
            path: row.get(6)?,
            uploaded_at: row.get(7)?,
            updated_at: row.get(8)?,
        },
        server_id: row.get(9)?,
        dirty: row.get::<_, i64>(10)? != 0,
        updated_at: row.get(11)?,
    })
}

/// Fill a task's workspace and category links from the junction tables
pub(crate) fn load_task_links(conn: &Connection, task: &mut Task) -> Result<()> {
    let Some(id) = task.id else {
        return Ok(());
    };

    task.workspace_id = conn
        .query_row(
            "SELECT id_workspace FROM tarefa_workspace WHERE id_tarefa = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;

    let mut stmt = conn.prepare(
        "SELECT id_categoria FROM tarefa_categoria WHERE id_tarefa = ?1 ORDER BY id_categoria",
    )?;
    task.category_ids = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(())
}

/// Read one mirrored record by kind and id
pub(crate) fn read_record(
    conn: &Connection,
    kind: EntityKind,
    id: i64,
) -> Result<Option<Record>> {
    let sql = |columns: &str| {
        format!(
            "SELECT {columns} FROM {} WHERE {} = ?1",
            kind.table(),
            kind.id_column()
        )
    };

    let record = match kind {
        EntityKind::User => conn
            .query_row(&sql(USER_COLUMNS), params![id], parse_user)
            .optional()?
            .map(|m| Record::User(m.record)),
        EntityKind::Workspace => conn
            .query_row(&sql(WORKSPACE_COLUMNS), params![id], parse_workspace)
            .optional()?
            .map(|m| Record::Workspace(m.record)),
        EntityKind::Category => conn
            .query_row(&sql(CATEGORY_COLUMNS), params![id], parse_category)
            .optional()?
            .map(|m| Record::Category(m.record)),
        EntityKind::Task => match conn
            .query_row(&sql(TASK_COLUMNS), params![id], parse_task)
            .optional()?
        {
            Some(mut mirrored) => {
                load_task_links(conn, &mut mirrored.record)?;
                Some(Record::Task(mirrored.record))
            }
            None => None,
        },
        EntityKind::Comment => conn
            .query_row(&sql(COMMENT_COLUMNS), params![id], parse_comment)
            .optional()?
            .map(|m| Record::Comment(m.record)),
        EntityKind::Attachment => conn
            .query_row(&sql(ATTACHMENT_COLUMNS), params![id], parse_attachment)
            .optional()?
            .map(|m| Record::Attachment(m.record)),
    };
    Ok(record)
}

// ---------------------------------------------------------------------------
// Local writes (dirty = 1)
// ---------------------------------------------------------------------------

fn insert_record(conn: &Connection, record: &Record, now: i64) -> Result<i64> {
    match record {
        Record::User(user) => {
            conn.execute(
                "INSERT INTO usuarios (id_usuario, email, senha, telefone, nome, pontos, dirty, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
                params![
                    user.id,
                    user.email,
                    user.password_hash,
                    user.phone,
                    user.name,
                    user.points,
                    now
                ],
            )?;
        }
        Record::Workspace(workspace) => {
            conn.execute(
                "INSERT INTO workspace (id_workspace, nome, equipe, criador, dirty, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5)",
                params![
                    workspace.id,
                    workspace.name,
                    workspace.team,
                    workspace.creator,
                    now
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.execute(
                "INSERT OR IGNORE INTO usuario_workspace (email, id_workspace) VALUES (?1, ?2)",
                params![workspace.creator, id],
            )?;
            return Ok(id);
        }
        Record::Category(category) => {
            conn.execute(
                "INSERT INTO categorias (id_categoria, nome, id_workspace, dirty, updated_at)
                 VALUES (?1, ?2, ?3, 1, ?4)",
                params![category.id, category.name, category.workspace_id, now],
            )?;
        }
        Record::Task(task) => {
            conn.execute(
                "INSERT INTO tarefas (id_tarefa, titulo, descricao, data_fim, data_criacao,
                                      prioridade, status, concluida, recorrente, recorrencia,
                                      id_usuario, dirty, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1, ?12)",
                params![
                    task.id,
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
            let id = conn.last_insert_rowid();
            sync_task_links(conn, id, task)?;
            return Ok(id);
        }
        Record::Comment(comment) => {
            conn.execute(
                "INSERT INTO comentarios (id_comentario, email, id_tarefa, descricao,
                                          data_criacao, data_atualizacao, dirty, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
                params![
                    comment.id,
                    comment.email,
                    comment.task_id,
                    comment.body,
                    comment.created_at,
                    comment.updated_at,
                    now
                ],
            )?;
        }
        Record::Attachment(attachment) => {
            conn.execute(
                "INSERT INTO anexos_tarefa (id_anexo, id_tarefa, tipo_arquivo, nome_arquivo,
                                            nome_original, tamanho_arquivo, caminho_arquivo,
                                            data_upload, data_atualizacao, dirty, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10)",
                params![
                    attachment.id,
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
        }
    }
    Ok(conn.last_insert_rowid())
}

fn update_record(conn: &Connection, record: &Record, now: i64) -> Result<()> {
    let rows = match record {
        Record::User(user) => conn.execute(
            "UPDATE usuarios SET email = ?2, senha = ?3, telefone = ?4, nome = ?5, pontos = ?6,
                                 dirty = 1, updated_at = ?7
             WHERE id_usuario = ?1",
            params![
                user.id,
                user.email,
                user.password_hash,
                user.phone,
                user.name,
                user.points,
                now
            ],
        )?,
        Record::Workspace(workspace) => conn.execute(
            "UPDATE workspace SET nome = ?2, equipe = ?3, criador = ?4, dirty = 1, updated_at = ?5
             WHERE id_workspace = ?1",
            params![
                workspace.id,
                workspace.name,
                workspace.team,
                workspace.creator,
                now
            ],
        )?,
        Record::Category(category) => conn.execute(
            "UPDATE categorias SET nome = ?2, id_workspace = ?3, dirty = 1, updated_at = ?4
             WHERE id_categoria = ?1",
            params![category.id, category.name, category.workspace_id, now],
        )?,
        Record::Task(task) => {
            let rows = conn.execute(
                "UPDATE tarefas SET titulo = ?2, descricao = ?3, data_fim = ?4,
                                    data_criacao = COALESCE(?5, data_criacao), prioridade = ?6,
                                    status = ?7, concluida = ?8, recorrente = ?9,
                                    recorrencia = ?10, id_usuario = ?11, dirty = 1,
                                    updated_at = ?12
                 WHERE id_tarefa = ?1",
                params![
                    task.id,
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
            if rows > 0 {
                sync_task_links(conn, task.id.unwrap_or_default(), task)?;
            }
            rows
        }
        Record::Comment(comment) => conn.execute(
            "UPDATE comentarios SET email = ?2, id_tarefa = ?3, descricao = ?4,
                                    data_criacao = COALESCE(?5, data_criacao),
                                    data_atualizacao = ?6, dirty = 1, updated_at = ?7
             WHERE id_comentario = ?1",
            params![
                comment.id,
                comment.email,
                comment.task_id,
                comment.body,
                comment.created_at,
                comment.updated_at,
                now
            ],
        )?,
        Record::Attachment(attachment) => conn.execute(
            "UPDATE anexos_tarefa SET id_tarefa = ?2, tipo_arquivo = ?3, nome_arquivo = ?4,
                                      nome_original = ?5, tamanho_arquivo = ?6,
                                      caminho_arquivo = ?7, data_upload = ?8,
                                      data_atualizacao = ?9, dirty = 1, updated_at = ?10
             WHERE id_anexo = ?1",
            params![
                attachment.id,
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
        )?,
    };

    if rows == 0 {
        let kind = record.kind();
        return Err(Error::NotFound(format!(
            "{kind} {}",
            record.id().unwrap_or_default()
        )));
    }
    Ok(())
}

/// Remove the entity row and its dependent local state.
///
/// Dependents are removed the same way the server cascades them.
fn delete_record(conn: &Connection, kind: EntityKind, id: i64) -> Result<()> {
    match kind {
        EntityKind::User => {}
        EntityKind::Workspace => {
            conn.execute(
                "DELETE FROM tarefa_categoria WHERE id_categoria IN
                 (SELECT id_categoria FROM categorias WHERE id_workspace = ?1)",
                params![id],
            )?;
            conn.execute(
                "DELETE FROM categorias WHERE id_workspace = ?1",
                params![id],
            )?;
            conn.execute(
                "DELETE FROM tarefa_workspace WHERE id_workspace = ?1",
                params![id],
            )?;
            conn.execute(
                "DELETE FROM usuario_workspace WHERE id_workspace = ?1",
                params![id],
            )?;
        }
        EntityKind::Category => {
            conn.execute(
                "DELETE FROM tarefa_categoria WHERE id_categoria = ?1",
                params![id],
            )?;
        }
        EntityKind::Task => {
            conn.execute("DELETE FROM comentarios WHERE id_tarefa = ?1", params![id])?;
            conn.execute(
                "DELETE FROM anexos_tarefa WHERE id_tarefa = ?1",
                params![id],
            )?;
            conn.execute(
                "DELETE FROM tarefa_workspace WHERE id_tarefa = ?1",
                params![id],
            )?;
            conn.execute(
                "DELETE FROM tarefa_categoria WHERE id_tarefa = ?1",
                params![id],
            )?;
        }
        EntityKind::Comment | EntityKind::Attachment => {}
    }

    let rows = conn.execute(
        &format!(
            "DELETE FROM {} WHERE {} = ?1",
            kind.table(),
            kind.id_column()
        ),
        params![id],
    )?;
    if rows == 0 {
        return Err(Error::NotFound(format!("{kind} {id}")));
    }
    Ok(())
}

/// Rebuild a task's junction rows from its embedded links
fn sync_task_links(conn: &Connection, task_id: i64, task: &Task) -> Result<()> {
    conn.execute(
        "DELETE FROM tarefa_workspace WHERE id_tarefa = ?1",
        params![task_id],
    )?;
    conn.execute(
        "DELETE FROM tarefa_categoria WHERE id_tarefa = ?1",
        params![task_id],
    )?;

    if let Some(workspace_id) = task.workspace_id {
        conn.execute(
            "INSERT OR IGNORE INTO tarefa_workspace (id_tarefa, id_workspace) VALUES (?1, ?2)",
            params![task_id, workspace_id],
        )?;
    }
    for category_id in &task.category_ids {
        conn.execute(
            "INSERT OR IGNORE INTO tarefa_categoria (id_tarefa, id_categoria) VALUES (?1, ?2)",
            params![task_id, category_id],
        )?;
    }
    Ok(())
}

/// Delete all mirrored and junction rows in dependency order
pub(crate) fn clear_mirror(conn: &Connection) -> Result<()> {
    for table in [
        "comentarios",
        "anexos_tarefa",
        "tarefa_categoria",
        "tarefa_workspace",
        "usuario_workspace",
        "tarefas",
        "categorias",
        "workspace",
        "usuarios",
    ] {
        conn.execute(&format!("DELETE FROM {table}"), [])?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Sync metadata
// ---------------------------------------------------------------------------

pub(crate) fn mark_pending(conn: &Connection, table: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO sync_metadata (table_name, pending_sync) VALUES (?1, 1)
         ON CONFLICT(table_name) DO UPDATE SET pending_sync = 1",
        params![table],
    )?;
    Ok(())
}

pub(crate) fn mark_synced(conn: &Connection, table: &str, now: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO sync_metadata (table_name, last_sync, pending_sync) VALUES (?1, ?2, 0)
         ON CONFLICT(table_name) DO UPDATE SET last_sync = ?2, pending_sync = 0",
        params![table, now],
    )?;
    Ok(())
}

/// Stamp a table's last snapshot time without touching its pending flag
pub(crate) fn stamp_last_sync(conn: &Connection, table: &str, now: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO sync_metadata (table_name, last_sync) VALUES (?1, ?2)
         ON CONFLICT(table_name) DO UPDATE SET last_sync = ?2",
        params![table, now],
    )?;
    Ok(())
}
