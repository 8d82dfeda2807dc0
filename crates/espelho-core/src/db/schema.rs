//! Schema creation and versioned reset
//!
//! The schema is versioned by a single integer. The upgrade policy is
//! drop-and-recreate: a version mismatch wipes every table, including the
//! mutation log, and rebuilds from scratch.

use rusqlite::Connection;

use crate::error::{Error, Result};
use crate::models::EntityKind;

/// Current schema version
pub(crate) const SCHEMA_VERSION: i32 = 1;

const CREATE_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    )",
    // Mirrored entity tables. No FOREIGN KEY clauses: snapshot content is
    // authoritative and may reference rows absent from the mirror.
    "CREATE TABLE IF NOT EXISTS usuarios (
        id_usuario INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT UNIQUE NOT NULL,
        senha TEXT,
        telefone TEXT,
        nome TEXT NOT NULL,
        pontos REAL NOT NULL DEFAULT 0.0,
        server_id INTEGER,
        dirty INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS workspace (
        id_workspace INTEGER PRIMARY KEY AUTOINCREMENT,
        nome TEXT NOT NULL,
        equipe INTEGER NOT NULL DEFAULT 0,
        criador TEXT NOT NULL,
        server_id INTEGER,
        dirty INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS categorias (
        id_categoria INTEGER PRIMARY KEY AUTOINCREMENT,
        nome TEXT NOT NULL,
        id_workspace INTEGER NOT NULL,
        server_id INTEGER,
        dirty INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL DEFAULT 0,
        UNIQUE(nome, id_workspace)
    )",
    "CREATE TABLE IF NOT EXISTS tarefas (
        id_tarefa INTEGER PRIMARY KEY AUTOINCREMENT,
        titulo TEXT NOT NULL,
        descricao TEXT NOT NULL DEFAULT '',
        data_fim TEXT,
        data_criacao TEXT,
        prioridade TEXT NOT NULL DEFAULT 'media'
            CHECK(prioridade IN ('alta', 'media', 'baixa', 'urgente')),
        status TEXT NOT NULL DEFAULT 'a_fazer'
            CHECK(status IN ('a_fazer', 'em_andamento', 'concluido', 'atrasada')),
        concluida INTEGER NOT NULL DEFAULT 0,
        recorrente INTEGER NOT NULL DEFAULT 0,
        recorrencia TEXT CHECK(recorrencia IN ('diaria', 'semanal', 'mensal')),
        id_usuario INTEGER NOT NULL,
        server_id INTEGER,
        dirty INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_tarefas_usuario ON tarefas(id_usuario)",
    "CREATE TABLE IF NOT EXISTS comentarios (
        id_comentario INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL,
        id_tarefa INTEGER NOT NULL,
        descricao TEXT NOT NULL,
        data_criacao TEXT,
        data_atualizacao TEXT,
        server_id INTEGER,
        dirty INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_comentarios_tarefa ON comentarios(id_tarefa)",
    "CREATE TABLE IF NOT EXISTS anexos_tarefa (
        id_anexo INTEGER PRIMARY KEY AUTOINCREMENT,
        id_tarefa INTEGER NOT NULL,
        tipo_arquivo TEXT NOT NULL CHECK(tipo_arquivo IN ('pdf', 'imagem')),
        nome_arquivo TEXT NOT NULL,
        nome_original TEXT NOT NULL,
        tamanho_arquivo INTEGER NOT NULL,
        caminho_arquivo TEXT NOT NULL,
        data_upload TEXT,
        data_atualizacao TEXT,
        server_id INTEGER,
        dirty INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL DEFAULT 0,
        UNIQUE(id_tarefa, tipo_arquivo)
    )",
    "CREATE INDEX IF NOT EXISTS idx_anexos_tarefa ON anexos_tarefa(id_tarefa)",
    // Junction tables, re-derived on every snapshot apply
    "CREATE TABLE IF NOT EXISTS usuario_workspace (
        id_usuario_workspace INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL,
        id_workspace INTEGER NOT NULL,
        UNIQUE(email, id_workspace)
    )",
    "CREATE TABLE IF NOT EXISTS tarefa_workspace (
        id_tarefa_workspace INTEGER PRIMARY KEY AUTOINCREMENT,
        id_tarefa INTEGER NOT NULL,
        id_workspace INTEGER NOT NULL,
        UNIQUE(id_tarefa, id_workspace)
    )",
    "CREATE INDEX IF NOT EXISTS idx_tarefa_workspace_ws ON tarefa_workspace(id_workspace)",
    "CREATE TABLE IF NOT EXISTS tarefa_categoria (
        id_tarefa_categoria INTEGER PRIMARY KEY AUTOINCREMENT,
        id_tarefa INTEGER NOT NULL,
        id_categoria INTEGER NOT NULL,
        UNIQUE(id_tarefa, id_categoria)
    )",
    "CREATE INDEX IF NOT EXISTS idx_tarefa_categoria_cat ON tarefa_categoria(id_categoria)",
    // Mutation log
    "CREATE TABLE IF NOT EXISTS pending_operations (
        op_id TEXT PRIMARY KEY,
        op_type TEXT NOT NULL CHECK(op_type IN ('CREATE', 'UPDATE', 'DELETE')),
        entity TEXT NOT NULL,
        entity_id INTEGER NOT NULL,
        payload TEXT NOT NULL,
        client_ts INTEGER NOT NULL,
        retry_count INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_pending_client_ts ON pending_operations(client_ts)",
    // Sync metadata
    "CREATE TABLE IF NOT EXISTS sync_metadata (
        table_name TEXT PRIMARY KEY,
        last_sync INTEGER,
        pending_sync INTEGER NOT NULL DEFAULT 0
    )",
];

const DROP_STATEMENTS: &[&str] = &[
    "DROP TABLE IF EXISTS sync_metadata",
    "DROP TABLE IF EXISTS pending_operations",
    "DROP TABLE IF EXISTS tarefa_categoria",
    "DROP TABLE IF EXISTS tarefa_workspace",
    "DROP TABLE IF EXISTS usuario_workspace",
    "DROP TABLE IF EXISTS anexos_tarefa",
    "DROP TABLE IF EXISTS comentarios",
    "DROP TABLE IF EXISTS tarefas",
    "DROP TABLE IF EXISTS categorias",
    "DROP TABLE IF EXISTS workspace",
    "DROP TABLE IF EXISTS usuarios",
    "DROP TABLE IF EXISTS schema_version",
    "DELETE FROM sqlite_sequence",
];

/// Initialize the schema, recreating everything on a version mismatch.
///
/// Idempotent; a failure here means the storage file is unusable.
pub(crate) fn init(conn: &Connection) -> Result<()> {
    let version = current_version(conn)?;

    if version != 0 && version != SCHEMA_VERSION {
        tracing::warn!(
            from = version,
            to = SCHEMA_VERSION,
            "schema version changed, dropping local data"
        );
        run_batch(conn, &DROP_STATEMENTS)?;
    }

    run_batch(conn, &CREATE_STATEMENTS)?;
    record_version(conn)?;
    seed_metadata(conn)?;
    Ok(())
}

/// Get the recorded schema version, 0 when the database is fresh
fn current_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version')",
            [],
            |row| row.get(0),
        )
        .map_err(schema_error)?;

    if !exists {
        return Ok(0);
    }

    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(schema_error)
}

fn run_batch(conn: &Connection, statements: &[&str]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", []).map_err(schema_error)?;

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, []) {
            // sqlite_sequence only exists once an AUTOINCREMENT insert ran
            if stmt.starts_with("DELETE FROM sqlite_sequence") {
                continue;
            }
            conn.execute("ROLLBACK", []).ok();
            return Err(schema_error(e));
        }
    }

    conn.execute("COMMIT", []).map_err(|e| {
        conn.execute("ROLLBACK", []).ok();
        schema_error(e)
    })?;
    Ok(())
}

fn record_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [SCHEMA_VERSION],
    )
    .map_err(schema_error)?;
    Ok(())
}

/// Seed one sync_metadata row per mirrored table
fn seed_metadata(conn: &Connection) -> Result<()> {
    for kind in EntityKind::ALL {
        conn.execute(
            "INSERT OR IGNORE INTO sync_metadata (table_name, last_sync, pending_sync) VALUES (?1, NULL, 0)",
            [kind.table()],
        )
        .map_err(schema_error)?;
    }
    Ok(())
}

fn schema_error(e: rusqlite::Error) -> Error {
    Error::Schema(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn init_creates_all_tables() {
        let conn = setup();
        init(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('usuarios', 'workspace', 'categorias', 'tarefas', 'comentarios',
                  'anexos_tarefa', 'pending_operations', 'sync_metadata')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 8);
    }

    #[test]
    fn init_is_idempotent() {
        let conn = setup();
        init(&conn).unwrap();
        init(&conn).unwrap();

        assert_eq!(current_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn version_mismatch_drops_and_recreates() {
        let conn = setup();
        init(&conn).unwrap();

        conn.execute(
            "INSERT INTO workspace (nome, criador) VALUES ('w', 'a@b.c')",
            [],
        )
        .unwrap();
        // simulate a database written by an older build
        conn.execute("DELETE FROM schema_version", []).unwrap();
        conn.execute("INSERT INTO schema_version (version) VALUES (999)", [])
            .unwrap();

        init(&conn).unwrap();

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM workspace", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
        assert_eq!(current_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn metadata_is_seeded_per_table() {
        let conn = setup();
        init(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sync_metadata", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 6);
    }
}
