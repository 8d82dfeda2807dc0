//! Append-only queue of local edits awaiting upload
//!
//! Separating "what changed" from "current state" lets uploads be deferred
//! indefinitely while preserving edit order and enabling deterministic retry.

use rusqlite::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{EntityKind, OpType, PendingOperation};

/// Append one operation; a duplicate `op_id` is rejected
pub(crate) fn enqueue(conn: &Connection, op: &PendingOperation) -> Result<()> {
    let payload = serde_json::to_string(&op.payload)?;

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO pending_operations
         (op_id, op_type, entity, entity_id, payload, client_ts, retry_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            op.op_id,
            op.op_type.as_str(),
            op.entity.as_str(),
            op.entity_id,
            payload,
            op.client_ts,
            op.retry_count,
        ],
    )?;

    if inserted == 0 {
        return Err(Error::DuplicateOperation(op.op_id.clone()));
    }
    Ok(())
}

/// All pending operations ordered by `client_ts` ascending.
///
/// This order is the upload contract: it equals causal edit order.
pub(crate) fn list_pending(conn: &Connection) -> Result<Vec<PendingOperation>> {
    let mut stmt = conn.prepare(
        "SELECT op_id, op_type, entity, entity_id, payload, client_ts, retry_count
         FROM pending_operations
         ORDER BY client_ts ASC, op_id ASC",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, u32>(6)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut ops = Vec::with_capacity(rows.len());
    for (op_id, op_type, entity, entity_id, payload, client_ts, retry_count) in rows {
        ops.push(PendingOperation {
            op_id,
            op_type: op_type.parse::<OpType>()?,
            entity: entity.parse::<EntityKind>()?,
            entity_id,
            payload: serde_json::from_str(&payload)?,
            client_ts,
            retry_count,
        });
    }
    Ok(ops)
}

/// Remove one acknowledged operation; removing an absent id is a no-op
pub(crate) fn remove(conn: &Connection, op_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM pending_operations WHERE op_id = ?1",
        params![op_id],
    )?;
    Ok(())
}

/// Increment `retry_count` for every operation of a failed batch
pub(crate) fn bump_retry(conn: &Connection, op_ids: &[String]) -> Result<()> {
    let mut stmt = conn.prepare(
        "UPDATE pending_operations SET retry_count = retry_count + 1 WHERE op_id = ?1",
    )?;
    for op_id in op_ids {
        stmt.execute(params![op_id])?;
    }
    Ok(())
}

pub(crate) fn count(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM pending_operations", [], |row| {
        row.get(0)
    })?;
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Highest client timestamp in the log, 0 when empty; seeds the mutation clock
pub(crate) fn max_client_ts(conn: &Connection) -> Result<i64> {
    let max: i64 = conn.query_row(
        "SELECT COALESCE(MAX(client_ts), 0) FROM pending_operations",
        [],
        |row| row.get(0),
    )?;
    Ok(max)
}
