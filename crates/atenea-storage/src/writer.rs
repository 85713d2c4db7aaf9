// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-writer helpers shared by the query modules.
//!
//! All writes in atenea-storage are serialized through `tokio-rusqlite`'s
//! single background thread. The `Database` struct IS the single writer.
//! Query modules accept `&Database` and call through `connection().call()`.
//!
//! **Do NOT create additional Connection instances for writes.**
//!
//! Closures that can reject a write return `Result<Result<T, AteneaError>,
//! rusqlite::Error>`: the outer error is a SQLite failure, the inner one a
//! domain rejection. Returning the inner error before `commit()` drops the
//! transaction, which rolls it back.

use rusqlite::{Connection, params};

/// Register an actor id on first use so audit foreign keys hold.
pub(crate) fn ensure_actor(conn: &Connection, actor: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO actors (id) VALUES (?1)",
        params![actor],
    )?;
    Ok(())
}

/// Register an optional actor id.
pub(crate) fn ensure_actor_opt(
    conn: &Connection,
    actor: Option<&str>,
) -> Result<(), rusqlite::Error> {
    match actor {
        Some(actor) => ensure_actor(conn, actor),
        None => Ok(()),
    }
}
