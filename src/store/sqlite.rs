use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use serde_json::Value;

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_json(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or_else(|e| {
        tracing::error!("Invalid JSON in database: '{}' - {}", s, e);
        Value::Object(Default::default())
    })
}

fn code_err(idx: usize, what: &str, code: i64) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Integer,
        format!("invalid {what} code {code}").into(),
    )
}

/// Maps a uniqueness violation to AlreadyExists.
fn constraint_err(err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(e, _) = &err {
        if e.code == rusqlite::ErrorCode::ConstraintViolation {
            return Error::AlreadyExists;
        }
    }
    Error::Database(err)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        fullname: row.get(2)?,
        is_staff: row.get(3)?,
        is_superuser: row.get(4)?,
        extras: parse_json(&row.get::<_, String>(5)?),
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        updated_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

fn space_from_row(row: &Row<'_>) -> rusqlite::Result<NoteSpace> {
    let kind_code: i64 = row.get(1)?;
    Ok(NoteSpace {
        id: row.get(0)?,
        kind: SpaceKind::from_code(kind_code).ok_or_else(|| code_err(1, "space kind", kind_code))?,
        name: row.get(2)?,
        extras: parse_json(&row.get::<_, String>(3)?),
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<Member> {
    let role_code: i64 = row.get(3)?;
    Ok(Member {
        id: row.get(0)?,
        space_id: row.get(1)?,
        user_id: row.get(2)?,
        role: Role::from_code(role_code).ok_or_else(|| code_err(3, "role", role_code))?,
        extras: parse_json(&row.get::<_, String>(4)?),
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        space_id: row.get(1)?,
        name: row.get(2)?,
        extras: parse_json(&row.get::<_, String>(3)?),
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        space_id: row.get(1)?,
        title: row.get(2)?,
        content: parse_json(&row.get::<_, String>(3)?),
        revision: row.get(4)?,
        is_archived: row.get(5)?,
        is_pinned: row.get(6)?,
        is_deleted: row.get(7)?,
        extras: parse_json(&row.get::<_, String>(8)?),
        created_at: parse_datetime(&row.get::<_, String>(9)?),
        updated_at: parse_datetime(&row.get::<_, String>(10)?),
    })
}

fn note_log_from_row(row: &Row<'_>) -> rusqlite::Result<NoteLog> {
    let action_code: i64 = row.get(3)?;
    Ok(NoteLog {
        id: row.get(0)?,
        note_id: row.get(1)?,
        user_id: row.get(2)?,
        action: LogAction::from_code(action_code)
            .ok_or_else(|| code_err(3, "log action", action_code))?,
        extras: parse_json(&row.get::<_, String>(4)?),
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        user_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        expires_at: row
            .get::<_, Option<String>>(5)?
            .map(|s| parse_datetime(&s)),
        last_used_at: row
            .get::<_, Option<String>>(6)?
            .map(|s| parse_datetime(&s)),
    })
}

fn insert_note_log(tx: &Transaction<'_>, log: &NoteLog) -> Result<()> {
    tx.execute(
        "INSERT INTO note_logs (id, note_id, user_id, action, extras, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            log.id,
            log.note_id,
            log.user_id,
            log.action.code(),
            log.extras.to_string(),
            format_datetime(&log.created_at),
        ],
    )?;
    Ok(())
}

const USER_COLS: &str = "id, email, fullname, is_staff, is_superuser, extras, created_at, updated_at";
const SPACE_COLS: &str = "id, kind, name, extras, created_at, updated_at";
const MEMBER_COLS: &str = "id, space_id, user_id, role, extras, created_at, updated_at";
const TAG_COLS: &str = "id, space_id, name, extras, created_at, updated_at";
const NOTE_COLS: &str = "id, space_id, title, content, revision, is_archived, is_pinned, is_deleted, extras, created_at, updated_at";
const NOTE_LOG_COLS: &str = "id, note_id, user_id, action, extras, created_at";
const TOKEN_COLS: &str = "id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at";

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<User> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let existing: i64 = tx.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;

        let mut stored = user.clone();
        if existing == 0 {
            // The first account bootstraps the instance.
            stored.is_staff = true;
            stored.is_superuser = true;
        }

        tx.execute(
            "INSERT INTO users (id, email, fullname, is_staff, is_superuser, extras, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                stored.id,
                stored.email,
                stored.fullname,
                stored.is_staff,
                stored.is_superuser,
                stored.extras.to_string(),
                format_datetime(&stored.created_at),
                format_datetime(&stored.updated_at),
            ],
        )
        .map_err(constraint_err)?;

        tx.commit()?;
        Ok(stored)
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLS} FROM users WHERE email = ?1"),
            params![email],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLS} FROM users WHERE id > ?1 ORDER BY id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], user_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET fullname = ?1, is_staff = ?2, is_superuser = ?3, extras = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                user.fullname,
                user.is_staff,
                user.is_superuser,
                user.extras.to_string(),
                format_datetime(&user.updated_at),
                user.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Note space operations

    fn create_space(&self, space: &NoteSpace, owner: &Member) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO notespaces (id, kind, name, extras, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                space.id,
                space.kind.code(),
                space.name,
                space.extras.to_string(),
                format_datetime(&space.created_at),
                format_datetime(&space.updated_at),
            ],
        )?;

        tx.execute(
            "INSERT INTO members (id, space_id, user_id, role, extras, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                owner.id,
                owner.space_id,
                owner.user_id,
                owner.role.code(),
                owner.extras.to_string(),
                format_datetime(&owner.created_at),
                format_datetime(&owner.updated_at),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn get_space(&self, id: &str) -> Result<Option<NoteSpace>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {SPACE_COLS} FROM notespaces WHERE id = ?1"),
            params![id],
            space_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_spaces(&self, cursor: &str, limit: i32) -> Result<Vec<NoteSpace>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SPACE_COLS} FROM notespaces WHERE id > ?1 ORDER BY id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], space_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_space(&self, space: &NoteSpace) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE notespaces SET name = ?1, extras = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                space.name,
                space.extras.to_string(),
                format_datetime(&space.updated_at),
                space.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_space(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM notespaces WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Member operations

    fn create_member(&self, member: &Member) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO members (id, space_id, user_id, role, extras, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    member.id,
                    member.space_id,
                    member.user_id,
                    member.role.code(),
                    member.extras.to_string(),
                    format_datetime(&member.created_at),
                    format_datetime(&member.updated_at),
                ],
            )
            .map_err(constraint_err)?;
        Ok(())
    }

    fn get_member(&self, id: &str) -> Result<Option<Member>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {MEMBER_COLS} FROM members WHERE id = ?1"),
            params![id],
            member_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_member_by_user(&self, space_id: &str, user_id: &str) -> Result<Option<Member>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {MEMBER_COLS} FROM members WHERE space_id = ?1 AND user_id = ?2"),
            params![space_id, user_id],
            member_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_members(&self, space_id: &str, cursor: &str, limit: i32) -> Result<Vec<Member>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEMBER_COLS} FROM members WHERE space_id = ?1 AND id > ?2 ORDER BY id LIMIT ?3"
        ))?;

        let rows = stmt.query_map(params![space_id, cursor, limit], member_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_member(&self, member: &Member) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE members SET role = ?1, extras = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                member.role.code(),
                member.extras.to_string(),
                format_datetime(&member.updated_at),
                member.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_member(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM members WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Tag operations

    fn create_tag(&self, tag: &Tag) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO tags (id, space_id, name, extras, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    tag.id,
                    tag.space_id,
                    tag.name,
                    tag.extras.to_string(),
                    format_datetime(&tag.created_at),
                    format_datetime(&tag.updated_at),
                ],
            )
            .map_err(constraint_err)?;
        Ok(())
    }

    fn get_tag(&self, id: &str) -> Result<Option<Tag>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TAG_COLS} FROM tags WHERE id = ?1"),
            params![id],
            tag_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_tag_by_name(&self, space_id: &str, name: &str) -> Result<Option<Tag>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TAG_COLS} FROM tags WHERE space_id = ?1 AND name = ?2"),
            params![space_id, name],
            tag_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tags(&self, space_id: &str, cursor: &str, limit: i32) -> Result<Vec<Tag>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TAG_COLS} FROM tags WHERE space_id = ?1 AND id > ?2 ORDER BY id LIMIT ?3"
        ))?;

        let rows = stmt.query_map(params![space_id, cursor, limit], tag_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_tag(&self, tag: &Tag) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE tags SET name = ?1, extras = ?2, updated_at = ?3 WHERE id = ?4",
                params![
                    tag.name,
                    tag.extras.to_string(),
                    format_datetime(&tag.updated_at),
                    tag.id,
                ],
            )
            .map_err(constraint_err)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_tag(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tags WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Note operations

    fn create_note(&self, note: &Note, log: &NoteLog) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO notes (id, space_id, title, content, revision, is_archived, is_pinned, is_deleted, extras, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                note.id,
                note.space_id,
                note.title,
                note.content.to_string(),
                note.revision,
                note.is_archived,
                note.is_pinned,
                note.is_deleted,
                note.extras.to_string(),
                format_datetime(&note.created_at),
                format_datetime(&note.updated_at),
            ],
        )?;

        insert_note_log(&tx, log)?;

        tx.commit()?;
        Ok(())
    }

    fn get_note(&self, id: &str) -> Result<Option<Note>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {NOTE_COLS} FROM notes WHERE id = ?1"),
            params![id],
            note_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_notes(&self, space_id: &str, cursor: &str, limit: i32) -> Result<Vec<Note>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLS} FROM notes WHERE space_id = ?1 AND id > ?2 ORDER BY id LIMIT ?3"
        ))?;

        let rows = stmt.query_map(params![space_id, cursor, limit], note_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_note_content(&self, note: &Note, log: &NoteLog) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE notes SET title = ?1, content = ?2, revision = ?3, updated_at = ?4 WHERE id = ?5",
            params![
                note.title,
                note.content.to_string(),
                note.revision,
                format_datetime(&note.updated_at),
                note.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }

        insert_note_log(&tx, log)?;

        tx.commit()?;
        Ok(())
    }

    fn set_note_flag(
        &self,
        note_id: &str,
        flag: NoteFlag,
        value: bool,
        log: &NoteLog,
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let rows = tx.execute(
            &format!(
                "UPDATE notes SET {} = ?1, updated_at = ?2 WHERE id = ?3",
                flag.name()
            ),
            params![value, format_datetime(&Utc::now()), note_id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }

        insert_note_log(&tx, log)?;

        tx.commit()?;
        Ok(())
    }

    fn delete_note(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM notes WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Note-Tag M2M operations

    fn add_note_tag(&self, note_id: &str, tag_id: &str, log: &NoteLog) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO note_tags (note_id, tag_id) VALUES (?1, ?2)",
            params![note_id, tag_id],
        )
        .map_err(constraint_err)?;

        insert_note_log(&tx, log)?;

        tx.commit()?;
        Ok(())
    }

    fn remove_note_tag(&self, note_id: &str, tag_id: &str, log: &NoteLog) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "DELETE FROM note_tags WHERE note_id = ?1 AND tag_id = ?2",
            params![note_id, tag_id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }

        insert_note_log(&tx, log)?;

        tx.commit()?;
        Ok(())
    }

    fn note_has_tag(&self, note_id: &str, tag_id: &str) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM note_tags WHERE note_id = ?1 AND tag_id = ?2",
            params![note_id, tag_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn list_note_tags(&self, note_id: &str) -> Result<Vec<Tag>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.space_id, t.name, t.extras, t.created_at, t.updated_at
             FROM tags t
             JOIN note_tags nt ON nt.tag_id = t.id
             WHERE nt.note_id = ?1
             ORDER BY t.name",
        )?;

        let rows = stmt.query_map(params![note_id], tag_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Note log operations

    fn get_note_log(&self, id: &str) -> Result<Option<NoteLog>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {NOTE_LOG_COLS} FROM note_logs WHERE id = ?1"),
            params![id],
            note_log_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_note_logs(&self, note_id: &str, cursor: &str, limit: i32) -> Result<Vec<NoteLog>> {
        let conn = self.conn();
        // Logs are chronological; the cursor is the last created_at seen.
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_LOG_COLS} FROM note_logs
             WHERE note_id = ?1 AND created_at > ?2 ORDER BY created_at, id LIMIT ?3"
        ))?;

        let rows = stmt.query_map(params![note_id, cursor, limit], note_log_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_note_logs(&self, note_id: &str) -> Result<i32> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM note_logs WHERE note_id = ?1",
            params![note_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO tokens (id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    token.id,
                    token.token_hash,
                    token.token_lookup,
                    token.user_id,
                    format_datetime(&token.created_at),
                    token.expires_at.as_ref().map(format_datetime),
                    token.last_used_at.as_ref().map(format_datetime),
                ],
            )
            .map_err(|e| match constraint_err(e) {
                Error::AlreadyExists => Error::TokenLookupCollision,
                other => other,
            })?;
        Ok(())
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLS} FROM tokens WHERE token_lookup = ?1"),
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLS} FROM tokens WHERE user_id = ?1 ORDER BY id"
        ))?;

        let rows = stmt.query_map(params![user_id], token_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::*;

    fn test_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn seed_user(store: &SqliteStore, email: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            fullname: "Test User".to_string(),
            is_staff: false,
            is_superuser: false,
            extras: json!({}),
            created_at: now,
            updated_at: now,
        };
        store.create_user(&user).unwrap()
    }

    fn seed_space(store: &SqliteStore, user: &User) -> NoteSpace {
        let now = Utc::now();
        let space = NoteSpace {
            id: Uuid::new_v4().to_string(),
            kind: SpaceKind::Team,
            name: "test-space".to_string(),
            extras: json!({}),
            created_at: now,
            updated_at: now,
        };
        let owner = Member {
            id: Uuid::new_v4().to_string(),
            space_id: space.id.clone(),
            user_id: user.id.clone(),
            role: Role::Owner,
            extras: json!({}),
            created_at: now,
            updated_at: now,
        };
        store.create_space(&space, &owner).unwrap();
        space
    }

    fn seed_note(store: &SqliteStore, space: &NoteSpace, user: &User) -> Note {
        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4().to_string(),
            space_id: space.id.clone(),
            title: "A".to_string(),
            content: json!({}),
            revision: 1,
            is_archived: false,
            is_pinned: false,
            is_deleted: false,
            extras: json!({}),
            created_at: now,
            updated_at: now,
        };
        let log = NoteLog::record(
            &note.id,
            &user.id,
            LogAction::Created,
            json!({"title": note.title, "content": note.content}),
        );
        store.create_note(&note, &log).unwrap();
        note
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = test_store();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"notespaces".to_string()));
        assert!(tables.contains(&"members".to_string()));
        assert!(tables.contains(&"tags".to_string()));
        assert!(tables.contains(&"notes".to_string()));
        assert!(tables.contains(&"note_tags".to_string()));
        assert!(tables.contains(&"note_logs".to_string()));
        assert!(tables.contains(&"tokens".to_string()));
    }

    #[test]
    fn test_first_user_bootstraps_instance() {
        let (_temp, store) = test_store();

        let first = seed_user(&store, "first@example.com");
        assert!(first.is_staff);
        assert!(first.is_superuser);

        let second = seed_user(&store, "second@example.com");
        assert!(!second.is_staff);
        assert!(!second.is_superuser);

        // Promotion is persisted, not just reported.
        let fetched = store.get_user(&first.id).unwrap().unwrap();
        assert!(fetched.is_superuser);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let (_temp, store) = test_store();

        seed_user(&store, "same@example.com");

        let now = Utc::now();
        let dup = User {
            id: Uuid::new_v4().to_string(),
            email: "same@example.com".to_string(),
            fullname: "Dup".to_string(),
            is_staff: false,
            is_superuser: false,
            extras: json!({}),
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(
            store.create_user(&dup),
            Err(Error::AlreadyExists)
        ));
    }

    #[test]
    fn test_space_create_adds_owner_membership() {
        let (_temp, store) = test_store();

        let user = seed_user(&store, "owner@example.com");
        let space = seed_space(&store, &user);

        let members = store.list_members(&space.id, "", 10).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, user.id);
        assert_eq!(members[0].role, Role::Owner);

        let member = store.get_member_by_user(&space.id, &user.id).unwrap();
        assert!(member.is_some());

        let nobody = store
            .get_member_by_user(&space.id, "missing-user")
            .unwrap();
        assert!(nobody.is_none());
    }

    #[test]
    fn test_member_pair_unique() {
        let (_temp, store) = test_store();

        let user = seed_user(&store, "owner@example.com");
        let space = seed_space(&store, &user);

        let now = Utc::now();
        let dup = Member {
            id: Uuid::new_v4().to_string(),
            space_id: space.id.clone(),
            user_id: user.id.clone(),
            role: Role::Guest,
            extras: json!({}),
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(
            store.create_member(&dup),
            Err(Error::AlreadyExists)
        ));
    }

    #[test]
    fn test_note_create_writes_log() {
        let (_temp, store) = test_store();

        let user = seed_user(&store, "owner@example.com");
        let space = seed_space(&store, &user);
        let note = seed_note(&store, &space, &user);

        let logs = store.list_note_logs(&note.id, "", 10).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, LogAction::Created);
        assert_eq!(logs[0].user_id, user.id);
        assert_eq!(logs[0].extras["title"], "A");
    }

    #[test]
    fn test_update_note_content_bumps_revision() {
        let (_temp, store) = test_store();

        let user = seed_user(&store, "owner@example.com");
        let space = seed_space(&store, &user);
        let mut note = seed_note(&store, &space, &user);

        note.title = "B".to_string();
        note.revision += 1;
        note.updated_at = Utc::now();
        let log = NoteLog::record(
            &note.id,
            &user.id,
            LogAction::Updated,
            json!({
                "old": {"title": "A", "content": {}},
                "new": {"title": "B", "content": {}},
            }),
        );
        store.update_note_content(&note, &log).unwrap();

        let fetched = store.get_note(&note.id).unwrap().unwrap();
        assert_eq!(fetched.title, "B");
        assert_eq!(fetched.revision, 2);

        let logs = store.list_note_logs(&note.id, "", 10).unwrap();
        assert_eq!(logs.len(), 2);
        let updated = logs.iter().find(|l| l.action == LogAction::Updated).unwrap();
        assert_eq!(updated.extras["old"]["title"], "A");
        assert_eq!(updated.extras["new"]["title"], "B");
    }

    #[test]
    fn test_set_note_flag_writes_log() {
        let (_temp, store) = test_store();

        let user = seed_user(&store, "owner@example.com");
        let space = seed_space(&store, &user);
        let note = seed_note(&store, &space, &user);

        let log = NoteLog::record(&note.id, &user.id, LogAction::Archived, json!({}));
        store
            .set_note_flag(&note.id, NoteFlag::Archived, true, &log)
            .unwrap();

        let fetched = store.get_note(&note.id).unwrap().unwrap();
        assert!(fetched.is_archived);
        assert!(!fetched.is_pinned);
        assert!(!fetched.is_deleted);
        // Flag toggles never move the revision counter.
        assert_eq!(fetched.revision, 1);
        assert_eq!(store.count_note_logs(&note.id).unwrap(), 2);
    }

    #[test]
    fn test_hard_delete_cascades_logs() {
        let (_temp, store) = test_store();

        let user = seed_user(&store, "owner@example.com");
        let space = seed_space(&store, &user);
        let note = seed_note(&store, &space, &user);

        let log = NoteLog::record(&note.id, &user.id, LogAction::Deleted, json!({}));
        store
            .set_note_flag(&note.id, NoteFlag::Deleted, true, &log)
            .unwrap();
        assert_eq!(store.count_note_logs(&note.id).unwrap(), 2);

        // Soft delete keeps the note and its history around.
        assert!(store.get_note(&note.id).unwrap().is_some());

        let deleted = store.delete_note(&note.id).unwrap();
        assert!(deleted);
        assert!(store.get_note(&note.id).unwrap().is_none());
        assert_eq!(store.count_note_logs(&note.id).unwrap(), 0);
    }

    #[test]
    fn test_space_delete_cascades() {
        let (_temp, store) = test_store();

        let user = seed_user(&store, "owner@example.com");
        let space = seed_space(&store, &user);
        let note = seed_note(&store, &space, &user);

        let now = Utc::now();
        let tag = Tag {
            id: Uuid::new_v4().to_string(),
            space_id: space.id.clone(),
            name: "ideas".to_string(),
            extras: json!({}),
            created_at: now,
            updated_at: now,
        };
        store.create_tag(&tag).unwrap();

        store.delete_space(&space.id).unwrap();

        assert!(store.get_note(&note.id).unwrap().is_none());
        assert!(store.get_tag(&tag.id).unwrap().is_none());
        assert!(store.list_members(&space.id, "", 10).unwrap().is_empty());
        assert_eq!(store.count_note_logs(&note.id).unwrap(), 0);
    }

    #[test]
    fn test_note_tag_attach_detach() {
        let (_temp, store) = test_store();

        let user = seed_user(&store, "owner@example.com");
        let space = seed_space(&store, &user);
        let note = seed_note(&store, &space, &user);

        let now = Utc::now();
        let tag = Tag {
            id: Uuid::new_v4().to_string(),
            space_id: space.id.clone(),
            name: "ideas".to_string(),
            extras: json!({}),
            created_at: now,
            updated_at: now,
        };
        store.create_tag(&tag).unwrap();

        assert!(!store.note_has_tag(&note.id, &tag.id).unwrap());

        let log = NoteLog::record(&note.id, &user.id, LogAction::Tagged, json!({"tag": tag.id}));
        store.add_note_tag(&note.id, &tag.id, &log).unwrap();

        assert!(store.note_has_tag(&note.id, &tag.id).unwrap());
        let tags = store.list_note_tags(&note.id).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "ideas");

        let log = NoteLog::record(&note.id, &user.id, LogAction::Untagged, json!({"tag": tag.id}));
        store.remove_note_tag(&note.id, &tag.id, &log).unwrap();
        assert!(!store.note_has_tag(&note.id, &tag.id).unwrap());
        assert_eq!(store.count_note_logs(&note.id).unwrap(), 3);
    }

    #[test]
    fn test_tag_name_unique_per_space() {
        let (_temp, store) = test_store();

        let user = seed_user(&store, "owner@example.com");
        let space = seed_space(&store, &user);

        let now = Utc::now();
        let tag = Tag {
            id: Uuid::new_v4().to_string(),
            space_id: space.id.clone(),
            name: "ideas".to_string(),
            extras: json!({}),
            created_at: now,
            updated_at: now,
        };
        store.create_tag(&tag).unwrap();

        let dup = Tag {
            id: Uuid::new_v4().to_string(),
            ..tag.clone()
        };
        assert!(matches!(store.create_tag(&dup), Err(Error::AlreadyExists)));

        // Same name in a different space is fine.
        let other_space = seed_space(&store, &user);
        let elsewhere = Tag {
            id: Uuid::new_v4().to_string(),
            space_id: other_space.id.clone(),
            ..tag
        };
        store.create_tag(&elsewhere).unwrap();
    }

    #[test]
    fn test_token_lookup_collision() {
        let (_temp, store) = test_store();

        let user = seed_user(&store, "owner@example.com");

        let now = Utc::now();
        let token1 = Token {
            id: "token-1".to_string(),
            token_hash: "hash1".to_string(),
            token_lookup: "lookup123".to_string(),
            user_id: user.id.clone(),
            created_at: now,
            expires_at: None,
            last_used_at: None,
        };
        store.create_token(&token1).unwrap();

        let token2 = Token {
            id: "token-2".to_string(),
            token_hash: "hash2".to_string(),
            token_lookup: "lookup123".to_string(), // Same lookup
            user_id: user.id,
            created_at: now,
            expires_at: None,
            last_used_at: None,
        };

        let result = store.create_token(&token2);
        assert!(matches!(result, Err(Error::TokenLookupCollision)));
    }

    #[test]
    fn test_token_cascades_on_user_delete() {
        let (_temp, store) = test_store();

        let user = seed_user(&store, "owner@example.com");
        let now = Utc::now();
        let token = Token {
            id: "token-1".to_string(),
            token_hash: "hash".to_string(),
            token_lookup: "lookup".to_string(),
            user_id: user.id.clone(),
            created_at: now,
            expires_at: None,
            last_used_at: None,
        };
        store.create_token(&token).unwrap();

        store
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![user.id])
            .unwrap();

        assert!(store.get_token_by_lookup("lookup").unwrap().is_none());
    }
}
