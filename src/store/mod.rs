mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// Compound mutations (space + owner membership, note mutation + log
/// entry) are single methods so the implementation can commit both
/// writes in one transaction.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    /// Creates a user. Inside the same transaction as the insert, the
    /// first user ever created is promoted to staff + superuser. Returns
    /// the stored row, which may carry the promoted flags.
    fn create_user(&self, user: &User) -> Result<User>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>>;
    fn update_user(&self, user: &User) -> Result<()>;

    // Note space operations
    /// Creates a space and the creator's Owner membership atomically.
    fn create_space(&self, space: &NoteSpace, owner: &Member) -> Result<()>;
    fn get_space(&self, id: &str) -> Result<Option<NoteSpace>>;
    fn list_spaces(&self, cursor: &str, limit: i32) -> Result<Vec<NoteSpace>>;
    fn update_space(&self, space: &NoteSpace) -> Result<()>;
    fn delete_space(&self, id: &str) -> Result<bool>;

    // Member operations
    fn create_member(&self, member: &Member) -> Result<()>;
    fn get_member(&self, id: &str) -> Result<Option<Member>>;
    fn get_member_by_user(&self, space_id: &str, user_id: &str) -> Result<Option<Member>>;
    fn list_members(&self, space_id: &str, cursor: &str, limit: i32) -> Result<Vec<Member>>;
    fn update_member(&self, member: &Member) -> Result<()>;
    fn delete_member(&self, id: &str) -> Result<bool>;

    // Tag operations
    fn create_tag(&self, tag: &Tag) -> Result<()>;
    fn get_tag(&self, id: &str) -> Result<Option<Tag>>;
    fn get_tag_by_name(&self, space_id: &str, name: &str) -> Result<Option<Tag>>;
    fn list_tags(&self, space_id: &str, cursor: &str, limit: i32) -> Result<Vec<Tag>>;
    fn update_tag(&self, tag: &Tag) -> Result<()>;
    fn delete_tag(&self, id: &str) -> Result<bool>;

    // Note operations. Mutations take the log entry recording them and
    // write both atomically; a failed log write rolls the mutation back.
    fn create_note(&self, note: &Note, log: &NoteLog) -> Result<()>;
    fn get_note(&self, id: &str) -> Result<Option<Note>>;
    fn list_notes(&self, space_id: &str, cursor: &str, limit: i32) -> Result<Vec<Note>>;
    fn update_note_content(&self, note: &Note, log: &NoteLog) -> Result<()>;
    fn set_note_flag(&self, note_id: &str, flag: NoteFlag, value: bool, log: &NoteLog)
    -> Result<()>;
    fn delete_note(&self, id: &str) -> Result<bool>;

    // Note-Tag M2M operations
    fn add_note_tag(&self, note_id: &str, tag_id: &str, log: &NoteLog) -> Result<()>;
    fn remove_note_tag(&self, note_id: &str, tag_id: &str, log: &NoteLog) -> Result<()>;
    fn note_has_tag(&self, note_id: &str, tag_id: &str) -> Result<bool>;
    fn list_note_tags(&self, note_id: &str) -> Result<Vec<Tag>>;

    // Note log operations. Rows are written by the note mutations above,
    // never directly, and never updated.
    fn get_note_log(&self, id: &str) -> Result<Option<NoteLog>>;
    fn list_note_logs(&self, note_id: &str, cursor: &str, limit: i32) -> Result<Vec<NoteLog>>;
    fn count_note_logs(&self, note_id: &str) -> Result<i32>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    fn close(&self) -> Result<()>;
}
