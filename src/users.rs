//! User accounts, kept in SQLite apart from patient data.

use std::path::Path;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use thiserror::Error;

use crate::password::{hash_password, verify_password};

pub type UserId = i64;

#[derive(Error, Debug)]
pub enum UserError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Email already exists!")]
    EmailTaken,

    #[error("User {0} not found")]
    NotFound(UserId),

    #[error("Invalid email or password")]
    InvalidCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_date: String,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    password TEXT NOT NULL,
    created_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);";

pub struct UserStore {
    conn: Connection,
    iterations: u32,
}

fn map_unique(e: rusqlite::Error) -> UserError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            UserError::EmailTaken
        }
        _ => UserError::Sqlite(e),
    }
}

impl UserStore {
    pub fn open(path: &Path, iterations: u32) -> Result<Self, UserError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::setup(Connection::open(path)?, iterations)
    }

    /// In-memory user table (for testing).
    pub fn open_in_memory(iterations: u32) -> Result<Self, UserError> {
        Self::setup(Connection::open_in_memory()?, iterations)
    }

    fn setup(conn: Connection, iterations: u32) -> Result<Self, UserError> {
        conn.execute_batch(SCHEMA)?;
        Ok(UserStore { conn, iterations })
    }

    pub fn register(&self, name: &str, email: &str, password: &str) -> Result<UserId, UserError> {
        let hashed = hash_password(password, self.iterations);
        self.conn
            .execute(
                "INSERT INTO users (name, email, password) VALUES (?1, ?2, ?3)",
                params![name, email, hashed],
            )
            .map_err(map_unique)?;
        let id = self.conn.last_insert_rowid();
        log::info!("Registered user {}", id);
        Ok(id)
    }

    /// Returns the user when the email exists and the password matches.
    pub fn verify(&self, email: &str, password: &str) -> Result<Option<User>, UserError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, email, created_date, password FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok((
                        User {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            email: row.get(2)?,
                            created_date: row.get(3)?,
                        },
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.and_then(|(user, hashed)| verify_password(password, &hashed).then_some(user)))
    }

    /// Like [`UserStore::verify`], but a failed check is an error.
    pub fn login(&self, email: &str, password: &str) -> Result<User, UserError> {
        self.verify(email, password)?.ok_or(UserError::InvalidCredentials)
    }

    pub fn user_exists(&self, name: &str, email: &str) -> Result<bool, UserError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM users WHERE name = ?1 AND email = ?2",
                params![name, email],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get(&self, id: UserId) -> Result<User, UserError> {
        self.conn
            .query_row(
                "SELECT id, name, email, created_date FROM users WHERE id = ?1",
                params![id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        created_date: row.get(3)?,
                    })
                },
            )
            .optional()?
            .ok_or(UserError::NotFound(id))
    }

    pub fn update(&self, id: UserId, name: &str, email: &str) -> Result<(), UserError> {
        let changed = self
            .conn
            .execute(
                "UPDATE users SET name = ?1, email = ?2 WHERE id = ?3",
                params![name, email, id],
            )
            .map_err(map_unique)?;
        if changed == 0 {
            return Err(UserError::NotFound(id));
        }
        Ok(())
    }

    pub fn delete(&self, id: UserId) -> Result<(), UserError> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(UserError::NotFound(id));
        }
        log::info!("Deleted user {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> UserStore {
        UserStore::open_in_memory(1_000).unwrap()
    }

    #[test]
    fn register_then_login() {
        let users = store();
        let id = users.register("Jacek", "jacek@jacek.com", "test123").unwrap();
        let user = users.verify("jacek@jacek.com", "test123").unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.name, "Jacek");
        assert!(users.verify("jacek@jacek.com", "wrong").unwrap().is_none());
        assert!(users.verify("nobody@example.com", "test123").unwrap().is_none());
        assert!(matches!(users.login("jacek@jacek.com", "wrong"), Err(UserError::InvalidCredentials)));
    }

    #[test]
    fn password_is_not_stored_in_plain_text() {
        let users = store();
        users.register("Jacek", "jacek@jacek.com", "test123").unwrap();
        let stored: String = users
            .conn
            .query_row("SELECT password FROM users", [], |row| row.get(0))
            .unwrap();
        assert_ne!(stored, "test123");
        assert!(stored.starts_with("pbkdf2-sha256$"));
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let users = store();
        users.register("A", "same@example.com", "pw").unwrap();
        let err = users.register("B", "same@example.com", "pw").unwrap_err();
        assert!(matches!(err, UserError::EmailTaken));
    }

    #[test]
    fn user_exists_needs_name_and_email() {
        let users = store();
        users.register("Jacek", "jacek@jacek.com", "test123").unwrap();
        assert!(users.user_exists("Jacek", "jacek@jacek.com").unwrap());
        assert!(!users.user_exists("NonExistenUser", "nonexistent@example.com").unwrap());
        assert!(!users.user_exists("Jacek", "other@example.com").unwrap());
    }

    #[test]
    fn update_and_delete() {
        let users = store();
        let id = users.register("Jacek", "jacek@jacek.com", "test123").unwrap();
        users.update(id, "Jack", "jack@example.com").unwrap();
        let user = users.get(id).unwrap();
        assert_eq!(user.email, "jack@example.com");
        assert!(users.verify("jack@example.com", "test123").unwrap().is_some());

        users.delete(id).unwrap();
        assert!(matches!(users.get(id), Err(UserError::NotFound(_))));
        assert!(matches!(users.delete(id), Err(UserError::NotFound(_))));
    }
}
