use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid, Database};
use crate::error::Result;
use crate::models::{Session, User};

impl Database {
    // ==================== USERS ====================

    /// Return the user for an email, creating the row on first sign-in.
    pub fn upsert_user(&self, email: &str) -> Result<User> {
        if let Some(user) = self.get_user_by_email(email)? {
            return Ok(user);
        }

        let user = User::new(email.to_string());
        self.conn.execute(
            "INSERT INTO users (id, email, created_at) VALUES (?, ?, ?)",
            params![
                user.id.to_string(),
                user.email,
                user.created_at.to_rfc3339()
            ],
        )?;
        Ok(user)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, created_at FROM users WHERE email = ?",
                [email],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    #[cfg(test)]
    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, created_at FROM users WHERE id = ?",
                [id.to_string()],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    // ==================== SESSION ====================

    /// Store the session, replacing any previous one
    pub fn save_session(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            r#"INSERT OR REPLACE INTO sessions
               (id, user_id, provider, access_token, refresh_token, created_at)
               VALUES (1, ?, ?, ?, ?, ?)"#,
            params![
                session.user_id.to_string(),
                session.provider,
                session.access_token,
                session.refresh_token,
                session.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_session(&self) -> Result<Option<Session>> {
        let session = self
            .conn
            .query_row(
                r#"SELECT s.user_id, u.email, s.provider, s.access_token, s.refresh_token, s.created_at
                   FROM sessions s
                   JOIN users u ON u.id = s.user_id
                   WHERE s.id = 1"#,
                [],
                |row| {
                    let user_id: String = row.get(0)?;
                    let created_at: String = row.get(5)?;
                    Ok(Session {
                        user_id: parse_uuid(&user_id)?,
                        email: row.get(1)?,
                        provider: row.get(2)?,
                        access_token: row.get(3)?,
                        refresh_token: row.get(4)?,
                        created_at: parse_timestamp(&created_at),
                    })
                },
            )
            .optional()?;
        Ok(session)
    }

    /// Remove the stored session. Returns false when nobody was signed in.
    pub fn delete_session(&self) -> Result<bool> {
        let rows = self.conn.execute("DELETE FROM sessions WHERE id = 1", [])?;
        Ok(rows > 0)
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        let id: String = row.get(0)?;
        let created_at: String = row.get(2)?;
        Ok(User {
            id: parse_uuid(&id)?,
            email: row.get(1)?,
            created_at: parse_timestamp(&created_at),
        })
    }
}

/// Build a session for a freshly signed-in user
pub fn new_session(
    user: &User,
    provider: &str,
    access_token: Option<String>,
    refresh_token: Option<String>,
) -> Session {
    Session {
        user_id: user.id,
        email: user.email.clone(),
        provider: provider.to_string(),
        access_token,
        refresh_token,
        created_at: Utc::now(),
    }
}
