use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::Role;
use crate::models::User;

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, name, email, password_hash, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.id.to_string(),
            user.name,
            user.email,
            user.password_hash,
            user.role.as_str(),
            user.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| {
        if DatabaseError::is_unique_violation(&e, "users.email") {
            DatabaseError::ConstraintViolation("email already registered".into())
        } else {
            e.into()
        }
    })?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<User, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, password_hash, role, created_at
         FROM users WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], user_columns);
    match result {
        Ok(parts) => user_from_parts(parts),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(DatabaseError::not_found("User", id)),
        Err(e) => Err(e.into()),
    }
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, password_hash, role, created_at
         FROM users WHERE email = ?1",
    )?;

    let result = stmt.query_row(params![email], user_columns);
    match result {
        Ok(parts) => Ok(Some(user_from_parts(parts)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

type UserColumns = (String, String, String, String, String, String);

fn user_columns(row: &rusqlite::Row<'_>) -> Result<UserColumns, rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn user_from_parts(
    (id, name, email, password_hash, role, created_at): UserColumns,
) -> Result<User, DatabaseError> {
    Ok(User {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        name,
        email,
        password_hash,
        role: Role::from_str(&role)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_default(),
    })
}
