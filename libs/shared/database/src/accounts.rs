use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{Role, UserAccount};

use crate::sqlite::{enum_column, timestamp_column, timestamp_param, uuid_column};
use crate::DatabaseError;

const ACCOUNT_COLUMNS: &str =
    "id, name, email, password_hash, role, is_active, contact, created_at";

/// Fields for a new `users` row; the email is normalised on insert.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub password_hash: Option<String>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn map_account(row: &Row<'_>) -> rusqlite::Result<UserAccount> {
    Ok(UserAccount {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: enum_column(row, 4)?,
        is_active: row.get(5)?,
        contact: row.get(6)?,
        created_at: timestamp_column(row, 7)?,
    })
}

pub fn insert_account(conn: &Connection, account: NewAccount) -> Result<UserAccount, DatabaseError> {
    let created = UserAccount {
        id: Uuid::new_v4(),
        name: account.name.trim().to_string(),
        email: normalize_email(&account.email),
        password_hash: account.password_hash,
        role: account.role,
        is_active: true,
        contact: account.contact.filter(|c| !c.trim().is_empty()),
        created_at: Utc::now(),
    };

    conn.execute(
        "INSERT INTO users (id, name, email, password_hash, role, is_active, contact, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            created.id.to_string(),
            created.name,
            created.email,
            created.password_hash,
            created.role.as_str(),
            created.is_active,
            created.contact,
            timestamp_param(created.created_at),
        ],
    )?;

    debug!("Created {} account {}", created.role, created.id);
    Ok(created)
}

pub fn find_account(conn: &Connection, id: Uuid) -> Result<Option<UserAccount>, DatabaseError> {
    let account = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", ACCOUNT_COLUMNS),
            params![id.to_string()],
            map_account,
        )
        .optional()?;
    Ok(account)
}

pub fn get_account(conn: &Connection, id: Uuid) -> Result<UserAccount, DatabaseError> {
    find_account(conn, id)?.ok_or_else(|| DatabaseError::not_found("Account", id))
}

pub fn find_account_by_email(conn: &Connection, email: &str) -> Result<Option<UserAccount>, DatabaseError> {
    let account = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE email = ?1", ACCOUNT_COLUMNS),
            params![normalize_email(email)],
            map_account,
        )
        .optional()?;
    Ok(account)
}

pub fn email_taken(conn: &Connection, email: &str, except: Option<Uuid>) -> Result<bool, DatabaseError> {
    let existing = find_account_by_email(conn, email)?;
    Ok(matches!(existing, Some(account) if Some(account.id) != except))
}

pub fn count_accounts_by_role(conn: &Connection, role: Role) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE role = ?1",
        params![role.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn update_account(conn: &Connection, id: Uuid, changes: AccountChanges) -> Result<UserAccount, DatabaseError> {
    let mut account = get_account(conn, id)?;

    if let Some(name) = changes.name.filter(|n| !n.trim().is_empty()) {
        account.name = name.trim().to_string();
    }
    if let Some(email) = changes.email.filter(|e| !e.trim().is_empty()) {
        account.email = normalize_email(&email);
    }
    if let Some(contact) = changes.contact {
        account.contact = Some(contact.trim().to_string()).filter(|c| !c.is_empty());
    }
    if let Some(password_hash) = changes.password_hash {
        account.password_hash = password_hash;
    }

    conn.execute(
        "UPDATE users SET name = ?2, email = ?3, contact = ?4, password_hash = ?5 WHERE id = ?1",
        params![
            id.to_string(),
            account.name,
            account.email,
            account.contact,
            account.password_hash,
        ],
    )?;
    Ok(account)
}

pub fn set_account_active(conn: &Connection, id: Uuid, is_active: bool) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET is_active = ?2 WHERE id = ?1",
        params![id.to_string(), is_active],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Account", id));
    }
    Ok(())
}

/// Deletes only the `users` row; profiles must already be gone.
pub fn delete_account_row(conn: &Connection, id: Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Account", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::open_memory_database;

    fn new_account(email: &str, role: Role) -> NewAccount {
        NewAccount {
            name: "  Test User ".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role,
            contact: Some(" ".to_string()),
        }
    }

    #[test]
    fn test_email_is_normalised_and_unique() {
        let conn = open_memory_database().unwrap();
        let account = insert_account(&conn, new_account(" Doc@Example.com ", Role::Doctor)).unwrap();

        assert_eq!(account.email, "doc@example.com");
        assert_eq!(account.name, "Test User");
        assert!(account.contact.is_none());
        assert!(email_taken(&conn, "DOC@example.com", None).unwrap());
        assert!(!email_taken(&conn, "doc@example.com", Some(account.id)).unwrap());

        let duplicate = insert_account(&conn, new_account("doc@example.com", Role::Patient)).unwrap_err();
        assert!(duplicate.is_constraint_violation());
    }

    #[test]
    fn test_deactivate_and_count() {
        let conn = open_memory_database().unwrap();
        let account = insert_account(&conn, new_account("p@example.com", Role::Patient)).unwrap();

        set_account_active(&conn, account.id, false).unwrap();

        assert!(!get_account(&conn, account.id).unwrap().is_active);
        assert_eq!(count_accounts_by_role(&conn, Role::Patient).unwrap(), 1);
        assert_eq!(count_accounts_by_role(&conn, Role::Doctor).unwrap(), 0);
    }

    #[test]
    fn test_missing_account_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = get_account(&conn, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
