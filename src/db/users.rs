use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{User, UserSummary};
use crate::db::{format_timestamp, timestamp_column};

const USER_COLUMNS: &str = "id, login_name, password, first_name, last_name, location, \
                            description, occupation, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        login_name: row.get(1)?,
        password: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        location: row.get(5)?,
        description: row.get(6)?,
        occupation: row.get(7)?,
        created_at: timestamp_column(row, 8)?,
    })
}

pub fn insert_user(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (id, login_name, password, first_name, last_name, location, description, occupation, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            user.id,
            user.login_name,
            user.password,
            user.first_name,
            user.last_name,
            user.location,
            user.description,
            user.occupation,
            format_timestamp(&user.created_at),
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        params![id],
        user_from_row,
    )
    .optional()
}

pub fn find_by_login(conn: &Connection, login_name: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE login_name = ?1", USER_COLUMNS),
        params![login_name],
        user_from_row,
    )
    .optional()
}

pub fn exists(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
}

pub fn list_summaries(conn: &Connection) -> rusqlite::Result<Vec<UserSummary>> {
    let mut stmt =
        conn.prepare("SELECT id, first_name, last_name FROM users ORDER BY created_at, rowid")?;
    let users = stmt
        .query_map([], |row| {
            Ok(UserSummary {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// Delete a user and everything hanging off them. Returns the file names of
/// the user's photos so the caller can remove the images from disk.
pub fn delete_user(conn: &mut Connection, id: &str) -> rusqlite::Result<Option<Vec<String>>> {
    let tx = conn.transaction()?;

    let file_names = {
        let mut stmt = tx.prepare("SELECT file_name FROM photos WHERE user_id = ?1")?;
        let names = stmt
            .query_map(params![id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        names
    };

    // Photos, comments, likes, activities and sessions go with the user via
    // ON DELETE CASCADE.
    let deleted = tx.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Ok(None);
    }

    tx.commit()?;
    Ok(Some(file_names))
}

/// Whether an error is the UNIQUE constraint on `login_name`.
pub fn is_duplicate_login(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                && msg.contains("users.login_name")
    )
}

#[cfg(test)]
pub(crate) fn sample_user(login_name: &str) -> User {
    User {
        id: uuid::Uuid::now_v7().to_string(),
        login_name: login_name.to_string(),
        password: "pw".to_string(),
        first_name: login_name.to_string(),
        last_name: "Tester".to_string(),
        location: String::new(),
        description: String::new(),
        occupation: String::new(),
        created_at: crate::db::now_timestamp(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[test]
    fn insert_and_find() {
        let (_tmp, pool) = test_pool();
        let conn = pool.get().unwrap();
        let alice = sample_user("alice");
        insert_user(&conn, &alice).unwrap();

        let by_id = find_by_id(&conn, &alice.id).unwrap().unwrap();
        assert_eq!(by_id.login_name, "alice");
        assert_eq!(by_id.created_at, alice.created_at);

        let by_login = find_by_login(&conn, "alice").unwrap().unwrap();
        assert_eq!(by_login.id, alice.id);

        assert!(exists(&conn, &alice.id).unwrap());
        assert!(find_by_login(&conn, "bob").unwrap().is_none());
    }

    #[test]
    fn duplicate_login_is_detected() {
        let (_tmp, pool) = test_pool();
        let conn = pool.get().unwrap();
        insert_user(&conn, &sample_user("alice")).unwrap();
        let err = insert_user(&conn, &sample_user("alice")).unwrap_err();
        assert!(is_duplicate_login(&err));
    }

    #[test]
    fn other_constraint_failures_are_not_duplicate_logins() {
        let (_tmp, pool) = test_pool();
        let conn = pool.get().unwrap();
        let alice = sample_user("alice");
        insert_user(&conn, &alice).unwrap();

        // Same primary key, different login name.
        let mut clash = sample_user("bob");
        clash.id = alice.id.clone();
        let err = insert_user(&conn, &clash).unwrap_err();
        assert!(!is_duplicate_login(&err));

        // Foreign key violation.
        let err = conn
            .execute(
                "INSERT INTO sessions (id, user_id, token, expires_at) VALUES ('s', 'ghost', 't', 'x')",
                [],
            )
            .unwrap_err();
        assert!(!is_duplicate_login(&err));
    }

    #[test]
    fn list_summaries_in_registration_order() {
        let (_tmp, pool) = test_pool();
        let conn = pool.get().unwrap();
        insert_user(&conn, &sample_user("alice")).unwrap();
        insert_user(&conn, &sample_user("bob")).unwrap();

        let names: Vec<String> = list_summaries(&conn)
            .unwrap()
            .into_iter()
            .map(|u| u.first_name)
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn delete_missing_user_returns_none() {
        let (_tmp, pool) = test_pool();
        let mut conn = pool.get().unwrap();
        assert!(delete_user(&mut conn, "nobody").unwrap().is_none());
    }
}
