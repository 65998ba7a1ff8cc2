use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{Comment, CommentView, Photo, UserSummary};
use crate::db::{format_timestamp, timestamp_column};
use crate::visibility::Sharing;

// --- Photos ---

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<Photo> {
    photo_columns(row, 0)
}

/// Read `id, user_id, file_name, date_time, sharing_list` starting at `base`.
pub(crate) fn photo_columns(row: &Row<'_>, base: usize) -> rusqlite::Result<Photo> {
    let sharing_raw: Option<String> = row.get(base + 4)?;
    let sharing = Sharing::from_column(sharing_raw.as_deref()).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(base + 4, Type::Text, Box::new(e))
    })?;
    Ok(Photo {
        id: row.get(base)?,
        user_id: row.get(base + 1)?,
        file_name: row.get(base + 2)?,
        date_time: timestamp_column(row, base + 3)?,
        sharing,
    })
}

pub fn insert_photo(conn: &Connection, photo: &Photo) -> Result<(), crate::error::AppError> {
    conn.execute(
        "INSERT INTO photos (id, user_id, file_name, date_time, sharing_list)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            photo.id,
            photo.user_id,
            photo.file_name,
            format_timestamp(&photo.date_time),
            photo.sharing.to_column()?,
        ],
    )?;
    Ok(())
}

pub fn find_photo(conn: &Connection, id: &str) -> rusqlite::Result<Option<Photo>> {
    conn.query_row(
        "SELECT id, user_id, file_name, date_time, sharing_list FROM photos WHERE id = ?1",
        params![id],
        photo_from_row,
    )
    .optional()
}

pub fn photos_of_user(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<Photo>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, file_name, date_time, sharing_list FROM photos
         WHERE user_id = ?1
         ORDER BY date_time, rowid",
    )?;
    let photos = stmt
        .query_map(params![user_id], photo_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(photos)
}

pub fn all_photos(conn: &Connection) -> rusqlite::Result<Vec<Photo>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, file_name, date_time, sharing_list FROM photos
         ORDER BY date_time, rowid",
    )?;
    let photos = stmt
        .query_map([], photo_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(photos)
}

pub fn delete_photo(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM photos WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

// --- Comments ---

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        photo_id: row.get(1)?,
        user_id: row.get(2)?,
        comment: row.get(3)?,
        date_time: timestamp_column(row, 4)?,
    })
}

pub fn insert_comment(conn: &Connection, comment: &Comment) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO comments (id, photo_id, user_id, comment, date_time)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            comment.id,
            comment.photo_id,
            comment.user_id,
            comment.comment,
            format_timestamp(&comment.date_time),
        ],
    )?;
    Ok(())
}

pub fn find_comment(
    conn: &Connection,
    photo_id: &str,
    comment_id: &str,
) -> rusqlite::Result<Option<Comment>> {
    conn.query_row(
        "SELECT id, photo_id, user_id, comment, date_time FROM comments
         WHERE id = ?1 AND photo_id = ?2",
        params![comment_id, photo_id],
        comment_from_row,
    )
    .optional()
}

pub fn delete_comment(conn: &Connection, comment_id: &str) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM comments WHERE id = ?1", params![comment_id])?;
    Ok(rows > 0)
}

pub fn comments_by_user(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<Comment>> {
    let mut stmt = conn.prepare(
        "SELECT id, photo_id, user_id, comment, date_time FROM comments
         WHERE user_id = ?1
         ORDER BY date_time, rowid",
    )?;
    let comments = stmt
        .query_map(params![user_id], comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

pub fn all_comments(conn: &Connection) -> rusqlite::Result<Vec<Comment>> {
    let mut stmt = conn.prepare(
        "SELECT id, photo_id, user_id, comment, date_time FROM comments
         ORDER BY date_time, rowid",
    )?;
    let comments = stmt
        .query_map([], comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

/// Comments on a photo, oldest first, with their authors resolved.
pub fn comment_views(conn: &Connection, photo_id: &str) -> rusqlite::Result<Vec<CommentView>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.comment, c.date_time, u.id, u.first_name, u.last_name
         FROM comments c
         JOIN users u ON u.id = c.user_id
         WHERE c.photo_id = ?1
         ORDER BY c.date_time, c.rowid",
    )?;
    let comments = stmt
        .query_map(params![photo_id], |row| {
            Ok(CommentView {
                id: row.get(0)?,
                comment: row.get(1)?,
                date_time: timestamp_column(row, 2)?,
                user: UserSummary {
                    id: row.get(3)?,
                    first_name: row.get(4)?,
                    last_name: row.get(5)?,
                },
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

// --- Likes ---

/// Add a like; liking twice leaves a single like.
pub fn like(conn: &Connection, photo_id: &str, user_id: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO likes (photo_id, user_id, created_at) VALUES (?1, ?2, ?3)",
        params![photo_id, user_id, format_timestamp(&chrono::Utc::now())],
    )?;
    Ok(())
}

pub fn unlike(conn: &Connection, photo_id: &str, user_id: &str) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM likes WHERE photo_id = ?1 AND user_id = ?2",
        params![photo_id, user_id],
    )?;
    Ok(())
}

pub fn likes_of(conn: &Connection, photo_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM likes WHERE photo_id = ?1 ORDER BY created_at, rowid",
    )?;
    let likes = stmt
        .query_map(params![photo_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(likes)
}

#[cfg(test)]
pub(crate) fn sample_photo(owner_id: &str, sharing: Sharing) -> Photo {
    let id = uuid::Uuid::now_v7().to_string();
    Photo {
        file_name: format!("{}.jpg", id),
        id,
        user_id: owner_id.to_string(),
        date_time: crate::db::now_timestamp(),
        sharing,
    }
}
