use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{ActivityKind, ActivityRecord, UserSummary};
use crate::db::photos::photo_columns;
use crate::db::{format_timestamp, timestamp_column};

const RECORD_QUERY: &str = "SELECT a.id, a.kind, a.created_at, u.id, u.first_name, u.last_name,
            p.id, p.user_id, p.file_name, p.date_time, p.sharing_list
     FROM activities a
     JOIN users u ON u.id = a.user_id
     LEFT JOIN photos p ON p.id = a.photo_id";

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ActivityRecord> {
    let kind: String = row.get(1)?;
    let kind = kind
        .parse::<ActivityKind>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    let photo_id: Option<String> = row.get(6)?;
    let photo = match photo_id {
        Some(_) => Some(photo_columns(row, 6)?),
        None => None,
    };

    Ok(ActivityRecord {
        id: row.get(0)?,
        kind,
        created_at: timestamp_column(row, 2)?,
        user: UserSummary {
            id: row.get(3)?,
            first_name: row.get(4)?,
            last_name: row.get(5)?,
        },
        photo,
    })
}

/// Append an activity and return its id.
pub fn insert_activity(
    conn: &Connection,
    kind: ActivityKind,
    user_id: &str,
    photo_id: Option<&str>,
) -> rusqlite::Result<String> {
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO activities (id, kind, user_id, photo_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            id,
            kind.as_str(),
            user_id,
            photo_id,
            format_timestamp(&crate::db::now_timestamp()),
        ],
    )?;
    Ok(id)
}

pub fn find_record(conn: &Connection, id: &str) -> rusqlite::Result<Option<ActivityRecord>> {
    conn.query_row(
        &format!("{} WHERE a.id = ?1", RECORD_QUERY),
        params![id],
        record_from_row,
    )
    .optional()
}

/// Most recent activities, newest first.
pub fn recent(conn: &Connection, limit: u32) -> rusqlite::Result<Vec<ActivityRecord>> {
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY a.created_at DESC, a.rowid DESC LIMIT ?1",
        RECORD_QUERY
    ))?;
    let records = stmt
        .query_map(params![limit], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}
