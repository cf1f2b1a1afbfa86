/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Parse a textual identifier (HTML attribute, JSON string) into a [`DbId`].
///
/// Surrounding whitespace is ignored. Returns `None` for anything that is not
/// a positive integer.
pub fn parse_db_id(raw: &str) -> Option<DbId> {
    raw.trim().parse::<DbId>().ok().filter(|id| *id > 0)
}
