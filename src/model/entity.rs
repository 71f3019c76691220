/// Holds all database entities.

/// Account row carrying the session key issued by the auth stage. The
/// mixed case `sessionKey` column is aliased onto `session_key` by the
/// repository queries.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Account {
    pub guid: i32,
    pub username: String,
    pub session_key: String,
}

/// Character row, reduced to the fields the front-end borrows.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Character {
    pub guid: i64,
    pub account: i32,
    pub online: i16,
}
