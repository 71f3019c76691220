/// Handles the account rows written by the auth stage.
use crate::model::entity::Account;
use crate::Result;
use sqlx::prelude::PgQueryAs;
use sqlx::PgConnection;

/// Finds the accounts registered under a name. The handshake demands exactly
/// one matching row; the caller enforces that contract.
pub async fn get_by_username(conn: &mut PgConnection, username: &str) -> Result<Vec<Account>> {
    Ok(sqlx::query_as::<_, Account>(
        r#"SELECT "guid", "username", "sessionKey" AS "session_key" FROM "accounts" WHERE "username" = $1"#,
    )
    .bind(username)
    .fetch_all(conn)
    .await?)
}
