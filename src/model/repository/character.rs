/// Handles the character rows of the character database.
use crate::model::entity::Character;
use crate::Result;
use sqlx::prelude::PgQueryAs;
use sqlx::PgConnection;

/// Finds the character currently flagged online for an account, if any.
pub async fn get_online_by_account(
    conn: &mut PgConnection,
    account: i32,
) -> Result<Option<Character>> {
    Ok(sqlx::query_as::<_, Character>(
        r#"SELECT "guid", "account", "online" FROM "characters" WHERE "account" = $1 AND "online" = 1"#,
    )
    .bind(account)
    .fetch_optional(conn)
    .await?)
}
