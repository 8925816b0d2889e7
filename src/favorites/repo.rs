use sqlx::PgPool;

/// Bookmark a plate. Adding an existing favorite is a no-op.
pub async fn add(db: &PgPool, user_id: i64, plate: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO favorites (user_id, mispar_rechev)
        VALUES ($1, $2)
        ON CONFLICT (user_id, mispar_rechev) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(plate)
    .execute(db)
    .await?;
    Ok(())
}

/// Drop a bookmark. Removing a missing favorite is a no-op.
pub async fn remove(db: &PgPool, user_id: i64, plate: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND mispar_rechev = $2")
        .bind(user_id)
        .bind(plate)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn list_plates(db: &PgPool, user_id: i64) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT mispar_rechev FROM favorites WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}
