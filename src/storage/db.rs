use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    tracing::info!("Connecting to database: {}", database_url);

    // Handle special SQLite URL formats
    let db = if database_url == "sqlite::memory:" {
        Database::connect(database_url)
            .await
            .map_err(|e| DbErr::Custom(format!("Connection failed: {}", e)))?
    } else if let Some(path_str) = database_url.strip_prefix("sqlite://") {
        let path_str = path_str.split('?').next().unwrap_or(path_str);
        let path = std::path::Path::new(path_str);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DbErr::Custom(format!("Failed to create DB directory: {}", e)))?;
                tracing::info!("Created database directory: {}", parent.display());
            }
        }

        if !path.exists() {
            std::fs::File::create(path)
                .map_err(|e| DbErr::Custom(format!("Failed to create DB file: {}", e)))?;
            tracing::info!("Created database file: {}", path.display());
        }

        Database::connect(database_url)
            .await
            .map_err(|e| DbErr::Custom(format!("Connection failed: {}", e)))?
    } else {
        return Err(DbErr::Custom("Invalid SQLite URL format".to_string()));
    };

    tracing::info!("Applying migrations...");
    apply_migrations(&db).await?;

    Ok(db)
}

async fn table_exists(db: &DatabaseConnection, name: &str) -> Result<bool, DbErr> {
    let stmt = Statement::from_sql_and_values(
        db.get_database_backend(),
        "SELECT name FROM sqlite_master WHERE type='table' AND name=?",
        vec![name.into()],
    );
    Ok(db.query_one(stmt).await?.is_some())
}

async fn apply_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    if table_exists(db, "seaql_migrations").await? {
        tracing::info!("Migrations already applied, skipping");
        return Ok(());
    }

    tracing::info!("First run: executing all migration SQL files");

    let migrations = [
        include_str!("../../migrations/001_create_users.sql"),
        include_str!("../../migrations/002_create_conversations.sql"),
        include_str!("../../migrations/003_create_messages.sql"),
    ];

    for (i, sql) in migrations.iter().enumerate() {
        db.execute_unprepared(sql).await?;
        tracing::info!("Applied migration {}", i + 1);
    }

    db.execute_unprepared(
        r#"
        CREATE TABLE IF NOT EXISTS seaql_migrations (
            version TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .await?;

    for i in 1..=migrations.len() {
        db.execute_unprepared(&format!(
            "INSERT OR IGNORE INTO seaql_migrations (version) VALUES ('m20250110_{:08}')",
            i * 100000
        ))
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_db_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let url = format!("sqlite://{}", db_path.display());

        let db = init_db(&url).await.unwrap();

        assert!(db_path.exists());
        assert!(table_exists(&db, "seaql_migrations").await.unwrap());
    }

    #[tokio::test]
    async fn test_init_db_runs_migrations() {
        let db = init_db("sqlite::memory:").await.unwrap();

        for table in ["users", "conversations", "messages"] {
            assert!(
                table_exists(&db, table).await.unwrap(),
                "table {} should exist",
                table
            );
        }
    }

    #[tokio::test]
    async fn test_init_db_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let url = format!("sqlite://{}", db_path.display());

        init_db(&url).await.unwrap();
        // Second init against the same file must not re-run migrations
        init_db(&url).await.unwrap();
    }

    #[tokio::test]
    async fn test_init_db_rejects_unknown_scheme() {
        assert!(init_db("postgres://nope").await.is_err());
    }
}
