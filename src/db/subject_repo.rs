use chrono::Utc;
use diet_core::{Catalog, RecordError, Storable, SubjectKind};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Debug)]
pub enum RepoError {
    Database(sqlx::Error),
    Record(RecordError),
    AlreadyExists(SubjectKind, String),
}

impl std::fmt::Display for RepoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepoError::Database(e) => write!(f, "Database error: {}", e),
            RepoError::Record(e) => write!(f, "Stored subject is invalid: {}", e),
            RepoError::AlreadyExists(kind, name) => {
                write!(f, "The {} '{}' already exists", kind, name)
            }
        }
    }
}

impl std::error::Error for RepoError {}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        RepoError::Database(e)
    }
}

impl From<RecordError> for RepoError {
    fn from(e: RecordError) -> Self {
        RepoError::Record(e)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(e: serde_json::Error) -> Self {
        RepoError::Record(RecordError::Json(e))
    }
}

/// Ingredients and recipes, one row each, stored as their JSON record.
pub struct SubjectRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct SubjectRow {
    data: String,
}

impl SubjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create<S: Storable>(&self, subject: &S) -> Result<(), RepoError> {
        let record = subject.to_record();
        if self.exists(S::KIND, &record.name).await? {
            return Err(RepoError::AlreadyExists(S::KIND, record.name));
        }

        let data = serde_json::to_string(&record)?;
        sqlx::query(
            r#"
            INSERT INTO subjects (id, kind, name, data, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(S::KIND.as_str())
        .bind(&record.name)
        .bind(&data)
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(kind = S::KIND.as_str(), name = %record.name, "Subject created");
        Ok(())
    }

    pub async fn update<S: Storable>(&self, subject: &S) -> Result<(), RepoError> {
        let record = subject.to_record();
        let data = serde_json::to_string(&record)?;
        let result = sqlx::query(
            r#"
            UPDATE subjects
            SET name = ?, data = ?, updated_at = ?
            WHERE id = ? AND kind = ?
            "#,
        )
        .bind(&record.name)
        .bind(&data)
        .bind(Utc::now().to_rfc3339())
        .bind(record.id.to_string())
        .bind(S::KIND.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::Database(sqlx::Error::RowNotFound));
        }
        Ok(())
    }

    pub async fn get_by_id<S: Storable>(
        &self,
        catalog: &Catalog,
        id: Uuid,
    ) -> Result<Option<S>, RepoError> {
        let row: Option<SubjectRow> =
            sqlx::query_as("SELECT data FROM subjects WHERE id = ? AND kind = ?")
                .bind(id.to_string())
                .bind(S::KIND.as_str())
                .fetch_optional(&self.pool)
                .await?;

        row.map(|row| hydrate(catalog, row)).transpose()
    }

    pub async fn get_by_name<S: Storable>(
        &self,
        catalog: &Catalog,
        name: &str,
    ) -> Result<Option<S>, RepoError> {
        let row: Option<SubjectRow> = sqlx::query_as(
            "SELECT data FROM subjects WHERE kind = ? AND LOWER(name) = LOWER(?)",
        )
        .bind(S::KIND.as_str())
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| hydrate(catalog, row)).transpose()
    }

    pub async fn list<S: Storable>(&self, catalog: &Catalog) -> Result<Vec<S>, RepoError> {
        let rows: Vec<SubjectRow> =
            sqlx::query_as("SELECT data FROM subjects WHERE kind = ? ORDER BY name")
                .bind(S::KIND.as_str())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(|row| hydrate(catalog, row)).collect()
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM subjects WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn exists(&self, kind: SubjectKind, name: &str) -> Result<bool, RepoError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT id FROM subjects WHERE kind = ? AND LOWER(name) = LOWER(?)")
                .bind(kind.as_str())
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }
}

fn hydrate<S: Storable>(catalog: &Catalog, row: SubjectRow) -> Result<S, RepoError> {
    let raw: serde_json::Value = serde_json::from_str(&row.data)?;
    Ok(S::from_raw(catalog, raw)?)
}
