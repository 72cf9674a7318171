//! PostgreSQL-backed repository storing entities as JSONB documents.

use std::fmt::Display;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use sqlx::PgPool;

use crate::Result;
use crate::repository::{Entity, Repository};

/// Repository over the `read_models` table.
///
/// Each repository owns one `collection`; rows are keyed by
/// `(collection, id)` where `id` is the entity id's `Display` form.
pub struct PostgresRepository<T, ID> {
    pool: PgPool,
    collection: &'static str,
    _phantom: PhantomData<fn() -> (T, ID)>,
}

impl<T, ID> PostgresRepository<T, ID> {
    pub fn new(pool: PgPool, collection: &'static str) -> Self {
        Self {
            pool,
            collection,
            _phantom: PhantomData,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn collection(&self) -> &'static str {
        self.collection
    }
}

impl<T, ID> Clone for PostgresRepository<T, ID> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone(), self.collection)
    }
}

#[async_trait]
impl<T, ID> Repository<T, ID> for PostgresRepository<T, ID>
where
    T: Entity<ID> + Serialize + DeserializeOwned + 'static,
    ID: Display + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: &ID) -> Result<Option<T>> {
        let body: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT body FROM read_models WHERE collection = $1 AND id = $2")
                .bind(self.collection)
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        Ok(body.map(serde_json::from_value).transpose()?)
    }

    #[tracing::instrument(skip(self, entity), fields(collection = self.collection, id = %entity.id()))]
    async fn save(&self, entity: T) -> Result<T> {
        let body = serde_json::to_value(&entity)?;

        sqlx::query(
            r#"
            INSERT INTO read_models (collection, id, body, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (collection, id)
            DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()
            "#,
        )
        .bind(self.collection)
        .bind(entity.id().to_string())
        .bind(body)
        .execute(&self.pool)
        .await?;

        Ok(entity)
    }

    async fn delete(&self, id: &ID) -> Result<()> {
        sqlx::query("DELETE FROM read_models WHERE collection = $1 AND id = $2")
            .bind(self.collection)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<T>> {
        let bodies: Vec<serde_json::Value> =
            sqlx::query_scalar("SELECT body FROM read_models WHERE collection = $1 ORDER BY id")
                .bind(self.collection)
                .fetch_all(&self.pool)
                .await?;

        bodies
            .into_iter()
            .map(|body| serde_json::from_value(body).map_err(Into::into))
            .collect()
    }
}
