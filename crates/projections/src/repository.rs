//! Point lookups and upserts over materialized entities.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Result;

/// An entity stored in a repository, identified by `ID`.
pub trait Entity<ID>: Clone + Send + Sync {
    fn id(&self) -> &ID;
}

/// Storage for materialized entities, independent of the event log.
///
/// A missing entity is `Ok(None)`, never an error. `save` inserts or
/// replaces the entity with the same id. `delete` of a missing id succeeds.
#[async_trait]
pub trait Repository<T, ID>: Send + Sync
where
    T: Entity<ID> + 'static,
    ID: Send + Sync + 'static,
{
    async fn find_by_id(&self, id: &ID) -> Result<Option<T>>;

    /// Inserts or replaces the entity, returning what was stored.
    async fn save(&self, entity: T) -> Result<T>;

    async fn delete(&self, id: &ID) -> Result<()>;

    async fn find_all(&self) -> Result<Vec<T>>;
}

#[async_trait]
impl<R, T, ID> Repository<T, ID> for Arc<R>
where
    R: Repository<T, ID> + ?Sized,
    T: Entity<ID> + 'static,
    ID: Send + Sync + 'static,
{
    async fn find_by_id(&self, id: &ID) -> Result<Option<T>> {
        (**self).find_by_id(id).await
    }

    async fn save(&self, entity: T) -> Result<T> {
        (**self).save(entity).await
    }

    async fn delete(&self, id: &ID) -> Result<()> {
        (**self).delete(id).await
    }

    async fn find_all(&self) -> Result<Vec<T>> {
        (**self).find_all().await
    }
}

/// In-memory repository ordered by id.
///
/// Cloning shares the underlying map.
#[derive(Debug)]
pub struct InMemoryRepository<T, ID> {
    entities: Arc<RwLock<BTreeMap<ID, T>>>,
}

impl<T, ID> InMemoryRepository<T, ID> {
    pub fn new() -> Self {
        Self {
            entities: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entities.read().await.is_empty()
    }
}

impl<T, ID> Clone for InMemoryRepository<T, ID> {
    fn clone(&self) -> Self {
        Self {
            entities: Arc::clone(&self.entities),
        }
    }
}

impl<T, ID> Default for InMemoryRepository<T, ID> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T, ID> Repository<T, ID> for InMemoryRepository<T, ID>
where
    T: Entity<ID> + 'static,
    ID: Ord + Clone + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: &ID) -> Result<Option<T>> {
        Ok(self.entities.read().await.get(id).cloned())
    }

    async fn save(&self, entity: T) -> Result<T> {
        self.entities
            .write()
            .await
            .insert(entity.id().clone(), entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: &ID) -> Result<()> {
        self.entities.write().await.remove(id);
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<T>> {
        Ok(self.entities.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: u32,
        text: &'static str,
    }

    impl Entity<u32> for Note {
        fn id(&self) -> &u32 {
            &self.id
        }
    }

    fn note(id: u32, text: &'static str) -> Note {
        Note { id, text }
    }

    #[tokio::test]
    async fn missing_entity_is_none() {
        let repo: InMemoryRepository<Note, u32> = InMemoryRepository::new();
        assert_eq!(repo.find_by_id(&1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_is_an_upsert() {
        let repo: InMemoryRepository<Note, u32> = InMemoryRepository::new();
        repo.save(note(1, "first")).await.unwrap();
        let saved = repo.save(note(1, "second")).await.unwrap();

        assert_eq!(saved.text, "second");
        assert_eq!(repo.find_by_id(&1).await.unwrap(), Some(note(1, "second")));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn delete_twice_is_a_no_op() {
        let repo: InMemoryRepository<Note, u32> = InMemoryRepository::new();
        repo.save(note(1, "doomed")).await.unwrap();

        repo.delete(&1).await.unwrap();
        repo.delete(&1).await.unwrap();

        assert!(repo.is_empty().await);
        assert_eq!(repo.find_by_id(&1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn find_all_is_ordered_by_id() {
        let repo: InMemoryRepository<Note, u32> = InMemoryRepository::new();
        for id in [3, 1, 2] {
            repo.save(note(id, "n")).await.unwrap();
        }

        let ids: Vec<u32> = repo
            .find_all()
            .await
            .unwrap()
            .iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let repo: InMemoryRepository<Note, u32> = InMemoryRepository::new();
        let other = repo.clone();
        repo.save(note(7, "shared")).await.unwrap();

        assert!(other.find_by_id(&7).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn works_through_a_shared_trait_object() {
        let repo: Arc<dyn Repository<Note, u32>> = Arc::new(InMemoryRepository::new());
        repo.save(note(1, "dyn")).await.unwrap();

        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }
}
