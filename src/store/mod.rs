use crate::db::document::{self, blocking_queries, schema::check_identifier};
use crate::{Error, Result};
use deadpool_sqlite::Pool;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::{debug, warn};

pub use crate::db::document::schema::{Direction, Document, Query};

/// Full result of a query at one point in time. Revisions grow across the whole store, a
/// snapshot with a higher revision never reflects older data than one with a lower revision.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub query: Query,
    pub revision: u64,
    pub documents: Vec<Document>,
}

type Listener = Arc<dyn Fn(Snapshot) + Send + Sync>;

struct Watch {
    id: u64,
    query: Query,
    listener: Listener,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    watches: Vec<Watch>,
}

/// Cancels the standing query when dropped
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
            registry.watches.retain(|it| it.id != self.id);
        }
    }
}

#[derive(Clone)]
pub struct DocumentStore {
    pool: Arc<Pool>,
    registry: Arc<Mutex<Registry>>,
    revision: Arc<Mutex<u64>>,
}

impl DocumentStore {
    pub fn new(pool: &Arc<Pool>) -> Self {
        DocumentStore {
            pool: pool.clone(),
            registry: Arc::new(Mutex::new(Registry::default())),
            revision: Arc::new(Mutex::new(0)),
        }
    }

    pub fn pool(&self) -> &Arc<Pool> {
        &self.pool
    }

    pub async fn get_all(&self, collection: &str) -> Result<Vec<Document>> {
        self.get(Query::collection(collection)).await
    }

    pub async fn get(&self, query: Query) -> Result<Vec<Document>> {
        check_identifier(&query.collection)?;
        document::queries::select(query, &self.pool).await
    }

    pub async fn get_by_id(&self, collection: &str, id: &str) -> Result<Document> {
        check_identifier(collection)?;
        document::queries::select_by_id(collection, id, &self.pool)
            .await
            .map_err(|e| match e {
                Error::NotFound(_) => not_found(collection, id),
                e => e,
            })
    }

    pub async fn add(&self, collection: &str, fields: Map<String, Value>) -> Result<Document> {
        check_identifier(collection)?;
        let doc = document::queries::insert(collection, generate_id(), fields, &self.pool).await?;
        self.notify(collection).await;
        Ok(doc)
    }

    pub async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Document> {
        check_identifier(collection)?;
        check_id(id)?;
        let doc = document::queries::upsert(collection, id, fields, &self.pool).await?;
        self.notify(collection).await;
        Ok(doc)
    }

    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Document> {
        check_identifier(collection)?;
        let doc = document::queries::patch(collection, id, fields, &self.pool)
            .await
            .map_err(|e| match e {
                Error::NotFound(_) => not_found(collection, id),
                e => e,
            })?;
        self.notify(collection).await;
        Ok(doc)
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        check_identifier(collection)?;
        if document::queries::delete(collection, id, &self.pool).await? == 0 {
            return Err(not_found(collection, id));
        }
        self.notify(collection).await;
        Ok(())
    }

    /// Registers a standing query. The current snapshot is delivered before this returns,
    /// failing to read it cancels the subscription and is reported to the caller.
    pub async fn subscribe(
        &self,
        query: Query,
        listener: impl Fn(Snapshot) + Send + Sync + 'static,
    ) -> Result<Subscription> {
        check_identifier(&query.collection)?;
        if let Some(order_by) = &query.order_by {
            check_identifier(&order_by.field)?;
        }
        let listener: Listener = Arc::new(listener);
        let subscription = {
            let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            registry.next_id += 1;
            let id = registry.next_id;
            registry.watches.push(Watch {
                id,
                query: query.clone(),
                listener: listener.clone(),
            });
            Subscription {
                id,
                registry: Arc::downgrade(&self.registry),
            }
        };
        let snapshot = self.snapshot(query).await?;
        listener(snapshot);
        Ok(subscription)
    }

    async fn snapshot(&self, query: Query) -> Result<Snapshot> {
        let revision = self.revision.clone();
        self.pool
            .get()
            .await?
            .interact(move |conn| {
                let mut revision = revision.lock().unwrap_or_else(PoisonError::into_inner);
                let documents = blocking_queries::select(&query, conn)?;
                *revision += 1;
                Ok(Snapshot {
                    query,
                    revision: *revision,
                    documents,
                })
            })
            .await?
    }

    async fn notify(&self, collection: &str) {
        let watches: Vec<(Query, Listener)> = {
            let registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            registry
                .watches
                .iter()
                .filter(|it| it.query.collection == collection)
                .map(|it| (it.query.clone(), it.listener.clone()))
                .collect()
        };
        for (query, listener) in watches {
            match self.snapshot(query).await {
                Ok(snapshot) => {
                    debug!(
                        collection,
                        revision = snapshot.revision,
                        documents = snapshot.documents.len(),
                        "Delivering snapshot",
                    );
                    listener(snapshot);
                }
                Err(e) => warn!(collection, error = %e, "Failed to refresh subscription"),
            }
        }
    }

    #[cfg(test)]
    fn watch_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .watches
            .len()
    }
}

pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string().to_uppercase()
}

fn check_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        Err(Error::invalid_input("Document id can't be empty"))
    } else {
        Ok(())
    }
}

fn not_found(collection: &str, id: &str) -> Error {
    Error::not_found(format!("Document {collection}/{id} doesn't exist"))
}
