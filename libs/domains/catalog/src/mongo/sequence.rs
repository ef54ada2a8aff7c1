use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};
use tracing::instrument;

use super::documents::CounterDocument;
use crate::error::{CatalogError, CatalogResult};
use crate::models::EntityKind;
use crate::repository::SequenceAllocator;

/// Sequence counters in the `counters` collection, one document per kind.
///
/// Each call is a single `$inc` upsert, atomic on the server and independent of
/// any open transaction.
#[derive(Clone)]
pub struct MongoSequenceAllocator {
    counters: Collection<CounterDocument>,
}

impl MongoSequenceAllocator {
    pub fn new(db: &Database) -> Self {
        Self {
            counters: db.collection::<CounterDocument>("counters"),
        }
    }
}

#[async_trait]
impl SequenceAllocator for MongoSequenceAllocator {
    #[instrument(skip(self))]
    async fn next(&self, kind: EntityKind) -> CatalogResult<i64> {
        let name: &str = kind.as_ref();
        let counter = self
            .counters
            .find_one_and_update(
                doc! { "_id": name },
                doc! { "$inc": { "seq": 1_i64 } },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| CatalogError::storage(format!("counter '{kind}' was not upserted")))?;

        // The counter holds how many ids were issued; ids start at 0.
        Ok(counter.seq - 1)
    }
}
