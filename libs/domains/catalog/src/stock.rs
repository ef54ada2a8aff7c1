//! Stock adjustment under concurrent requests.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::repository::ProductRepository;

/// Applies bounded decrements to a product's stock.
///
/// The bound check and the write happen in a single conditional update at the
/// storage layer, so concurrent decrements against one product can never
/// drive its amount below zero. A conditional update that loses a race is
/// retried from a fresh read, up to `max_attempts` cycles.
pub struct StockAdjuster<R: ProductRepository> {
    repository: Arc<R>,
    max_attempts: u32,
}

impl<R: ProductRepository> StockAdjuster<R> {
    pub fn new(repository: Arc<R>, max_attempts: u32) -> Self {
        Self {
            repository,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Decrease the stock of product `id` by `decrement`.
    ///
    /// Returns the updated amount, or `None` when no such product exists.
    #[instrument(skip(self))]
    pub async fn decrease_amount(&self, id: i64, decrement: i64) -> CatalogResult<Option<i64>> {
        if decrement <= 0 {
            return Err(CatalogError::validation(
                "amount",
                decrement,
                format!("Decrement must be positive, got {decrement}"),
            ));
        }

        for attempt in 1..=self.max_attempts {
            let Some(product) = self.repository.find_by_id(id).await? else {
                return Ok(None);
            };

            if decrement > product.amount {
                return Err(CatalogError::DecrementExceedsStock {
                    requested: decrement,
                    available: product.amount,
                });
            }

            match self
                .repository
                .decrement_amount_if_available(id, decrement)
                .await?
            {
                Some(amount) => {
                    info!(product_id = id, decrement, amount, "Stock decreased");
                    return Ok(Some(amount));
                }
                None => {
                    debug!(
                        product_id = id,
                        attempt, "Stock changed between read and write, retrying"
                    );
                }
            }
        }

        warn!(product_id = id, attempts = self.max_attempts, "Stock update kept conflicting");
        Err(CatalogError::storage(format!(
            "stock update for product {id} conflicted {} times",
            self.max_attempts
        )))
    }
}

impl<R: ProductRepository> Clone for StockAdjuster<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            max_attempts: self.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InternalKey, Product};
    use crate::repository::MockProductRepository;
    use mockall::Sequence;
    use mockall::predicate::eq;

    fn product_with_amount(amount: i64) -> Product {
        Product {
            id: 1,
            internal_key: InternalKey::generate(),
            name: "widget".to_string(),
            price: 100,
            amount,
            category_id: 0,
            image_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_decrease_within_stock() {
        let mut repository = MockProductRepository::new();
        repository
            .expect_find_by_id()
            .with(eq(1))
            .returning(|_| Ok(Some(product_with_amount(10))));
        repository
            .expect_decrement_amount_if_available()
            .with(eq(1), eq(4))
            .times(1)
            .returning(|_, _| Ok(Some(6)));

        let adjuster = StockAdjuster::new(Arc::new(repository), 3);
        assert_eq!(adjuster.decrease_amount(1, 4).await.unwrap(), Some(6));
    }

    #[tokio::test]
    async fn test_decrement_exceeding_stock_does_not_write() {
        let mut repository = MockProductRepository::new();
        repository
            .expect_find_by_id()
            .returning(|_| Ok(Some(product_with_amount(10))));
        repository.expect_decrement_amount_if_available().never();

        let adjuster = StockAdjuster::new(Arc::new(repository), 3);
        match adjuster.decrease_amount(1, 15).await {
            Err(CatalogError::DecrementExceedsStock {
                requested,
                available,
            }) => {
                assert_eq!(requested, 15);
                assert_eq!(available, 10);
            }
            other => panic!("expected DecrementExceedsStock, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_product_is_none() {
        let mut repository = MockProductRepository::new();
        repository.expect_find_by_id().returning(|_| Ok(None));

        let adjuster = StockAdjuster::new(Arc::new(repository), 3);
        assert_eq!(adjuster.decrease_amount(99, 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_non_positive_decrement_rejected() {
        let repository = MockProductRepository::new();
        let adjuster = StockAdjuster::new(Arc::new(repository), 3);

        assert!(matches!(
            adjuster.decrease_amount(1, 0).await,
            Err(CatalogError::Validation { .. })
        ));
        assert!(matches!(
            adjuster.decrease_amount(1, -3).await,
            Err(CatalogError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_lost_race_rereads_and_reports_new_stock() {
        let mut seq = Sequence::new();
        let mut repository = MockProductRepository::new();
        repository
            .expect_find_by_id()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(product_with_amount(10))));
        repository
            .expect_decrement_amount_if_available()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(None));
        repository
            .expect_find_by_id()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(product_with_amount(4))));

        let adjuster = StockAdjuster::new(Arc::new(repository), 3);
        assert!(matches!(
            adjuster.decrease_amount(1, 6).await,
            Err(CatalogError::DecrementExceedsStock {
                requested: 6,
                available: 4
            })
        ));
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let mut repository = MockProductRepository::new();
        repository
            .expect_find_by_id()
            .times(2)
            .returning(|_| Ok(Some(product_with_amount(10))));
        repository
            .expect_decrement_amount_if_available()
            .times(2)
            .returning(|_, _| Ok(None));

        let adjuster = StockAdjuster::new(Arc::new(repository), 2);
        assert!(matches!(
            adjuster.decrease_amount(1, 6).await,
            Err(CatalogError::StorageUnavailable(_))
        ));
    }
}
