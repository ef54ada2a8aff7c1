//! MongoDB test infrastructure
//!
//! Provides a `TestMongo` helper that starts a single-node replica set, so
//! multi-document transactions are available to the code under test.

use mongodb::{Client, Database};
use testcontainers::ContainerAsync;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::mongo::Mongo;

/// Test MongoDB wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
pub struct TestMongo {
    #[allow(dead_code)]
    container: ContainerAsync<Mongo>,
    pub client: Client,
    pub connection_string: String,
}

impl TestMongo {
    /// Start a replica-set container and connect to it
    ///
    /// # Example
    ///
    /// ```no_run
    /// use test_utils::TestMongo;
    ///
    /// # async fn example() {
    /// let mongo = TestMongo::new().await;
    /// let db = mongo.database("test_create_product");
    /// # }
    /// ```
    pub async fn new() -> Self {
        let container = Mongo::repl_set()
            .start()
            .await
            .expect("Failed to start MongoDB container");

        let host_port = container
            .get_host_port_ipv4(27017)
            .await
            .expect("Failed to get host port");

        // The replica set advertises the container hostname; connect directly.
        let connection_string = format!("mongodb://127.0.0.1:{}/?directConnection=true", host_port);

        let client = Client::with_uri_str(&connection_string)
            .await
            .expect("Failed to connect to test MongoDB");

        tracing::info!(port = host_port, "Test MongoDB ready (replica set)");

        Self {
            container,
            client,
            connection_string,
        }
    }

    /// A database handle; use one name per test for isolation
    pub fn database(&self, name: &str) -> Database {
        self.client.database(name)
    }

    /// Get a cloned client (useful for passing to repositories)
    pub fn client(&self) -> Client {
        self.client.clone()
    }
}

// Container is automatically cleaned up when TestMongo is dropped
impl Drop for TestMongo {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test MongoDB container");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_mongo_creation() {
        let mongo = TestMongo::new().await;
        assert!(mongo.connection_string.starts_with("mongodb://"));

        let names = mongo
            .database("admin")
            .list_collection_names()
            .await
            .expect("Failed to list collections");
        assert!(names.iter().all(|name| !name.is_empty()));
    }
}
