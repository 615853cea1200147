//! Cached reads and writes

use super::Portal;
use ess_core::cache::CacheKey;
use ess_core::error::EssResult;
use ess_core::http::RequestOptions;
use ess_core::mutation::{MutationKind, MutationOptions};
use serde::de::DeserializeOwned;
use serde_json::Value;

impl Portal {
    /// Read a resource through the view cache.
    ///
    /// The key's parameters become the query string of the resource's
    /// default endpoint.
    pub async fn view(&self, key: CacheKey) -> EssResult<Value> {
        let endpoint = key.resource.endpoint();
        let options = key
            .params
            .iter()
            .fold(RequestOptions::new(), |options, (name, value)| {
                options.with_query(name.clone(), value.clone())
            });
        let client = self.client.clone();
        self.cache
            .read(key, move || async move { client.get(endpoint, options).await })
            .await
    }

    /// Typed [`view`](Self::view)
    pub async fn view_as<T: DeserializeOwned>(&self, key: CacheKey) -> EssResult<T> {
        let value = self.view(key).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Run a write through the mutation pipeline
    pub async fn mutate(
        &self,
        kind: MutationKind,
        endpoint: &str,
        payload: Option<&Value>,
        options: MutationOptions,
    ) -> EssResult<Value> {
        self.mutations.mutate(kind, endpoint, payload, options).await
    }
}
