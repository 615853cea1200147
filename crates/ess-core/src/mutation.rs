//! Mutation pipeline
//!
//! Every write goes through [`MutationPipeline::mutate`]: send, notify, and
//! only on success invalidate the views the write affects. A failed write
//! never touches the cache.

use crate::cache::{Resource, ViewCache};
use crate::error::{EssError, EssResult};
use crate::http::{ApiClient, Method, RequestOptions};
use crate::notify::Notifier;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Kind of write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// POST
    Create,
    /// PATCH
    Update,
    /// PUT
    Replace,
    /// DELETE
    Delete,
}

impl MutationKind {
    pub fn method(self) -> Method {
        match self {
            Self::Create => Method::POST,
            Self::Update => Method::PATCH,
            Self::Replace => Method::PUT,
            Self::Delete => Method::DELETE,
        }
    }
}

pub type SuccessCallback = Box<dyn FnOnce(&Value) + Send>;
pub type ErrorCallback = Box<dyn FnOnce(&str) + Send>;

/// What to do around a write
#[derive(Default)]
pub struct MutationOptions {
    /// Success notification text; `None` means no success notification
    pub success_message: Option<String>,
    /// Resources whose views go stale when the write succeeds
    pub invalidates: Vec<Resource>,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
}

impl fmt::Debug for MutationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationOptions")
            .field("success_message", &self.success_message)
            .field("invalidates", &self.invalidates)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl MutationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = Some(message.into());
        self
    }

    pub fn invalidates(mut self, resources: impl IntoIterator<Item = Resource>) -> Self {
        for resource in resources {
            if !self.invalidates.contains(&resource) {
                self.invalidates.push(resource);
            }
        }
        self
    }

    /// Space-delimited form, e.g. `"goals comments"`; unknown names are skipped
    pub fn invalidates_str(self, resources: &str) -> Self {
        self.invalidates(Resource::parse_list(resources))
    }

    /// Runs after notification and invalidation, with the unwrapped response
    pub fn on_success(mut self, callback: impl FnOnce(&Value) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// Runs with the normalized error message
    pub fn on_error(mut self, callback: impl FnOnce(&str) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }
}

/// Runs writes and keeps the view cache honest
pub struct MutationPipeline {
    client: Arc<ApiClient>,
    cache: Arc<ViewCache>,
    notifier: Arc<dyn Notifier>,
}

impl MutationPipeline {
    pub fn new(client: Arc<ApiClient>, cache: Arc<ViewCache>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            client,
            cache,
            notifier,
        }
    }

    /// Send a write and apply its side effects
    pub async fn mutate(
        &self,
        kind: MutationKind,
        endpoint: &str,
        payload: Option<&Value>,
        options: MutationOptions,
    ) -> EssResult<Value> {
        let result = self
            .client
            .request(kind.method(), endpoint, payload, RequestOptions::default())
            .await;

        match result {
            Ok(value) => {
                if let Some(message) = &options.success_message {
                    self.notifier.success(message);
                }
                for resource in &options.invalidates {
                    self.cache.invalidate(*resource);
                }
                if let Some(on_success) = options.on_success {
                    on_success(&value);
                }
                Ok(value)
            }
            Err(EssError::Cancelled) => Err(EssError::Cancelled),
            Err(err) => {
                let message = err.user_message();
                tracing::debug!(endpoint, code = err.error_code(), "mutation failed");
                self.notifier.error(&message);
                if let Some(on_error) = options.on_error {
                    on_error(&message);
                }
                Err(err)
            }
        }
    }

    pub async fn create(
        &self,
        endpoint: &str,
        payload: &Value,
        options: MutationOptions,
    ) -> EssResult<Value> {
        self.mutate(MutationKind::Create, endpoint, Some(payload), options)
            .await
    }

    pub async fn update(
        &self,
        endpoint: &str,
        payload: &Value,
        options: MutationOptions,
    ) -> EssResult<Value> {
        self.mutate(MutationKind::Update, endpoint, Some(payload), options)
            .await
    }

    pub async fn replace(
        &self,
        endpoint: &str,
        payload: &Value,
        options: MutationOptions,
    ) -> EssResult<Value> {
        self.mutate(MutationKind::Replace, endpoint, Some(payload), options)
            .await
    }

    pub async fn delete(&self, endpoint: &str, options: MutationOptions) -> EssResult<Value> {
        self.mutate(MutationKind::Delete, endpoint, None, options)
            .await
    }
}
