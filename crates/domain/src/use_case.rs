//! Application operations exposed to external callers.

use async_trait::async_trait;
use tracing::Instrument;

use crate::error::DomainError;

/// An application operation: one request in, one outcome out.
///
/// Implementations keep no state between invocations; every call is
/// self-contained and may touch the event store and repositories any number
/// of times. Malformed requests are rejected with
/// [`DomainError::Validation`] before any storage call.
#[async_trait]
pub trait UseCase<Request>: Send + Sync
where
    Request: Send + 'static,
{
    type Response: Send;

    async fn execute(&self, request: Request) -> Result<Self::Response, DomainError>;
}

#[async_trait]
impl<U, Request> UseCase<Request> for std::sync::Arc<U>
where
    U: UseCase<Request> + ?Sized,
    Request: Send + 'static,
{
    type Response = U::Response;

    async fn execute(&self, request: Request) -> Result<Self::Response, DomainError> {
        (**self).execute(request).await
    }
}

/// Wraps a use case with a tracing span and an execution counter.
///
/// Executions are labelled with the request type's name, so one wrapper
/// around a service that handles several requests reports each separately.
pub struct Instrumented<U> {
    inner: U,
}

impl<U> Instrumented<U> {
    pub fn new(inner: U) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &U {
        &self.inner
    }
}

/// Short name of a request type, e.g. `PlaceOrder`.
fn request_name<Request>() -> &'static str {
    let full = std::any::type_name::<Request>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[async_trait]
impl<U, Request> UseCase<Request> for Instrumented<U>
where
    U: UseCase<Request>,
    Request: Send + 'static,
{
    type Response = U::Response;

    async fn execute(&self, request: Request) -> Result<Self::Response, DomainError> {
        let name = request_name::<Request>();
        let span = tracing::info_span!("use_case", use_case = name);

        async move {
            let result = self.inner.execute(request).await;
            let outcome = match &result {
                Ok(_) => "success",
                Err(error) => {
                    tracing::warn!(%error, "use case failed");
                    "failure"
                }
            };
            metrics::counter!(
                "use_case_executions_total",
                "use_case" => name,
                "outcome" => outcome
            )
            .increment(1);
            result
        }
        .instrument(span)
        .await
    }
}
