//! Capability traits injected into processing units.
//!
//! A unit pairs a [`Transport`] (location → raw content) with a
//! [`Transform`] (raw content → value). Both are opaque to the materializer.
//! Plain closures can be adapted with [`transport_fn`], [`transform_fn`] and
//! [`transform_sync`].

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::error::Result;

/// Fetches the raw content stored at a resource location.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str {
        "transport"
    }

    /// Fetch the content at `location`.
    async fn fetch(&self, location: &str) -> Result<String>;
}

/// Converts fetched content into a resource value.
#[async_trait]
pub trait Transform<V>: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str {
        "transform"
    }

    /// Produce the value for `content`.
    async fn apply(&self, content: String) -> Result<V>;
}

// ---------------------------------------------------------------------------
// Closure adapters
// ---------------------------------------------------------------------------

/// [`Transport`] backed by an async closure.
pub struct FnTransport<F> {
    f: F,
}

/// Adapt `Fn(String) -> impl Future<Output = Result<String>>` into a [`Transport`].
pub fn transport_fn<F, Fut>(f: F) -> FnTransport<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    FnTransport { f }
}

#[async_trait]
impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    async fn fetch(&self, location: &str) -> Result<String> {
        (self.f)(location.to_owned()).await
    }
}

/// [`Transform`] backed by an async closure.
pub struct FnTransform<F, V> {
    f: F,
    _value: PhantomData<fn() -> V>,
}

/// Adapt `Fn(String) -> impl Future<Output = Result<V>>` into a [`Transform`].
pub fn transform_fn<F, Fut, V>(f: F) -> FnTransform<F, V>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<V>> + Send + 'static,
{
    FnTransform {
        f,
        _value: PhantomData,
    }
}

#[async_trait]
impl<F, Fut, V> Transform<V> for FnTransform<F, V>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<V>> + Send + 'static,
    V: Send + 'static,
{
    async fn apply(&self, content: String) -> Result<V> {
        (self.f)(content).await
    }
}

/// [`Transform`] backed by a synchronous closure.
pub struct SyncTransform<F, V> {
    f: F,
    _value: PhantomData<fn() -> V>,
}

/// Adapt `Fn(String) -> Result<V>` into a [`Transform`].
pub fn transform_sync<F, V>(f: F) -> SyncTransform<F, V>
where
    F: Fn(String) -> Result<V> + Send + Sync,
{
    SyncTransform {
        f,
        _value: PhantomData,
    }
}

#[async_trait]
impl<F, V> Transform<V> for SyncTransform<F, V>
where
    F: Fn(String) -> Result<V> + Send + Sync,
    V: Send + 'static,
{
    async fn apply(&self, content: String) -> Result<V> {
        (self.f)(content)
    }
}
