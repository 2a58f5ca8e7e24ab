//! The underlying resolver capability and handles to the calls issued against it.

use std::{
    future::Future,
    marker::PhantomData,
    panic,
    pin::Pin,
    sync::Arc,
    task::{ready, Context, Poll},
    time::Duration,
};

use futures::future::BoxFuture;
use tokio::{task::JoinHandle, time::Instant};

/// Something that can perform a lookup, e.g. a DNS client.
///
/// Every request issued through a [`HedgedResolver`](crate::HedgedResolver) may be sent
/// twice, so requests must be cheap to clone and calls must be safe to abandon
/// half-way.
pub trait Resolver: Send + Sync + 'static {
    /// What is being looked up (a host name, a question, ...).
    type Request: Clone + Send + 'static;
    /// What a successful lookup produces.
    type Response: Send + 'static;
    /// What a failed lookup produces.
    type Error: Send + 'static;

    /// Starts a lookup.
    fn issue(&self, request: Self::Request) -> BoxFuture<'static, Result<Self::Response, Self::Error>>;
}

impl<R: Resolver> Resolver for Arc<R> {
    type Request = R::Request;
    type Response = R::Response;
    type Error = R::Error;

    fn issue(&self, request: Self::Request) -> BoxFuture<'static, Result<Self::Response, Self::Error>> {
        (**self).issue(request)
    }
}

/// A [`Resolver`] backed by a closure. Created with [`resolver_fn`].
pub struct FnResolver<F, Req> {
    f: F,
    _request: PhantomData<fn(Req)>,
}

/// Wraps a closure returning a lookup future into a [`Resolver`].
///
/// ```no_run
/// use hedged_resolver::{resolver_fn, HedgeConfig, HedgedResolver};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let dns = resolver_fn(|host: String| async move {
///     tokio::net::lookup_host((host.as_str(), 0))
///         .await
///         .map(|addrs| addrs.map(|a| a.ip()).collect::<Vec<_>>())
/// });
///
/// let resolver = HedgedResolver::new(dns, HedgeConfig::default())?;
/// let addrs = resolver.resolve("example.com".to_string()).await?;
/// # Ok(())
/// # }
/// ```
pub fn resolver_fn<F, Req, Fut, T, E>(f: F) -> FnResolver<F, Req>
where
    F: Fn(Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    FnResolver {
        f,
        _request: PhantomData,
    }
}

impl<F, Req, Fut, T, E> Resolver for FnResolver<F, Req>
where
    F: Fn(Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    Req: Clone + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    type Request = Req;
    type Response = T;
    type Error = E;

    fn issue(&self, request: Req) -> BoxFuture<'static, Result<T, E>> {
        Box::pin((self.f)(request))
    }
}

/// Final state of a single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<T, E> {
    /// The lookup produced a value.
    Succeeded(T),
    /// The lookup failed. Failure is a legitimate outcome of the lookup.
    Failed(E),
    /// The call was aborted before it produced an outcome.
    Cancelled,
}

impl<T, E> Completion<T, E> {
    /// Returns `true` for [`Completion::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Completion::Cancelled)
    }
}

/// A lookup running on its own task.
///
/// Awaiting the call yields its [`Completion`]. Cancellation is best effort: the
/// task is aborted at its next suspension point. Dropping the call cancels it.
#[derive(Debug)]
pub struct Call<T, E> {
    handle: JoinHandle<Result<T, E>>,
    started: Instant,
}

impl<T, E> Call<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Issues `request` against `resolver` and starts timing it.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn issue<R>(resolver: &R, request: R::Request) -> Self
    where
        R: Resolver<Response = T, Error = E>,
    {
        let started = Instant::now();
        Self {
            handle: tokio::spawn(resolver.issue(request)),
            started,
        }
    }
}

impl<T, E> Call<T, E> {
    /// Requests cancellation of the call.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Time since the call was issued.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// When the call was issued.
    pub fn started(&self) -> Instant {
        self.started
    }
}

impl<T, E> Future for Call<T, E> {
    type Output = Completion<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let completion = match ready!(Pin::new(&mut this.handle).poll(cx)) {
            Ok(Ok(value)) => Completion::Succeeded(value),
            Ok(Err(error)) => Completion::Failed(error),
            Err(err) if err.is_cancelled() => Completion::Cancelled,
            Err(err) => panic::resume_unwind(err.into_panic()),
        };
        Poll::Ready(completion)
    }
}

impl<T, E> Drop for Call<T, E> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
