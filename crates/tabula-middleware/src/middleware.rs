//! Core middleware trait and chain types.
//!
//! Every pipeline stage implements [`Middleware`]. A stage receives the
//! mutable context, the request, and a [`Next`] handle; calling
//! `next.run()` continues the chain, returning a response without calling
//! it short-circuits the pipeline (the denial path of the gate).

use std::future::Future;
use std::pin::Pin;

use crate::context::MiddlewareContext;
use crate::types::{Request, Response};

/// A boxed future returning `T`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A pipeline stage.
///
/// # Invariants
///
/// - A stage calls `next.run()` at most once; not calling it short-circuits
///   the remaining stages and the handler.
/// - Stages never reorder the pipeline.
pub trait Middleware: Send + Sync + 'static {
    /// Unique stage name, used for logging and tests.
    fn name(&self) -> &'static str;

    /// Processes the request through this stage.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// Handle to the remaining chain.
///
/// Consumed by `run`, so a stage cannot invoke the rest of the chain
/// twice.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Stage {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(
        Box<dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a>,
    ),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke the given stage.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Stage {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates the terminal `Next` invoking the handler.
    pub(crate) fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next stage or the handler.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> Response {
        match self.inner {
            NextInner::Stage { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

/// A stage built from an async closure, mostly for tests.
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a function-based stage.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(&mut MiddlewareContext, Request, Next<'_>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move { (self.func)(ctx, request, next).await })
    }
}
