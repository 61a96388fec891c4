//! Fixed-order request pipeline.
//!
//! Every request flows through the same stages in the same order; the
//! order is part of the platform contract and cannot be changed by
//! applications:
//!
//! 1. **Request variables** - method, return kind, tenant, page id
//! 2. **Project** - project/version/editor context from parameters
//! 3. **Session** - authentication gate (fixation, CSRF, service tokens)
//! 4. **Access** - stripped-hierarchy authorization
//! 5. **Telemetry** (post-handler) - request completion logging
//!
//! A denial at any pre-handler stage short-circuits: no later stage and
//! no handler runs.

use std::sync::Arc;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::session::SessionStore;
use crate::stages::{
    AccessMiddleware, GateConfig, ProjectMiddleware, RequestVarsMiddleware, SessionMiddleware,
    TelemetryMiddleware,
};
use crate::types::{Request, Response};

use tabula_config::ConfigStore;
use tabula_hierarchy::HierarchyStore;

/// A type-erased stage.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The fixed-order pipeline.
pub struct Pipeline {
    /// Stages running before the handler.
    pre_handler_stages: Vec<BoxedMiddleware>,
    /// Stages running around the handler, after all pre-handler stages.
    post_handler_stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Builds the standard Tabularium pipeline over the given shared
    /// components, in the fixed platform order.
    #[must_use]
    pub fn standard(
        config: Arc<ConfigStore>,
        hierarchy: Arc<HierarchyStore>,
        sessions: Arc<SessionStore>,
        gate: GateConfig,
    ) -> Self {
        Self::builder()
            .add_pre_handler_stage(RequestVarsMiddleware::new(hierarchy.clone()))
            .add_pre_handler_stage(ProjectMiddleware::new(config))
            .add_pre_handler_stage(SessionMiddleware::new(sessions, gate))
            .add_pre_handler_stage(AccessMiddleware::new(hierarchy))
            .add_post_handler_stage(TelemetryMiddleware::new())
            .build()
    }

    /// Processes a request through the pipeline.
    pub async fn process<H>(
        &self,
        mut ctx: MiddlewareContext,
        request: Request,
        handler: H,
    ) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        let next = self.build_chain(handler);
        next.run(&mut ctx, request).await
    }

    /// Processes a request, also returning the context after completion.
    ///
    /// Used by the dispatcher, which needs the resolved variables for
    /// logging and by tests asserting on context state.
    pub async fn process_with_context<H>(
        &self,
        mut ctx: MiddlewareContext,
        request: Request,
        handler: H,
    ) -> (MiddlewareContext, Response)
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        let next = self.build_chain(handler);
        let response = next.run(&mut ctx, request).await;
        (ctx, response)
    }

    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        let mut next = Next::handler(handler);
        for middleware in self.post_handler_stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        for middleware in self.pre_handler_stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Names of all stages in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.pre_handler_stages
            .iter()
            .chain(&self.post_handler_stages)
            .map(|mw| mw.name())
            .collect()
    }

    /// Number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.pre_handler_stages.len() + self.post_handler_stages.len()
    }
}

/// Builder for a [`Pipeline`].
pub struct PipelineBuilder {
    pre_handler_stages: Vec<BoxedMiddleware>,
    post_handler_stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pre_handler_stages: Vec::new(),
            post_handler_stages: Vec::new(),
        }
    }

    /// Adds a pre-handler stage.
    #[must_use]
    pub fn add_pre_handler_stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.pre_handler_stages.push(Arc::new(middleware));
        self
    }

    /// Adds a post-handler stage.
    #[must_use]
    pub fn add_post_handler_stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.post_handler_stages.push(Arc::new(middleware));
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            pre_handler_stages: self.pre_handler_stages,
            post_handler_stages: self.post_handler_stages,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Stage marker for the fixed platform order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: request-variable resolution.
    RequestVars = 1,
    /// Stage 2: project-context resolution.
    Project = 2,
    /// Stage 3: authentication gate.
    Session = 3,
    /// Stage 4: hierarchy access check.
    Access = 4,
    /// --- Handler invocation ---
    /// Stage 5: request completion telemetry.
    Telemetry = 5,
}

impl Stage {
    /// True for stages running before the handler.
    #[must_use]
    pub const fn is_pre_handler(self) -> bool {
        (self as u8) <= 4
    }

    /// The stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RequestVars => "request_vars",
            Self::Project => "project",
            Self::Session => "session",
            Self::Access => "access",
            Self::Telemetry => "telemetry",
        }
    }

    /// All stages in order.
    #[must_use]
    pub const fn all() -> [Stage; 5] {
        [
            Self::RequestVars,
            Self::Project,
            Self::Session,
            Self::Access,
            Self::Telemetry,
        ]
    }
}
