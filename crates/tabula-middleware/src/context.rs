//! Pipeline context.
//!
//! The [`MiddlewareContext`] carries per-request state through the
//! pipeline. It starts nearly empty and is enriched stage by stage:
//! request variables by the resolver, project variables by the project
//! stage, the caller by the gate. Once all pre-handler stages have run it
//! is frozen into a [`RequestContext`] for the page handler.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::Instant;

use tabula_core::{Caller, ProjectVariables, RequestContext, RequestId, RequestVariables};

/// Mutable context flowing through the pipeline.
#[derive(Debug)]
pub struct MiddlewareContext {
    /// Unique identifier for this request.
    request_id: RequestId,

    /// The authenticated caller, established by the gate stage.
    caller: Caller,

    /// Request variables, established by the resolver stage.
    vars: Option<RequestVariables>,

    /// Project variables, established by the project stage when the
    /// request carries project parameters.
    project: Option<ProjectVariables>,

    /// When the request started processing.
    started_at: Instant,

    /// Type-erased extension data for stage-to-stage hand-off.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates a context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a context with a specific request ID (propagated from an
    /// upstream service).
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            caller: Caller::Anonymous,
            vars: None,
            project: None,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// The request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// The authenticated caller.
    #[must_use]
    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    /// Sets the caller. Called by the gate stage only.
    pub fn set_caller(&mut self, caller: Caller) {
        self.caller = caller;
    }

    /// The resolved request variables, once the resolver stage has run.
    #[must_use]
    pub fn vars(&self) -> Option<&RequestVariables> {
        self.vars.as_ref()
    }

    /// Mutable access to the request variables.
    pub fn vars_mut(&mut self) -> Option<&mut RequestVariables> {
        self.vars.as_mut()
    }

    /// Sets the request variables. Called by the resolver stage only.
    pub fn set_vars(&mut self, vars: RequestVariables) {
        self.vars = Some(vars);
    }

    /// The resolved project variables, if the route carries them.
    #[must_use]
    pub fn project(&self) -> Option<&ProjectVariables> {
        self.project.as_ref()
    }

    /// Sets the project variables. Called by the project stage only.
    pub fn set_project(&mut self, project: ProjectVariables) {
        self.project = Some(project);
    }

    /// When the request started processing.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Freezes the context into the immutable handler snapshot.
    ///
    /// Returns `None` when the resolver stage has not run (a pipeline
    /// wiring error the dispatcher reports as internal).
    #[must_use]
    pub fn to_request_context(&self) -> Option<RequestContext> {
        let vars = self.vars.clone()?;
        Some(RequestContext::new(
            self.request_id,
            self.caller.clone(),
            vars,
            self.project.clone(),
        ))
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}
