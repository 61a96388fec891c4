//! Project-context resolution stage.
//!
//! Requests addressing project content carry a `project` parameter (and
//! optionally `version`, `report`, `channel`, `variant`, `lang`). This
//! stage validates the project against the configuration tree, fills in
//! configured defaults (version, editor) and derives the filesystem path
//! fragments. Derived fragments are cached process-wide per
//! (tenant, project, version) — they are pure string composition and
//! survive configuration refreshes unchanged.
//!
//! Requests without a `project` parameter pass through untouched.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::stages::query_params;
use crate::types::{Request, Response, ResponseExt};

use tabula_config::ConfigStore;
use tabula_core::{OutputChannel, ProjectPaths, ProjectVariables, ReturnKind, TenantId};

/// Stage deriving [`ProjectVariables`] from parameters and configuration.
pub struct ProjectMiddleware {
    config: Arc<ConfigStore>,
    path_cache: DashMap<String, ProjectPaths>,
}

impl ProjectMiddleware {
    /// Creates the stage over the shared configuration store.
    #[must_use]
    pub fn new(config: Arc<ConfigStore>) -> Self {
        Self {
            config,
            path_cache: DashMap::new(),
        }
    }

    /// Number of cached path-fragment entries.
    #[must_use]
    pub fn cached_paths(&self) -> usize {
        self.path_cache.len()
    }
}

impl Middleware for ProjectMiddleware {
    fn name(&self) -> &'static str {
        "project"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let params = query_params(request.uri().query().unwrap_or(""));
            let Some(project_id) = params.get("project").cloned() else {
                return next.run(ctx, request).await;
            };

            let (kind, tenant) = match ctx.vars() {
                Some(vars) => (vars.return_kind, vars.tenant.clone()),
                None => (ReturnKind::Xml, TenantId::default()),
            };

            let snapshot = self.config.snapshot();
            let Some(project_node) =
                snapshot.select(&format!("projects/project[@id='{project_id}']"))
            else {
                warn!(project_id = %project_id, "unknown project requested");
                return Response::negotiated_error(
                    kind,
                    http::StatusCode::NOT_FOUND,
                    "unknown_project",
                    &format!("no project registered with id '{project_id}'"),
                );
            };

            let version_id = params
                .get("version")
                .cloned()
                .or_else(|| project_node.attr("default-version").map(str::to_string));
            let Some(version_id) = version_id else {
                return Response::negotiated_error(
                    kind,
                    http::StatusCode::BAD_REQUEST,
                    "missing_version",
                    "no version requested and the project declares no default",
                );
            };

            let cache_key = format!("{tenant}/{project_id}/{version_id}");
            let paths = self
                .path_cache
                .entry(cache_key)
                .or_insert_with(|| ProjectPaths::derive(&tenant, &project_id, &version_id))
                .clone();

            let project = ProjectVariables {
                editor_id: project_node.attr("editor").map(str::to_string),
                report_type: params.get("report").cloned(),
                channel: OutputChannel {
                    kind: params
                        .get("channel")
                        .cloned()
                        .unwrap_or_else(|| "web".to_string()),
                    variant: params.get("variant").cloned(),
                    language: params.get("lang").cloned(),
                },
                paths,
                project_id,
                version_id,
            };
            ctx.set_project(project);

            next.run(ctx, request).await
        })
    }
}
