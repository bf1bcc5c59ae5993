//! Engine construction and serving.
//!
//! # Responsibilities
//! - Resolve the run mode
//! - Register named and custom validations into the validator handle
//! - Decide which optional middleware to attach, validating the CORS policy
//! - Collect route registrations, then apply the middleware stack
//! - Serve on a listener until shutdown
//!
//! # Design Decisions
//! - Middleware is applied when the router is finalized, so it covers every
//!   route regardless of registration order
//! - Building never binds a socket; `run`/`serve` do

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    handler::Handler,
    middleware,
    routing::{on, MethodFilter, MethodRouter},
    Extension, Router,
};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::broadcast;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use crate::config::{LocationConfig, Mode, Options};
use crate::error::{EngineError, EngineResult};
use crate::http::context::ContextMetadata;
use crate::http::middleware::location::location_middleware;
use crate::http::middleware::metadata::metadata_middleware;
use crate::http::middleware::recovery;
use crate::http::request::RequestIdLayer;
use crate::lifecycle::signals;
use crate::observability::logging::access_log;
use crate::validation::{
    builtins, SharedValidator, StructValidator, ValidationFn, ValidatorEngine,
};

/// Middleware selected at build time.
#[derive(Clone, Default)]
struct Stack {
    logging: bool,
    recovery: bool,
    compression: bool,
    location: Option<LocationConfig>,
    request_id: bool,
    cors: Option<CorsLayer>,
    metadata: Option<ContextMetadata>,
}

/// A configured, not yet listening, application.
pub struct Engine {
    router: Router,
    stack: Stack,
    mode: Mode,
    validator: Arc<dyn StructValidator>,
}

impl Engine {
    /// Build an engine from options.
    ///
    /// Fails if validations are requested but the validator handle is not a
    /// [`ValidatorEngine`], or if a configured CORS policy is invalid.
    pub fn new(mut options: Options) -> EngineResult<Self> {
        let mode = options.resolved_mode();
        if mode == Mode::Debug {
            tracing::warn!("Running in debug mode; set mode = \"release\" in production");
        }

        let validator = options
            .validator
            .take()
            .unwrap_or_else(|| Arc::new(ValidatorEngine::new()));

        if !options.validations.is_empty() || !options.validation_funcs.is_empty() {
            let engine = validator
                .engine()
                .downcast_ref::<ValidatorEngine>()
                .ok_or_else(|| {
                    EngineError::Internal("couldn't get the validator engine".to_string())
                })?;
            let custom = std::mem::take(&mut options.validation_funcs);
            let funcs = resolve_validations(&options.validations, custom);
            for (tag, func) in funcs {
                engine.register_validation(tag, func);
            }
        }

        let mut stack = Stack {
            logging: options.enable_logging,
            recovery: options.enable_recovery,
            compression: options.enable_compression,
            location: options.enable_location.then(|| options.location.clone()),
            request_id: options.enable_request_id,
            ..Stack::default()
        };

        if options.cors.is_configured() {
            options.cors.validate()?;
            stack.cors = Some(options.cors.to_layer()?);
        }

        if !options.context_metadata.is_empty() {
            let metadata = std::mem::take(&mut options.context_metadata);
            stack.metadata = Some(ContextMetadata::new(metadata));
        }

        tracing::debug!(
            mode = %mode,
            logging = stack.logging,
            recovery = stack.recovery,
            compression = stack.compression,
            location = stack.location.is_some(),
            request_id = stack.request_id,
            cors = stack.cors.is_some(),
            metadata = stack.metadata.is_some(),
            "Engine configured"
        );

        Ok(Self {
            router: Router::new(),
            stack,
            mode,
            validator,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The validator handle bound requests are checked against.
    pub fn validator(&self) -> &Arc<dyn StructValidator> {
        &self.validator
    }

    /// Register `handler` for `method` requests on `path`.
    pub fn handle<H, T>(self, method: MethodFilter, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.route(path, on(method, handler))
    }

    /// Register an axum method router on `path`.
    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        if self.mode == Mode::Debug {
            tracing::debug!(path = %path, "Route registered");
        }
        self.router = self.router.route(path, method_router);
        self
    }

    /// Apply the middleware stack and return the finished router.
    pub fn into_router(self) -> Router {
        let Stack {
            logging,
            recovery: recover,
            compression,
            location,
            request_id,
            cors,
            metadata,
        } = self.stack;

        // Layers wrap what is already there: innermost first.
        let mut router = self
            .router
            .layer(Extension(SharedValidator(self.validator)));
        if let Some(metadata) = metadata {
            router = router.layer(middleware::from_fn_with_state(
                metadata,
                metadata_middleware,
            ));
        }
        if let Some(cors) = cors {
            router = router.layer(cors);
        }
        if request_id {
            router = router.layer(RequestIdLayer);
        }
        if let Some(config) = location {
            router = router.layer(middleware::from_fn_with_state(
                config,
                location_middleware,
            ));
        }
        if compression {
            router = router.layer(CompressionLayer::new());
        }
        if recover {
            router = router.layer(recovery::layer());
        }
        if logging {
            router = router.layer(middleware::from_fn(access_log));
        }
        router
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let mode = self.mode;
        tracing::info!(address = %addr, mode = %mode, "HTTP server starting");

        let app = self.into_router().into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Bind `addr` and serve until Ctrl+C or SIGTERM.
    pub async fn run<A: ToSocketAddrs>(self, addr: A) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        let shutdown = crate::lifecycle::Shutdown::new();
        let receiver = shutdown.subscribe();

        tokio::spawn(async move {
            signals::wait_for_signal().await;
            shutdown.trigger();
        });

        self.serve(listener, receiver).await
    }
}

/// Built-ins first, then custom functions for tags still free.
fn resolve_validations(
    names: &[String],
    custom: HashMap<String, ValidationFn>,
) -> HashMap<String, ValidationFn> {
    let mut funcs = HashMap::new();
    for name in names {
        match builtins::lookup(name) {
            Some(func) => {
                funcs.insert(name.clone(), func);
            }
            None => tracing::warn!(validation = %name, "Unknown built-in validation ignored"),
        }
    }
    for (tag, func) in custom {
        if funcs.contains_key(&tag) {
            // TODO: decide whether custom functions should override built-ins of the same name.
            tracing::warn!(tag = %tag, "Custom validation shadowed by built-in");
            continue;
        }
        funcs.insert(tag, func);
    }
    funcs
}
