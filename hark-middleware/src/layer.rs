use crate::exchange::{Exchange, ExchangeLogger};
use crate::request::capture;
use crate::response::{LogTransform, intercept};
use crate::sink::Sink;
use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use hark_broadcast::{Broadcaster, client_script};
use hark_core::config::{CLIENT_SCRIPT_PATH, SinkKind};
use hark_core::{CallerResolver, FrameResolver, HarkConfig, HarkError, LogRecordBuffer, Options};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Push-server port assumed when the configured address has none.
const DEFAULT_WS_PORT: u16 = 8081;

/// Installs exchange logging on an axum [`Router`].
///
/// ```ignore
/// let app = HarkLayer::from_config(&config)?.apply(Router::new().route("/", get(root)));
/// ```
#[derive(Debug, Clone)]
pub struct HarkLayer {
    options: Arc<Options>,
    sink: Sink,
    resolver: Arc<dyn CallerResolver>,
    transforms: HashMap<String, LogTransform>,
    ws_port: u16,
    mount_client_script: bool,
}

struct LayerState {
    options: Arc<Options>,
    sink: Sink,
    resolver: Arc<dyn CallerResolver>,
    transforms: HashMap<String, LogTransform>,
}

impl HarkLayer {
    pub fn new(options: Options) -> Self {
        Self {
            options: Arc::new(options),
            sink: Sink::default(),
            resolver: Arc::new(FrameResolver::default()),
            transforms: HashMap::new(),
            ws_port: DEFAULT_WS_PORT,
            mount_client_script: true,
        }
    }

    /// Validate `config` and pick the sink it names. In broadcast mode the
    /// layer owns a fresh [`Broadcaster`]; serve it with
    /// [`hark_broadcast::serve`] using [`HarkLayer::broadcaster`].
    pub fn from_config(config: &HarkConfig) -> Result<Self, HarkError> {
        let options = config.normalize()?;
        let sink = match config.sink {
            SinkKind::Stdout => Sink::Stdout,
            SinkKind::Tracing => Sink::Tracing,
            SinkKind::Broadcast => Sink::Broadcast(Broadcaster::new()),
        };
        let ws_port = config
            .broadcast_addr
            .parse::<SocketAddr>()
            .map(|addr| addr.port())
            .unwrap_or(DEFAULT_WS_PORT);

        Ok(Self {
            options: Arc::new(options),
            sink,
            resolver: Arc::new(FrameResolver::new(config.internal_frame_prefix.clone())),
            transforms: HashMap::new(),
            ws_port,
            mount_client_script: true,
        })
    }

    pub fn with_sink(mut self, sink: Sink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn CallerResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Rewrite the logged JSON response body of requests to `path`.
    pub fn with_transform(
        mut self,
        path: impl Into<String>,
        f: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.transforms.insert(path.into(), LogTransform::new(f));
        self
    }

    pub fn with_ws_port(mut self, port: u16) -> Self {
        self.ws_port = port;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn broadcaster(&self) -> Option<Broadcaster> {
        match &self.sink {
            Sink::Broadcast(broadcaster) => Some(broadcaster.clone()),
            _ => None,
        }
    }

    /// Leave [`CLIENT_SCRIPT_PATH`] to the wrapped router. The path is still
    /// never logged.
    pub fn without_client_script(mut self) -> Self {
        self.mount_client_script = false;
        self
    }

    /// Add the client-script route and wrap every route in the logger.
    ///
    /// # Panics
    ///
    /// Panics if `router` already has a route at [`CLIENT_SCRIPT_PATH`] and
    /// [`HarkLayer::without_client_script`] was not called.
    pub fn apply(self, router: Router) -> Router {
        let script = client_script(self.ws_port);
        let state = Arc::new(LayerState {
            options: self.options,
            sink: self.sink,
            resolver: self.resolver,
            transforms: self.transforms,
        });

        let router = if self.mount_client_script {
            router.route(
                CLIENT_SCRIPT_PATH,
                get(move || serve_client_script(script.clone())),
            )
        } else {
            router
        };
        router.layer(middleware::from_fn_with_state(state, log_exchange))
    }
}

async fn serve_client_script(script: Option<String>) -> Response {
    match script {
        Some(source) => (
            [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
            source,
        )
            .into_response(),
        None => {
            warn!("Client script asset is missing from the build");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

async fn log_exchange(State(state): State<Arc<LayerState>>, req: Request, next: Next) -> Response {
    if state.options.is_filtered(req.uri().path()) {
        return next.run(req).await;
    }

    let max_body_bytes = state.options.max_body_bytes;
    let (mut req, line) = match capture(req, max_body_bytes).await {
        Ok(captured) => captured,
        Err(response) => return response,
    };

    let buffer = match LogRecordBuffer::start(&line, state.options.clone()) {
        Ok(buffer) => buffer,
        Err(e) => {
            warn!(error = %e, kind = e.kind(), path = %line.path, "Failed to start exchange log, serving unlogged");
            return next.run(req).await;
        }
    };
    let exchange = Exchange::new(buffer, state.resolver.clone());
    req.extensions_mut().insert(ExchangeLogger::attached(exchange.clone()));

    let response = tokio::select! {
        response = next.run(req) => response,
        _ = tokio::time::sleep(state.options.timeout) => {
            if let Some(mut buffer) = exchange.finish() {
                buffer.timeout_notice(state.options.timeout_ms());
                state.sink.emit(&buffer.render());
            }
            debug!(exchange = %exchange.id(), "Exchange timed out");
            return Response::new(Body::empty());
        }
    };

    let transform = state.transforms.get(line.path.as_str());
    let response = intercept(response, &exchange, max_body_bytes, transform).await;
    if let Some(mut buffer) = exchange.finish() {
        buffer.finalize(response.status().as_u16());
        state.sink.emit(&buffer.render());
    }
    response
}
