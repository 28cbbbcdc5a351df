use super::{page_routes, system_routes};
use crate::auth::EndpointAuth;
use crate::config::{ServerConfig, TreeConfig};
use crate::confluence::{ConfluenceClients, TransportProvider};
use crate::endpoint::EndpointRegistry;
use crate::error::{ConflagentError, ConflagentResult};
use crate::error_handling::{
    json_error_handler, method_not_allowed_handler, not_found_handler, query_error_handler,
};
use crate::metrics::{HttpMetrics, RequestMetrics};

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer as ActixHttpServer, Resource};
use log::info;
use std::sync::Arc;

/// Shared application state for the HTTP server.
///
/// Everything in here is read-only once the server starts.
pub struct AppState {
    /// Endpoint table loaded at startup
    pub registry: Arc<EndpointRegistry>,
    /// Per-endpoint transports
    pub transports: Arc<dyn TransportProvider>,
    /// Tree listing bounds
    pub tree: TreeConfig,
    /// Request metrics served on `/metrics`
    pub metrics: Arc<HttpMetrics>,
}

impl AppState {
    pub fn new(
        registry: EndpointRegistry,
        transports: Arc<dyn TransportProvider>,
        tree: TreeConfig,
    ) -> ConflagentResult<Self> {
        let metrics = HttpMetrics::new()
            .map_err(|e| ConflagentError::internal(format!("Failed to set up metrics: {}", e)))?;
        Ok(Self {
            registry: Arc::new(registry),
            transports,
            tree,
            metrics: Arc::new(metrics),
        })
    }
}

/// Resource whose unsupported methods are answered with an envelope.
fn resource(path: &str) -> Resource {
    web::resource(path).default_service(web::route().to(method_not_allowed_handler))
}

/// Register handlers, payload error handlers and the route table.
///
/// The caller supplies `AppState` as app data, a default service and, for
/// `/metrics` to have anything to report, the [`RequestMetrics`] middleware.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .service(resource("/").route(web::get().to(system_routes::landing_page)))
        .service(resource("/metrics").route(web::get().to(system_routes::metrics)))
        .service(
            web::scope("/endpoint/{endpoint}")
                .service(resource("/health").route(web::get().to(system_routes::health)))
                .service(
                    resource("/openapi.json").route(web::get().to(system_routes::openapi_spec)),
                )
                .service(
                    web::scope("/pages")
                        .wrap(EndpointAuth)
                        .service(
                            resource("")
                                .route(web::get().to(page_routes::list_pages))
                                .route(web::post().to(page_routes::create_page)),
                        )
                        .service(resource("/tree").route(web::get().to(page_routes::get_tree)))
                        .service(
                            resource("/rename").route(web::post().to(page_routes::rename_page)),
                        )
                        // Suffix routes first so the catch-all title pattern does not shadow them.
                        .service(
                            resource("/{title:.*}/children")
                                .route(web::get().to(page_routes::list_children)),
                        )
                        .service(
                            resource("/{title:.*}/parent")
                                .route(web::get().to(page_routes::get_parent)),
                        )
                        .service(
                            resource("/{title:.*}/move")
                                .route(web::post().to(page_routes::move_page)),
                        )
                        .service(
                            resource("/{title:.*}")
                                .route(web::get().to(page_routes::read_page))
                                .route(web::put().to(page_routes::update_page)),
                        ),
                ),
        );
}

/// HTTP server for a set of Conflagent endpoints.
pub struct ConflagentHttpServer {
    state: web::Data<AppState>,
    bind_address: String,
}

impl ConflagentHttpServer {
    /// Create a server backed by real Confluence clients.
    pub fn new(config: &ServerConfig, registry: EndpointRegistry) -> ConflagentResult<Self> {
        let clients = ConfluenceClients::from_registry(&registry, &config.transport)?;
        Self::with_transports(
            registry,
            Arc::new(clients),
            config.tree.clone(),
            &config.bind_address(),
        )
    }

    /// Create a server with an explicit transport provider.
    pub fn with_transports(
        registry: EndpointRegistry,
        transports: Arc<dyn TransportProvider>,
        tree: TreeConfig,
        bind_address: &str,
    ) -> ConflagentResult<Self> {
        Ok(Self {
            state: web::Data::new(AppState::new(registry, transports, tree)?),
            bind_address: bind_address.to_string(),
        })
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    /// Run the HTTP server until it is shut down.
    pub async fn run(&self) -> ConflagentResult<()> {
        info!(
            "HTTP server running on {} serving endpoints {:?}",
            self.bind_address,
            self.state.registry.names()
        );

        let state = self.state.clone();
        let server = ActixHttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(RequestMetrics::new(state.metrics.clone()))
                .wrap(Logger::default())
                .wrap(cors)
                .app_data(state.clone())
                .configure(configure_app)
                .default_service(web::route().to(not_found_handler))
        })
        .bind(&self.bind_address)
        .map_err(|e| ConflagentError::internal(format!("Failed to bind HTTP server: {}", e)))?
        .run();

        server
            .await
            .map_err(|e| ConflagentError::internal(format!("HTTP server error: {}", e)))?;

        Ok(())
    }
}
