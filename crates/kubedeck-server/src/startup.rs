use std::net::TcpListener;

use actix_web::{
    App, HttpRequest, HttpResponse, HttpServer,
    dev::Server,
    http::{Method, header::HeaderValue},
    middleware::DefaultHeaders,
    web::{self, Data},
};
use tracing_actix_web::TracingLogger;

use crate::config::ServerConfig;
use crate::error::ErrorMessage;
use crate::routes::{
    assistant::draft_manifest,
    cluster::{read_all_namespaces, read_all_nodes, read_cluster_name},
    deployments::{create_deployment, delete_deployment, read_all_deployments},
    health_check::health_check,
    pods::{
        create_pod, delete_pod, read_all_pods, read_pod_logs, read_pod_manifest, replace_pod,
    },
};
use crate::state::AppState;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub fn build(config: &ServerConfig, state: AppState) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(config.address())?;
        let port = listener.local_addr()?.port();
        let server = run(listener, &config.cors_origin, state)?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(
    listener: TcpListener,
    cors_origin: &str,
    state: AppState,
) -> Result<Server, std::io::Error> {
    let origin = HeaderValue::from_str(cors_origin).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid CORS origin '{}': {}", cors_origin, e),
        )
    })?;
    let state = Data::new(state);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(cors_headers(origin.clone()))
            .wrap(TracingLogger::default())
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .listen(listener)?
    .run();

    Ok(server)
}

/// CORS headers for the single allowed origin, added to every response
pub fn cors_headers(origin: HeaderValue) -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", origin))
        .add(("Access-Control-Allow-Methods", ALLOWED_METHODS))
        .add(("Access-Control-Allow-Headers", ALLOWED_HEADERS))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        // cluster
        .service(read_cluster_name)
        .service(read_all_nodes)
        .service(read_all_namespaces)
        // deployments
        .service(read_all_deployments)
        .service(create_deployment)
        .service(delete_deployment)
        // pods
        .service(read_all_pods)
        .service(create_pod)
        .service(replace_pod)
        .service(delete_pod)
        .service(read_pod_manifest)
        .service(read_pod_logs)
        // assistant
        .service(draft_manifest)
        .default_service(web::to(fallback));
}

/// Answers CORS preflight requests and reports unknown routes
async fn fallback(req: HttpRequest) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        return HttpResponse::NoContent().finish();
    }

    HttpResponse::NotFound().json(ErrorMessage {
        error: format!("no route for {} {}", req.method(), req.path()),
        step: None,
        original_deleted: None,
    })
}
