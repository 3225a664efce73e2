//! Application assembly and lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::HqConfig;
use crate::handlers;
use crate::services::{
    Database, EmailProvider, HttpPdfRenderer, HttpSmsProvider, MockEmailProvider,
    MockPdfRenderer, MockSmsProvider, Notifier, PdfRenderer, SmsProvider, SmtpProvider,
};
use crate::workers::SweepWorker;
use vsuite_core::error::AppError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: HqConfig,
    pub db: Database,
    pub notifier: Notifier,
    pub pdf: Arc<dyn PdfRenderer>,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    state: AppState,
    sweeper: Option<SweepWorker>,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: HqConfig) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;
        db.run_migrations().await?;

        let email_provider: Arc<dyn EmailProvider> = if config.smtp.enabled {
            match SmtpProvider::new(config.smtp.clone()) {
                Ok(provider) => {
                    tracing::info!("SMTP email provider initialized");
                    Arc::new(provider)
                }
                Err(e) => {
                    tracing::warn!("Failed to initialize SMTP provider: {}. Using mock.", e);
                    Arc::new(MockEmailProvider::new(true))
                }
            }
        } else {
            tracing::info!("SMTP provider disabled, using mock email provider");
            Arc::new(MockEmailProvider::new(true))
        };

        let sms_provider: Arc<dyn SmsProvider> = if config.sms.enabled {
            tracing::info!("HTTP SMS provider initialized");
            Arc::new(HttpSmsProvider::new(config.sms.clone()))
        } else {
            tracing::info!("SMS provider disabled, using mock SMS provider");
            Arc::new(MockSmsProvider::new(true))
        };

        let pdf: Arc<dyn PdfRenderer> = if config.pdf.enabled {
            tracing::info!("HTTP PDF renderer initialized");
            Arc::new(HttpPdfRenderer::new(config.pdf.clone()))
        } else {
            tracing::info!("PDF renderer disabled, using mock renderer");
            Arc::new(MockPdfRenderer::new(true))
        };

        let notifier = Notifier::new(
            db.clone(),
            email_provider,
            sms_provider,
            config.notify.owner_email.clone(),
        );

        let state = AppState {
            config: config.clone(),
            db: db.clone(),
            notifier: notifier.clone(),
            pdf,
        };

        let router = build_router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on port {}", port);

        let sweeper = if config.sweep.enabled {
            Some(SweepWorker::new(
                db,
                notifier,
                Duration::from_secs(config.sweep.interval_secs),
            ))
        } else {
            tracing::info!("Sweep worker disabled by configuration");
            None
        };

        Ok(Self {
            port,
            listener,
            router,
            state,
            sweeper,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the server (and sweep worker) until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let sweep_token = self.sweeper.as_ref().map(|s| s.shutdown_token());
        if let Some(sweeper) = self.sweeper {
            tokio::spawn(sweeper.run());
        }

        let result = axum::serve(self.listener, self.router).await;

        if let Some(token) = sweep_token {
            token.cancel();
        }

        result
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics_endpoint))
        // Templates
        .route(
            "/templates",
            post(handlers::templates::create_template).get(handlers::templates::list_templates),
        )
        .route(
            "/templates/:id",
            get(handlers::templates::get_template)
                .put(handlers::templates::update_template)
                .delete(handlers::templates::delete_template),
        )
        // Proposals
        .route(
            "/proposals",
            post(handlers::proposals::create_proposal).get(handlers::proposals::list_proposals),
        )
        .route(
            "/proposals/:id",
            get(handlers::proposals::get_proposal).put(handlers::proposals::update_proposal),
        )
        .route("/proposals/:id/send", post(handlers::proposals::send_proposal))
        .route(
            "/proposals/:id/create-revision",
            post(handlers::proposals::create_revision),
        )
        // Public shareable-link routes
        .route(
            "/shared/proposals/:link",
            get(handlers::shared::get_shared_proposal),
        )
        .route(
            "/shared/proposals/:link/respond",
            post(handlers::shared::respond_shared_proposal),
        )
        // Invoices
        .route(
            "/invoices",
            post(handlers::invoices::create_invoice).get(handlers::invoices::list_invoices),
        )
        .route("/invoices/overdue", get(handlers::invoices::list_overdue_invoices))
        .route(
            "/invoices/:id",
            get(handlers::invoices::get_invoice)
                .put(handlers::invoices::update_invoice)
                .delete(handlers::invoices::delete_invoice),
        )
        .route("/invoices/:id/send", post(handlers::invoices::send_invoice))
        // Payments
        .route(
            "/payments",
            post(handlers::payments::create_payment).get(handlers::payments::list_payments),
        )
        // Contracts
        .route(
            "/contracts",
            post(handlers::contracts::create_contract).get(handlers::contracts::list_contracts),
        )
        .route(
            "/contracts/needs-attention",
            get(handlers::contracts::contracts_needing_attention),
        )
        .route(
            "/contracts/:id",
            get(handlers::contracts::get_contract)
                .put(handlers::contracts::update_contract)
                .delete(handlers::contracts::delete_contract),
        )
        .route("/contracts/:id/send", post(handlers::contracts::send_contract))
        .route(
            "/contracts/:id/signatures",
            post(handlers::contracts::sign_contract),
        )
        .route(
            "/contracts/:id/execute",
            post(handlers::contracts::execute_contract),
        )
        // Clients
        .route(
            "/clients",
            post(handlers::clients::create_client).get(handlers::clients::list_clients),
        )
        .route(
            "/clients/:id",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        // Projects
        .route(
            "/projects",
            post(handlers::projects::create_project).get(handlers::projects::list_projects),
        )
        .route(
            "/projects/:id",
            get(handlers::projects::get_project)
                .put(handlers::projects::update_project)
                .delete(handlers::projects::delete_project),
        )
        // Tasks
        .route(
            "/tasks",
            post(handlers::tasks::create_task).get(handlers::tasks::list_tasks),
        )
        .route(
            "/tasks/:id",
            get(handlers::tasks::get_task)
                .put(handlers::tasks::update_task)
                .delete(handlers::tasks::delete_task),
        )
        .route(
            "/tasks/:id/dependencies",
            post(handlers::tasks::add_task_dependency),
        )
        .route(
            "/tasks/:id/dependencies/:depends_on",
            axum::routing::delete(handlers::tasks::remove_task_dependency),
        )
        // Time logs
        .route(
            "/time-logs",
            post(handlers::time_logs::create_time_log).get(handlers::time_logs::list_time_logs),
        )
        .route(
            "/time-logs/:id",
            axum::routing::put(handlers::time_logs::update_time_log)
                .delete(handlers::time_logs::delete_time_log),
        )
        .layer(axum::middleware::from_fn(
            crate::middleware::metrics::track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
