use crate::{
    config::Config,
    error::Result,
    ml,
    routes::{api_routes, catalog_routes},
    services::{
        Catalog, GoogleBooksClient, PipelineSettings, RecommendationService, SimilarityRanker,
    },
};
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::info;
use std::net::TcpListener;
use std::sync::Arc;

/// Everything a request needs, built once at startup and shared read-only.
#[derive(Clone)]
pub struct AppContext {
    catalog: web::Data<Catalog>,
    recommendations: web::Data<RecommendationService>,
}

impl AppContext {
    /// Load the catalog and the models, and check that they agree on the
    /// embedding dimension. Any failure here is fatal.
    pub async fn initialize(config: &Config) -> Result<Self> {
        let api_key = config.google_books_api_key()?;
        let catalog = Arc::new(Catalog::load(&config.catalog_source).await?);

        info!("Loading models ({:?} backend)...", config.model_backend);
        let (embedder, summarizer) = ml::load_models(config).await?;
        catalog.ensure_dimension(embedder.dimension())?;

        let books = GoogleBooksClient::new(
            &config.google_books_base_url,
            api_key,
            config.google_books_country.as_deref(),
        );
        let recommendations = RecommendationService::new(
            books,
            summarizer,
            SimilarityRanker::new(embedder),
            catalog.clone(),
            PipelineSettings::from(config),
        );

        Ok(Self::new(catalog, recommendations))
    }

    pub fn new(catalog: Arc<Catalog>, recommendations: RecommendationService) -> Self {
        Self {
            catalog: web::Data::from(catalog),
            recommendations: web::Data::new(recommendations),
        }
    }

    /// Register shared state and the API routes on an app.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.catalog.clone())
            .app_data(self.recommendations.clone())
            .service(api_routes());
    }
}

/// The recommendation API server.
pub struct Application {
    port: u16,
    host: String,
    config: Config,
}

impl Application {
    /// Create a new application instance
    pub fn new(config: &Config) -> Self {
        Self {
            port: config.port,
            host: config.host.clone(),
            config: config.clone(),
        }
    }

    /// Build and run the server
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind((self.host.as_str(), self.port))?;
        info!("Starting server at http://{}:{}", self.host, self.port);

        self.run_with_listener(listener).await
    }

    /// Run the server with a specific TCP listener
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        let context = AppContext::initialize(&self.config).await?;

        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header();

            App::new()
                .wrap(cors)
                .wrap(Logger::default())
                .configure(|cfg| context.configure(cfg))
        })
        .listen(listener)?
        .run()
        .await?;

        Ok(())
    }
}

/// The catalog service: serves the catalog CSV as JSON.
pub struct CatalogApplication {
    port: u16,
    host: String,
    catalog_source: String,
}

impl CatalogApplication {
    pub fn new(config: &Config) -> Self {
        Self {
            port: config.catalog_port,
            host: config.host.clone(),
            catalog_source: config.catalog_source.clone(),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind((self.host.as_str(), self.port))?;
        info!("Starting catalog service at http://{}:{}", self.host, self.port);

        self.run_with_listener(listener).await
    }

    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        let catalog = web::Data::new(Catalog::load(&self.catalog_source).await?);

        HttpServer::new(move || {
            App::new()
                .wrap(Logger::default())
                .app_data(catalog.clone())
                .configure(catalog_routes)
        })
        .listen(listener)?
        .run()
        .await?;

        Ok(())
    }
}
