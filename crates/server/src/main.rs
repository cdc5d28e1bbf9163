//! Lodestone Server
//!
//! Axum server exposing the agentic RAG pipeline: query execution, document
//! ingestion, and vector store introspection. Also carries a small CLI for
//! one-shot queries without the HTTP layer.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use clap::{Parser, Subcommand};
use lodestone_core::embed::{Embedder, HttpEmbedder};
use lodestone_core::ingest::{IngestFile, IngestReport, IngestionPipeline};
use lodestone_core::llm::{ChatLlm, OpenAiChatLlm};
use lodestone_core::store::{InMemoryStore, QdrantStore, VectorStore};
use lodestone_core::{FinalResponse, Orchestrator, Settings};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use utoipa::{OpenApi, ToSchema};

/// Application state
struct AppState {
    orchestrator: Orchestrator,
    pipeline: IngestionPipeline,
    store: Arc<dyn VectorStore>,
}

type SharedState = Arc<AppState>;

// === API Types ===

#[derive(Deserialize, ToSchema)]
struct QueryRequest {
    query: String,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize, ToSchema)]
struct DeleteDocumentResponse {
    source: String,
    deleted_chunks: u64,
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    store_reachable: bool,
}

#[derive(Parser)]
#[command(author, version, about = "Lodestone - Agentic RAG Question Answering")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Start the Lodestone server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,
        /// Use an in-memory vector store instead of Qdrant
        #[arg(long)]
        memory: bool,
    },
    /// Run a single query and print the response (no server)
    Ask {
        /// The question to answer
        query: String,
        /// Use an in-memory vector store instead of Qdrant
        #[arg(long)]
        memory: bool,
    },
}

// === OpenAPI Definition ===

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lodestone API",
        version = "1.0.0",
        description = "Agentic retrieval-augmented question answering"
    ),
    paths(
        run_query,
        list_documents,
        upload_documents,
        delete_document,
        store_health,
        store_stats
    ),
    components(schemas(QueryRequest, ErrorResponse, DeleteDocumentResponse, HealthResponse)),
    tags(
        (name = "query", description = "Query execution"),
        (name = "documents", description = "Document ingestion and management"),
        (name = "store", description = "Vector store introspection")
    )
)]
struct ApiDoc;

// === API Handlers ===

/// Execute a query through the full orchestration loop
#[utoipa::path(
    post,
    path = "/api/v1/query",
    tag = "query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Final answer with confidence and suggestions"),
        (status = 500, description = "Language model unreachable", body = ErrorResponse)
    )
)]
async fn run_query(
    State(state): State<SharedState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<FinalResponse>, (StatusCode, Json<ErrorResponse>)> {
    tracing::info!(query = %req.query, "query received");
    match state.orchestrator.run(&req.query).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::error!(error = %e, "query execution failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

/// List ingested documents
#[utoipa::path(
    get,
    path = "/api/v1/documents",
    tag = "documents",
    responses(
        (status = 200, description = "Distinct sources with chunk counts")
    )
)]
async fn list_documents(State(state): State<SharedState>) -> impl IntoResponse {
    match state.store.list_documents().await {
        Ok(docs) => Json(serde_json::json!({ "documents": docs })).into_response(),
        Err(e) => store_error(e).into_response(),
    }
}

/// Upload documents as multipart form data
#[utoipa::path(
    post,
    path = "/api/v1/documents",
    tag = "documents",
    responses(
        (status = 200, description = "Per-file ingestion report"),
        (status = 400, description = "Malformed multipart payload", body = ErrorResponse)
    )
)]
async fn upload_documents(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<IngestReport>, (StatusCode, Json<ErrorResponse>)> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| field.name().unwrap_or("upload").to_string());
        let document_type = document_type_for(&name);
        let content = field.text().await.map_err(bad_request)?;
        files.push(IngestFile {
            name,
            content,
            document_type,
        });
    }

    if files.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "no files in upload".to_string(),
            }),
        ));
    }

    match state.pipeline.ingest(files).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}

/// Delete every chunk belonging to a source
#[utoipa::path(
    delete,
    path = "/api/v1/documents/{source}",
    tag = "documents",
    params(("source" = String, Path, description = "Document source name")),
    responses(
        (status = 200, description = "Deleted chunk count", body = DeleteDocumentResponse)
    )
)]
async fn delete_document(
    State(state): State<SharedState>,
    Path(source): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_by_source(&source).await {
        Ok(deleted_chunks) => Json(DeleteDocumentResponse {
            source,
            deleted_chunks,
        })
        .into_response(),
        Err(e) => store_error(e).into_response(),
    }
}

/// Vector store reachability
#[utoipa::path(
    get,
    path = "/api/v1/store/health",
    tag = "store",
    responses(
        (status = 200, description = "Health report", body = HealthResponse)
    )
)]
async fn store_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let reachable = state.store.health().await;
    Json(HealthResponse {
        status: if reachable { "ok" } else { "degraded" }.to_string(),
        store_reachable: reachable,
    })
}

/// Vector and source counts
#[utoipa::path(
    get,
    path = "/api/v1/store/stats",
    tag = "store",
    responses(
        (status = 200, description = "Collection statistics")
    )
)]
async fn store_stats(State(state): State<SharedState>) -> impl IntoResponse {
    match state.store.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => store_error(e).into_response(),
    }
}

async fn serve_openapi() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

fn bad_request(e: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

fn store_error(e: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

fn document_type_for(name: &str) -> String {
    match name.rsplit('.').next() {
        Some("md") => "markdown",
        Some("csv") => "csv",
        Some("json") => "json",
        _ => "text",
    }
    .to_string()
}

// === Wiring ===

async fn build_state(settings: &Settings, in_memory: bool) -> anyhow::Result<SharedState> {
    let llm: Arc<dyn ChatLlm> = Arc::new(OpenAiChatLlm::new(settings)?);
    let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(settings)?);

    let store: Arc<dyn VectorStore> = if in_memory {
        tracing::info!("using in-memory vector store");
        Arc::new(InMemoryStore::new())
    } else {
        let qdrant = QdrantStore::new(settings)?;
        qdrant.ensure_collection().await?;
        tracing::info!(url = %settings.qdrant_url, collection = %settings.qdrant_collection_name, "connected to Qdrant");
        Arc::new(qdrant)
    };

    let orchestrator = Orchestrator::new(llm, embedder.clone(), store.clone(), settings);
    let pipeline = IngestionPipeline::new(
        embedder,
        store.clone(),
        settings.chunk_size,
        settings.chunk_overlap,
    );

    Ok(Arc::new(AppState {
        orchestrator,
        pipeline,
        store,
    }))
}

async fn run_server(port: u16, in_memory: bool) -> anyhow::Result<()> {
    let settings = Settings::from_env();
    let state = build_state(&settings, in_memory).await?;

    let document_routes = Router::new()
        .route("/", get(list_documents).post(upload_documents))
        .route("/:source", delete(delete_document));

    let store_routes = Router::new()
        .route("/health", get(store_health))
        .route("/stats", get(store_stats));

    let app = Router::new()
        .route("/api/v1/query", post(run_query))
        .nest("/api/v1/documents", document_routes)
        .nest("/api/v1/store", store_routes)
        .route("/api/v1/openapi.json", get(serve_openapi))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!(%addr, "Lodestone server listening");
    println!("Lodestone running at http://{addr}");
    println!("   Query:     POST /api/v1/query");
    println!("   Documents: /api/v1/documents (GET, POST, DELETE /:source)");
    println!("   Store:     /api/v1/store/health, /api/v1/store/stats");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_ask(query: &str, in_memory: bool) -> anyhow::Result<()> {
    let settings = Settings::from_env();
    let state = build_state(&settings, in_memory).await?;

    let response = state.orchestrator.run(query).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lodestone_core=debug".into()),
        )
        .init();

    let args = Args::parse();
    match args.command {
        Some(CliCommand::Ask { query, memory }) => run_ask(&query, memory).await,
        Some(CliCommand::Serve { port, memory }) => run_server(port, memory).await,
        None => run_server(8000, false).await,
    }
}
