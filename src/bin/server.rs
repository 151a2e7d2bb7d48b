use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use cutting_stock::input::ProblemFile;
use cutting_stock::report::Report;
use cutting_stock::{MicroLpSolver, Settings, optimize};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct OptimizeRequest {
    #[serde(flatten)]
    problem: ProblemFile,
    #[serde(default)]
    settings: Settings,
}

async fn optimize_handler(
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<Report>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize"
    );

    let status = |e: cutting_stock::Error| {
        let code = if e.is_input_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (code, e.to_string())
    };

    let problem = req.problem.into_problem().map_err(status)?;
    let settings = req.settings;
    let outcome = tokio::task::spawn_blocking({
        let problem = problem.clone();
        move || optimize(problem, settings, MicroLpSolver::new())
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(status)?;

    Ok(Json(Report::from_outcome(&problem, &outcome)))
}

fn app() -> Router {
    Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize", post(optimize_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Log to `CUTTING_STOCK_LOG` (default `cutting_stock.log`), appending.
fn init_logging() -> std::io::Result<String> {
    let path = std::env::var("CUTTING_STOCK_LOG").unwrap_or_else(|_| "cutting_stock.log".to_string());
    let log_file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();
    Ok(path)
}

async fn serve(addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    eprintln!("Listening on {addr}");
    axum::serve(listener, app()).await
}

#[tokio::main]
async fn main() {
    match init_logging() {
        Ok(path) => tracing::info!(path, "logging started"),
        Err(e) => {
            eprintln!("Error: cannot open log file: {e}");
            std::process::exit(1);
        }
    }

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("0.0.0.0:{port}");

    if let Err(e) = serve(&addr).await {
        tracing::error!(addr, error = %e, "server stopped");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
