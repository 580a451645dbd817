use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use cutplan::budget::{self, BudgetInput, Quote};
use cutplan::planner::{DEFAULT_KERF, PlanError, Planner};
use cutplan::sheet::FreeRegion;
use cutplan::types::{PieceDemand, PlacedPiece, StockSheet, deserialize_u32_from_number};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct PlanRequest {
    stock: Vec<StockSheet>,
    pieces: Vec<PieceRequest>,
    #[serde(default = "default_kerf")]
    kerf: f64,
}

fn default_kerf() -> f64 {
    DEFAULT_KERF
}

#[derive(Deserialize, Serialize)]
struct PieceRequest {
    #[serde(default)]
    id: Option<String>,
    name: String,
    length: f64,
    width: f64,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    qty: u32,
}

#[derive(Serialize)]
struct PlanResponse {
    sheets: Vec<SheetResponse>,
    sheet_count: usize,
    total_efficiency: f64,
}

#[derive(Serialize)]
struct SheetResponse {
    id: u32,
    name: String,
    length: f64,
    width: f64,
    efficiency: f64,
    placements: Vec<PlacedPiece>,
    /// Offcut rectangles, so a renderer can shade the waste.
    free_regions: Vec<FreeRegion>,
}

async fn plan(Json(req): Json<PlanRequest>) -> Result<Json<PlanResponse>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /plan"
    );

    if req.kerf < 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "kerf must not be negative".to_string(),
        ));
    }
    for s in &req.stock {
        if !(s.length > 0.0) || !(s.width > 0.0) {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("stock sheet \"{}\" must have positive dimensions", s.name),
            ));
        }
    }

    let demands: Vec<PieceDemand> = req
        .pieces
        .into_iter()
        .enumerate()
        .map(|(i, p)| PieceDemand {
            id: p.id.unwrap_or_else(|| format!("p{}", i + 1)),
            name: p.name,
            length: p.length,
            width: p.width,
            qty: p.qty,
        })
        .collect();

    let planner = Planner::new(req.stock, req.kerf);
    let plan = planner.plan(&demands).map_err(|e| {
        let status = match e {
            PlanError::InvalidDemand { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        };
        (status, e.to_string())
    })?;

    Ok(Json(PlanResponse {
        sheet_count: plan.sheet_count(),
        total_efficiency: plan.total_efficiency(),
        sheets: plan
            .sheets
            .into_iter()
            .map(|s| {
                let efficiency = s.efficiency();
                SheetResponse {
                    id: s.id,
                    name: s.name,
                    length: s.length,
                    width: s.width,
                    efficiency,
                    placements: s.pieces,
                    free_regions: s.free_regions,
                }
            })
            .collect(),
    }))
}

async fn budget_quote(
    Json(input): Json<BudgetInput>,
) -> Result<Json<Quote>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&input).unwrap_or_default(),
        "POST /budget"
    );

    budget::quote(&input)
        .map(Json)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

fn main() {
    // The sentry transport must outlive the async runtime, so the guard is
    // created before it.
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to start tokio runtime")
        .block_on(serve());
}

async fn serve() {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/plan", post(plan))
        .route("/budget", post(budget_quote))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
