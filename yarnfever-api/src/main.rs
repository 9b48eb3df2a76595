//! Yarn Fever Web API
//!
//! Serves the puzzle engine over REST for browser clients. The process
//! holds one shared play session; every mutating endpoint returns the
//! full game state so clients can re-render without extra round trips.
//!
//! Levels come from a JSON level file when one is found (`--levels`,
//! then `levels.json`, then `data/levels.json`), otherwise the builtin
//! set is used.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use yarnfever_core::{builtin_levels, Game, Level, LevelSet, LoadOutcome, SlotId, YarnId};

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser, Debug)]
#[command(name = "yarnfever-api")]
#[command(about = "REST API for the Yarn Fever puzzle engine", long_about = None)]
struct Args {
    /// Path to a JSON level file
    #[arg(short, long)]
    levels: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, default_value = "8000")]
    port: u16,
}

// =============================================================================
// Session State
// =============================================================================

/// Shared application state
struct AppStateInner {
    session: Mutex<Game>,
}

type AppState = Arc<AppStateInner>;

// =============================================================================
// JSON Models
// =============================================================================

#[derive(Serialize)]
struct YarnModel {
    id: u16,
    color: String,
    slot: u8,
    layer: u8,
}

#[derive(Serialize)]
struct SlotModel {
    id: u8,
    kind: String,
    capacity: u8,
    target_color: Option<String>,
    /// Yarn ids bottom to top.
    yarns: Vec<u16>,
}

#[derive(Serialize)]
struct GameStateModel {
    level: u32,
    name: Option<String>,
    moves: u32,
    score: u32,
    total_score: u32,
    completed_levels: u32,
    level_count: usize,
    yarns_left: u16,
    cleared: bool,
    can_undo: bool,
    hinted: Option<u16>,
    slots: Vec<SlotModel>,
    yarns: Vec<YarnModel>,
}

#[derive(Deserialize)]
struct MoveRequest {
    yarn: u16,
    to: u8,
}

#[derive(Serialize)]
struct LevelClearModel {
    moves: u32,
    score: u32,
    perfect: bool,
}

#[derive(Serialize)]
struct MoveResponse {
    accepted: bool,
    triplets: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    level_clear: Option<LevelClearModel>,
    state: GameStateModel,
}

#[derive(Serialize)]
struct HintModel {
    yarn: u16,
    to: u8,
}

#[derive(Serialize)]
struct HintResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<HintModel>,
    state: GameStateModel,
}

#[derive(Serialize)]
struct NextResponse {
    all_cleared: bool,
    state: GameStateModel,
}

#[derive(Serialize)]
struct HealthModel {
    status: String,
}

#[derive(Serialize)]
struct ErrorModel {
    detail: String,
}

// =============================================================================
// Conversion Functions
// =============================================================================

/// Convert the session to a JSON-serializable GameStateModel
fn game_to_model(game: &Game) -> GameStateModel {
    let board = game.board();
    let palette = board.palette();

    let mut yarns = Vec::new();
    let mut slots = Vec::with_capacity(board.slots().len());
    for slot in board.slots() {
        for (layer, y) in slot.stack().iter().enumerate() {
            yarns.push(YarnModel {
                id: y.id.0,
                color: palette[y.color.0 as usize].clone(),
                slot: slot.id.0,
                layer: layer as u8,
            });
        }
        slots.push(SlotModel {
            id: slot.id.0,
            kind: slot.kind.as_str().to_string(),
            capacity: slot.capacity(),
            target_color: slot
                .target_color()
                .map(|color| palette[color.0 as usize].clone()),
            yarns: slot.stack().iter().map(|y| y.id.0).collect(),
        });
    }

    GameStateModel {
        level: board.level(),
        name: game.level_name().map(str::to_string),
        moves: board.moves(),
        score: board.score(),
        total_score: game.total_score(),
        completed_levels: game.completed_levels(),
        level_count: game.level_count(),
        yarns_left: board.yarns_left(),
        cleared: board.was_cleared(),
        can_undo: board.can_undo(),
        hinted: board.hinted().map(|yarn| yarn.0),
        slots,
        yarns,
    }
}

fn bad_request(detail: String) -> (StatusCode, Json<ErrorModel>) {
    (StatusCode::BAD_REQUEST, Json(ErrorModel { detail }))
}

// =============================================================================
// API Endpoints
// =============================================================================

async fn get_game(State(state): State<AppState>) -> Json<GameStateModel> {
    let session = state.session.lock().unwrap();
    Json(game_to_model(&session))
}

async fn make_move(
    State(state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, (StatusCode, Json<ErrorModel>)> {
    let mut session = state.session.lock().unwrap();

    // Ids outside the level are errors; a known yarn that simply
    // cannot make the move comes back as a rejected outcome instead.
    if usize::from(req.yarn) >= session.board().yarn_count() {
        return Err(bad_request(format!("Unknown yarn id: {}", req.yarn)));
    }
    if session.board().slot(SlotId(req.to)).is_none() {
        return Err(bad_request(format!("Unknown slot id: {}", req.to)));
    }

    let outcome = session.apply_move(YarnId(req.yarn), SlotId(req.to));
    Ok(Json(MoveResponse {
        accepted: outcome.accepted,
        triplets: outcome.triplets,
        level_clear: outcome.cleared.map(|clear| LevelClearModel {
            moves: clear.moves,
            score: clear.score,
            perfect: clear.perfect,
        }),
        state: game_to_model(&session),
    }))
}

async fn undo(
    State(state): State<AppState>,
) -> Result<Json<GameStateModel>, (StatusCode, Json<ErrorModel>)> {
    let mut session = state.session.lock().unwrap();

    if !session.undo() {
        return Err(bad_request("Nothing to undo".to_string()));
    }

    Ok(Json(game_to_model(&session)))
}

async fn hint(State(state): State<AppState>) -> Json<HintResponse> {
    let mut session = state.session.lock().unwrap();
    let hint = session.find_hint().map(|hint| HintModel {
        yarn: hint.yarn.0,
        to: hint.dest.0,
    });
    Json(HintResponse {
        hint,
        state: game_to_model(&session),
    })
}

async fn reset_game(State(state): State<AppState>) -> Json<GameStateModel> {
    let mut session = state.session.lock().unwrap();
    session.reset();
    Json(game_to_model(&session))
}

async fn next_level(State(state): State<AppState>) -> Json<NextResponse> {
    let mut session = state.session.lock().unwrap();
    let all_cleared = matches!(session.next_level(), LoadOutcome::AllCleared { .. });
    Json(NextResponse {
        all_cleared,
        state: game_to_model(&session),
    })
}

async fn health() -> Json<HealthModel> {
    Json(HealthModel {
        status: "ok".to_string(),
    })
}

// =============================================================================
// Main
// =============================================================================

/// Load levels from the first usable level file, falling back to the
/// builtin set.
fn load_levels(explicit: Option<&Path>) -> Vec<Level> {
    let candidates = [
        explicit,
        Some(Path::new("levels.json")),
        Some(Path::new("data/levels.json")),
    ];

    let loaded = candidates.into_iter().flatten().find_map(|path| {
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<LevelSet>(&text) {
                Ok(set) => {
                    info!(path = %path.display(), count = set.levels.len(), "Loaded level file");
                    Some(set.levels)
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Level file did not parse");
                    None
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read level file");
                None
            }
        }
    });

    loaded.unwrap_or_else(|| {
        info!("No level file found, using builtin levels");
        builtin_levels()
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let levels = load_levels(args.levels.as_deref());
    let state: AppState = Arc::new(AppStateInner {
        session: Mutex::new(Game::new(levels)),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/game", get(get_game))
        .route("/move", post(make_move))
        .route("/undo", post(undo))
        .route("/hint", post(hint))
        .route("/reset", post(reset_game))
        .route("/next", post(next_level))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(port = args.port, "Yarn Fever API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
