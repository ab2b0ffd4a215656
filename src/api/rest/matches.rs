use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::api::rest::json_body;
use crate::engine::matching::{match_candidates, rank_scores, MatchRequest};
use crate::error::AppError;
use crate::models::candidate::{CandidateScore, RankedCandidate};
use crate::models::nurse::Coordinate;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/matches", post(find_matches))
        .route("/rankings", post(rank_supplied_scores))
}

#[derive(Deserialize)]
pub struct RankingRequest {
    pub scores: Vec<CandidateScore>,
    #[serde(default)]
    pub patient_location: Option<Coordinate>,
}

async fn find_matches(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MatchRequest>, JsonRejection>,
) -> Result<Json<Vec<RankedCandidate>>, AppError> {
    let ranked = match_candidates(&state, json_body(payload)?).await?;
    Ok(Json(ranked))
}

async fn rank_supplied_scores(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RankingRequest>, JsonRejection>,
) -> Result<Json<Vec<RankedCandidate>>, AppError> {
    let request = json_body(payload)?;
    let ranked = rank_scores(&state, &request.scores, request.patient_location.as_ref()).await?;
    Ok(Json(ranked))
}
