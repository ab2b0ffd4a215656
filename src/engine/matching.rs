use std::collections::HashMap;
use std::time::Instant;

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::ranking::rank;
use crate::error::AppError;
use crate::models::candidate::{CandidateScore, RankedCandidate};
use crate::models::nurse::Coordinate;
use crate::models::patient::Intake;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub intake: Intake,
    #[serde(default)]
    pub patient_location: Option<Coordinate>,
    #[serde(default)]
    pub available_only: bool,
}

/// Intake to shortlist. A failing prediction service yields `Upstream`
/// and never touches booking state.
pub async fn match_candidates(
    state: &AppState,
    request: MatchRequest,
) -> Result<Vec<RankedCandidate>, AppError> {
    let start = Instant::now();

    let scores = match state.predictor.predict(&request.intake).await {
        Ok(scores) => scores,
        Err(err) => {
            state.metrics.prediction_failures_total.inc();
            observe(state, start, "unavailable");
            warn!(error = %err, "prediction unavailable; ranking skipped");
            return Err(err);
        }
    };

    let mut ranked = rank_scores_inner(state, &scores, request.patient_location.as_ref()).await;
    if let Ok(candidates) = ranked.as_mut() {
        if request.available_only {
            candidates.retain(|candidate| candidate.nurse.available);
        }
    }

    finish(state, start, ranked)
}

/// Ranks caller-supplied scores against the directory.
pub async fn rank_scores(
    state: &AppState,
    scores: &[CandidateScore],
    patient: Option<&Coordinate>,
) -> Result<Vec<RankedCandidate>, AppError> {
    let start = Instant::now();

    if let Some(bad) = scores
        .iter()
        .find(|score| !(0.0..=1.0).contains(&score.probability))
    {
        observe(state, start, "ValidationError");
        return Err(AppError::Validation(format!(
            "probability {} for nurse {} is outside [0, 1]",
            bad.probability, bad.nurse_id
        )));
    }

    let ranked = rank_scores_inner(state, scores, patient).await;
    finish(state, start, ranked)
}

async fn rank_scores_inner(
    state: &AppState,
    scores: &[CandidateScore],
    patient: Option<&Coordinate>,
) -> Result<Vec<RankedCandidate>, AppError> {
    if scores.is_empty() {
        return Ok(Vec::new());
    }

    let mut ids: Vec<Uuid> = scores.iter().map(|score| score.nurse_id).collect();
    ids.sort();
    ids.dedup();

    let profiles: HashMap<Uuid, _> = state
        .directory
        .resolve(&ids)
        .await?
        .into_iter()
        .map(|nurse| (nurse.id, nurse))
        .collect();

    Ok(rank(scores, &profiles, patient))
}

fn finish(
    state: &AppState,
    start: Instant,
    ranked: Result<Vec<RankedCandidate>, AppError>,
) -> Result<Vec<RankedCandidate>, AppError> {
    match &ranked {
        Ok(candidates) if candidates.is_empty() => {
            observe(state, start, "no_match");
            info!("no candidates matched");
        }
        Ok(candidates) => {
            observe(state, start, "success");
            info!(
                candidates = candidates.len(),
                top_nurse_id = %candidates[0].nurse_id,
                "candidates ranked"
            );
        }
        Err(err) => {
            observe(state, start, err.kind());
            warn!(error = %err, "ranking failed");
        }
    }
    ranked
}

fn observe(state: &AppState, start: Instant, outcome: &str) {
    state
        .metrics
        .ranking_latency_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .ranking_requests_total
        .with_label_values(&[outcome])
        .inc();
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::{match_candidates, rank_scores, MatchRequest};
    use crate::config::Config;
    use crate::directory::{InMemoryNurseDirectory, NewNurse, NurseDirectory};
    use crate::error::AppError;
    use crate::models::candidate::CandidateScore;
    use crate::models::nurse::{Coordinate, Gender, Location, NurseProfile};
    use crate::models::patient::{Intake, Language};
    use crate::prediction::PredictionClient;
    use crate::state::AppState;

    struct FixedScores(Vec<CandidateScore>);

    #[async_trait]
    impl PredictionClient for FixedScores {
        async fn predict(&self, _intake: &Intake) -> Result<Vec<CandidateScore>, AppError> {
            Ok(self.0.clone())
        }
    }

    struct Offline;

    #[async_trait]
    impl PredictionClient for Offline {
        async fn predict(&self, _intake: &Intake) -> Result<Vec<CandidateScore>, AppError> {
            Err(AppError::Upstream("connection refused".to_string()))
        }
    }

    struct BrokenDirectory;

    #[async_trait]
    impl NurseDirectory for BrokenDirectory {
        async fn resolve(&self, _ids: &[Uuid]) -> Result<Vec<NurseProfile>, AppError> {
            Err(AppError::Upstream("directory timed out".to_string()))
        }
    }

    fn intake() -> Intake {
        Intake {
            disease: "Diabetes".to_string(),
            duration_months: 6,
            symptoms: vec!["fatigue".to_string(), "frequent urination".to_string()],
            pain_level: 3,
            prior_diagnosis: true,
            comorbidity: None,
            preferred_language: Language::Hindi,
        }
    }

    fn add_nurse(state: &AppState, n: u32, lat: f64, lng: f64, available: bool) -> Uuid {
        state
            .nurses
            .add(NewNurse {
                name: format!("nurse {n}"),
                specialization: "Diabetes Care".to_string(),
                experience_years: n,
                language: "Hindi".to_string(),
                gender: Gender::Other,
                phone: format!("+91-{n:010}"),
                email: format!("nurse{n}@example.com"),
                available,
                location: Location {
                    coordinate: Coordinate { lat, lng },
                    address: "Mumbai".to_string(),
                },
            })
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn prediction_outage_is_upstream_failure() {
        let state = AppState::new(&Config::default(), Arc::new(Offline)).unwrap();
        let err = match_candidates(
            &state,
            MatchRequest {
                intake: intake(),
                patient_location: None,
                available_only: false,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Upstream(_)));
        assert_eq!(state.metrics.prediction_failures_total.get(), 1);
    }

    #[tokio::test]
    async fn available_only_filters_after_ranking() {
        let state = AppState::new(&Config::default(), Arc::new(FixedScores(Vec::new()))).unwrap();
        let on_duty = add_nurse(&state, 1, 19.10, 72.90, true);
        let off_duty = add_nurse(&state, 2, 19.05, 72.85, false);
        let scores = vec![
            CandidateScore {
                nurse_id: on_duty,
                probability: 0.4,
            },
            CandidateScore {
                nurse_id: off_duty,
                probability: 0.9,
            },
        ];
        let state = AppState {
            predictor: Arc::new(FixedScores(scores)),
            ..state
        };

        let everyone = match_candidates(
            &state,
            MatchRequest {
                intake: intake(),
                patient_location: None,
                available_only: false,
            },
        )
        .await
        .unwrap();
        assert_eq!(everyone.len(), 2);
        assert_eq!(everyone[0].nurse_id, off_duty);

        let available = match_candidates(
            &state,
            MatchRequest {
                intake: intake(),
                patient_location: None,
                available_only: true,
            },
        )
        .await
        .unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].nurse_id, on_duty);
    }

    #[tokio::test]
    async fn directory_outage_surfaces_as_upstream_failure() {
        let config = Config::default();
        let state = AppState::with_directory(
            &config,
            Arc::new(FixedScores(Vec::new())),
            Arc::new(InMemoryNurseDirectory::new()),
            Arc::new(BrokenDirectory),
        )
        .unwrap();
        let scores = [CandidateScore {
            nurse_id: Uuid::new_v4(),
            probability: 0.5,
        }];

        let err = rank_scores(&state, &scores, None).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn rejects_probability_out_of_range() {
        let state = AppState::new(&Config::default(), Arc::new(Offline)).unwrap();
        let scores = [CandidateScore {
            nurse_id: Uuid::new_v4(),
            probability: f64::NAN,
        }];

        let err = rank_scores(&state, &scores, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
