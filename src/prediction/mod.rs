use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::candidate::CandidateScore;
use crate::models::patient::Intake;

/// Compatibility prediction service. The returned order is only a hint.
#[async_trait]
pub trait PredictionClient: Send + Sync {
    async fn predict(&self, intake: &Intake) -> Result<Vec<CandidateScore>, AppError>;
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    top_nurses: Vec<TopNurse>,
}

#[derive(Debug, Deserialize)]
struct TopNurse {
    nurse_id: Uuid,
    probability: f64,
}

pub struct HttpPredictionClient {
    client: reqwest::Client,
    predict_url: String,
}

impl HttpPredictionClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| {
                AppError::Internal(format!("failed to build prediction client: {err}"))
            })?;

        Ok(Self {
            client,
            predict_url: format!("{}/predict", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl PredictionClient for HttpPredictionClient {
    async fn predict(&self, intake: &Intake) -> Result<Vec<CandidateScore>, AppError> {
        debug!(url = %self.predict_url, disease = %intake.disease, "requesting prediction");

        let response = self
            .client
            .post(&self.predict_url)
            .json(intake)
            .send()
            .await
            .map_err(|err| {
                warn!(error = %err, "prediction request failed");
                AppError::Upstream(format!("prediction service unreachable: {err}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "prediction service returned {status}"
            )));
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|err| AppError::Upstream(format!("malformed prediction response: {err}")))?;

        into_scores(body)
    }
}

fn into_scores(body: PredictResponse) -> Result<Vec<CandidateScore>, AppError> {
    body.top_nurses
        .into_iter()
        .map(|nurse| {
            if !(0.0..=1.0).contains(&nurse.probability) {
                return Err(AppError::Upstream(format!(
                    "probability {} for nurse {} is outside [0, 1]",
                    nurse.probability, nurse.nurse_id
                )));
            }
            Ok(CandidateScore {
                nurse_id: nurse.nurse_id,
                probability: nurse.probability,
            })
        })
        .collect()
}
