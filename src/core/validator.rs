//! Validator - the verifying actor's round
//!
//! 1. Discover newly launched tokens
//! 2. Ask every configured producer for a prediction, concurrently
//! 3. Record well-formed predictions in the pending store
//! 4. Once a token matures, score each producer against ground truth
//! 5. Emit `producer -> average accuracy` for weight submission
//!
//! All mutation goes through `&mut self`; rounds are serialized, so the
//! store and score history never see concurrent writers.

use chrono::Utc;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::api::types::{PredictRequest, PredictResponse};
use crate::core::verification::{calculate_accuracy, OutcomeVerifier};
use crate::models::config::RugIntelConfig;
use crate::models::errors::AppResult;
use crate::models::types::{NewToken, PredictionRecord};
use crate::providers::{ProducerClient, ProducerSource};
use crate::storage::PendingStore;

pub struct Validator {
    verifier: OutcomeVerifier,
    producer_client: Arc<dyn ProducerSource>,
    producers: Vec<String>,
    store: PendingStore,
    /// Every accuracy ever computed, per producer
    score_history: HashMap<String, Vec<f64>>,
    discovery_limit: usize,
    /// In-memory store differs from the document on disk
    unsaved: bool,
}

impl Validator {
    pub fn new(
        verifier: OutcomeVerifier,
        producer_client: Arc<dyn ProducerSource>,
        producers: Vec<String>,
        store: PendingStore,
        discovery_limit: usize,
    ) -> Self {
        Self {
            verifier,
            producer_client,
            producers,
            store,
            score_history: HashMap::new(),
            discovery_limit,
            unsaved: false,
        }
    }

    pub fn from_config(config: &RugIntelConfig) -> AppResult<Self> {
        let client = ProducerClient::new(config.producer_timeout, config.producer_api_key.clone())?;
        Ok(Self::new(
            OutcomeVerifier::from_config(config)?,
            Arc::new(client),
            config.producers.clone(),
            PendingStore::load_or_recover(config.pending_path())?,
            config.discovery_limit,
        ))
    }

    pub fn pending(&self) -> &PendingStore {
        &self.store
    }

    pub fn score_history(&self) -> &HashMap<String, Vec<f64>> {
        &self.score_history
    }

    pub fn producers(&self) -> &[String] {
        &self.producers
    }

    /// Discover tokens and record producer predictions; returns how many
    /// predictions were recorded
    pub async fn forward(&mut self) -> AppResult<usize> {
        self.forward_at(Utc::now().timestamp()).await
    }

    pub async fn forward_at(&mut self, now: i64) -> AppResult<usize> {
        if self.producers.is_empty() {
            warn!("No producers configured, skipping discovery");
            return Ok(0);
        }

        let tokens = self
            .verifier
            .discover_new_tokens(self.discovery_limit, now * 1000)
            .await;
        if tokens.is_empty() {
            info!("No new tokens to analyze");
            return Ok(0);
        }

        let mut recorded = 0;
        for token in &tokens {
            info!(token = %token.address, symbol = %token.symbol, "🔍 Requesting predictions");
            let responses = self.query_producers(token).await;

            let mut count = 0;
            for (producer, response) in responses {
                self.store.insert(
                    &token.address,
                    &producer,
                    PredictionRecord {
                        risk_score: response.risk_score,
                        confidence: response.confidence,
                        evidence: response.evidence,
                        time_to_event: response.time_to_event,
                        launch_timestamp: token.timestamp,
                        queried_at: now,
                    },
                );
                count += 1;
            }
            info!(token = %token.address, predictions = count, "📊 Predictions recorded");
            recorded += count;
        }

        if recorded > 0 {
            self.unsaved = true;
        }
        self.persist()?;
        Ok(recorded)
    }

    /// Save the store if it has unsaved changes. A failed save leaves the
    /// changes marked so the next round retries.
    fn persist(&mut self) -> AppResult<()> {
        if !self.unsaved {
            return Ok(());
        }
        self.store.save()?;
        self.unsaved = false;
        Ok(())
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Well-formed responses from every producer, in producer order
    async fn query_producers(&self, token: &NewToken) -> Vec<(String, PredictResponse)> {
        let request = PredictRequest {
            token_address: token.address.clone(),
            launch_timestamp: token.timestamp,
            token_name: (!token.name.is_empty()).then(|| token.name.clone()),
            token_symbol: (!token.symbol.is_empty()).then(|| token.symbol.clone()),
        };

        let calls = self.producers.iter().map(|producer| {
            let request = &request;
            async move {
                (
                    producer,
                    self.producer_client.predict(producer, request).await,
                )
            }
        });

        join_all(calls)
            .await
            .into_iter()
            .filter_map(|(producer, outcome)| match outcome {
                Ok(response) if response.is_well_formed() => Some((producer.clone(), response)),
                Ok(response) => {
                    warn!(
                        producer = %producer,
                        risk_score = response.risk_score,
                        confidence = response.confidence,
                        "Discarding out-of-range prediction"
                    );
                    None
                }
                Err(e) => {
                    warn!(producer = %producer, error = %e, "Producer query failed");
                    None
                }
            })
            .collect()
    }

    /// Verify every matured token; returns average accuracy per producer
    /// for this round
    pub async fn verify_pending(&mut self) -> AppResult<HashMap<String, f64>> {
        self.verify_pending_at(Utc::now().timestamp()).await
    }

    pub async fn verify_pending_at(&mut self, now: i64) -> AppResult<HashMap<String, f64>> {
        let mut round: HashMap<String, Vec<f64>> = HashMap::new();
        let mut verified = Vec::new();

        for token in self.store.tokens() {
            let Some(predictions) = self.store.get(&token) else {
                continue;
            };
            let Some(launch) = predictions.values().next().map(|p| p.launch_timestamp) else {
                continue;
            };

            let Some(outcome) = self.verifier.check_outcome_at(&token, launch, now).await else {
                debug!(token = %token, "Not yet matured");
                continue;
            };

            for (producer, prediction) in predictions {
                let accuracy = calculate_accuracy(
                    prediction.risk_score,
                    outcome.is_rugpull,
                    outcome.liquidity_drained,
                    outcome.funds_moved_to_exchange,
                );
                info!(
                    producer = %producer,
                    token = %token,
                    predicted = prediction.risk_score,
                    rugpull = outcome.is_rugpull,
                    accuracy,
                    "Prediction scored"
                );
                round.entry(producer.clone()).or_default().push(accuracy);
            }
            verified.push(token);
        }

        for (producer, scores) in &round {
            self.score_history
                .entry(producer.clone())
                .or_default()
                .extend(scores);
        }

        if !verified.is_empty() {
            for token in &verified {
                self.store.remove(token);
            }
            self.unsaved = true;
        }
        // Scored predictions are already out of the store, so this round's
        // weights are returned even if the save fails
        if let Err(e) = self.persist() {
            error!(
                code = e.code_str(),
                error = %e,
                path = %self.store.path().display(),
                "Failed to save pending store, will retry next round"
            );
        }

        let averages: HashMap<String, f64> = round
            .into_iter()
            .map(|(producer, scores)| {
                let avg = scores.iter().sum::<f64>() / scores.len() as f64;
                (producer, avg)
            })
            .collect();

        if !averages.is_empty() {
            info!(
                producers = averages.len(),
                tokens = verified.len(),
                "⚖️ Producer weights computed"
            );
        }
        Ok(averages)
    }
}
