// libs/chat-cell/src/services/intent.rs
//
// Two-stage intent detection: fixed keyword sets decide the common cases
// deterministically; anything else goes to the zero-shot model, whose
// answer only counts above the configured confidence threshold.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{Intent, IntentClassification, IntentOutcome, ManagementAction};

const KEYWORD_SETS: [(Intent, &[&str]); 6] = [
    (Intent::Help, &["help", "faq", "what can you do", "guide me"]),
    (Intent::Booking, &["book", "appointment", "schedule", "book appointment"]),
    (Intent::Managing, &["manage", "reschedule", "cancel", "change appointment"]),
    (Intent::Location, &["where", "location", "address", "clinic location"]),
    (Intent::Contact, &["contact", "phone", "call", "reach"]),
    (Intent::Services, &["services", "treatments", "available services"]),
];

/// Candidate labels sent to the zero-shot model, with their intent mapping.
const CANDIDATE_LABELS: [(&str, Intent); 6] = [
    ("greeting", Intent::Greeting),
    ("help", Intent::Help),
    ("booking appointment", Intent::Booking),
    ("managing appointment", Intent::Managing),
    ("asking location", Intent::Location),
    ("contact information", Intent::Contact),
];

/// Direct reschedule/cancel wording, checked before any classification.
pub fn parse_management_action(text: &str) -> Option<ManagementAction> {
    let lowercase = text.to_lowercase();
    if lowercase.contains("reschedule") || lowercase.contains("change") {
        return Some(ManagementAction::Reschedule);
    }
    if lowercase.contains("cancel") || lowercase.contains("delete") {
        return Some(ManagementAction::Cancel);
    }
    None
}

pub fn keyword_intent(text: &str) -> Option<Intent> {
    let lowercase = text.to_lowercase();
    let trimmed = lowercase.trim();
    KEYWORD_SETS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| trimmed.contains(p)))
        .map(|(intent, _)| *intent)
}

/// Seam for the remote classifier so deployments can swap the provider and
/// tests can stub it out.
#[async_trait]
pub trait IntentModel: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Option<IntentClassification>, AppError>;
}

/// Zero-shot classification against a BART-MNLI style inference endpoint.
pub struct ZeroShotIntentModel {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
}

impl ZeroShotIntentModel {
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        if !config.is_intent_api_configured() {
            return None;
        }
        Some(Self {
            client: reqwest::Client::new(),
            api_url: config.intent_api_url.clone(),
            api_token: config.intent_api_token.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ZeroShotResponse {
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    scores: Vec<f32>,
}

#[async_trait]
impl IntentModel for ZeroShotIntentModel {
    async fn classify(&self, text: &str) -> Result<Option<IntentClassification>, AppError> {
        debug!("Classifying intent remotely");

        let candidate_labels: Vec<&str> = CANDIDATE_LABELS.iter().map(|(label, _)| *label).collect();
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(&json!({
                "inputs": text,
                "parameters": { "candidate_labels": candidate_labels }
            }))
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::Server { status, message });
        }

        let parsed: ZeroShotResponse = response
            .json()
            .await
            .map_err(|e| AppError::Parse(e.to_string()))?;

        let Some(top_label) = parsed.labels.first() else {
            return Ok(None);
        };
        let confidence = parsed.scores.first().copied().unwrap_or(0.0);

        Ok(CANDIDATE_LABELS
            .iter()
            .find(|(label, _)| *label == top_label.as_str())
            .map(|(_, intent)| IntentClassification {
                intent: *intent,
                confidence,
            }))
    }
}

pub struct IntentClassifier {
    model: Option<Box<dyn IntentModel>>,
    confidence_threshold: f32,
}

impl IntentClassifier {
    pub fn new(model: Option<Box<dyn IntentModel>>, confidence_threshold: f32) -> Self {
        Self {
            model,
            confidence_threshold,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let model = ZeroShotIntentModel::from_config(config)
            .map(|m| Box::new(m) as Box<dyn IntentModel>);
        Self::new(model, config.intent_confidence_threshold)
    }

    pub async fn classify(&self, text: &str) -> IntentOutcome {
        if let Some(intent) = keyword_intent(text) {
            return IntentOutcome::Match(intent);
        }

        let Some(model) = &self.model else {
            return IntentOutcome::Unknown;
        };

        match model.classify(text).await {
            Ok(Some(classification)) => {
                debug!(
                    "Remote intent {:?} with confidence {:.2}",
                    classification.intent, classification.confidence
                );
                if classification.confidence < self.confidence_threshold {
                    IntentOutcome::LowConfidence
                } else {
                    IntentOutcome::Match(classification.intent)
                }
            }
            Ok(None) => IntentOutcome::Unknown,
            Err(e) => {
                warn!("Intent classification failed: {}", e);
                IntentOutcome::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn management_wording_is_deterministic() {
        assert_eq!(
            parse_management_action("I want to reschedule my visit"),
            Some(ManagementAction::Reschedule)
        );
        assert_eq!(
            parse_management_action("please CHANGE the appointment"),
            Some(ManagementAction::Reschedule)
        );
        assert_eq!(
            parse_management_action("cancel it"),
            Some(ManagementAction::Cancel)
        );
        assert_eq!(
            parse_management_action("delete my booking"),
            Some(ManagementAction::Cancel)
        );
        assert_eq!(parse_management_action("hello there"), None);
    }

    #[test]
    fn keyword_sets_match_case_insensitively() {
        assert_eq!(keyword_intent("I'd like to BOOK a visit"), Some(Intent::Booking));
        assert_eq!(keyword_intent("where is the clinic"), Some(Intent::Location));
        assert_eq!(keyword_intent("what treatments do you have"), Some(Intent::Services));
        assert_eq!(keyword_intent("can you call me"), Some(Intent::Contact));
        assert_eq!(keyword_intent("help"), Some(Intent::Help));
        assert_eq!(keyword_intent("blargh"), None);
    }

    #[test]
    fn earlier_keyword_sets_win() {
        // "cancel my appointment" contains both a managing and a booking
        // keyword; help/booking/managing ordering resolves it.
        assert_eq!(keyword_intent("cancel"), Some(Intent::Managing));
        assert_eq!(keyword_intent("appointment"), Some(Intent::Booking));
    }

    #[tokio::test]
    async fn classifier_without_model_is_unknown_for_free_text() {
        let classifier = IntentClassifier::new(None, 0.5);
        assert_eq!(classifier.classify("gibberish input").await, IntentOutcome::Unknown);
        assert_eq!(
            classifier.classify("book me in").await,
            IntentOutcome::Match(Intent::Booking)
        );
    }

    struct FixedModel(f32, Intent);

    #[async_trait]
    impl IntentModel for FixedModel {
        async fn classify(&self, _text: &str) -> Result<Option<IntentClassification>, AppError> {
            Ok(Some(IntentClassification {
                intent: self.1,
                confidence: self.0,
            }))
        }
    }

    #[tokio::test]
    async fn low_confidence_asks_for_a_rephrase() {
        let classifier = IntentClassifier::new(Some(Box::new(FixedModel(0.3, Intent::Booking))), 0.5);
        assert_eq!(classifier.classify("hmm").await, IntentOutcome::LowConfidence);

        let classifier = IntentClassifier::new(Some(Box::new(FixedModel(0.9, Intent::Greeting))), 0.5);
        assert_eq!(
            classifier.classify("hmm").await,
            IntentOutcome::Match(Intent::Greeting)
        );
    }
}
