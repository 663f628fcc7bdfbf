pub mod insights;
pub mod roast;

use std::sync::Arc;

use crate::services::gemini::GeminiClient;
use crate::services::roaster::RoastOrchestrator;

pub struct AppState {
    pub orchestrator: Arc<RoastOrchestrator>,
    pub gemini: Arc<GeminiClient>,
    /// Plain client for the insights endpoint, which does its own
    /// GitHub fetches instead of going through the roast tooling.
    pub insights_http: reqwest::Client,
}
