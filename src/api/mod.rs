mod gemini;

use crate::config::StoryboardConfig;
use crate::error::Result;
use crate::scene::{AnalysisResult, SceneImage};
use async_trait::async_trait;

pub use gemini::GeminiClient;

/// Boundary to the hosted generative service. Orchestration only talks to
/// this trait, so tests can drive a run against a scripted gateway.
#[async_trait]
pub trait StoryboardGateway: Send + Sync {
    /// Split the script into an ordered list of scene descriptors plus
    /// run-level style and character metadata. A failure here aborts the
    /// whole run; no retry is performed.
    async fn analyze_script(&self, config: &StoryboardConfig) -> Result<AnalysisResult>;

    /// Render one scene frame from its English prompt and the run-level
    /// metadata. A failure here is per-scene, not fatal to the run.
    async fn generate_scene_image(
        &self,
        config: &StoryboardConfig,
        analysis: &AnalysisResult,
        prompt: &str,
    ) -> Result<SceneImage>;
}
