use crate::api::StoryboardGateway;
use crate::config::StoryboardConfig;
use crate::error::{Result, StoryboardError};
use crate::scene::{AnalysisResult, StoryboardScene};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Cooperative cancellation flag. Checked only between image requests, so a
/// request already in flight always completes or fails before the stop takes
/// effect.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// State transitions emitted during a run, consumed by the presentation
/// layer (the CLI progress logger).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    AnalysisStarted,
    AnalysisCompleted { scene_count: usize },
    SceneStarted { index: usize },
    SceneCompleted { index: usize },
    SceneFailed { index: usize, error: String },
    RunCancelled,
    RunFinished,
}

/// One full script-to-storyboard generation attempt: analysis, then one
/// image request per scene, strictly in order. Owns the scene list and the
/// run-level metadata needed for single-scene regeneration.
pub struct StoryboardRun {
    gateway: Arc<dyn StoryboardGateway>,
    config: StoryboardConfig,
    analysis: Option<AnalysisResult>,
    scenes: Vec<StoryboardScene>,
    generating: bool,
    events: Option<mpsc::UnboundedSender<RunEvent>>,
}

impl StoryboardRun {
    pub fn new(gateway: Arc<dyn StoryboardGateway>, config: StoryboardConfig) -> Self {
        Self {
            gateway,
            config,
            analysis: None,
            scenes: Vec::new(),
            generating: false,
            events: None,
        }
    }

    /// Creates the event stream for this run. Later subscribers replace
    /// earlier ones.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<RunEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    pub fn scenes(&self) -> &[StoryboardScene] {
        &self.scenes
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Runs the two-phase pipeline: one analysis call, then sequential image
    /// synthesis with a cancel check before each request. An analysis
    /// failure aborts the run; an image failure only leaves that scene
    /// without a frame.
    pub async fn generate(&mut self, cancel: &CancelToken) -> Result<()> {
        if self.config.script.trim().is_empty() {
            return Err(StoryboardError::EmptyScript);
        }

        self.generating = true;
        self.scenes.clear();
        self.analysis = None;

        self.emit(RunEvent::AnalysisStarted);
        let analysis = match self.gateway.analyze_script(&self.config).await {
            Ok(result) => result,
            Err(e) => {
                self.generating = false;
                return Err(e);
            }
        };

        self.scenes = analysis
            .scenes
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, descriptor)| StoryboardScene::new(i, descriptor))
            .collect();
        self.analysis = Some(analysis.clone());
        self.emit(RunEvent::AnalysisCompleted {
            scene_count: self.scenes.len(),
        });

        for i in 0..self.scenes.len() {
            if cancel.is_cancelled() {
                self.emit(RunEvent::RunCancelled);
                break;
            }

            self.emit(RunEvent::SceneStarted { index: i });
            let prompt = self.scenes[i].descriptor.video_prompt_en.clone();
            let result = self
                .gateway
                .generate_scene_image(&self.config, &analysis, &prompt)
                .await;
            self.finish_scene(i, result);
        }

        self.generating = false;
        self.emit(RunEvent::RunFinished);
        Ok(())
    }

    /// Re-renders a single scene using the stored run-level metadata. A
    /// no-op without a prior successful analysis. On failure the previous
    /// image is kept and only the generating flag is cleared.
    pub async fn regenerate_scene(&mut self, index: usize) -> Result<bool> {
        let Some(analysis) = self.analysis.clone() else {
            return Ok(false);
        };
        if index >= self.scenes.len() {
            return Err(StoryboardError::SceneIndex(index));
        }

        self.scenes[index].generating = true;
        self.emit(RunEvent::SceneStarted { index });

        let prompt = self.scenes[index].descriptor.video_prompt_en.clone();
        let result = self
            .gateway
            .generate_scene_image(&self.config, &analysis, &prompt)
            .await;
        self.finish_scene(index, result);
        Ok(true)
    }

    fn finish_scene(&mut self, index: usize, result: Result<crate::scene::SceneImage>) {
        match result {
            Ok(image) => {
                let scene = &mut self.scenes[index];
                scene.image = Some(image);
                scene.generating = false;
                self.emit(RunEvent::SceneCompleted { index });
            }
            Err(e) => {
                warn!("Image generation failed for scene {}: {}", index + 1, e);
                self.scenes[index].generating = false;
                self.emit(RunEvent::SceneFailed {
                    index,
                    error: e.to_string(),
                });
            }
        }
    }

    fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
