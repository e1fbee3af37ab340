use crate::error::Result;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One unit of script-to-image mapping produced by script analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDescriptor {
    /// The specific line from the script
    pub script_segment: String,
    /// Cinematic visual prompt in English, fed to the image model
    pub video_prompt_en: String,
    /// Korean direction notes for the production staff
    pub video_prompt_ko: String,
}

/// Parsed output of one script-analysis call. Immutable for the lifetime of
/// a run; kept as the source of truth for later single-scene regeneration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub scenes: Vec<SceneDescriptor>,
    /// Physical description maintained across all frames
    pub character_description: String,
    /// Core artistic keywords applied to every scene image request
    pub global_style_guide: String,
}

impl AnalysisResult {
    /// Caps the scene list when the model over-produces. Fewer scenes than
    /// requested are accepted as-is.
    pub fn truncate_to(&mut self, count: usize) {
        self.scenes.truncate(count);
    }
}

/// A generated scene frame, held as a base64 payload so it can be embedded
/// directly into the HTML report.
#[derive(Debug, Clone)]
pub struct SceneImage {
    pub mime_type: String,
    pub data: String,
}

impl SceneImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Raw image bytes, for the ZIP export.
    pub fn decode(&self) -> Result<Vec<u8>> {
        Ok(base64::engine::general_purpose::STANDARD.decode(&self.data)?)
    }
}

/// One row of the storyboard. Created in bulk right after analysis with the
/// generating flag set; mutated in place once its image arrives or fails.
#[derive(Debug, Clone)]
pub struct StoryboardScene {
    pub id: String,
    pub index: usize,
    pub descriptor: SceneDescriptor,
    pub image: Option<SceneImage>,
    pub generating: bool,
}

impl StoryboardScene {
    pub fn new(index: usize, descriptor: SceneDescriptor) -> Self {
        Self {
            id: format!("sc-{}-{}", index, Uuid::new_v4()),
            index,
            descriptor,
            image: None,
            generating: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(i: usize) -> SceneDescriptor {
        SceneDescriptor {
            script_segment: format!("segment {i}"),
            video_prompt_en: format!("prompt {i}"),
            video_prompt_ko: format!("연출 {i}"),
        }
    }

    #[test]
    fn truncate_caps_over_produced_lists() {
        let mut result = AnalysisResult {
            scenes: (0..5).map(descriptor).collect(),
            character_description: String::new(),
            global_style_guide: String::new(),
        };
        result.truncate_to(3);
        assert_eq!(result.scenes.len(), 3);
        assert_eq!(result.scenes[2].script_segment, "segment 2");
    }

    #[test]
    fn truncate_keeps_short_lists_unchanged() {
        let mut result = AnalysisResult {
            scenes: (0..2).map(descriptor).collect(),
            character_description: String::new(),
            global_style_guide: String::new(),
        };
        result.truncate_to(10);
        assert_eq!(result.scenes.len(), 2);
    }

    #[test]
    fn descriptor_parses_from_schema_field_names() {
        let json = r#"{
            "scriptSegment": "A line",
            "videoPromptEn": "A shot",
            "videoPromptKo": "연출 설명"
        }"#;
        let descriptor: SceneDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.script_segment, "A line");
        assert_eq!(descriptor.video_prompt_ko, "연출 설명");
    }

    #[test]
    fn new_scene_starts_generating_without_image() {
        let scene = StoryboardScene::new(3, descriptor(3));
        assert!(scene.generating);
        assert!(scene.image.is_none());
        assert!(scene.id.starts_with("sc-3-"));
    }

    #[test]
    fn scene_image_round_trips_bytes() {
        use base64::Engine;
        let image = SceneImage {
            mime_type: "image/png".to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(b"png-bytes"),
        };
        assert_eq!(image.decode().unwrap(), b"png-bytes");
        assert!(image.data_url().starts_with("data:image/png;base64,"));
    }
}
