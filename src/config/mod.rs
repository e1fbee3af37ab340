use crate::error::Result;
use base64::Engine;
use clap::ValueEnum;
use std::path::Path;

/// Minimum scenes requested from the model, regardless of script length.
pub const MIN_SCENES: usize = 2;
/// Hard cap on generated images per run.
pub const MAX_SCENES: usize = 50;

/// Narration pace used to estimate the script's runtime.
const CHARS_PER_MINUTE: f64 = 450.0;

/// Screen ratios supported by the image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AspectRatio {
    /// Shorts / vertical video
    #[value(name = "9:16")]
    NineSixteen,
    /// Long-form video
    #[value(name = "16:9")]
    SixteenNine,
    /// Social feed
    #[value(name = "3:4")]
    ThreeFour,
    /// Classic TV
    #[value(name = "4:3")]
    FourThree,
    /// Square
    #[value(name = "1:1")]
    OneOne,
}

impl AspectRatio {
    /// Wire form expected by the image API.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::NineSixteen => "9:16",
            AspectRatio::SixteenNine => "16:9",
            AspectRatio::ThreeFour => "3:4",
            AspectRatio::FourThree => "4:3",
            AspectRatio::OneOne => "1:1",
        }
    }
}

/// Qualitative scene-count setting used when no explicit count is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SceneDensity {
    /// Long-form pacing, roughly 2 scenes per minute
    Essential,
    /// Balanced, based on script length (3-4 scenes per 1000 characters)
    Standard,
    /// Short-form pacing, 12-15 cuts per minute
    Detailed,
}

/// A style or character reference image, held as a base64 payload so it can
/// be attached inline to generation requests.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub mime_type: String,
    pub data: String,
}

impl ReferenceImage {
    pub async fn from_file(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let mime_type = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            _ => "image/jpeg",
        };
        let data = base64::engine::general_purpose::STANDARD.encode(&bytes);
        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// User-entered settings for one storyboard generation run.
#[derive(Debug, Clone)]
pub struct StoryboardConfig {
    /// Base art style, free text or a preset name
    pub style: String,
    pub aspect_ratio: AspectRatio,
    pub density: SceneDensity,
    /// Explicit scene count; 0 means derive from script length and density
    pub target_scene_count: u32,
    pub script: String,
    /// Main character description used for continuity across frames
    pub main_character: String,
    pub style_image: Option<ReferenceImage>,
    pub character_image: Option<ReferenceImage>,
}

impl StoryboardConfig {
    /// How many scenes to request from the analysis call.
    ///
    /// An explicit non-zero target wins over the density formula; the result
    /// is always clamped to [MIN_SCENES, MAX_SCENES].
    pub fn resolved_scene_count(&self) -> usize {
        let chars = self.script.chars().count() as f64;
        let minutes = (chars / CHARS_PER_MINUTE).max(0.5);

        let base = if self.target_scene_count > 0 {
            self.target_scene_count as f64
        } else {
            match self.density {
                SceneDensity::Essential => (minutes * 2.0).ceil().max(2.0),
                SceneDensity::Detailed => (minutes * 15.0).ceil(),
                SceneDensity::Standard => ((chars / 1000.0) * 4.0).ceil().max(2.0),
            }
        };

        (base.round() as i64).clamp(MIN_SCENES as i64, MAX_SCENES as i64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(script: String, density: SceneDensity, target: u32) -> StoryboardConfig {
        StoryboardConfig {
            style: "Cinematic live action".to_string(),
            aspect_ratio: AspectRatio::NineSixteen,
            density,
            target_scene_count: target,
            script,
            main_character: String::new(),
            style_image: None,
            character_image: None,
        }
    }

    #[test]
    fn standard_density_follows_script_length() {
        // 4500 chars -> ceil(4.5 * 4) = 18
        let cfg = config("a".repeat(4500), SceneDensity::Standard, 0);
        assert_eq!(cfg.resolved_scene_count(), 18);
    }

    #[test]
    fn essential_density_short_script_hits_floor() {
        // 100 chars -> 0.5 minutes -> max(2, ceil(1.0)) = 2
        let cfg = config("a".repeat(100), SceneDensity::Essential, 0);
        assert_eq!(cfg.resolved_scene_count(), 2);
    }

    #[test]
    fn essential_density_long_script() {
        // 4500 chars -> 10 minutes -> 20 scenes
        let cfg = config("a".repeat(4500), SceneDensity::Essential, 0);
        assert_eq!(cfg.resolved_scene_count(), 20);
    }

    #[test]
    fn detailed_density_short_script() {
        // 100 chars -> 0.5 minutes -> ceil(7.5) = 8
        let cfg = config("a".repeat(100), SceneDensity::Detailed, 0);
        assert_eq!(cfg.resolved_scene_count(), 8);
    }

    #[test]
    fn detailed_density_is_capped() {
        // 45000 chars -> 100 minutes -> 1500 before the clamp
        let cfg = config("a".repeat(45_000), SceneDensity::Detailed, 0);
        assert_eq!(cfg.resolved_scene_count(), MAX_SCENES);
    }

    #[test]
    fn explicit_count_overrides_density() {
        for density in [
            SceneDensity::Essential,
            SceneDensity::Standard,
            SceneDensity::Detailed,
        ] {
            let cfg = config("a".repeat(10_000), density, 7);
            assert_eq!(cfg.resolved_scene_count(), 7);
        }
    }

    #[test]
    fn explicit_count_is_clamped() {
        let cfg = config("a".repeat(100), SceneDensity::Standard, 75);
        assert_eq!(cfg.resolved_scene_count(), 50);

        let cfg = config("a".repeat(100), SceneDensity::Standard, 1);
        assert_eq!(cfg.resolved_scene_count(), 2);
    }

    #[test]
    fn count_stays_in_range_for_any_length() {
        for chars in [0usize, 1, 50, 449, 450, 1000, 9999, 100_000] {
            for density in [
                SceneDensity::Essential,
                SceneDensity::Standard,
                SceneDensity::Detailed,
            ] {
                let count = config("a".repeat(chars), density, 0).resolved_scene_count();
                assert!(
                    (MIN_SCENES..=MAX_SCENES).contains(&count),
                    "{chars} chars / {density:?} resolved to {count}"
                );
            }
        }
    }

    #[test]
    fn scene_count_uses_characters_not_bytes() {
        // Multibyte script text must be measured in characters.
        let cfg = config("한".repeat(4500), SceneDensity::Standard, 0);
        assert_eq!(cfg.resolved_scene_count(), 18);
    }

    #[test]
    fn reference_image_data_url() {
        let image = ReferenceImage {
            mime_type: "image/png".to_string(),
            data: "QUJD".to_string(),
        };
        assert_eq!(image.data_url(), "data:image/png;base64,QUJD");
    }
}
