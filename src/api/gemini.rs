use crate::api::StoryboardGateway;
use crate::config::{ReferenceImage, StoryboardConfig};
use crate::error::{Result, StoryboardError};
use crate::scene::{AnalysisResult, SceneImage};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const TEXT_MODEL: &str = "gemini-3-flash-preview";
const IMAGE_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self { api_key, client }
    }

    async fn post_generate(&self, model: &str, body: &Value) -> Result<GenerateContentResponse> {
        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(StoryboardError::ApiError(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl StoryboardGateway for GeminiClient {
    async fn analyze_script(&self, config: &StoryboardConfig) -> Result<AnalysisResult> {
        let target = config.resolved_scene_count();
        info!("Analyzing script into {} scenes using Gemini...", target);

        let mut parts = vec![json!({ "text": director_prompt(config, target) })];
        push_reference_parts(&mut parts, config);

        let request_body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": analysis_schema(),
            }
        });

        let response = self.post_generate(TEXT_MODEL, &request_body).await?;
        let text = first_text_part(&response).ok_or_else(|| {
            StoryboardError::ApiError("No text in analysis response".to_string())
        })?;

        let result = parse_analysis(&text, target)?;
        info!("Script analysis produced {} scenes", result.scenes.len());
        Ok(result)
    }

    async fn generate_scene_image(
        &self,
        config: &StoryboardConfig,
        analysis: &AnalysisResult,
        prompt: &str,
    ) -> Result<SceneImage> {
        let instruction = format!(
            "High-end video storyboard frame. Style: {}. Scene: {}. Consistent Character: {}. \
             Professional cinematic lighting, detailed textures, masterwork quality.",
            analysis.global_style_guide, prompt, analysis.character_description
        );

        let mut parts = vec![json!({ "text": instruction })];
        push_reference_parts(&mut parts, config);

        let request_body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"],
                "imageConfig": { "aspectRatio": config.aspect_ratio.as_str() }
            }
        });

        let response = self.post_generate(IMAGE_MODEL, &request_body).await?;
        first_inline_image(response).ok_or(StoryboardError::NoImage)
    }
}

/// Instruction block for the analysis call. The exact scene count is stated
/// twice; the model still over- or under-produces occasionally, so the parsed
/// list is truncated afterwards.
fn director_prompt(config: &StoryboardConfig, target: usize) -> String {
    let character = if config.main_character.trim().is_empty() {
        "the protagonist"
    } else {
        config.main_character.as_str()
    };

    format!(
        r#"# ROLE: Master Visual Director & Storyboard Artist
# TASK: Split the provided script into EXACTLY {target} distinct visual scenes.
# DIRECTING STYLE:
- Base Art Style: {style}
- Screen Ratio: {ratio}
- Character Continuity: Maintain features for "{character}".

# CONSTRAINTS:
- You must distribute the script evenly across exactly {target} scenes.
- Each scene must have a unique, vivid cinematic description.
- provide "videoPromptEn" (English) for the image AI.
- provide "videoPromptKo" (Korean) for the production staff.

# SCRIPT:
{script}

# OUTPUT SCHEMA (JSON):
{{
  "scenes": [
    {{
      "scriptSegment": "The specific line from the script",
      "videoPromptEn": "Detailed cinematic visual prompt in English",
      "videoPromptKo": "한글 연출 및 구도 설명"
    }}
  ],
  "characterDescription": "Concise physical description to maintain character consistency",
  "globalStyleGuide": "Core artistic keywords to maintain the {style} look across all frames"
}}"#,
        target = target,
        style = config.style,
        ratio = config.aspect_ratio.as_str(),
        character = character,
        script = config.script,
    )
}

/// Structured-output schema for the analysis response.
fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "scenes": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "scriptSegment": { "type": "STRING" },
                        "videoPromptEn": { "type": "STRING" },
                        "videoPromptKo": { "type": "STRING" }
                    },
                    "required": ["scriptSegment", "videoPromptEn", "videoPromptKo"]
                }
            },
            "characterDescription": { "type": "STRING" },
            "globalStyleGuide": { "type": "STRING" }
        },
        "required": ["scenes", "characterDescription", "globalStyleGuide"]
    })
}

fn push_reference_parts(parts: &mut Vec<Value>, config: &StoryboardConfig) {
    if let Some(image) = &config.style_image {
        parts.push(inline_image_part(image));
    }
    if let Some(image) = &config.character_image {
        parts.push(inline_image_part(image));
    }
}

fn inline_image_part(image: &ReferenceImage) -> Value {
    json!({
        "inlineData": {
            "mimeType": image.mime_type,
            "data": image.data,
        }
    })
}

fn first_text_part(response: &GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .first()?
        .content
        .as_ref()?
        .parts
        .iter()
        .find_map(|part| part.text.clone())
}

fn first_inline_image(response: GenerateContentResponse) -> Option<SceneImage> {
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .find_map(|part| part.inline_data)
        .map(|inline| SceneImage {
            mime_type: inline.mime_type,
            data: inline.data,
        })
}

/// Parses the analysis JSON, stripping the markdown fences the model
/// sometimes wraps around structured output, and caps the scene list at the
/// requested count.
fn parse_analysis(text: &str, target: usize) -> Result<AnalysisResult> {
    let json_text = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let mut result: AnalysisResult = serde_json::from_str(json_text)
        .map_err(|e| StoryboardError::ApiError(format!("Failed to parse analysis JSON: {}", e)))?;

    result.truncate_to(target);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AspectRatio, SceneDensity};

    fn scene_json(i: usize) -> String {
        format!(
            r#"{{"scriptSegment":"line {i}","videoPromptEn":"shot {i}","videoPromptKo":"연출 {i}"}}"#
        )
    }

    fn analysis_json(scene_count: usize) -> String {
        let scenes: Vec<String> = (0..scene_count).map(scene_json).collect();
        format!(
            r#"{{"scenes":[{}],"characterDescription":"tall, red coat","globalStyleGuide":"noir, rain"}}"#,
            scenes.join(",")
        )
    }

    #[test]
    fn parse_analysis_truncates_over_production() {
        let result = parse_analysis(&analysis_json(8), 5).unwrap();
        assert_eq!(result.scenes.len(), 5);
        assert_eq!(result.scenes[4].script_segment, "line 4");
        assert_eq!(result.global_style_guide, "noir, rain");
    }

    #[test]
    fn parse_analysis_accepts_under_production() {
        let result = parse_analysis(&analysis_json(3), 10).unwrap();
        assert_eq!(result.scenes.len(), 3);
    }

    #[test]
    fn parse_analysis_strips_markdown_fences() {
        let fenced = format!("```json\n{}\n```", analysis_json(2));
        let result = parse_analysis(&fenced, 2).unwrap();
        assert_eq!(result.scenes.len(), 2);
    }

    #[test]
    fn parse_analysis_rejects_malformed_json() {
        let err = parse_analysis("not json at all", 5).unwrap_err();
        assert!(matches!(err, StoryboardError::ApiError(_)));
    }

    #[test]
    fn director_prompt_states_exact_count() {
        let config = StoryboardConfig {
            style: "Ghibli".to_string(),
            aspect_ratio: AspectRatio::SixteenNine,
            density: SceneDensity::Standard,
            target_scene_count: 0,
            script: "Once upon a time".to_string(),
            main_character: String::new(),
            style_image: None,
            character_image: None,
        };
        let prompt = director_prompt(&config, 18);
        assert!(prompt.contains("EXACTLY 18 distinct visual scenes"));
        assert!(prompt.contains("Base Art Style: Ghibli"));
        assert!(prompt.contains("Screen Ratio: 16:9"));
        assert!(prompt.contains(r#"Maintain features for "the protagonist""#));
    }

    #[test]
    fn reference_parts_follow_the_text_part() {
        let image = ReferenceImage {
            mime_type: "image/jpeg".to_string(),
            data: "QUJD".to_string(),
        };
        let config = StoryboardConfig {
            style: String::new(),
            aspect_ratio: AspectRatio::OneOne,
            density: SceneDensity::Standard,
            target_scene_count: 0,
            script: String::new(),
            main_character: String::new(),
            style_image: Some(image.clone()),
            character_image: Some(image),
        };

        let mut parts = vec![json!({ "text": "instruction" })];
        push_reference_parts(&mut parts, &config);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[2]["inlineData"]["data"], "QUJD");
    }

    #[test]
    fn first_inline_image_skips_text_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Here is your frame" },
                        { "inlineData": { "mimeType": "image/png", "data": "QUJD" } }
                    ]
                }
            }]
        }))
        .unwrap();

        let image = first_inline_image(response).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "QUJD");
    }

    #[test]
    fn missing_image_payload_is_detected() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "refused" }] } }]
        }))
        .unwrap();
        assert!(first_inline_image(response).is_none());
    }
}
