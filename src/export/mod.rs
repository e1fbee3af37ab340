use crate::error::Result;
use crate::scene::StoryboardScene;
use std::io::{Cursor, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use zip::write::FileOptions;
use zip::ZipWriter;

/// Archive entry name for a scene, 1-based and zero-padded to two digits.
pub fn scene_file_name(index: usize) -> String {
    format!("scene_{:02}.png", index + 1)
}

/// Plain-text script transcript, one block per scene.
pub fn script_text(scenes: &[StoryboardScene]) -> String {
    scenes
        .iter()
        .map(|s| format!("[장면 {}]\n{}", s.index + 1, s.descriptor.script_segment))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Plain-text direction notes with the Korean guide and the English prompt.
pub fn direction_notes(scenes: &[StoryboardScene]) -> String {
    scenes
        .iter()
        .map(|s| {
            format!(
                "[장면 {} 연출 안내]\n한글: {}\n영문: {}",
                s.index + 1,
                s.descriptor.video_prompt_ko,
                s.descriptor.video_prompt_en
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// In-memory ZIP of all generated frames. Scenes without an image are
/// skipped rather than padded with placeholders.
pub fn image_archive(scenes: &[StoryboardScene]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for scene in scenes {
        if let Some(image) = &scene.image {
            zip.start_file(scene_file_name(scene.index), options)?;
            zip.write_all(&image.decode()?)?;
        }
    }

    Ok(zip.finish()?.into_inner())
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const REPORT_HEAD: &str = r#"<!DOCTYPE html>
<html lang="ko">
<head>
    <meta charset="UTF-8">
    <title>Storyboard Report</title>
    <script src="https://cdnjs.cloudflare.com/ajax/libs/jszip/3.10.1/jszip.min.js"></script>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; background: #f0f2f5; padding: 40px; color: #1a1a1a; margin: 0; }
        .container { max-width: 1400px; margin: 0 auto; }
        .header { text-align: center; margin-bottom: 40px; background: white; padding: 30px; border-radius: 20px; }
        .header h1 { font-weight: 900; font-size: 28px; color: #000; margin: 0; }
        .header p { color: #666; font-size: 11px; margin-top: 8px; font-weight: 800; letter-spacing: 2px; }
        .toolbar { display: flex; justify-content: center; margin-bottom: 30px; }
        .btn-download { background: #2563eb; color: white; border: none; padding: 12px 24px; border-radius: 12px; font-weight: 800; cursor: pointer; font-size: 14px; }
        .btn-download:hover { background: #1d4ed8; }
        .board-table { width: 100%; border-collapse: separate; border-spacing: 0 15px; table-layout: fixed; }
        .board-table th { padding: 15px; text-align: left; font-size: 11px; color: #888; text-transform: uppercase; font-weight: 900; border-bottom: 2px solid #ddd; }
        .col-no { width: 60px; }
        .col-img { width: 420px; }
        .scene-row { background: white; border-radius: 15px; }
        .scene-row td { padding: 25px; vertical-align: top; border-top: 1px solid #f0f0f0; border-bottom: 1px solid #f0f0f0; word-break: keep-all; }
        .no-cell { font-weight: 900; color: #2563eb; font-size: 24px; text-align: center; }
        .img-cell img { width: 100%; border-radius: 12px; border: 1px solid #eee; display: block; }
        .img-missing { width: 100%; padding: 60px 0; text-align: center; background: #f8fafc; border-radius: 12px; color: #aaa; font-weight: 800; }
        .script-cell { font-weight: 700; font-size: 16px; line-height: 1.6; color: #111; }
        .meta-label { font-size: 10px; font-weight: 900; color: #2563eb; text-transform: uppercase; display: block; margin-bottom: 8px; }
        .meta-text-ko { font-size: 14px; color: #333; font-weight: 700; margin-bottom: 15px; line-height: 1.5; }
        .meta-text-en { font-size: 12px; color: #777; font-style: italic; background: #f8fafc; padding: 12px; border-radius: 8px; line-height: 1.4; }
        @media print { .toolbar { display: none; } body { background: white; padding: 0; } }
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>STORYBOARD PROJECT REPORT</h1>
            <p>AI-GENERATED VISUAL SEQUENCE</p>
        </div>
        <div class="toolbar">
            <button class="btn-download" onclick="downloadAllImages()">이미지 전체 다운로드 (ZIP)</button>
        </div>
        <table class="board-table">
            <colgroup>
                <col class="col-no">
                <col class="col-img">
                <col>
                <col>
            </colgroup>
            <thead>
                <tr>
                    <th>NO</th>
                    <th>VISUAL</th>
                    <th>SCRIPT</th>
                    <th>PRODUCTION DETAIL</th>
                </tr>
            </thead>
            <tbody>
"#;

const REPORT_TAIL: &str = r#"            </tbody>
        </table>
    </div>
    <script>
        async function downloadAllImages() {
            const zip = new JSZip();
            const images = document.querySelectorAll('.img-cell img');
            for (let i = 0; i < images.length; i++) {
                const base64Data = images[i].src.split(',')[1];
                zip.file(`scene_${String(i + 1).padStart(2, '0')}.png`, base64Data, { base64: true });
            }
            const content = await zip.generateAsync({ type: "blob" });
            const link = document.createElement('a');
            link.href = URL.createObjectURL(content);
            link.download = `storyboard_images_${Date.now()}.zip`;
            link.click();
        }
    </script>
</body>
</html>
"#;

/// Self-contained HTML report: every frame embedded as a data URI, scene
/// text alongside, and a client-side script that re-bundles the embedded
/// images into a ZIP from inside the report itself.
pub fn html_report(scenes: &[StoryboardScene]) -> String {
    let mut html = String::from(REPORT_HEAD);

    for scene in scenes {
        let visual = match &scene.image {
            Some(image) => format!(
                r#"<img src="{}" alt="Scene {}">"#,
                image.data_url(),
                scene.index + 1
            ),
            None => r#"<div class="img-missing">NO IMAGE</div>"#.to_string(),
        };
        html.push_str(&format!(
            r#"                <tr class="scene-row">
                    <td class="no-cell">{no}</td>
                    <td class="img-cell">{visual}</td>
                    <td class="script-cell">{segment}</td>
                    <td>
                        <span class="meta-label">연출 가이드 (KOR)</span>
                        <div class="meta-text-ko">{ko}</div>
                        <span class="meta-label">PROMPT METADATA (EN)</span>
                        <div class="meta-text-en">{en}</div>
                    </td>
                </tr>
"#,
            no = scene.index + 1,
            visual = visual,
            segment = escape_html(&scene.descriptor.script_segment),
            ko = escape_html(&scene.descriptor.video_prompt_ko),
            en = escape_html(&scene.descriptor.video_prompt_en),
        ));
    }

    html.push_str(REPORT_TAIL);
    html
}

/// Writes all four export artifacts into the output directory with an
/// epoch-seconds timestamp in each file name.
pub async fn write_all(out_dir: &Path, scenes: &[StoryboardScene]) -> Result<()> {
    tokio::fs::create_dir_all(out_dir).await?;

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let archive = image_archive(scenes)?;
    tokio::fs::write(
        out_dir.join(format!("storyboard_images_{}.zip", timestamp)),
        archive,
    )
    .await?;
    tokio::fs::write(
        out_dir.join(format!("script_{}.txt", timestamp)),
        script_text(scenes),
    )
    .await?;
    tokio::fs::write(
        out_dir.join(format!("descriptions_{}.txt", timestamp)),
        direction_notes(scenes),
    )
    .await?;
    tokio::fs::write(
        out_dir.join(format!("storyboard_report_{}.html", timestamp)),
        html_report(scenes),
    )
    .await?;

    info!("Exports written to {}", out_dir.display());
    Ok(())
}
