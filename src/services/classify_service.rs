use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;
use crate::models::drive_item::DriveFile;
use crate::models::preferences::Preferences;
use crate::models::proposal::FileMove;

const PROVIDER: &str = "openai";
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 2000;
const MAX_DETAILED_FILES: usize = 50;
/// Listings above this size are down-sampled by MIME group before the
/// model call.
pub const MAX_CLASSIFIER_FILES: usize = 4000;

const SYSTEM_PROMPT: &str = "You are an expert file organization assistant. Your task is to \
analyze file metadata and propose a logical folder structure that groups related files together.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedFolder {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Classifier output: a target folder set plus file-move intents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierOutput {
    #[serde(default)]
    pub proposed_folders: Vec<ProposedFolder>,
    #[serde(default)]
    pub file_moves: Vec<FileMove>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        files: &[DriveFile],
        preferences: &Preferences,
    ) -> Result<ClassifierOutput, AppError>;
}

/// Drop listing entries the user asked to ignore. Folders never move, so
/// they are excluded up front.
pub fn filter_files(files: &[DriveFile], prefs: &Preferences) -> Vec<DriveFile> {
    // the ceiling is user-supplied and unbounded; saturate instead of
    // overflowing into a negative ceiling that drops every sized file
    let max_size = prefs.max_file_size_mb.max(0).saturating_mul(1024 * 1024);
    files
        .iter()
        .filter(|file| !file.is_folder())
        .filter(|file| !prefs.ignore_mime.contains(&file.mime_type))
        .filter(|file| {
            if !prefs.ignore_large {
                return true;
            }
            file.size_bytes.map_or(true, |size| size <= max_size)
        })
        .cloned()
        .collect()
}

/// Down-sample an oversized listing by taking an even sample from each MIME
/// group, so every file family stays represented in the prompt.
pub fn summarize_large_file_list(files: Vec<DriveFile>, max_files: usize) -> Vec<DriveFile> {
    if files.len() <= max_files {
        return files;
    }

    let mut groups: BTreeMap<String, Vec<DriveFile>> = BTreeMap::new();
    for file in files {
        groups.entry(file.mime_type.clone()).or_default().push(file);
    }

    let per_group = (max_files / groups.len()).max(1);
    let mut sampled = Vec::new();
    for (_, group) in groups {
        if group.len() <= per_group {
            sampled.extend(group);
        } else {
            let step = group.len() / per_group;
            sampled.extend(group.into_iter().step_by(step.max(1)).take(per_group));
        }
    }

    tracing::info!(sampled = sampled.len(), "down-sampled large file listing");
    sampled
}

fn file_summary(files: &[DriveFile]) -> String {
    let mut mime_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut extension_counts: BTreeMap<String, usize> = BTreeMap::new();

    for file in files {
        *mime_counts.entry(file.mime_type.clone()).or_default() += 1;
        if let Some((_, ext)) = file.name.rsplit_once('.') {
            *extension_counts.entry(ext.to_lowercase()).or_default() += 1;
        }
    }

    let mut top_mimes: Vec<_> = mime_counts.into_iter().collect();
    top_mimes.sort_by(|a, b| b.1.cmp(&a.1));
    let mut top_exts: Vec<_> = extension_counts.into_iter().collect();
    top_exts.sort_by(|a, b| b.1.cmp(&a.1));

    let mut summary = format!("Total files: {}\n\nTop MIME types:\n", files.len());
    for (mime, count) in top_mimes.into_iter().take(10) {
        summary.push_str(&format!("  {mime}: {count}\n"));
    }
    summary.push_str("\nTop file extensions:\n");
    for (ext, count) in top_exts.into_iter().take(10) {
        summary.push_str(&format!("  .{ext}: {count}\n"));
    }
    summary
}

pub fn build_classification_prompt(
    files: &[DriveFile],
    prefs: &Preferences,
) -> Result<String, AppError> {
    let details = files
        .iter()
        .take(MAX_DETAILED_FILES)
        .map(|file| {
            json!({
                "id": file.id,
                "name": file.name,
                "mime_type": file.mime_type,
                "size_bytes": file.size_bytes,
                "current_parent": file.parents.first(),
                "modified_time": file.modified_time,
            })
        })
        .collect::<Vec<_>>();
    let details_json = serde_json::to_string_pretty(&details)?;
    let summary = file_summary(files);

    Ok(format!(
        "Please analyze the following Google Drive files and propose a logical folder structure.\n\
\n\
File Summary:\n\
{summary}\n\
File Details (first {MAX_DETAILED_FILES} files for analysis):\n\
{details_json}\n\
\n\
User Preferences:\n\
- Ignore MIME types: {ignore_mime:?}\n\
- Ignore large files: {ignore_large}\n\
\n\
Rules:\n\
1. Group files by type, purpose, or project.\n\
2. Use clear, descriptive folder names.\n\
3. Keep the structure flat and intuitive.\n\
4. Assign each file to exactly one proposed folder; omit files that should stay put.\n\
5. Reference files by id only, never by full metadata.\n\
6. Return ONLY a JSON object with this schema:\n\
{{\n\
  \"proposed_folders\": [{{ \"name\": \"Receipts\", \"description\": \"Purchase receipts\" }}],\n\
  \"file_moves\": [{{ \"file_id\": \"abc\", \"file_name\": \"receipt.pdf\", \"current_parent\": \"root\", \"proposed_folder\": \"Receipts\" }}],\n\
  \"reasoning\": \"Brief explanation of the proposed structure\"\n\
}}\n\
No other text.",
        ignore_mime = prefs.ignore_mime,
        ignore_large = prefs.ignore_large,
    ))
}

/// Pull the JSON object out of a completion that may wrap it in a code
/// fence or surrounding prose.
pub fn extract_json_payload(text: &str) -> Option<String> {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + "```json".len()..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    let first = trimmed.find('{')?;
    let last = trimmed.rfind('}')?;
    if first <= last {
        return Some(trimmed[first..=last].to_string());
    }

    None
}

/// Parse a completion into a classifier output, dropping moves that
/// reference ids absent from the listing or name no destination.
pub fn parse_classifier_response(
    text: &str,
    files: &[DriveFile],
) -> Result<ClassifierOutput, AppError> {
    let payload = extract_json_payload(text).ok_or_else(|| {
        AppError::General("classifier response did not contain a JSON payload".to_string())
    })?;
    let mut parsed: ClassifierOutput = serde_json::from_str(&payload)?;

    let known_ids: HashSet<&str> = files.iter().map(|f| f.id.as_str()).collect();
    parsed.file_moves.retain(|mv| {
        if mv.proposed_folder.trim().is_empty() {
            tracing::warn!(file_id = %mv.file_id, "dropping move with empty destination");
            return false;
        }
        if !known_ids.contains(mv.file_id.as_str()) {
            tracing::warn!(file_id = %mv.file_id, "dropping move for unknown file id");
            return false;
        }
        true
    });
    parsed
        .proposed_folders
        .retain(|folder| !folder.name.trim().is_empty());

    Ok(parsed)
}

/// Chat-completions backed classifier.
pub struct OpenAiClassifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiClassifier {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(
        &self,
        files: &[DriveFile],
        preferences: &Preferences,
    ) -> Result<ClassifierOutput, AppError> {
        let prompt = build_classification_prompt(files, preferences)?;

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": prompt },
                ],
                "temperature": TEMPERATURE,
                "max_tokens": MAX_TOKENS,
            }))
            .send()
            .await
            .map_err(|e| AppError::external(PROVIDER, None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::external(PROVIDER, Some(status.as_u16()), body));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| AppError::external(PROVIDER, None, e.to_string()))?;
        let content = completion
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| AppError::external(PROVIDER, None, "empty completion"))?;

        let output = parse_classifier_response(content, files)?;
        tracing::info!(
            folders = output.proposed_folders.len(),
            moves = output.file_moves.len(),
            "classification proposal generated"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str, name: &str, mime: &str, size: Option<i64>) -> DriveFile {
        DriveFile {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: mime.to_string(),
            size_bytes: size,
            parents: vec!["root".to_string()],
            created_time: None,
            modified_time: None,
        }
    }

    #[test]
    fn test_filter_skips_ignored_mime_and_folders() {
        let files = vec![
            file("a", "receipt.pdf", "application/pdf", Some(100)),
            file("b", "archive.zip", "application/zip", Some(100)),
            file(
                "c",
                "Stuff",
                "application/vnd.google-apps.folder",
                None,
            ),
        ];
        let prefs = Preferences {
            ignore_mime: vec!["application/zip".to_string()],
            ..Default::default()
        };

        let filtered = filter_files(&files, &prefs);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "a");
    }

    #[test]
    fn test_filter_respects_size_ceiling() {
        let files = vec![
            file("small", "a.pdf", "application/pdf", Some(1024)),
            file("big", "b.pdf", "application/pdf", Some(200 * 1024 * 1024)),
            file("unknown", "c.pdf", "application/pdf", None),
        ];
        let prefs = Preferences {
            ignore_large: true,
            max_file_size_mb: 100,
            ..Default::default()
        };

        let filtered = filter_files(&files, &prefs);
        let ids: Vec<&str> = filtered.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["small", "unknown"]);
    }

    #[test]
    fn test_extreme_size_ceiling_keeps_all_files() {
        let files = vec![
            file("a", "a.pdf", "application/pdf", Some(1024)),
            file("b", "b.pdf", "application/pdf", Some(200 * 1024 * 1024)),
        ];
        let prefs = Preferences {
            ignore_large: true,
            max_file_size_mb: i64::MAX,
            ..Default::default()
        };

        let filtered = filter_files(&files, &prefs);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_summarize_caps_and_keeps_every_group() {
        let mut files = Vec::new();
        for i in 0..300 {
            files.push(file(&format!("pdf{i}"), "a.pdf", "application/pdf", None));
        }
        for i in 0..300 {
            files.push(file(&format!("img{i}"), "b.png", "image/png", None));
        }

        let sampled = summarize_large_file_list(files, 100);
        assert!(sampled.len() <= 100);
        assert!(sampled.iter().any(|f| f.mime_type == "application/pdf"));
        assert!(sampled.iter().any(|f| f.mime_type == "image/png"));
    }

    #[test]
    fn test_extract_json_from_code_fence() {
        let text = "Here you go:\n```json\n{\"proposed_folders\": []}\n```";
        assert_eq!(
            extract_json_payload(text).unwrap(),
            "{\"proposed_folders\": []}"
        );
    }

    #[test]
    fn test_extract_json_from_bare_text() {
        let text = "noise {\"file_moves\": []} trailing";
        assert_eq!(extract_json_payload(text).unwrap(), "{\"file_moves\": []}");
        assert!(extract_json_payload("no json here").is_none());
    }

    #[test]
    fn test_parse_drops_unknown_ids_and_empty_folders() {
        let files = vec![file("a", "receipt.pdf", "application/pdf", None)];
        let text = r#"{
            "proposed_folders": [
                {"name": "Receipts", "description": "Purchase receipts"},
                {"name": "  ", "description": "bogus"}
            ],
            "file_moves": [
                {"file_id": "a", "file_name": "receipt.pdf", "current_parent": "root", "proposed_folder": "Receipts"},
                {"file_id": "ghost", "file_name": "x", "current_parent": "root", "proposed_folder": "Receipts"},
                {"file_id": "a", "file_name": "receipt.pdf", "current_parent": "root", "proposed_folder": ""}
            ],
            "reasoning": "receipts together"
        }"#;

        let parsed = parse_classifier_response(text, &files).unwrap();
        assert_eq!(parsed.proposed_folders.len(), 1);
        assert_eq!(parsed.file_moves.len(), 1);
        assert_eq!(parsed.file_moves[0].file_id, "a");
        assert_eq!(parsed.reasoning.as_deref(), Some("receipts together"));
    }

    #[test]
    fn test_prompt_contains_summary_and_schema() {
        let files = vec![
            file("a", "receipt.pdf", "application/pdf", Some(10)),
            file("b", "photo.png", "image/png", Some(10)),
        ];
        let prompt = build_classification_prompt(&files, &Preferences::default()).unwrap();

        assert!(prompt.contains("Total files: 2"));
        assert!(prompt.contains("application/pdf: 1"));
        assert!(prompt.contains("\"proposed_folders\""));
        assert!(prompt.contains("\"file_moves\""));
    }
}
