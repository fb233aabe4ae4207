//! Configuration health check: which provider keys are present and what
//! the active provider selection is.

use serde::Serialize;
use tauri::AppHandle;
use tauri_plugin_store::StoreExt;
use tracing::info;

use crate::commands::config::PREFERENCES_STORE;

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub active_provider: String,
    pub gemini_api_key_set: bool,
    pub claude_api_key_set: bool,
    pub openai_api_key_set: bool,
    pub download_dir_accessible: bool,
    pub download_dir_path: Option<String>,
}

fn key_is_set(service: &str) -> bool {
    keyring::Entry::new(service, "decormate")
        .and_then(|e| e.get_password())
        .is_ok()
}

#[tauri::command]
pub fn run_health_check(app: AppHandle) -> Result<HealthReport, String> {
    info!("Running health check");

    let active_provider = app
        .store(PREFERENCES_STORE)
        .ok()
        .and_then(|store| store.get("ai_provider"))
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| "gemini".to_string());

    let gemini_key_set = key_is_set("decormate-gemini-api");
    let claude_key_set = key_is_set("decormate-claude-api");
    let openai_key_set = key_is_set("decormate-openai-api");
    info!(
        "Provider: {}, Gemini key set: {}, Claude key set: {}, OpenAI key set: {}",
        active_provider, gemini_key_set, claude_key_set, openai_key_set
    );

    let download_dir = dirs::download_dir();
    let download_accessible = download_dir
        .as_ref()
        .map(|d| d.exists() && d.is_dir())
        .unwrap_or(false);

    Ok(HealthReport {
        active_provider,
        gemini_api_key_set: gemini_key_set,
        claude_api_key_set: claude_key_set,
        openai_api_key_set: openai_key_set,
        download_dir_accessible: download_accessible,
        download_dir_path: download_dir.map(|d| d.to_string_lossy().to_string()),
    })
}
