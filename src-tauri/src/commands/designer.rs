//! Tauri commands for the design session: upload, analyze, edit, toggle,
//! restart, and export. Each command is a thin wrapper over a session
//! transition; provider settings are resolved per call from preferences
//! and the keychain.

use base64::Engine;
use keyring::Entry;
use tauri::{AppHandle, State};
use tauri_plugin_store::StoreExt;
use tracing::{info, warn};

use crate::commands::config::PREFERENCES_STORE;
use crate::designer::gateway::LiveGateway;
use crate::designer::image_prep::prepare_upload;
use crate::designer::types::{ImagePart, RoomUpload};
use crate::error::DecorMateError;
use crate::session::{self, SessionState, SessionView};

const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Current session snapshot, for initial render and refresh.
#[tauri::command]
pub fn get_session(state: State<SessionState>) -> Result<SessionView, String> {
    Ok(state.lock()?.view())
}

/// Convert an upload batch and start a fresh session around it.
///
/// All files are decoded before the session is touched: a failing file
/// leaves the previous images in place and surfaces a conversational error.
#[tauri::command]
pub fn upload_room_images(
    state: State<SessionState>,
    files: Vec<RoomUpload>,
) -> Result<SessionView, String> {
    if files.is_empty() {
        return Ok(state.lock()?.view());
    }
    state.lock()?.ensure_idle()?;

    info!("Converting {} uploaded file(s)", files.len());
    let mut parts: Vec<ImagePart> = Vec::with_capacity(files.len());
    for file in &files {
        let bytes = match base64::engine::general_purpose::STANDARD.decode(&file.data_base64) {
            Ok(bytes) => bytes,
            Err(e) => {
                let err = DecorMateError::Upload(format!("Unreadable file data: {}", e));
                let mut session = state.lock()?;
                session.fail_upload(err.to_string());
                return Ok(session.view());
            }
        };
        match prepare_upload(&bytes) {
            Ok(part) => parts.push(part),
            Err(e) => {
                let err = DecorMateError::Upload(e);
                let mut session = state.lock()?;
                session.fail_upload(err.to_string());
                return Ok(session.view());
            }
        }
    }

    let mut session = state.lock()?;
    session.apply_upload(parts);
    Ok(session.view())
}

/// Ask the model for design suggestions on the current images.
#[tauri::command]
pub async fn analyze_room(
    app: AppHandle,
    state: State<'_, SessionState>,
) -> Result<SessionView, String> {
    // A missing key or bad provider config surfaces through the transcript
    // like any other gateway failure, and stays retryable.
    match live_gateway(&app) {
        Ok(gateway) => session::run_analyze(state.inner(), &gateway).await,
        Err(e) => {
            let mut session = state.lock()?;
            if session.begin_analyze()?.is_none() {
                return Ok(session.view());
            }
            session.finish_analyze(Err(e));
            Ok(session.view())
        }
    }
}

/// Send a free-form design prompt and apply the resulting edit.
#[tauri::command]
pub async fn send_design_message(
    app: AppHandle,
    state: State<'_, SessionState>,
    prompt: String,
) -> Result<SessionView, String> {
    match live_gateway(&app) {
        Ok(gateway) => session::run_edit(state.inner(), &gateway, &prompt).await,
        Err(e) => {
            let mut session = state.lock()?;
            if session.begin_edit(&prompt)?.is_none() {
                return Ok(session.view());
            }
            session.finish_edit(Err(e));
            Ok(session.view())
        }
    }
}

/// Flip the before/after view.
#[tauri::command]
pub fn toggle_original(state: State<SessionState>) -> Result<SessionView, String> {
    let mut session = state.lock()?;
    session.toggle_show_original();
    Ok(session.view())
}

/// Throw everything away and start over.
#[tauri::command]
pub fn restart_session(state: State<SessionState>) -> Result<SessionView, String> {
    let mut session = state.lock()?;
    session.restart();
    Ok(session.view())
}

/// Write the currently displayed design to the download directory with a
/// timestamped name. Returns the written path.
#[tauri::command]
pub fn save_design_image(state: State<SessionState>) -> Result<String, String> {
    let data_url = state
        .lock()?
        .display_image()
        .map(|s| s.to_string())
        .ok_or_else(|| String::from(DecorMateError::Export("No design image to save".to_string())))?;

    let (mime_type, bytes) = decode_data_url(&data_url)
        .map_err(|e| String::from(DecorMateError::Export(e)))?;
    let extension = match mime_type.as_str() {
        "image/jpeg" => "jpg",
        _ => "png",
    };

    let dir = dirs::download_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| String::from(DecorMateError::Export("No download directory found".to_string())))?;

    let filename = format!(
        "decormate-design-{}.{}",
        chrono::Local::now().format("%Y%m%d-%H%M%S"),
        extension
    );
    let path = dir.join(filename);

    std::fs::write(&path, bytes).map_err(|e| {
        warn!("Failed to write design image to {:?}: {}", path, e);
        String::from(DecorMateError::Export(format!("Could not write file: {}", e)))
    })?;

    info!("Saved design image to {:?}", path);
    Ok(path.to_string_lossy().to_string())
}

/// Split a `data:<mime>;base64,<payload>` URL into MIME type and bytes.
fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>), String> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| "Not a data URL".to_string())?;
    let (mime_type, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| "Not a base64 data URL".to_string())?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| format!("Invalid base64 payload: {}", e))?;
    Ok((mime_type.to_string(), bytes))
}

/// Build a gateway from the user's provider settings.
fn live_gateway(app: &AppHandle) -> Result<LiveGateway, String> {
    let (provider, model, image_model, api_key) = get_ai_settings(app)?;
    Ok(LiveGateway::new(provider, model, image_model, api_key))
}

/// Resolve provider, models, and API key from preferences and keychain.
fn get_ai_settings(app: &AppHandle) -> Result<(String, String, String, String), String> {
    let store = app.store(PREFERENCES_STORE).map_err(|e| {
        warn!("Failed to open preferences store: {}", e);
        String::from(DecorMateError::Config(e.to_string()))
    })?;

    let provider = store
        .get("ai_provider")
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| "gemini".to_string());

    let default_model = match provider.as_str() {
        "gemini" => "gemini-2.5-flash",
        "claude" => "claude-sonnet-4-20250514",
        "openai" => "gpt-4o",
        _ => "gemini-2.5-flash",
    };
    let model = store
        .get("ai_model")
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| default_model.to_string());

    let image_model = store
        .get("ai_image_model")
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string());

    let service = match provider.as_str() {
        "gemini" => "decormate-gemini-api",
        "claude" => "decormate-claude-api",
        "openai" => "decormate-openai-api",
        _ => {
            return Err(DecorMateError::Config(format!("Unknown AI provider: {}", provider)).into())
        }
    };

    let entry = Entry::new(service, "decormate")
        .map_err(|e| String::from(DecorMateError::Keychain(e.to_string())))?;
    let api_key = match entry.get_password() {
        Ok(key) => key,
        Err(keyring::Error::NoEntry) => {
            return Err(DecorMateError::Config(format!(
                "No API key configured for '{}'. Please set it in Settings.",
                provider
            ))
            .into())
        }
        Err(e) => {
            return Err(DecorMateError::Keychain(format!(
                "Failed to read API key for '{}': {}",
                provider, e
            ))
            .into())
        }
    };

    Ok((provider, model, image_model, api_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_url_png() {
        let (mime, bytes) = decode_data_url("data:image/png;base64,QUJD").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"ABC");
    }

    #[test]
    fn test_decode_data_url_rejects_plain_strings() {
        assert!(decode_data_url("https://example.com/x.png").is_err());
        assert!(decode_data_url("data:image/png,rawpayload").is_err());
        assert!(decode_data_url("data:image/png;base64,@@@").is_err());
    }
}
