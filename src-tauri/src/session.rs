//! Conversation state machine for a design session.
//!
//! One `DesignSession` per app window, owned by Tauri managed state. All
//! mutation happens through the transition methods here; commands and the
//! gateway never touch fields directly. The transcript is append-only and
//! only ever reset wholesale by an upload or a restart.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tracing::{info, warn};

use crate::designer::gateway::DesignGateway;
use crate::designer::types::{ChatMessage, EditOutcome, ImagePart};

pub const WELCOME_MESSAGE: &str =
    "Welcome! I am your AI interior designer. Please upload a photo of your room to begin.";

pub const UPLOAD_READY_MESSAGE: &str =
    "Great, I've got your image. Ask me for ideas, or tell me what you'd like to change.";

pub const ANALYZED_MESSAGE: &str = "I've analyzed your room. What creative direction should we \
     take? Feel free to use one of my suggestions or share your own idea.";

pub const EDIT_FALLBACK_TEXT: &str = "Here is the updated design:";

/// Shown when an edit response carries neither an image nor any text.
pub const NO_IMAGE_FALLBACK_TEXT: &str =
    "I couldn't generate a new image for that request. Try describing the change differently.";

pub const ANALYZING_STATUS: &str = "Analyzing your space...";
pub const EDITING_STATUS: &str = "Visualizing your ideas...";

const BUSY_ERROR: &str = "Another request is still in progress. Please wait for it to finish.";

/// Canonical session record. Fields are replaced, not mutated in place, on
/// each transition.
#[derive(Debug)]
pub struct DesignSession {
    /// Uploaded images in upload order; the first is the primary image
    images: Vec<ImagePart>,
    /// Data URL of the primary upload; set once per upload batch
    original_image: Option<String>,
    /// Data URL of the image currently shown; replaced by successful edits
    display_image: Option<String>,
    suggestions: Vec<String>,
    transcript: Vec<ChatMessage>,
    loading: bool,
    status: String,
    last_error: Option<String>,
    analyzed: bool,
    show_original: bool,
}

impl DesignSession {
    pub fn new() -> Self {
        Self {
            images: Vec::new(),
            original_image: None,
            display_image: None,
            suggestions: Vec::new(),
            transcript: vec![ChatMessage::model(WELCOME_MESSAGE)],
            loading: false,
            status: String::new(),
            last_error: None,
            analyzed: false,
            show_original: false,
        }
    }

    /// Unconditional reset to the canonical initial record.
    pub fn restart(&mut self) {
        *self = Self::new();
    }

    /// Adopt a freshly converted upload batch. A new upload always
    /// supersedes the previous session in full.
    pub fn apply_upload(&mut self, parts: Vec<ImagePart>) {
        let Some(first) = parts.first() else {
            return;
        };
        let primary = first.to_data_url();
        *self = Self::new();
        self.transcript = vec![ChatMessage::model(UPLOAD_READY_MESSAGE)];
        self.original_image = Some(primary.clone());
        self.display_image = Some(primary);
        self.images = parts;
        info!("Session reset with {} uploaded image(s)", self.images.len());
    }

    /// Record a codec failure. Prior images are left untouched.
    pub fn fail_upload(&mut self, err: String) {
        warn!("Upload failed: {}", err);
        self.transcript
            .push(ChatMessage::model(format!("Sorry, I encountered an error. {}", err)));
        self.last_error = Some(err);
    }

    /// Reject a user-initiated transition while a request is in flight.
    pub fn ensure_idle(&self) -> Result<(), String> {
        if self.loading {
            Err(BUSY_ERROR.to_string())
        } else {
            Ok(())
        }
    }

    /// Gate an analyze request. `Err` means a request is already in flight,
    /// `Ok(None)` means the precondition failed and the call is a no-op.
    pub fn begin_analyze(&mut self) -> Result<Option<Vec<ImagePart>>, String> {
        self.ensure_idle()?;
        if self.images.is_empty() {
            return Ok(None);
        }
        self.loading = true;
        self.status = ANALYZING_STATUS.to_string();
        self.last_error = None;
        Ok(Some(self.images.clone()))
    }

    /// Apply the analyze result. Clears the loading flag on both arms so
    /// the UI can never be stuck on a stale indicator.
    pub fn finish_analyze(&mut self, result: Result<Vec<String>, String>) {
        self.loading = false;
        self.status.clear();
        match result {
            Ok(suggestions) => {
                info!("Analysis complete: {} suggestion(s)", suggestions.len());
                self.suggestions = suggestions;
                self.analyzed = true;
                self.transcript.push(ChatMessage::model(ANALYZED_MESSAGE));
            }
            Err(e) => {
                warn!("Analysis failed: {}", e);
                self.transcript.push(ChatMessage::model(format!(
                    "Sorry, I ran into a problem while analyzing your room. {}",
                    e
                )));
                // analyzed stays false so the action remains retryable
                self.last_error = Some(e);
            }
        }
    }

    /// Gate an edit request. Appends the user message before the network
    /// call resolves and clears any pending suggestions.
    pub fn begin_edit(&mut self, prompt: &str) -> Result<Option<Vec<ImagePart>>, String> {
        self.ensure_idle()?;
        let prompt = prompt.trim();
        if prompt.is_empty() || self.images.is_empty() {
            return Ok(None);
        }
        self.transcript.push(ChatMessage::user(prompt));
        self.suggestions.clear();
        self.loading = true;
        self.status = EDITING_STATUS.to_string();
        self.last_error = None;
        Ok(Some(self.images.clone()))
    }

    /// Apply the edit result: exactly one model message per send, success
    /// or failure. The display image only moves on success with an image.
    pub fn finish_edit(&mut self, result: Result<EditOutcome, String>) {
        self.loading = false;
        self.status.clear();
        match result {
            Ok(outcome) => {
                let text = match (outcome.new_image, outcome.text) {
                    (Some(image), text) => {
                        self.display_image = Some(format!("data:image/png;base64,{}", image));
                        self.show_original = false;
                        text.unwrap_or_else(|| EDIT_FALLBACK_TEXT.to_string())
                    }
                    (None, Some(text)) => text,
                    (None, None) => NO_IMAGE_FALLBACK_TEXT.to_string(),
                };
                self.transcript.push(ChatMessage::model(text));
            }
            Err(e) => {
                warn!("Edit failed: {}", e);
                self.transcript.push(ChatMessage::model(format!(
                    "I'm sorry, I couldn't process that request. {}",
                    e
                )));
                self.last_error = Some(e);
            }
        }
    }

    /// Flip the before/after toggle. Only meaningful when both references
    /// exist and differ; otherwise a no-op.
    pub fn toggle_show_original(&mut self) {
        if self.can_toggle() {
            self.show_original = !self.show_original;
        }
    }

    fn can_toggle(&self) -> bool {
        match (&self.original_image, &self.display_image) {
            (Some(original), Some(display)) => original != display,
            _ => false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn display_image(&self) -> Option<&str> {
        self.display_image.as_deref()
    }

    /// Snapshot for the presentation layer.
    pub fn view(&self) -> SessionView {
        SessionView {
            display_image: self.display_image.clone(),
            original_image: self.original_image.clone(),
            show_original: self.show_original,
            can_toggle: self.can_toggle(),
            suggestions: self.suggestions.clone(),
            transcript: self.transcript.clone(),
            loading: self.loading,
            status: self.status.clone(),
            last_error: self.last_error.clone(),
            analyzed: self.analyzed,
            image_count: self.images.len(),
        }
    }
}

impl Default for DesignSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable snapshot of the session, rendered by the frontend.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub display_image: Option<String>,
    pub original_image: Option<String>,
    pub show_original: bool,
    pub can_toggle: bool,
    pub suggestions: Vec<String>,
    pub transcript: Vec<ChatMessage>,
    pub loading: bool,
    pub status: String,
    pub last_error: Option<String>,
    pub analyzed: bool,
    pub image_count: usize,
}

/// Managed state wrapper for the per-window session.
pub struct SessionState(Mutex<DesignSession>);

impl SessionState {
    pub fn new() -> Self {
        Self(Mutex::new(DesignSession::new()))
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, DesignSession>, String> {
        self.0.lock().map_err(|_| "Session state poisoned".to_string())
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the analyze transition end to end. The lock is never held across
/// the network await; `finish_analyze` runs on every completion path.
pub async fn run_analyze<G: DesignGateway>(
    state: &SessionState,
    gateway: &G,
) -> Result<SessionView, String> {
    let images = {
        let mut session = state.lock()?;
        match session.begin_analyze()? {
            Some(images) => images,
            None => return Ok(session.view()),
        }
    };

    let result = gateway.analyze(&images).await;

    let mut session = state.lock()?;
    session.finish_analyze(result);
    Ok(session.view())
}

/// Run the send-message transition end to end: optimistic user message,
/// gateway edit call, exactly one model message on completion.
pub async fn run_edit<G: DesignGateway>(
    state: &SessionState,
    gateway: &G,
    prompt: &str,
) -> Result<SessionView, String> {
    let images = {
        let mut session = state.lock()?;
        match session.begin_edit(prompt)? {
            Some(images) => images,
            None => return Ok(session.view()),
        }
    };

    let result = gateway.edit(&images, prompt.trim()).await;

    let mut session = state.lock()?;
    session.finish_edit(result);
    Ok(session.view())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_part(data: &str) -> ImagePart {
        ImagePart {
            mime_type: "image/jpeg".to_string(),
            data: data.to_string(),
        }
    }

    #[test]
    fn test_new_session_has_single_welcome_message() {
        let session = DesignSession::new();
        let view = session.view();
        assert_eq!(view.transcript.len(), 1);
        assert_eq!(view.transcript[0].text, WELCOME_MESSAGE);
        assert!(view.display_image.is_none());
        assert!(view.suggestions.is_empty());
        assert!(!view.analyzed);
        assert!(!view.loading);
    }

    #[test]
    fn test_apply_upload_supersedes_previous_session() {
        let mut session = DesignSession::new();
        session.apply_upload(vec![sample_part("old")]);
        session.finish_analyze(Ok(vec!["stale suggestion".to_string()]));

        session.apply_upload(vec![sample_part("new"), sample_part("extra")]);
        let view = session.view();

        assert_eq!(view.image_count, 2);
        assert_eq!(
            view.original_image.as_deref(),
            Some("data:image/jpeg;base64,new")
        );
        assert_eq!(view.original_image, view.display_image);
        assert!(view.suggestions.is_empty());
        assert!(!view.analyzed);
        assert_eq!(view.transcript.len(), 1);
        assert_eq!(view.transcript[0].text, UPLOAD_READY_MESSAGE);
    }

    #[test]
    fn test_fail_upload_preserves_images() {
        let mut session = DesignSession::new();
        session.apply_upload(vec![sample_part("kept")]);

        session.fail_upload("bad file".to_string());
        let view = session.view();

        assert_eq!(view.image_count, 1);
        assert_eq!(view.last_error.as_deref(), Some("bad file"));
        let last = view.transcript.last().unwrap();
        assert_eq!(last.role, crate::designer::types::Role::Model);
        assert!(last.text.contains("bad file"));
    }

    #[test]
    fn test_begin_analyze_without_images_is_noop() {
        let mut session = DesignSession::new();
        assert!(session.begin_analyze().unwrap().is_none());
        assert!(!session.is_loading());
    }

    #[test]
    fn test_begin_analyze_rejected_while_loading() {
        let mut session = DesignSession::new();
        session.apply_upload(vec![sample_part("a")]);
        assert!(session.begin_analyze().unwrap().is_some());
        assert!(session.begin_analyze().is_err());
    }

    #[test]
    fn test_finish_analyze_failure_stays_retryable() {
        let mut session = DesignSession::new();
        session.apply_upload(vec![sample_part("a")]);
        let before = session.view().transcript.len();

        session.begin_analyze().unwrap();
        session.finish_analyze(Err("upstream down".to_string()));
        let view = session.view();

        assert!(!view.loading);
        assert!(!view.analyzed);
        assert!(view.suggestions.is_empty());
        assert_eq!(view.transcript.len(), before + 1);
        assert!(view.last_error.is_some());

        // retry succeeds
        session.begin_analyze().unwrap();
        session.finish_analyze(Ok(vec!["suggestion A".to_string()]));
        assert!(session.view().analyzed);
    }

    #[test]
    fn test_begin_edit_appends_user_message_and_clears_suggestions() {
        let mut session = DesignSession::new();
        session.apply_upload(vec![sample_part("a")]);
        session.begin_analyze().unwrap();
        session.finish_analyze(Ok(vec!["suggestion A".to_string()]));

        let before = session.view().transcript.len();
        session.begin_edit("  make it cozy  ").unwrap();
        let view = session.view();

        assert_eq!(view.transcript.len(), before + 1);
        assert_eq!(view.transcript.last().unwrap().text, "make it cozy");
        assert_eq!(view.transcript.last().unwrap().role, crate::designer::types::Role::User);
        assert!(view.suggestions.is_empty());
        assert!(view.loading);
    }

    #[test]
    fn test_begin_edit_blank_prompt_is_noop() {
        let mut session = DesignSession::new();
        session.apply_upload(vec![sample_part("a")]);
        assert!(session.begin_edit("   ").unwrap().is_none());
        assert!(!session.is_loading());
        assert_eq!(session.view().transcript.len(), 1);
    }

    #[test]
    fn test_finish_edit_with_image_moves_display_and_resets_toggle() {
        let mut session = DesignSession::new();
        session.apply_upload(vec![sample_part("orig")]);
        session.begin_edit("make it cozy").unwrap();
        session.finish_edit(Ok(EditOutcome {
            new_image: Some("bmV3".to_string()),
            text: None,
        }));
        session.toggle_show_original();
        assert!(session.view().show_original);

        session.begin_edit("now brighter").unwrap();
        session.finish_edit(Ok(EditOutcome {
            new_image: Some("YnJpZ2h0".to_string()),
            text: Some("Brightened the palette.".to_string()),
        }));
        let view = session.view();

        assert_eq!(
            view.display_image.as_deref(),
            Some("data:image/png;base64,YnJpZ2h0")
        );
        assert!(!view.show_original);
        assert_eq!(
            view.original_image.as_deref(),
            Some("data:image/jpeg;base64,orig")
        );
        assert_eq!(view.transcript.last().unwrap().text, "Brightened the palette.");
    }

    #[test]
    fn test_finish_edit_without_image_keeps_display() {
        let mut session = DesignSession::new();
        session.apply_upload(vec![sample_part("orig")]);
        session.begin_edit("make it cozy").unwrap();
        session.finish_edit(Ok(EditOutcome {
            new_image: None,
            text: Some("That room is already cozy.".to_string()),
        }));
        let view = session.view();

        assert_eq!(
            view.display_image.as_deref(),
            Some("data:image/jpeg;base64,orig")
        );
        assert_eq!(view.transcript.last().unwrap().text, "That room is already cozy.");
    }

    #[test]
    fn test_finish_edit_empty_outcome_uses_fallback_sentence() {
        let mut session = DesignSession::new();
        session.apply_upload(vec![sample_part("orig")]);
        session.begin_edit("do a thing").unwrap();
        session.finish_edit(Ok(EditOutcome::default()));

        assert_eq!(
            session.view().transcript.last().unwrap().text,
            NO_IMAGE_FALLBACK_TEXT
        );
    }

    #[test]
    fn test_toggle_requires_differing_images() {
        let mut session = DesignSession::new();
        session.toggle_show_original();
        assert!(!session.view().show_original);

        session.apply_upload(vec![sample_part("same")]);
        // original == display right after upload
        session.toggle_show_original();
        assert!(!session.view().show_original);

        session.begin_edit("change it").unwrap();
        session.finish_edit(Ok(EditOutcome {
            new_image: Some("ZGlmZg==".to_string()),
            text: None,
        }));
        session.toggle_show_original();
        assert!(session.view().show_original);
    }

    #[test]
    fn test_restart_returns_to_initial_record() {
        let mut session = DesignSession::new();
        session.apply_upload(vec![sample_part("a")]);
        session.begin_analyze().unwrap();
        session.finish_analyze(Ok(vec!["suggestion A".to_string()]));
        session.restart();

        let view = session.view();
        assert_eq!(view.transcript.len(), 1);
        assert_eq!(view.transcript[0].text, WELCOME_MESSAGE);
        assert_eq!(view.image_count, 0);
        assert!(view.suggestions.is_empty());
        assert!(!view.analyzed);
        assert!(view.display_image.is_none());
    }
}
