//! Type definitions shared between the gateway, the session state machine,
//! and the frontend-facing commands.

use serde::{Deserialize, Serialize};

/// One uploaded source image, encoded for generative-model requests.
/// Immutable once created; a session holds these in upload order and the
/// first one is the primary image shown in the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePart {
    /// MIME type of the encoded payload (e.g. "image/jpeg")
    pub mime_type: String,
    /// Base64-encoded image bytes
    pub data: String,
}

impl ImagePart {
    /// Render as a `data:` URL for direct display in the WebView.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One entry in the conversation transcript. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    /// Optional data URL attached to the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            image: None,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
            image: None,
        }
    }
}

/// Result of an image-edit request. Either field may be absent; the session
/// layer supplies fallback text when both are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOutcome {
    /// Base64-encoded replacement image, if the model produced one
    pub new_image: Option<String>,
    /// Commentary from the model, if any
    pub text: Option<String>,
}

/// An image file handed over from the frontend, still in its uploaded form.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomUpload {
    /// MIME type reported by the browser file input
    pub mime_type: String,
    /// Base64-encoded raw file bytes
    pub data_base64: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_part_data_url() {
        let part = ImagePart {
            mime_type: "image/jpeg".to_string(),
            data: "aGVsbG8=".to_string(),
        };
        assert_eq!(part.to_data_url(), "data:image/jpeg;base64,aGVsbG8=");
    }

    #[test]
    fn test_chat_message_roles_serialize_lowercase() {
        let msg = ChatMessage::user("make it cozy");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""role":"user""#));
        assert!(!json.contains("image"));

        let msg = ChatMessage::model("Here is the updated design:");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""role":"model""#));
    }

    #[test]
    fn test_chat_message_deserialize() {
        let json = r#"{"role":"model","text":"hi","image":"data:image/png;base64,AA=="}"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.role, Role::Model);
        assert_eq!(msg.image.as_deref(), Some("data:image/png;base64,AA=="));
    }

    #[test]
    fn test_edit_outcome_default_is_empty() {
        let outcome = EditOutcome::default();
        assert!(outcome.new_image.is_none());
        assert!(outcome.text.is_none());
    }
}
