//! Prompts and schemas for the design-suggestion and image-edit calls.

/// JSON schema for the structured suggestion response.
pub fn suggestions_json_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "suggestions": {
                "type": "array",
                "items": {
                    "type": "string",
                    "description": "A single design suggestion."
                }
            }
        },
        "required": ["suggestions"],
        "additionalProperties": false
    })
}

/// Instruction sent alongside the room photos when asking for suggestions.
pub fn build_suggestion_prompt() -> String {
    "You are an expert interior designer. Analyze this room and provide 5 \
     creative, actionable suggestions to improve its design. Focus on themes, \
     color palettes, furniture, and lighting. Respond with a JSON object \
     containing a \"suggestions\" array of strings."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_requires_suggestions_array() {
        let schema = suggestions_json_schema();
        assert_eq!(schema["properties"]["suggestions"]["type"], "array");
        assert_eq!(schema["required"][0], "suggestions");
    }

    #[test]
    fn test_prompt_mentions_room_and_json() {
        let prompt = build_suggestion_prompt();
        assert!(prompt.contains("interior designer"));
        assert!(prompt.contains("suggestions"));
    }
}
