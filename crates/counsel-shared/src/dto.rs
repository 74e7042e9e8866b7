//! Data Transfer Objects - request/response types for the API.

use serde::{Deserialize, Serialize};

/// Longest input accepted by the embedding endpoint, in characters.
pub const MAX_EMBED_INPUT_CHARS: usize = 8000;

/// Request to embed a piece of text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedRequest {
    pub input: String,
}

impl EmbedRequest {
    /// Check the input is non-blank and within [`MAX_EMBED_INPUT_CHARS`].
    pub fn validate(&self) -> Result<&str, String> {
        let input = self.input.trim();
        if input.is_empty() {
            return Err("input must not be empty".to_string());
        }
        if input.chars().count() > MAX_EMBED_INPUT_CHARS {
            return Err(format!(
                "input must be at most {MAX_EMBED_INPUT_CHARS} characters"
            ));
        }
        Ok(input)
    }
}

/// Embedding vector together with the model that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub embedding: Vec<f32>,
    pub embedding_model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_trims_input() {
        let request = EmbedRequest {
            input: "  estate planning  ".to_string(),
        };
        assert_eq!(request.validate(), Ok("estate planning"));
    }

    #[test]
    fn test_validate_rejects_blank_and_oversized() {
        let blank = EmbedRequest {
            input: " \n\t".to_string(),
        };
        assert!(blank.validate().is_err());

        let at_limit = EmbedRequest {
            input: "a".repeat(MAX_EMBED_INPUT_CHARS),
        };
        assert!(at_limit.validate().is_ok());

        let oversized = EmbedRequest {
            input: "a".repeat(MAX_EMBED_INPUT_CHARS + 1),
        };
        assert!(oversized.validate().is_err());
    }

    #[test]
    fn test_limit_applies_to_trimmed_input() {
        let padded = EmbedRequest {
            input: format!("  {}\n", "a".repeat(MAX_EMBED_INPUT_CHARS)),
        };
        assert_eq!(padded.validate().map(str::len), Ok(MAX_EMBED_INPUT_CHARS));
    }

    #[test]
    fn test_response_field_names() {
        let json = serde_json::to_value(EmbedResponse {
            embedding: vec![0.5],
            embedding_model: "text-embedding-3-small".to_string(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"embedding": [0.5], "embedding_model": "text-embedding-3-small"})
        );
    }
}
