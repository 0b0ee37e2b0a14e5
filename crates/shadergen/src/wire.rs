use serde::{Deserialize, Serialize};

use crate::GenerateError;

/// Body of `POST /api/generate-shader`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

/// Successful response body. Only the first code block is used.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub shader_code: Vec<ShaderCode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShaderCode {
    pub text: String,
}

impl GenerateResponse {
    /// Text of the first code block; an empty list or a blank block is rejected.
    pub fn into_source(self) -> Result<String, GenerateError> {
        self.shader_code
            .into_iter()
            .next()
            .map(|code| code.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(GenerateError::EmptyResponse)
    }
}

pub fn decode_response(body: &str) -> Result<String, GenerateError> {
    let response: GenerateResponse = serde_json::from_str(body)?;
    response.into_source()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialises_prompt() {
        let body = serde_json::to_string(&GenerateRequest {
            prompt: "red circle".into(),
        })
        .unwrap();
        assert_eq!(body, r#"{"prompt":"red circle"}"#);
    }

    #[test]
    fn takes_first_code_block() {
        let body = r#"{"shader_code":[{"text":"void main(){}"},{"text":"ignored"}],"model":"x"}"#;
        assert_eq!(decode_response(body).unwrap(), "void main(){}");
    }

    #[test]
    fn empty_code_list_is_rejected() {
        assert!(matches!(
            decode_response(r#"{"shader_code":[]}"#),
            Err(GenerateError::EmptyResponse)
        ));
        assert!(matches!(
            decode_response(r#"{"shader_code":[{"text":"  \n"}]}"#),
            Err(GenerateError::EmptyResponse)
        ));
    }

    #[test]
    fn missing_field_is_a_decode_error() {
        assert!(matches!(
            decode_response(r#"{"code":"void main(){}"}"#),
            Err(GenerateError::Decode(_))
        ));
        assert!(matches!(
            decode_response("<html>502</html>"),
            Err(GenerateError::Decode(_))
        ));
    }
}
