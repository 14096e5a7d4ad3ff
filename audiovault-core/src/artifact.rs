use serde_json::Value;

/// A synthesized audio clip that passed validation and is ready to be
/// persisted.
///
/// The `id` is fixed before any side effect happens and is the correlation
/// key across the blob store, the catalog, metrics and logs.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub id: String,
    pub input: String,
    pub provider_response: Option<Value>,
    pub voice: String,
    pub model: String,
    /// The payload exactly as the caller sent it. The catalog keeps this
    /// for audit and replay; the blob store gets `audio`.
    pub audio_base64: String,
    pub audio: Vec<u8>,
    pub sidecar: Option<Value>,
}

impl AudioArtifact {
    pub fn filename(&self) -> String {
        audio_key(&self.id)
    }

    pub fn sidecar_filename(&self) -> String {
        sidecar_key(&self.id)
    }

    /// Provider metadata flattened to the text the catalog stores.
    pub fn provider_response_text(&self) -> Option<String> {
        match &self.provider_response {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

pub fn audio_key(id: &str) -> String {
    format!("{id}.wav")
}

pub fn sidecar_key(id: &str) -> String {
    format!("{id}.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact(provider_response: Option<Value>) -> AudioArtifact {
        AudioArtifact {
            id: "abc".to_string(),
            input: "hello".to_string(),
            provider_response,
            voice: "v1".to_string(),
            model: "m1".to_string(),
            audio_base64: "AAAA".to_string(),
            audio: vec![0, 0, 0],
            sidecar: None,
        }
    }

    #[test]
    fn filenames_derive_from_id() {
        let artifact = artifact(None);
        assert_eq!(artifact.filename(), "abc.wav");
        assert_eq!(artifact.sidecar_filename(), "abc.json");
    }

    #[test]
    fn provider_response_text_unwraps_strings() {
        assert_eq!(
            artifact(Some(json!("raw text"))).provider_response_text(),
            Some("raw text".to_string())
        );
        assert_eq!(
            artifact(Some(json!({"model": "llama"}))).provider_response_text(),
            Some(r#"{"model":"llama"}"#.to_string())
        );
        assert_eq!(artifact(Some(Value::Null)).provider_response_text(), None);
        assert_eq!(artifact(None).provider_response_text(), None);
    }
}
