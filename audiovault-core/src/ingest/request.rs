use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::error::ValidationError;
use crate::artifact::AudioArtifact;

/// Standard alphabet; padding is accepted but not required, matching what
/// producers in the wild send.
const AUDIO_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Body of a creation request as it arrives on the wire. Every field is
/// optional here so validation can report all missing fields at once.
///
/// Text fields accept any JSON value: `null`, `false`, `0` and `""` read as
/// absent, other values keep their JSON text. A wrongly typed field is
/// therefore a validation problem, never an unreadable body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRequest {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub input: Option<String>,

    #[serde(default, rename = "openTTS_Voice", deserialize_with = "lenient_text")]
    pub voice: Option<String>,

    #[serde(default, rename = "openTTS_Model", deserialize_with = "lenient_text")]
    pub model: Option<String>,

    /// Upstream provider metadata. The wire name carries a historical typo;
    /// the corrected spelling is accepted too.
    #[serde(default, rename = "groq_respose", alias = "groq_response")]
    pub provider_response: Option<Value>,

    #[serde(default, rename = "audioBase64", deserialize_with = "lenient_text")]
    pub audio_base64: Option<String>,

    /// Opaque caller data stored next to the audio as `{id}.json`.
    #[serde(default, rename = "arrayBuffer")]
    pub sidecar: Option<Value>,
}

impl CreateRequest {
    /// Required fields that are absent or empty, in a stable order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("input", &self.input),
            ("openTTS_Voice", &self.voice),
            ("openTTS_Model", &self.model),
            ("audioBase64", &self.audio_base64),
        ]
        .into_iter()
        .filter(|(_, value)| is_blank(value))
        .map(|(name, _)| name)
        .collect()
    }

    /// Validates the request and builds the artifact. `generate_id` is only
    /// called when the caller did not supply a usable id.
    pub fn into_artifact(
        self,
        generate_id: impl FnOnce() -> String,
    ) -> Result<AudioArtifact, ValidationError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let audio_base64 = self.audio_base64.unwrap_or_default();
        let audio = AUDIO_BASE64
            .decode(audio_base64.trim())
            .map_err(|e| ValidationError::InvalidPayload(e.to_string()))?;

        let id = match self.id {
            Some(id) if !id.is_empty() => id,
            _ => generate_id(),
        };

        Ok(AudioArtifact {
            id,
            input: self.input.unwrap_or_default(),
            provider_response: self.provider_response,
            voice: self.voice.unwrap_or_default(),
            model: self.model.unwrap_or_default(),
            audio_base64,
            audio,
            sidecar: self.sidecar,
        })
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(text_of))
}

fn text_of(value: Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text),
        Value::Number(n) if n.as_f64().is_some_and(|f| f == 0.0) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn complete() -> CreateRequest {
        CreateRequest {
            input: Some("hello".to_string()),
            voice: Some("v1".to_string()),
            model: Some("m1".to_string()),
            audio_base64: Some("AAAA".to_string()),
            ..CreateRequest::default()
        }
    }

    #[rstest]
    #[case(json!({}), vec!["input", "openTTS_Voice", "openTTS_Model", "audioBase64"])]
    #[case(json!({"input": "hi"}), vec!["openTTS_Voice", "openTTS_Model", "audioBase64"])]
    #[case(
        json!({"input": "", "openTTS_Voice": "v", "openTTS_Model": "", "audioBase64": "AAAA"}),
        vec!["input", "openTTS_Model"]
    )]
    #[case(
        json!({"input": "hi", "openTTS_Voice": null, "openTTS_Model": "m", "audioBase64": ""}),
        vec!["openTTS_Voice", "audioBase64"]
    )]
    #[case(
        json!({"input": false, "openTTS_Voice": 0, "openTTS_Model": "m", "audioBase64": "AAAA"}),
        vec!["input", "openTTS_Voice"]
    )]
    #[case(
        json!({"input": "hi", "openTTS_Voice": "v", "openTTS_Model": "m", "audioBase64": "AAAA"}),
        vec![]
    )]
    fn missing_fields_are_exhaustive_and_ordered(
        #[case] body: Value,
        #[case] expected: Vec<&'static str>,
    ) {
        let request: CreateRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.missing_fields(), expected);
    }

    #[test]
    fn missing_fields_reject_before_decoding() {
        let request = CreateRequest {
            input: None,
            audio_base64: Some("%%% not base64 %%%".to_string()),
            ..complete()
        };
        assert_eq!(
            request.into_artifact(|| "unused".to_string()).unwrap_err(),
            ValidationError::MissingFields(vec!["input"])
        );
    }

    #[test]
    fn decodes_payload_once() {
        let artifact = complete().into_artifact(|| "gen".to_string()).unwrap();
        assert_eq!(artifact.audio, vec![0, 0, 0]);
        assert_eq!(artifact.audio_base64, "AAAA");
        assert_eq!(artifact.filename(), "gen.wav");
    }

    #[rstest]
    #[case("AAAA", 3)]
    #[case("AAA", 2)]
    #[case("AA==", 1)]
    #[case("UklGRg==", 4)]
    fn accepts_padded_and_unpadded_payloads(#[case] payload: &str, #[case] len: usize) {
        let request = CreateRequest {
            audio_base64: Some(payload.to_string()),
            ..complete()
        };
        let artifact = request.into_artifact(|| "gen".to_string()).unwrap();
        assert_eq!(artifact.audio.len(), len);
    }

    #[test]
    fn undecodable_payload_is_a_validation_error() {
        let request = CreateRequest {
            audio_base64: Some("not*base64".to_string()),
            ..complete()
        };
        assert!(matches!(
            request.into_artifact(|| "gen".to_string()),
            Err(ValidationError::InvalidPayload(_))
        ));
    }

    #[test]
    fn supplied_id_is_kept_and_empty_id_is_replaced() {
        let supplied = CreateRequest {
            id: Some("client-1".to_string()),
            ..complete()
        };
        assert_eq!(
            supplied.into_artifact(|| "gen".to_string()).unwrap().id,
            "client-1"
        );

        let empty = CreateRequest {
            id: Some(String::new()),
            ..complete()
        };
        assert_eq!(empty.into_artifact(|| "gen".to_string()).unwrap().id, "gen");
    }

    #[test]
    fn non_string_values_keep_their_json_text() {
        let request: CreateRequest = serde_json::from_value(json!({
            "id": 42,
            "input": true,
            "openTTS_Voice": "v",
            "openTTS_Model": 7,
            "audioBase64": {"not": "text"}
        }))
        .unwrap();

        assert_eq!(request.id.as_deref(), Some("42"));
        assert_eq!(request.input.as_deref(), Some("true"));
        assert_eq!(request.model.as_deref(), Some("7"));
        assert!(request.missing_fields().is_empty());
        assert!(matches!(
            request.into_artifact(|| "gen".to_string()),
            Err(ValidationError::InvalidPayload(_))
        ));
    }

    #[test]
    fn wire_names_and_alias_deserialize() {
        let request: CreateRequest = serde_json::from_value(json!({
            "input": "hi",
            "openTTS_Voice": "v",
            "openTTS_Model": "m",
            "groq_response": {"tokens": 3},
            "audioBase64": "AAAA",
            "arrayBuffer": [1, 2, 3]
        }))
        .unwrap();

        assert_eq!(request.provider_response, Some(json!({"tokens": 3})));
        assert_eq!(request.sidecar, Some(json!([1, 2, 3])));
        assert!(request.missing_fields().is_empty());
    }
}
