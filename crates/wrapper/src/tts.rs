//! Text-to-speech seam and its Google Cloud implementation.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::config::TtsConfig;
use crate::error::{GatewayError, TTS};
use crate::upstream::http_client;

pub const GOOGLE_TTS_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + 'static {
    /// MP3 audio for `text`.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, GatewayError>;
}

/// Control whitespace makes the synthesizer pause oddly.
pub fn sanitize(text: &str) -> String {
    text.replace(['\n', '\r', '\t'], " ")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    speaking_rate: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

pub struct GoogleTts {
    http: reqwest::Client,
    endpoint: Url,
    config: TtsConfig,
}

impl GoogleTts {
    pub fn new(config: TtsConfig) -> Result<Self, GatewayError> {
        let endpoint = Url::parse(GOOGLE_TTS_ENDPOINT)
            .map_err(|e| GatewayError::Internal(format!("bad TTS endpoint: {e}")))?;
        Self::with_endpoint(config, endpoint)
    }

    pub fn with_endpoint(config: TtsConfig, endpoint: Url) -> Result<Self, GatewayError> {
        Ok(Self {
            http: http_client()?,
            endpoint,
            config,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, GatewayError> {
        let text = sanitize(text);
        let body = SynthesizeRequest {
            input: SynthesisInput { text: &text },
            voice: VoiceSelection {
                language_code: &self.config.language_code,
                name: &self.config.voice_name,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                speaking_rate: self.config.speaking_rate,
            },
        };

        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("key", &self.config.api_key);

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(TTS, e))?;
        if !response.status().is_success() {
            return Err(GatewayError::rejected(TTS, response).await);
        }
        let decoded: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::from_reqwest(TTS, e))?;
        STANDARD
            .decode(decoded.audio_content)
            .map_err(|e| GatewayError::protocol(TTS, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn config() -> TtsConfig {
        TtsConfig {
            api_key: "secret".into(),
            language_code: "fr-FR".into(),
            voice_name: "fr-FR-Chirp3-HD-Sulafat".into(),
            speaking_rate: 1.5,
        }
    }

    fn synthesizer(server: &mockito::ServerGuard) -> GoogleTts {
        let endpoint = Url::parse(&format!("{}/v1/text:synthesize", server.url())).unwrap();
        GoogleTts::with_endpoint(config(), endpoint).unwrap()
    }

    #[test]
    fn sanitize_flattens_control_whitespace() {
        assert_eq!(sanitize("Bonjour\nça va ?\r\n\tOui"), "Bonjour ça va ?   Oui");
    }

    #[tokio::test]
    async fn sends_voice_and_decodes_audio() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/text:synthesize")
            .match_query(Matcher::UrlEncoded("key".into(), "secret".into()))
            .match_body(Matcher::Json(json!({
                "input": {"text": "Salut toi"},
                "voice": {"languageCode": "fr-FR", "name": "fr-FR-Chirp3-HD-Sulafat"},
                "audioConfig": {"audioEncoding": "MP3", "speakingRate": 1.5}
            })))
            .with_body(json!({"audioContent": STANDARD.encode(b"mp3-bytes")}).to_string())
            .create_async()
            .await;

        let audio = synthesizer(&server).synthesize("Salut\ntoi").await.unwrap();
        assert_eq!(audio, b"mp3-bytes");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejection_and_bad_audio_are_errors() {
        let mut server = mockito::Server::new_async().await;
        let _m1 = server
            .mock("POST", "/v1/text:synthesize")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;
        let err = synthesizer(&server).synthesize("x").await.unwrap_err();
        assert!(matches!(err, GatewayError::UpstreamRejected { status: 403, .. }));

        let mut server = mockito::Server::new_async().await;
        let _m2 = server
            .mock("POST", "/v1/text:synthesize")
            .match_query(Matcher::Any)
            .with_body(r#"{"audioContent":"***"}"#)
            .create_async()
            .await;
        let err = synthesizer(&server).synthesize("x").await.unwrap_err();
        assert!(matches!(err, GatewayError::Protocol { .. }));
    }
}
