// crates/wrapper/src/config.rs
use reqwest::Url;

use coach_types::{ConfigError, Env, UserResolver};

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_LANGUAGE_CODE: &str = "fr-FR";
pub const DEFAULT_VOICE_NAME: &str = "fr-FR-Chirp3-HD-Sulafat";
pub const DEFAULT_SPEAKING_RATE: f32 = 1.1;

#[derive(Debug, Clone, PartialEq)]
pub struct TtsConfig {
    pub api_key: String,
    pub language_code: String,
    pub voice_name: String,
    pub speaking_rate: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrapperConfig {
    pub port: u16,
    /// `http://{COACH_AGENT_HOST}:{COACH_AGENT_PORT}`
    pub agent_url: Url,
    pub agent_name: String,
    pub backend_url: Url,
    pub user_email: Option<String>,
    /// Seeds `user:first_name` in new sessions.
    pub user_first_name: Option<String>,
    /// `None` disables speech synthesis.
    pub tts: Option<TtsConfig>,
}

fn parse_url(name: &'static str, value: String) -> Result<Url, ConfigError> {
    Url::parse(&value).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
        value,
    })
}

impl WrapperConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&Env::process())
    }

    pub fn from_lookup(env: &Env) -> Result<Self, ConfigError> {
        let agent_host = env.require("COACH_AGENT_HOST")?;
        let agent_port = env.require("COACH_AGENT_PORT")?;
        let agent_port: u16 = agent_port.parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::Invalid {
                name: "COACH_AGENT_PORT",
                reason: e.to_string(),
                value: agent_port.clone(),
            }
        })?;
        let agent_url = parse_url(
            "COACH_AGENT_HOST",
            format!("http://{agent_host}:{agent_port}"),
        )?;

        let tts = match env.get("TTS_API_KEY") {
            None => None,
            Some(api_key) => Some(TtsConfig {
                api_key,
                language_code: env
                    .get("TTS_LANGUAGE_CODE")
                    .unwrap_or_else(|| DEFAULT_LANGUAGE_CODE.to_string()),
                voice_name: env
                    .get("TTS_VOICE_NAME")
                    .unwrap_or_else(|| DEFAULT_VOICE_NAME.to_string()),
                speaking_rate: env.parse_or("TTS_SPEAKING_RATE", DEFAULT_SPEAKING_RATE)?,
            }),
        };

        Ok(Self {
            port: env.parse_or("PORT", DEFAULT_PORT)?,
            agent_url,
            agent_name: env.require("COACH_AGENT_NAME")?,
            backend_url: parse_url("COACH_BACKEND_URL", env.require("COACH_BACKEND_URL")?)?,
            user_email: env.get("COACH_USER_EMAIL"),
            user_first_name: env.get("COACH_USER_FIRST_NAME"),
            tts,
        })
    }

    pub fn identity(&self) -> UserResolver {
        UserResolver::from_stub(self.user_email.clone())
    }
}
