// crates/wrapper/src/state.rs
//! Shared state of the gateway.

use std::sync::Arc;

use coach_types::UserResolver;

use crate::agent::AgentClient;
use crate::backend::CoachBackendClient;
use crate::config::WrapperConfig;
use crate::error::GatewayError;
use crate::proxy::SessionProxy;
use crate::sessions::SessionDirectory;
use crate::tts::{GoogleTts, SpeechSynthesizer};
use crate::CoachSessions;

pub struct WrapperState {
    pub identity: UserResolver,
    pub sessions: Arc<CoachSessions>,
    pub proxy: SessionProxy,
    /// `None` when no TTS key is configured; replies are then text only.
    pub tts: Option<Arc<dyn SpeechSynthesizer>>,
}

impl WrapperState {
    pub fn new(
        identity: UserResolver,
        sessions: Arc<CoachSessions>,
        proxy: SessionProxy,
        tts: Option<Arc<dyn SpeechSynthesizer>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            identity,
            sessions,
            proxy,
            tts,
        })
    }

    pub fn from_config(config: &WrapperConfig) -> Result<Arc<Self>, GatewayError> {
        let backend = CoachBackendClient::new(config.backend_url.clone())?;
        let agent = AgentClient::new(config.agent_url.clone(), config.agent_name.clone())?;
        let sessions = Arc::new(SessionDirectory::new(
            backend.clone(),
            agent,
            config.user_first_name.clone(),
        ));
        let proxy = SessionProxy::new(sessions.clone(), Some(backend));
        let tts = match &config.tts {
            Some(tts) => Some(Arc::new(GoogleTts::new(tts.clone())?) as Arc<dyn SpeechSynthesizer>),
            None => None,
        };
        Ok(Self::new(config.identity(), sessions, proxy, tts))
    }
}
