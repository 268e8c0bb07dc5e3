//! Speech module - voice replies
//!
//! Text is rendered into SSML, synthesized to raw PCM by Azure, encoded to
//! SILK by an external encoder and base64-encoded for upload as a voice file.

mod azure;
mod encoder;
mod ssml;

pub use azure::{AzureSpeechSynthesizer, SpeechSynthesizer};
pub use encoder::{SilkEncoder, VoiceEncoder};
pub use ssml::{SsmlTemplate, DEFAULT_SSML_TEMPLATE};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::SpeechConfig;
use crate::error::Result;

/// Synthesizer plus encoder
#[derive(Clone)]
pub struct VoicePipeline {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    encoder: Arc<dyn VoiceEncoder>,
}

impl VoicePipeline {
    /// Assemble a pipeline from parts
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, encoder: Arc<dyn VoiceEncoder>) -> Self {
        VoicePipeline {
            synthesizer,
            encoder,
        }
    }

    /// Build the Azure + SILK pipeline
    pub fn from_config(config: &SpeechConfig) -> Result<Self> {
        let synthesizer = AzureSpeechSynthesizer::new(config)?;
        let encoder = SilkEncoder::new(&config.encoder)?;
        info!(
            "Voice replies enabled (voice {}, encoder {})",
            config.voice_name,
            encoder.program().display()
        );
        Ok(Self::new(Arc::new(synthesizer), Arc::new(encoder)))
    }

    /// Build the pipeline if speech is configured, logging why not otherwise
    pub fn try_from_config(config: Option<&SpeechConfig>) -> Option<Self> {
        let Some(config) = config else {
            warn!("Speech not configured, voice replies disabled");
            return None;
        };

        match Self::from_config(config) {
            Ok(pipeline) => Some(pipeline),
            Err(e) => {
                warn!("Voice replies disabled: {}", e);
                None
            }
        }
    }

    /// Synthesize and encode `text`, returning the encoded voice as base64
    pub async fn synthesize(&self, text: &str) -> Result<String> {
        let pcm = self.synthesizer.synthesize(text).await?;
        let silk = self
            .encoder
            .encode(&pcm, self.synthesizer.sample_rate())
            .await?;
        Ok(STANDARD.encode(silk))
    }

    /// Like [`synthesize`](Self::synthesize), logging failures
    pub async fn synthesize_base64(&self, text: &str) -> Option<String> {
        match self.synthesize(text).await {
            Ok(data) => Some(data),
            Err(e) => {
                error!("Voice synthesis failed: {}", e);
                None
            }
        }
    }
}
