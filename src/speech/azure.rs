//! Azure text-to-speech over REST

use async_trait::async_trait;
use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::config::SpeechConfig;
use crate::error::{Error, Result};
use crate::speech::ssml::SsmlTemplate;

/// Turns text into raw 16-bit mono PCM
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text`
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Sample rate of the returned PCM
    fn sample_rate(&self) -> u32;
}

/// Azure Speech REST synthesizer
pub struct AzureSpeechSynthesizer {
    client: Client,
    endpoint: String,
    key: SecretString,
    output_format: String,
    sample_rate: u32,
    template: SsmlTemplate,
}

impl AzureSpeechSynthesizer {
    /// Create a synthesizer. Fails when key or region is missing.
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        if config.key.expose_secret().is_empty() {
            return Err(Error::Speech("speech key is not configured".to_string()));
        }
        if config.region.is_empty() && config.endpoint.is_none() {
            return Err(Error::Speech("speech region is not configured".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("ocbot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(AzureSpeechSynthesizer {
            client,
            endpoint: config.endpoint(),
            key: config.key.clone(),
            output_format: config.output_format.clone(),
            sample_rate: config.sample_rate,
            template: SsmlTemplate::new(config)?,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for AzureSpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let ssml = self.template.render(text)?;
        debug!("Synthesizing {} chars via {}", text.chars().count(), self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", self.key.expose_secret())
            .header("X-Microsoft-OutputFormat", &self.output_format)
            .header(header::CONTENT_TYPE, "application/ssml+xml")
            .body(ssml)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Speech(format!(
                "synthesis failed ({}): {}",
                status.as_u16(),
                body
            )));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(Error::Speech("synthesis returned no audio".to_string()));
        }

        info!("Speech synthesized successfully ({} bytes)", audio.len());
        Ok(audio.to_vec())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
