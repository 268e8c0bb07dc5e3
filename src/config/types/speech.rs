//! Speech configuration types
//!
//! Azure TTS voice/style parameters and the external SILK encoder command.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Azure Speech subscription key
    #[serde(skip_serializing, default = "default_secret")]
    pub key: SecretString,
    /// Azure region, e.g. `eastasia`
    #[serde(default)]
    pub region: String,
    /// SSML `xml:lang`
    #[serde(default = "default_xml_lang")]
    pub xml_lang: String,
    /// Voice name
    #[serde(default = "default_voice_name")]
    pub voice_name: String,
    /// Speaking style for `mstts:express-as`
    #[serde(default = "default_style")]
    pub style: String,
    /// Style degree for `mstts:express-as`
    #[serde(default = "default_style_degree")]
    pub style_degree: String,
    /// Value of `X-Microsoft-OutputFormat`; must be a raw PCM format
    #[serde(default = "default_output_format")]
    pub output_format: String,
    /// Sample rate of `output_format`
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Endpoint override (defaults to the regional TTS endpoint)
    pub endpoint: Option<String>,
    /// Voice encoder command
    #[serde(default)]
    pub encoder: EncoderConfig,
    /// Request timeout
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        SpeechConfig {
            key: default_secret(),
            region: String::new(),
            xml_lang: default_xml_lang(),
            voice_name: default_voice_name(),
            style: default_style(),
            style_degree: default_style_degree(),
            output_format: default_output_format(),
            sample_rate: default_sample_rate(),
            endpoint: None,
            encoder: EncoderConfig::default(),
            timeout: default_timeout(),
        }
    }
}

impl SpeechConfig {
    /// Resolve the synthesis endpoint
    pub fn endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!(
                "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
                self.region
            ),
        }
    }
}

fn default_xml_lang() -> String {
    "zh-CN".to_string()
}

fn default_voice_name() -> String {
    "zh-CN-XiaochenNeural".to_string()
}

fn default_style() -> String {
    "live_commercial".to_string()
}

fn default_style_degree() -> String {
    "2".to_string()
}

fn default_output_format() -> String {
    "raw-24khz-16bit-mono-pcm".to_string()
}

fn default_sample_rate() -> u32 {
    24_000
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

/// External PCM → SILK encoder invocation.
///
/// `{input}`, `{output}` and `{rate}` in `args` are replaced with the PCM
/// file, the SILK file and the PCM sample rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Program name or path
    #[serde(default = "default_encoder_program")]
    pub program: String,
    /// Argument template
    #[serde(default = "default_encoder_args")]
    pub args: Vec<String>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            program: default_encoder_program(),
            args: default_encoder_args(),
        }
    }
}

fn default_encoder_program() -> String {
    "silk_v3_encoder".to_string()
}

fn default_encoder_args() -> Vec<String> {
    ["{input}", "{output}", "-Fs_API", "{rate}", "-tencent", "-quiet"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
