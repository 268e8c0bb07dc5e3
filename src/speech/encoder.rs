//! PCM to SILK voice encoding via an external encoder program

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::config::EncoderConfig;
use crate::error::{Error, Result};

/// Encodes raw PCM into the platform voice codec
#[async_trait]
pub trait VoiceEncoder: Send + Sync {
    /// Encode 16-bit mono PCM sampled at `sample_rate`
    async fn encode(&self, pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>>;
}

/// Runs an external SILK encoder on temporary files
#[derive(Debug, Clone)]
pub struct SilkEncoder {
    program: PathBuf,
    args: Vec<String>,
}

impl SilkEncoder {
    /// Locate the encoder program on `PATH` (or at the given path)
    pub fn new(config: &EncoderConfig) -> Result<Self> {
        let program = which::which(&config.program).map_err(|e| {
            Error::Encoder(format!("encoder '{}' not found: {}", config.program, e))
        })?;

        Ok(SilkEncoder {
            program,
            args: config.args.clone(),
        })
    }

    /// Path of the resolved program
    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    fn expand_args(&self, input: &str, output: &str, sample_rate: u32) -> Vec<String> {
        let rate = sample_rate.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", input)
                    .replace("{output}", output)
                    .replace("{rate}", &rate)
            })
            .collect()
    }
}

#[async_trait]
impl VoiceEncoder for SilkEncoder {
    async fn encode(&self, pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>> {
        if pcm.is_empty() {
            return Err(Error::Encoder("no PCM data to encode".to_string()));
        }

        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("voice.pcm");
        let output = workdir.path().join("voice.silk");
        tokio::fs::write(&input, pcm).await?;

        let args = self.expand_args(
            &input.to_string_lossy(),
            &output.to_string_lossy(),
            sample_rate,
        );
        debug!("Running {} {:?}", self.program.display(), args);

        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !result.status.success() {
            return Err(Error::Encoder(format!(
                "{} exited with {}: {}",
                self.program.display(),
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        let encoded = tokio::fs::read(&output).await.map_err(|e| {
            Error::Encoder(format!("encoder produced no output file: {}", e))
        })?;
        if encoded.is_empty() {
            return Err(Error::Encoder("encoder produced an empty file".to_string()));
        }

        debug!("Encoded {} PCM bytes into {} bytes", pcm.len(), encoded.len());
        Ok(encoded)
    }
}
