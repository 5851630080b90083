//! `ensemble transcribe`: speech to text for one audio file.

use anyhow::Result;
use colored::Colorize;
use tracing::warn;

use ensemble_core::config::load_config;
use ensemble_providers::transcription::is_audio_file;
use ensemble_providers::{WhisperClient, WhisperResponse};

use crate::helpers;

pub async fn run(file: &str, model: Option<String>, keep_loaded: bool) -> Result<()> {
    let mut config = load_config(None).transcription;
    if let Some(model) = model {
        config.model = model;
    }
    if keep_loaded {
        config.auto_close = false;
    }

    if !is_audio_file(file) {
        warn!(file, "file extension does not look like audio");
    }

    let mut client = WhisperClient::from_config(&config)?;
    let response = client.transcribe(&helpers::expand_tilde(file)).await?;
    print_transcript(client.model_name(), &response);
    Ok(())
}

fn print_transcript(model: &str, response: &WhisperResponse) {
    println!();
    println!("{}", response.text.trim());
    println!();

    let mut stats = format!(
        "model: {model} | language: {} | audio: {:.1}s | took: {:.1}s",
        if response.language.is_empty() { "?" } else { &response.language },
        response.duration(),
        response.transcribe_time.as_secs_f64(),
    );
    if let Some(speed) = response.speed_factor() {
        stats.push_str(&format!(" | {speed:.2}s per audio second"));
    }
    println!("{}", stats.dimmed());
    println!();
}
