use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use aea_envelope::config::Config;
use aea_envelope::error::{EnvelopeError, Result};
use aea_envelope::Envelope;

#[derive(Parser, Debug)]
#[command(name = "aea-envelope")]
#[command(about = "Encode, decode and inspect agent envelopes")]
struct Cli {
    #[arg(long, env = "AEA_ENVELOPE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read an envelope as JSON and print its wire bytes as base64
    Encode {
        #[arg(long, default_value = "-")]
        input: String,
    },
    /// Read base64 wire bytes and print the envelope as JSON
    Decode {
        #[arg(long, default_value = "-")]
        input: String,

        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Read base64 wire bytes and describe every field
    Inspect {
        #[arg(long, default_value = "-")]
        input: String,
    },
}

async fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut content = String::new();
        tokio::io::stdin().read_to_string(&mut content).await?;
        return Ok(content);
    }
    Ok(tokio::fs::read_to_string(input).await?)
}

fn check_size(size: usize, max: usize) -> Result<()> {
    if size > max {
        return Err(EnvelopeError::FrameTooLarge { size, max });
    }
    Ok(())
}

fn encode_json(json: &str, max_frame_size: usize) -> Result<Vec<u8>> {
    let envelope: Envelope = serde_json::from_str(json)
        .map_err(|e| EnvelopeError::Serialization(format!("invalid envelope json: {e}")))?;
    check_size(envelope.encoded_len(), max_frame_size)?;
    Ok(envelope.encode())
}

fn decode_base64(encoded: &str, max_frame_size: usize) -> Result<Envelope> {
    let bytes = BASE64
        .decode(encoded.trim().as_bytes())
        .map_err(|e| EnvelopeError::Serialization(format!("invalid base64 input: {e}")))?;
    check_size(bytes.len(), max_frame_size)?;
    debug!(bytes = bytes.len(), "decoding envelope");
    Envelope::decode(&bytes)
}

fn describe(envelope: &Envelope) -> String {
    let protocol = match envelope.parsed_protocol_id() {
        Ok(id) => format!(
            "{} (author={}, name={}, version={})",
            envelope.protocol_id, id.author(), id.name(), id.version()
        ),
        Err(_) => envelope.protocol_id.clone(),
    };
    [
        format!("to:          {}", envelope.to),
        format!("sender:      {}", envelope.sender),
        format!("protocol_id: {protocol}"),
        format!("message:     {} bytes", envelope.message.len()),
        format!("uri:         {}", envelope.uri),
        format!("unknown:     {} bytes", envelope.unknown_fields.len()),
        format!("encoded:     {} bytes", envelope.encoded_len()),
    ]
    .join("\n")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    }
    .with_env_overrides()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Encode { input } => {
            let json = read_input(&input).await?;
            let encoded = encode_json(&json, config.max_frame_size())?;
            println!("{}", BASE64.encode(encoded));
        }
        Commands::Decode { input, pretty } => {
            let envelope = decode_base64(&read_input(&input).await?, config.max_frame_size())?;
            let json = if pretty {
                serde_json::to_string_pretty(&envelope)
            } else {
                serde_json::to_string(&envelope)
            }
            .map_err(|e| EnvelopeError::Serialization(e.to_string()))?;
            println!("{json}");
        }
        Commands::Inspect { input } => {
            let envelope = decode_base64(&read_input(&input).await?, config.max_frame_size())?;
            println!("{}", describe(&envelope));
        }
    }
    Ok(())
}
