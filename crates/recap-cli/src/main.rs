use std::path::PathBuf;

use clap::{Parser, Subcommand};

use recap_pipeline::UploadPayload;
use recap_types::mime_for_extension;

#[derive(Parser)]
#[command(name = "recap", about = "Audio/video transcription and summarization service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run a local file through the pipeline and print the JSON response
    Transcribe {
        /// Audio or video file to process
        file: PathBuf,

        /// Language hint for the transcription engine (e.g. "en")
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Validate configuration and provider credentials
    Check,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let mut config = recap_config::load_config()?;
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(recap_gateway::start_server(config))
                .map_err(|e| anyhow::anyhow!("{e}"))?;
        }
        Commands::Transcribe { file, language } => {
            let config = recap_config::load_config()?;
            config.validate()?;

            let bytes = std::fs::read(&file)?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let mime_type = recap_types::extension_of(&filename)
                .map(|ext| mime_for_extension(&ext).to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(async {
                let pipeline =
                    recap_gateway::build_pipeline(&config).map_err(|e| anyhow::anyhow!("{e}"))?;
                let response = pipeline
                    .run(UploadPayload {
                        bytes,
                        filename,
                        mime_type,
                        language,
                    })
                    .await?;
                println!("{}", serde_json::to_string_pretty(&response)?);
                Ok::<_, anyhow::Error>(())
            })?;
        }
        Commands::Check => {
            let config = recap_config::load_config()?;
            config.validate()?;
            println!(
                "Configuration OK (transcription: {}, summary model: {})",
                config.transcription.provider.as_str(),
                config.summary.model
            );
        }
    }

    Ok(())
}
