use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "fishai-server")]
#[command(about = "FishAI image classification service", long_about = None)]
pub struct Cli {
    /// Configuration file path (YAML)
    #[arg(short, long, env = "FISHAI_CONFIG", default_value = "fishai.yaml")]
    pub config: PathBuf,

    /// Listen address
    #[arg(short = 'l', long)]
    pub host: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// Directory holding config.json and model.safetensors
    #[arg(short, long)]
    pub model_dir: Option<PathBuf>,

    /// Hugging Face repository to fetch the model from instead of model_dir
    #[arg(long)]
    pub model_repo: Option<String>,

    /// Directory for stored uploads
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Provenance log location
    #[arg(long)]
    pub metadata_path: Option<PathBuf>,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
