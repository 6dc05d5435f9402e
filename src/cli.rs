// cli.rs - Command-line interface configuration
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "scene-viewer")]
#[command(about = "glTF scene viewer with orbit controls and a reflective ring light", long_about = None)]
pub struct Cli {
    /// Route that selects the model ("/" or "/hamburger")
    #[arg(long, default_value = "/")]
    pub route: String,

    /// Directory holding models/ and environmentMaps/
    #[arg(long, default_value = "static")]
    pub assets: PathBuf,

    /// Optional JSON file overriding viewer settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Hide the debug panel
    #[arg(long = "no-ui", default_value = "false")]
    pub no_ui: bool,
}
