use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scripture-api-generator")]
#[command(about = "Generate a static JSON API tree from USFM/USX scripture sources", long_about = None)]
pub struct Cli {
    #[arg(
        long,
        help = "Input envelope JSON files or directories (can be specified multiple times)"
    )]
    pub inputs: Vec<PathBuf>,

    #[arg(long, default_value = "out", help = "Output directory")]
    pub out: PathBuf,

    #[arg(long, help = "Minify JSON output")]
    pub minify_json: bool,

    #[arg(long, help = "Compress JSON with gzip")]
    pub gzip_json: bool,

    #[arg(
        long,
        help = "Use the book common name (spaces as underscores) in URL paths instead of the book id"
    )]
    pub use_common_name: bool,

    #[arg(
        long,
        help = "Skip failed books and emit a partial corpus instead of aborting"
    )]
    pub keep_going: bool,

    #[arg(long, help = "Validate an existing output tree only (no generation)")]
    pub validate_only: bool,

    #[arg(long, help = "Log directory")]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    pub fn parse() -> Self {
        Parser::parse()
    }
}
