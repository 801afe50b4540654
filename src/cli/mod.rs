pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rowgate")]
#[command(about = "rowgate - JSON over HTTP for PostgreSQL tables, scoped by database role")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve(commands::serve::ServeArgs),

    #[command(about = "Print the SQL a query compiles to (no database needed)")]
    Compile(commands::compile::CompileArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Serve(args) => commands::serve::handle(args).await,
        Commands::Compile(args) => commands::compile::handle(args, output_format),
    }
}
