use std::path::PathBuf;

use clap::Args;

use crate::config::AppConfig;

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, help = "YAML or JSON config file (defaults to the APP_ENV preset)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Port to listen on, overrides config and environment")]
    pub port: Option<u16>,
}

pub async fn handle(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.api.port = port;
    }
    crate::server::serve(config).await
}
