use std::io::{self, BufReader};

use anyhow::Result;
use clap::Parser;
use tracing::info;

use linemap_proxy::config::Config;
use linemap_proxy::lsp::handler::Server;
use linemap_proxy::lsp::transport::serve;
use linemap_proxy::util::log;

fn main() -> Result<()> {
    let config = Config::parse();
    let _log_guard = log::init(config.log_config())?;
    info!(?config, "Starting linemap-proxy");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut reader = BufReader::new(stdin.lock());
    let mut writer = stdout.lock();

    let mut server = Server::new(config.target_generator());
    serve(&mut reader, &mut writer, &mut server)?;

    info!("Shutting down");
    Ok(())
}
