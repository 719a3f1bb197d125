use std::path::PathBuf;

use clap::Parser;

use crate::generator::{CommandGenerator, PreludeGenerator, TargetGenerator};
use crate::util::log::LogConfig;

/// Language-server proxy core keeping source and generated lines in step.
#[derive(Debug, Parser)]
#[command(name = "linemap-proxy", version)]
pub struct Config {
    /// Communicate over stdin/stdout (the only transport).
    #[arg(long)]
    pub stdio: bool,

    /// Log file, or a directory to place the default log file in.
    #[arg(long, env = "LINEMAP_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Program producing the target document from the source on stdin.
    #[arg(long, env = "LINEMAP_GENERATOR")]
    pub generator: Option<String>,

    /// Extra argument for the generator program, may be repeated.
    #[arg(long = "generator-arg", allow_hyphen_values = true)]
    pub generator_args: Vec<String>,

    /// Line emitted ahead of the source by the built-in generator, may be repeated.
    #[arg(long = "prelude")]
    pub prelude: Vec<String>,
}

impl Config {
    pub fn target_generator(&self) -> Box<dyn TargetGenerator> {
        match &self.generator {
            Some(program) => Box::new(CommandGenerator::new(
                program.clone(),
                self.generator_args.clone(),
            )),
            None => Box::new(PreludeGenerator::new(self.prelude.clone())),
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            log_file_path: self.log_file.clone(),
        }
    }
}
