use anyhow::{anyhow, Result};
use clap::Parser;
use hubload_types::HubModelId;
use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::args::Args;
use crate::commands::upload::{self, UploadRequest};
use crate::config::Config;

pub struct Cli {
    args: Args,
}

impl Cli {
    pub fn parse() -> Self {
        Self {
            args: Args::parse(),
        }
    }

    pub async fn exec(self) -> Result<()> {
        self.setup();
        let config = Config::resolve(&self.args)?;

        let request = UploadRequest {
            model_id: HubModelId::new(self.args.model_id.as_str()),
            task_type: self.args.task_type.into(),
            start: self.args.start,
        };

        // Dropping the upload future on interrupt releases the scratch directory before we exit.
        let mut stdout = std::io::stdout();
        tokio::select! {
            result = upload::exec(request, &config, &mut stdout) => result.map(|_| ()),
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, the temporary files have been removed");
                Err(anyhow!("Interrupted"))
            },
        }
    }

    fn setup(&self) {
        // Build the filter from cli args, or environment variable
        let env_filter = EnvFilter::builder()
            .with_default_directive(
                match self.args.verbose {
                    0 => LevelFilter::INFO,
                    1 => LevelFilter::DEBUG,
                    _2_or_more => LevelFilter::TRACE,
                }
                .into(),
            )
            .from_env_lossy()
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("rustls=warn".parse().unwrap());

        // Progress goes to stdout, so logs are kept on stderr.
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_file(self.args.with_log_locations)
                    .with_line_number(self.args.with_log_locations),
            )
            .with(env_filter)
            .init();
    }
}
