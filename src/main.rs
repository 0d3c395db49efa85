// Copyright 2018-2022 Cargill Incorporated
// SPDX-License-Identifier: Apache-2.0

use crate::orchestrator::{Cli, OrchResult};
use aws_config::BehaviorVersion;
use aws_types::region::Region;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod ec2_utils;
mod github_utils;
mod orchestrator;
mod user_data;

#[tokio::main(flavor = "current_thread")]
async fn main() -> OrchResult<()> {
    // Diagnostics go to stderr; stdout is reserved for pipeline output
    // lines and operator-facing progress.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Cli::parse().into_config()?;
    let region = Region::new(config.region.clone());
    let aws_config = aws_config::defaults(BehaviorVersion::latest())
        .region(region)
        .load()
        .await;

    orchestrator::run(&config, &aws_config).await
}
