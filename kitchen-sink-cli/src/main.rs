/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::util::SubscriberInitExt;

mod cli_args;
mod modes;

use cli_args::{Mode, Opt};
use modes::demo::run_demo;
use modes::identity::print_identity;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `init` also routes the library crates' `log` records into tracing.
    tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .finish()
        .init();

    let opt = Opt::parse();
    match opt.mode {
        Mode::Identity(args) => print_identity(args).await?,
        Mode::Demo(args) => run_demo(args).await?,
    };

    Ok(())
}
