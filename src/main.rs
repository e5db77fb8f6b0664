#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::doc_markdown)]
//! scstacks: correlate Service Catalog provisioned products with CloudFormation stacks.

mod audit;
mod aws;
mod cli;
mod types;

use anyhow::Context;
use clap::Parser;
use tracing::level_filters::LevelFilter;

use audit::{AuditError, CleanupOptions};
use aws::AwsInventory;
use cli::output::{write_lookup_failure, write_report};
use cli::{Cli, OutputCtx, normalize_args, write_error};
use types::{ErrorOutput, ReportOutput};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    init_tracing(cli.log_level());

    let ctx = OutputCtx::new(cli.output, cli.json, cli.no_header);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    match runtime.block_on(run(&cli, &ctx)) {
        Ok(()) => Ok(()),
        Err(err) => {
            let error_output = ErrorOutput::from_audit_error(&err);
            write_error(&error_output, cli.output, cli.json);
            std::process::exit(err.exit_code());
        }
    }
}

async fn run(cli: &Cli, ctx: &OutputCtx) -> Result<(), AuditError> {
    let opts = CleanupOptions {
        profile: cli.profile.clone(),
        region: cli.region.clone(),
        delete: cli.delete,
    };

    let t_config = ctx.timer("load_config");
    let inventory = AwsInventory::connect(&opts.profile, &opts.region).await;
    drop(t_config);

    let t_audit = ctx.timer("audit");
    let result = audit::audit(&inventory, &opts, |i, n| ctx.show_progress(i, n)).await;
    drop(t_audit);
    ctx.clear_progress();
    let report = result?;

    let mut stderr = std::io::stderr().lock();
    for failure in &report.failures {
        let _ = write_lookup_failure(&mut stderr, failure, &opts.profile);
    }
    drop(stderr);
    write_report(&ReportOutput::new(&report, &opts), ctx);

    report.termination_result()
}

/// Diagnostics go to stderr. `RUST_LOG` overrides the verbosity flags.
fn init_tracing(level: LevelFilter) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init();
}
