mod cli;
mod error_fmt;
mod logging;
mod run;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if !cli.json {
        let _ = color_eyre::install();
    }

    if let Err(e) = real_main(cli) {
        tracing::error!(error = %e, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let loaded = cadence_config::load_file(&cli.config);
    logging::init(
        cli.json,
        &cli.log_level,
        loaded.as_ref().ok().map(|c| &c.logging),
    );
    let cfg = loaded.wrap_err("loading config")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
        .wrap_err("installing Ctrl-C handler")?;

    match cli.cmd {
        Commands::Track {
            cadence,
            seconds,
            cue,
            speed,
        } => {
            run::track(&cfg, cadence, seconds, cue, speed, cli.json, &shutdown)?;
        }
        Commands::Calibrate {
            bias,
            seconds_per_tempo,
            speed,
        } => {
            run::calibrate(&cfg, bias, seconds_per_tempo, speed, cli.json, &shutdown)?;
        }
        Commands::Diagnostics {
            bpm,
            seconds,
            mode,
            speed,
        } => {
            run::diagnostics(&cfg, bpm, seconds, mode.map(Into::into), speed, cli.json)?;
        }
        Commands::SelfCheck => run::self_check(&cfg, cli.json)?,
    }
    Ok(())
}
