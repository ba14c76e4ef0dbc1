use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use anyhow::Result;
use tracing::{debug, warn};

use cc_statusline::cli::Args;
use cc_statusline::config::Config;
use cc_statusline::display::{placeholder_line, render, RenderOptions};
use cc_statusline::git::working_tree_status;
use cc_statusline::logging::init_logging;
use cc_statusline::models::SessionSnapshot;
use cc_statusline::quota::select_provider;
use cc_statusline::utils::read_stdin;

fn main() {
    let (args, arg_error) = Args::parse();
    init_logging(args.debug);
    if let Some(e) = arg_error {
        warn!(error = %e, "ignoring invalid arguments");
    }

    // The host keeps its previous statusline on a non-zero exit, so every
    // failure still ends in exit 0 with something on stdout.
    let lines = match panic::catch_unwind(AssertUnwindSafe(|| build_lines(&args))) {
        Ok(Ok(lines)) => lines,
        Ok(Err(e)) => {
            warn!(error = %format!("{e:#}"), "render failed");
            vec![placeholder_line(&RenderOptions::default())]
        }
        Err(_) => vec![placeholder_line(&RenderOptions::default())],
    };

    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "{}", lines.join("\n"));
    let _ = out.flush();
}

fn build_lines(args: &Args) -> Result<Vec<String>> {
    let config = Config::load(args);
    let opts = RenderOptions::from_config(&config);

    let stdin = read_stdin()?;
    let snapshot = match SessionSnapshot::from_slice(&stdin) {
        Ok(s) => s,
        Err(e) => {
            debug!(error = %format!("{e:#}"), "unusable statusLine input");
            return Ok(vec![placeholder_line(&opts)]);
        }
    };

    let git = if config.git_enabled {
        let dir = Some(snapshot.working_directory.as_str())
            .filter(|d| !d.is_empty())
            .map(Path::new);
        working_tree_status(&config, dir)
    } else {
        None
    };

    let quota = select_provider(&config, &stdin).and_then(|provider| {
        let report = provider.fetch();
        debug!(source = provider.name(), present = report.is_some(), "quota");
        report
    });

    Ok(render(&snapshot, git.as_ref(), quota.as_ref(), &opts))
}
