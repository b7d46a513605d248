use std::path::Path;
use std::process::ExitCode;

use hoist::cleanup::CleanupReport;
use hoist::cmd::SystemRunner;
use hoist::logging;
use hoist::params::RunId;
use hoist::pipeline::{self, Cli, Outcome, Settings};
use hoist::resolve::TerminalPrompter;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let (cli, unknown) = match Cli::parse_lenient(std::env::args().skip(1)) {
        Ok(parsed) => parsed,
        Err(e) => e.exit(),
    };

    let run_id = RunId::now();
    let log_file = run_id.log_file();
    let _guard = match logging::init(Path::new(&log_file)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    for arg in &unknown {
        warn!("ignoring unknown argument {arg}");
    }
    info!("logging to {log_file}");

    let env = |key: &str| std::env::var(key).ok();
    let result = pipeline::execute(
        &cli,
        run_id,
        &SystemRunner,
        &env,
        &mut TerminalPrompter,
        Settings::default(),
    );

    match result {
        Ok(Outcome::Deployed(summary)) => {
            if !summary.validation.reachable() {
                warn!("deployed, but the application did not answer every probe");
            }
            ExitCode::SUCCESS
        }
        Ok(Outcome::Cleaned(report)) => {
            report_cleanup(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let code = e.exit_code();
            error!("{}", e.detail());
            error!("run failed (exit code {code}), see {log_file}");
            ExitCode::from(code)
        }
    }
}

fn report_cleanup(report: &CleanupReport) {
    for step in report.steps.iter().filter(|s| s.result.is_err()) {
        warn!("cleanup step '{}' did not complete", step.name);
    }
}
