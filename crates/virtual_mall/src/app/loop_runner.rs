use std::process::ExitCode;

use tracing::error;
use walkthrough::{run_app, AppError};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_app(app.config, app.session, app.host) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::GraphicsUnavailable(err)) => {
            error!(error = %err, "3D view unavailable");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
