//! `printgate watch`: stream notices until Ctrl-C.

use chrono::Local;
use tokio::sync::broadcast::error::RecvError;

use printgate_core::Workflow;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(workflow: &Workflow, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let mut notices = workflow.notices();

    // A failed status check is reported as a notice; keep watching.
    workflow.start().await?;
    if !global.quiet {
        eprintln!("Watching {} (Ctrl-C to stop)", workflow.config().push_url);
    }

    loop {
        tokio::select! {
            notice = notices.recv() => match notice {
                Ok(notice) => {
                    if !global.quiet || notice.is_error() {
                        let at = notice.at.with_timezone(&Local).format("%H:%M:%S");
                        eprint!("[{at}] ");
                    }
                    output::print_notice(&notice, color, global.quiet);
                }
                Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "notice stream lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}
