//! Command dispatch: bridges CLI args -> workflow operations -> output formatting.

pub mod config_cmd;
pub mod device;
pub mod enroll;
pub mod identify;
pub mod operation;
pub mod status;
pub mod util;
pub mod watch;

use printgate_core::Workflow;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    workflow: &Workflow,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(workflow, global).await,
        Command::Init => device::init(workflow, global).await,
        Command::Capture(args) => device::capture(workflow, args, global).await,
        Command::Match => device::match_templates(workflow, global).await,
        Command::Enroll(args) => enroll::handle(workflow, args, global).await,
        Command::Identify => identify::handle(workflow, global).await,
        Command::Watch => watch::handle(workflow, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "local command routed to the device service".into(),
        )),
    }
}
