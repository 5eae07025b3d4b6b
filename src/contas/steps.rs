// Purpose: Administrative steps run before handing control to the server.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use subprocess::{ExitStatus, Popen, PopenConfig};

use super::error::LaunchError;
use super::flags::StartupFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminStep {
    Migrate,
    CollectStatic,
}

impl AdminStep {
    /// The manage.py subcommand, always non-interactive.
    pub fn args(&self) -> [&'static str; 2] {
        match self {
            AdminStep::Migrate => ["migrate", "--noinput"],
            AdminStep::CollectStatic => ["collectstatic", "--noinput"],
        }
    }
}

impl fmt::Display for AdminStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminStep::Migrate => write!(f, "migrate"),
            AdminStep::CollectStatic => write!(f, "collectstatic"),
        }
    }
}

/// Steps enabled by `flags`, migrations first.
pub fn planned_steps(flags: &StartupFlags) -> Vec<AdminStep> {
    let mut steps = vec![];
    if flags.migrate {
        steps.push(AdminStep::Migrate);
    }
    if flags.collect_static {
        steps.push(AdminStep::CollectStatic);
    }
    steps
}

pub trait StepRunner {
    fn run_step(&self, step: AdminStep) -> Result<(), LaunchError>;
}

/// Runs steps as `<python> <manage_py> <subcommand> --noinput`.
#[derive(Debug, Clone)]
pub struct ManageCommand {
    pub python: String,
    pub manage_py: PathBuf,
}

impl Default for ManageCommand {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            manage_py: PathBuf::from("manage.py"),
        }
    }
}

impl ManageCommand {
    pub fn argv(&self, step: AdminStep) -> Vec<OsString> {
        let mut argv: Vec<OsString> = vec![
            OsString::from(&self.python),
            self.manage_py.clone().into_os_string(),
        ];
        argv.extend(step.args().iter().map(OsString::from));
        argv
    }
}

impl StepRunner for ManageCommand {
    fn run_step(&self, step: AdminStep) -> Result<(), LaunchError> {
        let argv = self.argv(step);
        info!("Running {}", step);
        debug!("Step command: {:?}", argv);

        // stdin/stdout/stderr are inherited so the step's output reaches the container log.
        let mut p = Popen::create(argv.as_slice(), PopenConfig::default()).map_err(|e| {
            LaunchError::StepSpawn {
                step,
                reason: e.to_string(),
            }
        })?;
        let status = p.wait().map_err(|e| LaunchError::StepSpawn {
            step,
            reason: e.to_string(),
        })?;
        check_status(step, status)
    }
}

fn check_status(step: AdminStep, status: ExitStatus) -> Result<(), LaunchError> {
    match status {
        ExitStatus::Exited(0) => Ok(()),
        ExitStatus::Exited(code) => Err(LaunchError::StepFailed {
            step,
            code: i32::try_from(code).unwrap_or(1),
        }),
        ExitStatus::Signaled(signal) => Err(LaunchError::StepKilled { step, signal }),
        ExitStatus::Other(code) => Err(LaunchError::StepFailed { step, code }),
        ExitStatus::Undetermined => Err(LaunchError::StepFailed { step, code: 1 }),
    }
}
