use std::ffi::OsString;
use std::fmt;

use serde::Serialize;

use super::flags::StartupFlags;
use super::steps::{planned_steps, AdminStep, ManageCommand};

/// What `start` would do under the current environment, without doing it.
#[derive(Debug, Serialize)]
pub struct Plan {
    pub flags: StartupFlags,
    pub steps: Vec<PlannedStep>,
    pub command: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PlannedStep {
    pub step: AdminStep,
    pub argv: Vec<String>,
}

impl Plan {
    pub fn new(flags: StartupFlags, manage: &ManageCommand, command: &[OsString]) -> Self {
        let steps = planned_steps(&flags)
            .into_iter()
            .map(|step| PlannedStep {
                step,
                argv: manage
                    .argv(step)
                    .iter()
                    .map(|a| a.to_string_lossy().to_string())
                    .collect(),
            })
            .collect();
        Self {
            flags,
            steps,
            command: command
                .iter()
                .map(|a| a.to_string_lossy().to_string())
                .collect(),
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = |on: bool| if on { "run" } else { "skip" };
        writeln!(f, "migrate: {}", state(self.flags.migrate))?;
        writeln!(f, "collectstatic: {}", state(self.flags.collect_static))?;
        for planned in &self.steps {
            writeln!(f, "step: {}", planned.argv.join(" "))?;
        }
        write!(f, "exec: {}", self.command.join(" "))
    }
}
