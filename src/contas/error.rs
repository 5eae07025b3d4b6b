use thiserror::Error;

use super::steps::AdminStep;

/// Exit code a POSIX shell reports for a command it cannot find.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code a POSIX shell reports for a command it found but cannot run.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("{step} failed with exit code {code}")]
    StepFailed { step: AdminStep, code: i32 },

    #[error("{step} was killed by signal {signal}")]
    StepKilled { step: AdminStep, signal: u8 },

    #[error("could not start {step}: {reason}")]
    StepSpawn { step: AdminStep, reason: String },

    #[error("could not exec {program}: {source}")]
    Exec {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An empty command vector reached `Launcher::launch`. The CLI always
    /// falls back to the profile's server command, so only library callers
    /// can hit this; it is reported like any other failure.
    #[error("no command given and no default server command available")]
    EmptyCommand,
}

impl LaunchError {
    /// The status the entrypoint should exit with for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchError::StepFailed { code, .. } => *code,
            LaunchError::StepKilled { signal, .. } => 128 + i32::from(*signal),
            LaunchError::StepSpawn { .. } => EXIT_NOT_FOUND,
            LaunchError::Exec { source, .. } => match source.kind() {
                std::io::ErrorKind::NotFound => EXIT_NOT_FOUND,
                _ => EXIT_NOT_EXECUTABLE,
            },
            LaunchError::EmptyCommand => 1,
        }
    }
}
