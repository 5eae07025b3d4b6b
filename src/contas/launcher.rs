use std::ffi::OsString;
use std::process::Command;

use log::{debug, info};

use super::error::LaunchError;
use super::flags::StartupFlags;
use super::steps::{planned_steps, AdminStep, StepRunner};

/// The container startup sequence: gated admin steps, then exec.
pub struct Launcher<R: StepRunner> {
    flags: StartupFlags,
    runner: R,
}

impl<R: StepRunner> Launcher<R> {
    pub fn new(flags: StartupFlags, runner: R) -> Self {
        Self { flags, runner }
    }

    /// Runs the enabled steps in order and stops at the first failure.
    pub fn prepare(&self) -> Result<Vec<AdminStep>, LaunchError> {
        if !self.flags.any() {
            debug!("No administrative steps enabled");
        }
        let steps = planned_steps(&self.flags);
        for step in &steps {
            self.runner.run_step(*step)?;
        }
        Ok(steps)
    }

    /// Prepares, then replaces the current process with `command`.
    ///
    /// On Unix this only returns on failure. Elsewhere the command is awaited
    /// and its exit code is returned.
    pub fn launch(&self, command: &[OsString]) -> Result<i32, LaunchError> {
        self.prepare()?;
        hand_off(command)
    }
}

fn display(command: &[OsString]) -> String {
    command
        .iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(unix)]
pub fn hand_off(command: &[OsString]) -> Result<i32, LaunchError> {
    use std::os::unix::process::CommandExt;

    let (program, args) = command.split_first().ok_or(LaunchError::EmptyCommand)?;
    info!("Starting {}", display(command));
    let source = Command::new(program).args(args).exec();
    Err(LaunchError::Exec {
        program: program.to_string_lossy().to_string(),
        source,
    })
}

#[cfg(not(unix))]
pub fn hand_off(command: &[OsString]) -> Result<i32, LaunchError> {
    let (program, args) = command.split_first().ok_or(LaunchError::EmptyCommand)?;
    info!("Starting {}", display(command));
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|source| LaunchError::Exec {
            program: program.to_string_lossy().to_string(),
            source,
        })?;
    Ok(status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingRunner {
        calls: RefCell<Vec<AdminStep>>,
        fail_on: Option<AdminStep>,
    }

    impl StepRunner for &RecordingRunner {
        fn run_step(&self, step: AdminStep) -> Result<(), LaunchError> {
            self.calls.borrow_mut().push(step);
            if self.fail_on == Some(step) {
                return Err(LaunchError::StepFailed { step, code: 2 });
            }
            Ok(())
        }
    }

    #[test]
    fn test_prepare_no_flags_runs_nothing() {
        let runner = RecordingRunner::default();
        let launcher = Launcher::new(StartupFlags::default(), &runner);
        assert!(launcher.prepare().unwrap().is_empty());
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_prepare_migrate_only() {
        let runner = RecordingRunner::default();
        let flags = StartupFlags {
            migrate: true,
            collect_static: false,
        };
        let launcher = Launcher::new(flags, &runner);
        launcher.prepare().unwrap();
        assert_eq!(*runner.calls.borrow(), vec![AdminStep::Migrate]);
    }

    #[test]
    fn test_prepare_stops_on_first_failure() {
        let runner = RecordingRunner {
            fail_on: Some(AdminStep::Migrate),
            ..Default::default()
        };
        let flags = StartupFlags {
            migrate: true,
            collect_static: true,
        };
        let launcher = Launcher::new(flags, &runner);
        let err = launcher.prepare().unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(*runner.calls.borrow(), vec![AdminStep::Migrate]);
    }

    #[test]
    fn test_launch_failure_never_reaches_command() {
        let runner = RecordingRunner {
            fail_on: Some(AdminStep::CollectStatic),
            ..Default::default()
        };
        let flags = StartupFlags {
            migrate: true,
            collect_static: true,
        };
        let launcher = Launcher::new(flags, &runner);
        // A command that would replace the test process if it were reached.
        let command = vec![OsString::from("true")];
        let err = launcher.launch(&command).unwrap_err();
        assert!(matches!(err, LaunchError::StepFailed { .. }));
        assert_eq!(
            *runner.calls.borrow(),
            vec![AdminStep::Migrate, AdminStep::CollectStatic]
        );
    }

    #[test]
    fn test_hand_off_empty_command() {
        let err = hand_off(&[]).unwrap_err();
        assert!(matches!(err, LaunchError::EmptyCommand));
        assert_eq!(err.exit_code(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_display_non_utf8() {
        use std::os::unix::ffi::OsStringExt;

        let command = vec![
            OsString::from("printf"),
            OsString::from_vec(b"caf\xe9".to_vec()),
        ];
        assert_eq!(display(&command), "printf caf\u{fffd}");
    }

    #[test]
    fn test_hand_off_missing_program() {
        let command = vec![OsString::from("contas-no-such-program")];
        let err = hand_off(&command).unwrap_err();
        assert_eq!(err.exit_code(), crate::contas::error::EXIT_NOT_FOUND);
    }
}
