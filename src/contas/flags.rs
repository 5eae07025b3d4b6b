// Purpose: Environment flags read by the entrypoint.

use std::env;

use serde::Serialize;

pub const RUN_MIGRATIONS: &str = "RUN_MIGRATIONS";
pub const RUN_COLLECTSTATIC: &str = "RUN_COLLECTSTATIC";

// Launcher overrides
pub const PYTHON: &str = "CONTAS_PYTHON";
pub const MANAGE_PY: &str = "CONTAS_MANAGE_PY";
pub const WORKDIR: &str = "CONTAS_WORKDIR";
pub const LOG: &str = "CONTAS_LOG";

/// A flag is on only when its value is exactly `1`. Unset, empty, `true`,
/// ` 1` and friends are all off.
pub fn flag_enabled(raw: Option<&str>) -> bool {
    matches!(raw, Some("1"))
}

/// Snapshot of the startup flags, taken once per container start.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartupFlags {
    pub migrate: bool,
    pub collect_static: bool,
}

impl StartupFlags {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            migrate: flag_enabled(lookup(RUN_MIGRATIONS).as_deref()),
            collect_static: flag_enabled(lookup(RUN_COLLECTSTATIC).as_deref()),
        }
    }

    pub fn any(&self) -> bool {
        self.migrate || self.collect_static
    }
}
