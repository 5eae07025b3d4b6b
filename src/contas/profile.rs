use super::utils;
use anyhow::Result;
use clap::ValueEnum;
use log::{debug, warn};
use pathdiff::diff_paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

pub const META_DIR: &str = ".contas";
pub const PROFILE_FILE: &str = "profile.json";

pub const DEFAULT_NAME: &str = "automacao_contas";
pub const DEFAULT_PYTHON_IMAGE: &str = "python:3.11-slim";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_WORKERS: u32 = 3;
pub const DEFAULT_TIMEOUT: u32 = 120;

// PDF rendering, OCR with the Portuguese pack, libmagic and a C toolchain.
pub const DEFAULT_OS_PACKAGES: &[&str] = &[
    "poppler-utils",
    "tesseract-ocr",
    "tesseract-ocr-por",
    "libmagic1",
    "build-essential",
];

/// What the image ENTRYPOINT points at.
#[derive(Debug, Default, Clone, ValueEnum, Serialize, Deserialize, PartialEq)]
pub enum LauncherKind {
    #[default]
    Binary,
    Script,
}

// Profile holds everything needed to render the image definition.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub python_image: String,
    pub os_packages: Vec<String>,
    pub port: u16,
    pub workers: u32,
    pub timeout: u32,
    pub manage_py: PathBuf,
    pub launcher: LauncherKind,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            python_image: DEFAULT_PYTHON_IMAGE.to_string(),
            os_packages: DEFAULT_OS_PACKAGES.iter().map(|p| p.to_string()).collect(),
            port: DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
            timeout: DEFAULT_TIMEOUT,
            manage_py: PathBuf::from("manage.py"),
            launcher: LauncherKind::default(),
        }
    }
}

impl Profile {
    pub fn path(project_root: &Path) -> PathBuf {
        project_root.join(META_DIR).join(PROFILE_FILE)
    }

    pub fn load(project_root: &Path) -> Result<Self> {
        let profile_json = std::fs::read_to_string(Self::path(project_root))?;
        let profile: Profile = serde_json::from_str(&profile_json)?;
        Ok(profile)
    }

    /// Loads the saved profile, or the defaults when none was generated.
    pub fn load_or_default(project_root: &Path) -> Result<Self> {
        if Self::path(project_root).exists() {
            return Self::load(project_root);
        }
        debug!("No profile at {:?}, using defaults", Self::path(project_root));
        Ok(Self::default())
    }

    pub fn save(&self, project_root: &Path) -> Result<()> {
        let profile_json = serde_json::to_string_pretty(&self)?;
        std::fs::write(Self::path(project_root), profile_json)?;
        Ok(())
    }

    pub fn builder(project_root: &Path) -> Result<ProfileBuilder> {
        analyse_project(project_root)
    }

    /// The default container command: Gunicorn serving the project's WSGI app.
    pub fn server_command(&self) -> Vec<String> {
        vec![
            "gunicorn".to_string(),
            format!("{}.wsgi:application", self.name),
            "--bind".to_string(),
            format!("0.0.0.0:{}", self.port),
            "--workers".to_string(),
            self.workers.to_string(),
            "--timeout".to_string(),
            self.timeout.to_string(),
        ]
    }
}

#[derive(Default, Debug)]
pub struct ProfileBuilder {
    project_root: PathBuf,
    name: Option<String>,
    candidates: Vec<PathBuf>,
    python_image: Option<String>,
    extra_packages: Vec<String>,
    port: Option<u16>,
    workers: Option<u32>,
    timeout: Option<u32>,
    manage_py: Option<PathBuf>,
    launcher: LauncherKind,
}

impl ProfileBuilder {
    pub fn name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    pub fn python_image(mut self, image: String) -> Self {
        self.python_image = Some(image);
        self
    }

    pub fn extra_packages(mut self, packages: Vec<String>) -> Self {
        self.extra_packages = packages;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn workers(mut self, workers: u32) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn timeout(mut self, timeout: u32) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn manage_py(mut self, manage_py: PathBuf) -> Self {
        self.manage_py = Some(manage_py);
        self
    }

    pub fn launcher(mut self, launcher: LauncherKind) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn build(self) -> Result<Profile> {
        let defaults = Profile::default();

        let manage_py = self.manage_py.unwrap_or(defaults.manage_py);
        if !self.project_root.join(&manage_py).is_file() {
            return Err(anyhow::anyhow!(
                "No {} found in {}. Is this a Django project?",
                manage_py.display(),
                self.project_root.display()
            ));
        }

        let name = match self.name {
            Some(name) => name,
            None => match self.candidates.as_slice() {
                [only] => module_name(only).unwrap_or(defaults.name),
                [] => {
                    warn!("No Django settings module found, using {}", DEFAULT_NAME);
                    defaults.name
                }
                many => {
                    warn!(
                        "Multiple settings modules found {:?}, using {}. Pass --name to choose.",
                        many, DEFAULT_NAME
                    );
                    defaults.name
                }
            },
        };
        debug!("Project module: {}", name);

        if self.workers == Some(0) {
            return Err(anyhow::anyhow!("Worker count must be at least 1."));
        }

        let mut os_packages = defaults.os_packages;
        for package in self.extra_packages {
            if !os_packages.contains(&package) {
                os_packages.push(package);
            }
        }

        Ok(Profile {
            name,
            python_image: self.python_image.unwrap_or(defaults.python_image),
            os_packages,
            port: self.port.unwrap_or(defaults.port),
            workers: self.workers.unwrap_or(defaults.workers),
            timeout: self.timeout.unwrap_or(defaults.timeout),
            manage_py,
            launcher: self.launcher,
        })
    }
}

// Dotted module path for a relative package directory, e.g. `src/site` -> `src.site`.
fn module_name(dir: &Path) -> Option<String> {
    let parts = dir
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<&str>>>()?;
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("."))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn ignore_dir(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| matches!(s, "__pycache__" | "venv" | "env" | "node_modules" | "staticfiles"))
        .unwrap_or(false)
}

fn analyse_project(project_root: &Path) -> Result<ProfileBuilder> {
    let mut builder = ProfileBuilder {
        project_root: project_root.to_path_buf(),
        ..Default::default()
    };

    for entry in WalkDir::new(project_root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !(is_hidden(e) || ignore_dir(e)))
    {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_dir() && utils::is_settings_package(entry.path()) {
                    let relative = diff_paths(entry.path(), project_root).ok_or_else(|| {
                        anyhow::anyhow!("Could not relativise {:?}", entry.path())
                    })?;
                    debug!("Found settings package: {:?}", relative);
                    builder.candidates.push(relative);
                }
            }
            Err(e) => {
                return Err(anyhow::anyhow!("Error walking project directory: {:?}", e));
            }
        }
    }
    builder.candidates.sort();
    Ok(builder)
}
