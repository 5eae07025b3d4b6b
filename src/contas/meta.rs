use std::path::Path;

use super::docker::{self, DOCKERFILE, ENTRYPOINT_SCRIPT, LAUNCHER_BINARY};
use super::profile::{LauncherKind, Profile, META_DIR};
use anyhow::Result;
use log::{debug, info};

pub struct Generator {
    pub profile: Profile,
}

impl Generator {
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }

    pub fn generate_meta_dir(&self, project_root: &Path) -> Result<()> {
        let meta_dir = project_root.join(META_DIR);
        if !meta_dir.exists() {
            std::fs::create_dir(&meta_dir)?;
        }
        Ok(())
    }

    pub fn generate_docker(&self, project_root: &Path) -> Result<()> {
        let dockerfile = docker::generate_dockerfile(&self.profile, project_root)?;
        let dockerignore = docker::generate_docker_ignore()?;
        std::fs::write(project_root.join(META_DIR).join(DOCKERFILE), dockerfile)?;
        std::fs::write(project_root.join(".dockerignore"), dockerignore)?;
        Ok(())
    }

    // Puts whatever the ENTRYPOINT points at into the build context.
    pub fn generate_launcher(&self, project_root: &Path) -> Result<()> {
        match self.profile.launcher {
            LauncherKind::Binary => {
                let exe = std::env::current_exe()?;
                let target = project_root.join(META_DIR).join(LAUNCHER_BINARY);
                debug!("Copying launcher {:?} to {:?}", exe, target);
                std::fs::copy(&exe, &target)?;
            }
            LauncherKind::Script => {
                let script = docker::generate_entrypoint_script(&self.profile)?;
                let target = project_root.join(ENTRYPOINT_SCRIPT);
                std::fs::write(&target, script)?;
                make_executable(&target)?;
            }
        }
        Ok(())
    }

    pub fn generate(&self, project_root: &Path) -> Result<()> {
        self.generate_meta_dir(project_root)?;
        self.profile.save(project_root)?;
        self.generate_launcher(project_root)?;
        self.generate_docker(project_root)?;
        info!(
            "Generated image definition for {} in {}",
            self.profile.name,
            project_root.join(META_DIR).display()
        );
        Ok(())
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
