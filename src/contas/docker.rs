use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use handlebars::Handlebars;
use log::debug;
use serde::Serialize;
use subprocess::{Popen, PopenConfig, Redirection};

use super::profile::{LauncherKind, Profile, META_DIR};
use super::templates::{DOCKER_IGNORE, TEMPLATE_DOCKERFILE, TEMPLATE_ENTRYPOINT};
use super::utils;

pub const DOCKERFILE: &str = "Dockerfile";
pub const ENTRYPOINT_SCRIPT: &str = "entrypoint.sh";
pub const LAUNCHER_BINARY: &str = "contas-deploy";

fn engine_available(engine: &str) -> bool {
    let p = Popen::create(
        &[engine, "ps"],
        PopenConfig {
            stdout: Redirection::Pipe,
            stderr: Redirection::Pipe,
            ..Default::default()
        },
    );
    let mut p = match p {
        Ok(p) => p,
        Err(_) => return false,
    };
    // Drain the output so a long container list cannot fill the pipe.
    let drained = p
        .communicate_start(None)
        .limit_time(Duration::from_secs(5))
        .read()
        .is_ok();
    if !drained {
        let _ = p.terminate();
        return false;
    }
    matches!(
        p.wait_timeout(Duration::from_secs(5)),
        Ok(Some(status)) if status.success()
    )
}

pub fn get_container_engine() -> Result<String> {
    for engine in ["docker", "podman"] {
        if engine_available(engine) {
            debug!("Using container engine: {}", engine);
            return Ok(engine.to_string());
        }
    }
    Err(anyhow::anyhow!("Docker or Podman not found."))
}

pub fn image_name(profile: &Profile, tag: &str) -> String {
    format!("{}:{}", profile.name.to_lowercase(), tag.to_lowercase())
}

pub fn build_image(
    project_root: &Path,
    profile: &Profile,
    tag: &str,
    timeout: Duration,
) -> Result<String> {
    let dockerfile_path = project_root.join(META_DIR).join(DOCKERFILE);
    if !dockerfile_path.exists() {
        return Err(anyhow::anyhow!(
            "No Dockerfile at {}. Run `contas-deploy generate` first.",
            dockerfile_path.display()
        ));
    }
    let engine = get_container_engine()?;
    let image = image_name(profile, tag);
    let dockerfile = dockerfile_path.to_string_lossy().to_string();
    let context = project_root.to_string_lossy().to_string();

    debug!("Building image: {}", image);
    // The engine's build output is inherited so failures stay visible.
    let popen_conf = PopenConfig::default();
    let mut p = Popen::create(
        &[
            engine.as_str(),
            "build",
            "-t",
            image.as_str(),
            "-f",
            dockerfile.as_str(),
            context.as_str(),
        ],
        popen_conf,
    )?;

    match p.wait_timeout(timeout)? {
        Some(s) if s.success() => Ok(image),
        Some(_) => Err(anyhow::anyhow!("Failed to build image {}.", image)),
        None => {
            p.terminate()?;
            Err(anyhow::anyhow!(
                "Image build timed out after {} seconds",
                timeout.as_secs()
            ))
        }
    }
}

// JSON array form for CMD, one quoted element per argument.
fn exec_form(command: &[String]) -> Result<String> {
    let quoted = command
        .iter()
        .map(serde_json::to_string)
        .collect::<serde_json::Result<Vec<String>>>()?;
    Ok(format!("[{}]", quoted.join(", ")))
}

fn renderer() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
}

pub fn generate_dockerfile(profile: &Profile, project_root: &Path) -> Result<String> {
    let mut handlebars = renderer();
    handlebars.register_template_string("Dockerfile", TEMPLATE_DOCKERFILE)?;

    #[derive(Serialize)]
    struct Data {
        python_image: String,
        os_packages: Vec<String>,
        requirements: bool,
        launcher: LauncherKind,
        launcher_path: String,
        manage_py_env: String,
        port: u16,
        command: String,
    }

    let d = Data {
        python_image: profile.python_image.clone(),
        os_packages: profile.os_packages.clone(),
        requirements: utils::check_requirements_txt(project_root),
        launcher: profile.launcher.clone(),
        launcher_path: format!("{}/{}", META_DIR, LAUNCHER_BINARY),
        manage_py_env: serde_json::to_string(&format!(
            "/app/{}",
            profile.manage_py.to_string_lossy()
        ))?,
        port: profile.port,
        command: exec_form(&profile.server_command())?,
    };

    Ok(handlebars.render("Dockerfile", &d)?)
}

pub fn generate_entrypoint_script(profile: &Profile) -> Result<String> {
    let mut handlebars = renderer();
    handlebars.register_template_string("entrypoint", TEMPLATE_ENTRYPOINT)?;

    #[derive(Serialize)]
    struct Data {
        manage_py: String,
    }

    let d = Data {
        manage_py: utils::shell_quote(&profile.manage_py.to_string_lossy()),
    };

    Ok(handlebars.render("entrypoint", &d)?)
}

pub fn generate_docker_ignore() -> Result<String> {
    let mut handlebars = renderer();
    handlebars.register_template_string("dockerignore", DOCKER_IGNORE)?;
    Ok(handlebars.render("dockerignore", &())?)
}
