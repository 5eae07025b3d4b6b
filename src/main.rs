mod contas;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::{debug, error, LevelFilter};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use contas::error::LaunchError;
use contas::flags::{self, StartupFlags};
use contas::launcher::Launcher;
use contas::meta::Generator;
use contas::plan::Plan;
use contas::profile::{LauncherKind, Profile};
use contas::steps::ManageCommand;

#[derive(Debug, Args)]
struct ManageOpts {
    /// Python interpreter used for manage.py.
    #[arg(long, env = flags::PYTHON, default_value = "python")]
    python: String,

    /// Path to manage.py, relative to the working directory.
    #[arg(long, env = flags::MANAGE_PY, default_value = "manage.py")]
    manage_py: PathBuf,

    /// Directory to run in. Defaults to the current one.
    #[arg(long, env = flags::WORKDIR)]
    workdir: Option<PathBuf>,

    /// Command to exec after the administrative steps. Defaults to the profile's server command.
    #[arg(last = true, value_parser = clap::value_parser!(OsString))]
    command: Vec<OsString>,
}

impl ManageOpts {
    fn manage_command(&self) -> ManageCommand {
        ManageCommand {
            python: self.python.clone(),
            manage_py: self.manage_py.clone(),
        }
    }

    // Applies --workdir and resolves the final command.
    fn resolve(&self) -> Result<Vec<OsString>> {
        if let Some(workdir) = &self.workdir {
            std::env::set_current_dir(workdir)?;
        }
        if !self.command.is_empty() {
            return Ok(self.command.clone());
        }
        let profile = Profile::load_or_default(&std::env::current_dir()?)?;
        debug!("No command given, using the server command of {}", profile.name);
        Ok(profile
            .server_command()
            .into_iter()
            .map(OsString::from)
            .collect())
    }
}

#[derive(Debug, Args)]
struct GenerateOpts {
    #[arg(default_value_os_t = PathBuf::from("."))]
    project_root: PathBuf,

    /// Django project module holding settings.py and wsgi.py.
    #[arg(long, short)]
    name: Option<String>,

    #[arg(long)]
    python_image: Option<String>,

    /// Extra OS package to install. Repeatable.
    #[arg(long = "package", short = 'p')]
    packages: Vec<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long, short)]
    workers: Option<u32>,

    /// Gunicorn request timeout in seconds.
    #[arg(long, short)]
    timeout: Option<u32>,

    #[arg(long)]
    manage_py: Option<PathBuf>,

    #[arg(long, short, value_enum, default_value_t = LauncherKind::Binary)]
    launcher: LauncherKind,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[clap(
        name = "start",
        about = "Container entrypoint: run the enabled administrative steps, then exec the command."
    )]
    Start {
        #[clap(flatten)]
        opts: ManageOpts,
    },

    #[clap(
        name = "plan",
        about = "Show what start would do in the current environment without running anything."
    )]
    Plan {
        #[clap(flatten)]
        opts: ManageOpts,

        #[arg(long)]
        json: bool,
    },

    #[clap(
        name = "generate",
        about = "Generate the profile and image definition. Overwrites if re-run."
    )]
    Generate {
        #[clap(flatten)]
        args: GenerateOpts,
    },

    #[clap(name = "build", about = "Build the image from the generated Dockerfile.")]
    Build {
        #[arg(default_value_os_t = PathBuf::from("."))]
        project_root: PathBuf,

        #[arg(long, default_value = "latest")]
        tag: String,

        /// Build timeout in seconds.
        #[arg(long, default_value_t = 600)]
        timeout: u64,
    },
}

#[derive(Parser)]
#[command(name = "contas-deploy")]
#[command(about = "Entrypoint and image definition for the automacao_contas deployment.", long_about = None)]
#[command(version)]
pub struct App {
    /// Enable debug logging.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

fn log_level(verbose: bool) -> LevelFilter {
    if verbose {
        return LevelFilter::Debug;
    }
    std::env::var(flags::LOG)
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Info)
}

fn init_logging(verbose: bool) {
    let config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .build();
    // Everything goes to stderr; stdout belongs to the exec'd command.
    if TermLogger::init(
        log_level(verbose),
        config,
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .is_err()
    {
        eprintln!("Logger already initialised");
    }
}

fn run(command: Command) -> Result<i32> {
    match command {
        Command::Start { opts } => {
            let flags = StartupFlags::from_env();
            debug!("Startup flags: {:?}", flags);
            let cmd = opts.resolve()?;
            let launcher = Launcher::new(flags, opts.manage_command());
            Ok(launcher.launch(&cmd)?)
        }
        Command::Plan { opts, json } => {
            let cmd = opts.resolve()?;
            let plan = Plan::new(StartupFlags::from_env(), &opts.manage_command(), &cmd);
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("{}", plan);
            }
            Ok(0)
        }
        Command::Generate { args } => {
            let project_root = std::fs::canonicalize(&args.project_root)?;
            let mut builder = Profile::builder(&project_root)?
                .extra_packages(args.packages)
                .launcher(args.launcher);

            // Overwrite detected values if needed
            if let Some(name) = args.name {
                builder = builder.name(name);
            }
            if let Some(image) = args.python_image {
                builder = builder.python_image(image);
            }
            if let Some(port) = args.port {
                builder = builder.port(port);
            }
            if let Some(workers) = args.workers {
                builder = builder.workers(workers);
            }
            if let Some(timeout) = args.timeout {
                builder = builder.timeout(timeout);
            }
            if let Some(manage_py) = args.manage_py {
                builder = builder.manage_py(manage_py);
            }

            let profile = builder.build()?;
            Generator::new(profile).generate(&project_root)?;
            Ok(0)
        }
        Command::Build {
            project_root,
            tag,
            timeout,
        } => {
            let project_root = std::fs::canonicalize(project_root)?;
            let profile = Profile::load(&project_root)?;
            let image = contas::docker::build_image(
                &project_root,
                &profile,
                &tag,
                Duration::from_secs(timeout),
            )?;
            println!("{}", image);
            Ok(0)
        }
    }
}

fn main() {
    let app = App::parse();
    init_logging(app.verbose);

    match run(app.command) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<LaunchError>()
                .map(LaunchError::exit_code)
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}
