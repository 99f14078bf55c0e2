// src/main.rs

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use argh::FromArgs;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod assets;
mod cache;
mod cascade;
mod config;
mod discovery;
mod error;
mod flame;
mod frontmatter;
mod guide;
mod health;
mod markdown;
mod menu;
mod orchestrator;
mod output;
mod parallel;
mod postprocess;
mod render;
mod site;
mod strategy;
mod syntax;
mod taxonomy;
mod template;
mod watch;
mod xref;

use config::HealthProfile;
use error::RunError;
use orchestrator::BuildOpts;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn default_config_file() -> String {
    "bengal.toml".to_string()
}

fn default_flame_output() -> String {
    "flamechart".to_string()
}

#[derive(FromArgs, Debug)]
/// Bengal - a fast static site generator
struct Argz {
    /// print version information
    #[argh(switch, short = 'V')]
    version: bool,

    #[argh(subcommand)]
    command: Option<SubCommand>,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
enum SubCommand {
    Build(BuildArgs),
    Watch(WatchArgs),
    Guide(GuideArgs),
    Flame(FlameArgs),
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "build")]
/// Build the site
struct BuildArgs {
    /// path to the config file
    #[argh(option, short = 'c', default = "default_config_file()")]
    config_file: String,

    /// only rebuild pages whose content, cascade, or config changed
    #[argh(switch)]
    incremental: bool,

    /// disable the parallel rendering pool (sequential rendering)
    #[argh(switch)]
    no_parallel: bool,

    /// abort the build on the first render or health-check error
    #[argh(switch)]
    strict: bool,

    /// health-check profile: writer, theme-dev, or dev
    #[argh(option, default = "String::new()")]
    profile: String,

    /// include draft content
    #[argh(switch)]
    drafts: bool,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "watch")]
/// Watch for changes and rebuild automatically
struct WatchArgs {
    /// path to the config file
    #[argh(option, short = 'c', default = "default_config_file()")]
    config_file: String,

    /// include draft content
    #[argh(switch)]
    drafts: bool,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "guide")]
/// Print a guide explaining Bengal's features and configuration
struct GuideArgs {}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "flame")]
/// Build the site with profiling and generate flamechart output
struct FlameArgs {
    /// path to the config file
    #[argh(option, short = 'c', default = "default_config_file()")]
    config_file: String,

    /// output SVG path
    #[argh(option, short = 'o', default = "default_flame_output()")]
    output: String,
}

fn parse_profile(name: &str) -> Option<HealthProfile> {
    match name {
        "" => None,
        "writer" => Some(HealthProfile::Writer),
        "theme-dev" | "theme_dev" => Some(HealthProfile::ThemeDev),
        "dev" => Some(HealthProfile::Dev),
        _ => {
            eprintln!("unknown --profile {name:?}, falling back to BENGAL_PROFILE or writer");
            None
        }
    }
}

fn resolve_profile(cli_profile: &str) -> HealthProfile {
    parse_profile(cli_profile)
        .or_else(|| std::env::var("BENGAL_PROFILE").ok().and_then(|v| parse_profile(&v)))
        .unwrap_or(HealthProfile::Writer)
}

fn init_tracing(target_default: &str) {
    let no_color = std::env::var_os("BENGAL_NO_COLOR").is_some();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| target_default.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(!no_color)
                .with_timer(tracing_subscriber::fmt::time::UtcTime::new(
                    kiters::timestamp::get_utc_formatter(),
                ))
                .with_target(false)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::NONE),
        )
        .init();
}

fn run_build(args: &BuildArgs) -> Result<orchestrator::BuildStats, RunError> {
    let root = PathBuf::from(".");
    let config_path = Path::new(&args.config_file);
    let opts = BuildOpts {
        incremental: args.incremental,
        parallel: !args.no_parallel,
        strict: args.strict,
        profile: resolve_profile(&args.profile),
        include_drafts: args.drafts,
    };
    orchestrator::build(&root, config_path, &opts)
}

fn exit_code_for(err: &RunError) -> u8 {
    match err {
        RunError::Health(_) => 2,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let argz: Argz = argh::from_env();

    if argz.version {
        println!("bengal {}", VERSION);
        return ExitCode::SUCCESS;
    }

    if let Some(SubCommand::Flame(args)) = &argz.command {
        if let Err(e) = flame::flame(&args.config_file, &args.output) {
            eprintln!("Error: {:?}", e);
            return ExitCode::from(exit_code_for(&e));
        }
        return ExitCode::SUCCESS;
    }

    init_tracing("bengal=info");

    match argz.command {
        Some(SubCommand::Build(args)) => match run_build(&args) {
            Ok(stats) => {
                if stats.no_changes {
                    tracing::info!("build::no_changes nothing to do");
                } else {
                    tracing::info!(
                        "build::done {} page(s) rendered, {} skipped, {} asset(s), {}ms",
                        stats.pages_rendered,
                        stats.pages_skipped,
                        stats.assets_processed,
                        stats.duration_ms
                    );
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{:?}", e);
                ExitCode::from(exit_code_for(&e))
            }
        },
        Some(SubCommand::Watch(args)) => {
            if let Err(e) = watch::watch(&args.config_file, args.drafts) {
                error!("{:?}", e);
                return ExitCode::from(exit_code_for(&e));
            }
            ExitCode::SUCCESS
        }
        Some(SubCommand::Guide(_)) => {
            guide::print_guide();
            ExitCode::SUCCESS
        }
        Some(SubCommand::Flame(_)) => unreachable!(),
        None => {
            println!("bengal {}", VERSION);
            println!("Use --help for usage information");
            ExitCode::SUCCESS
        }
    }
}
