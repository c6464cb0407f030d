use clap::{Arg, ArgAction, Command};
use tracing::info;
use tracing_subscriber::EnvFilter;

use undo::config::Config;
use undo::undo_router::{UndoRequest, UndoRouter};

fn log_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "error",
        1 => "warn",
        2 => "info",
        _ => "debug",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("undo")
        .about("make a 'best effort' attempt to undo the most recently run command")
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .help("Increase the level of verbosity, can be stacked (-vvv)")
            .action(ArgAction::Count))
        .arg(Arg::new("dry")
            .short('d')
            .long("dry")
            .help("Show the resolved command(s) but do not run them")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("allow-imprecise")
            .long("allow-imprecise")
            .help("Also consider undo commands which may have unexpected or unwanted effects")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("command")
            .short('c')
            .long("command")
            .help("Undo the given command rather than the last one in history")
            .value_name("CMD")
            .num_args(1))
        .arg(Arg::new("all")
            .short('A')
            .long("all")
            .help("Search all registry files rather than stopping after the first file with a match")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("interactive")
            .short('i')
            .long("interactive")
            .help("Ask before running the undo command, even when there is only one")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("show-config")
            .long("show-config")
            .help("Show configuration information")
            .action(ArgAction::SetTrue))
        .get_matches();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(matches.get_count("verbose"))));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load()?;
    config.allow_imprecise |= matches.get_flag("allow-imprecise");
    config.search_all |= matches.get_flag("all");

    if matches.get_flag("show-config") {
        config.show_config_info()?;
        return Ok(());
    }

    let request = UndoRequest {
        command: matches.get_one::<String>("command").cloned(),
        dry: matches.get_flag("dry"),
        interactive: matches.get_flag("interactive"),
    };
    info!("Processing request: {:?}", request);

    let router = UndoRouter::new(config);
    router.process(&request).await?;

    Ok(())
}
