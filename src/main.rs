use clap::Parser as _;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};
use waterkotte_ecotouch_tools::commands;

#[derive(clap::Parser)]
#[clap(version, about, author)]
enum Commands {
    Tags(commands::tags::Args),
    Read(commands::read::Args),
    Write(commands::write::Args),
    Describe(commands::describe::Args),
    Info(commands::info::Args),
}

fn end<E: std::error::Error>(r: Result<(), E>) {
    std::process::exit(match r {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            let mut cause = e.source();
            while let Some(e) = cause {
                eprintln!("  because: {e}");
                cause = e.source();
            }
            1
        }
    });
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let filter = std::env::var("WATERKOTTE_ECOTOUCH_LOG")
        .unwrap_or_default()
        .parse::<tracing_subscriber::filter::targets::Targets>()
        .unwrap_or_default();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
    match Commands::parse() {
        Commands::Tags(args) => end(commands::tags::run(args)),
        Commands::Read(args) => end(commands::read::run(args).await),
        Commands::Write(args) => end(commands::write::run(args).await),
        Commands::Describe(args) => end(commands::describe::run(args).await),
        Commands::Info(args) => end(commands::info::run(args).await),
    }
}
