use clap::{Parser, Subcommand};

mod commands;
mod envelope;
mod eval;
mod support;
mod timeutil;

use support::{resolve_settings, Ctx, GlobalArgs};

#[derive(Parser, Debug)]
#[command(name = "webscout")]
#[command(version = envelope::VERSION)]
#[command(about = "Composable web retrieval for agents: search, fetch, render, extract", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[allow(clippy::large_enum_variant)]
enum Commands {
    /// List available providers and their status
    Providers,
    /// Search the web
    Search(commands::search::SearchCmd),
    /// Fetch a URL over HTTP
    Fetch(commands::fetch::FetchCmd),
    /// Render a URL in a browser
    Render(commands::render::RenderCmd),
    /// Extract readable content from a URL, file, or stdin
    Extract(commands::extract::ExtractCmd),
    /// Search, pick candidates, and extract the top results
    Pipeline(commands::pipeline::PipelineCmd),
    /// Run an eval suite: search quality plus fetch/extract health
    Eval(commands::eval::EvalCmd),
}

fn init_tracing(global: &GlobalArgs) {
    use tracing_subscriber::EnvFilter;
    let default = if global.verbose {
        "webscout=debug,webscout_local=debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!global.no_color && std::env::var_os("NO_COLOR").is_none())
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.global);

    let command_name = match &cli.command {
        Commands::Providers => "providers",
        Commands::Search(_) => "search",
        Commands::Fetch(_) => "fetch",
        Commands::Render(_) => "render",
        Commands::Extract(_) => "extract",
        Commands::Pipeline(_) => "pipeline",
        Commands::Eval(_) => "eval",
    };

    let settings = match resolve_settings(&cli.global) {
        Ok(settings) => settings,
        Err(e) => {
            // Settings resolution failures still produce a full envelope in
            // JSON mode.
            let ctx = Ctx::new(cli.global.clone(), crate::support::Settings::fallback());
            let code = ctx.finish(command_name, serde_json::json!({}), Some(e));
            std::process::exit(code);
        }
    };
    let mut ctx = Ctx::new(cli.global.clone(), settings);

    let code = match &cli.command {
        Commands::Providers => commands::providers::run(&mut ctx).await,
        Commands::Search(cmd) => commands::search::run(&mut ctx, cmd).await,
        Commands::Fetch(cmd) => commands::fetch::run(&mut ctx, cmd).await,
        Commands::Render(cmd) => commands::render::run(&mut ctx, cmd).await,
        Commands::Extract(cmd) => commands::extract::run(&mut ctx, cmd).await,
        Commands::Pipeline(cmd) => commands::pipeline::run(&mut ctx, cmd).await,
        Commands::Eval(cmd) => commands::eval::run(&mut ctx, cmd).await,
    };
    std::process::exit(code);
}
