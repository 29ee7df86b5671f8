//! Genesis's main application entry point.
//! Handles command-line argument parsing and dispatches to the subcommands.

use genesis::{
    cli::{get_args, Cli, Command, GenerateArgs, LocalArgs},
    config::AppConfig,
    error::{default_error_handler, Result},
    local::{render_local, LocalSettings},
    logger::init_logger,
    orchestrator::Orchestrator,
    registry::ProviderRegistry,
};

/// Main application entry point.
fn main() {
    let args = get_args();
    init_logger(args.verbose);

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

fn orchestrator(args: &Cli) -> Result<Orchestrator> {
    let config = AppConfig::load(args.config.as_deref())?;
    Ok(Orchestrator::new(ProviderRegistry::from_config(&config)?))
}

fn run(args: Cli) -> Result<()> {
    match &args.command {
        Command::Generate(generate_args) => generate(&orchestrator(&args)?, generate_args),
        Command::List => list(&orchestrator(&args)?),
        Command::Local(local_args) => local(local_args),
    }
}

fn generate(orchestrator: &Orchestrator, args: &GenerateArgs) -> Result<()> {
    let request = args.request()?;
    let generation = match (&args.branch, &args.tag) {
        (Some(branch), _) => orchestrator.generate_from_branch(&request, branch)?,
        (None, Some(tag)) => orchestrator.generate_from_tag(&request, tag)?,
        (None, None) => orchestrator.generate(&request)?,
    };

    if args.keep_checkout {
        println!("Checkout kept at '{}'.", generation.checkout_dir.display());
    } else if let Err(e) = orchestrator.cleanup(&generation.checkout_dir) {
        log::warn!("{e}");
    }
    println!("Project generated successfully at {}.", generation.repository_url);
    Ok(())
}

fn list(orchestrator: &Orchestrator) -> Result<()> {
    for source in orchestrator.template_names()? {
        println!("{}:", source.name);
        for name in source.project_names {
            println!("  - {name}");
        }
    }
    Ok(())
}

fn local(args: &LocalArgs) -> Result<()> {
    let settings = LocalSettings::load(&args.options)?;
    let target = render_local(&args.wd, args.target.as_deref(), &settings)?;
    println!("Project created in '{}'.", target.display());
    Ok(())
}
