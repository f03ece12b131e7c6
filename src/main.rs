use clap::Parser;
use resilient_locator::cli::commands::{
    build_context, cmd_enrich, cmd_ingest, cmd_list, cmd_register, cmd_resolve, cmd_run,
};
use resilient_locator::cli::config::{Cli, Commands, load_config};
use resilient_locator::record::ingest::ExternalElement;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // CLI > config file > defaults
    let mut config = load_config(cli.config.as_deref());
    config.apply_cli(&cli);
    let ctx = build_context(&config)?;

    match cli.command {
        Commands::Ingest { page, file } => {
            cmd_ingest(&ctx, &page, &file)?;
        }
        Commands::Register {
            page,
            ocr_type,
            tag_name,
            label_text,
            placeholder,
            text,
            value,
            intent,
            dom_id,
            dom_class,
            test_id,
            selector,
            sample_value,
        } => {
            let input = ExternalElement {
                page_name: page,
                ocr_type,
                tag_name,
                intent,
                label_text,
                placeholder,
                text,
                value,
                dom_id,
                dom_class,
                test_id,
                custom_selector: selector,
                sample_value,
            };
            cmd_register(&ctx, input)?;
        }
        Commands::Enrich { url, page } => {
            cmd_enrich(&ctx, &config, &url, page.as_deref())?;
        }
        Commands::Resolve {
            url,
            name,
            action,
            value,
        } => {
            cmd_resolve(&ctx, &config, &url, &name, &action, value.as_deref())?;
        }
        Commands::List { page } => {
            cmd_list(&ctx, &page)?;
        }
        Commands::Run { spec, output } => {
            let all_passed = cmd_run(&ctx, &config, &spec, output.as_deref())?;
            if !all_passed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
