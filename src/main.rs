use anyhow::Result;
use cwefix::cli::{init_logging, parse_args, Commands};
use cwefix::commands::{self, FixConfig};
use cwefix::observability::install_panic_hook;

fn main() -> Result<()> {
    install_panic_hook();
    let cli = parse_args();

    match cli.command {
        Commands::Fix {
            paths,
            classpath,
            check,
            format,
            output,
            config,
            jobs,
            rules,
            verbosity,
            quiet,
        } => {
            init_logging(verbosity);
            let report = commands::handle_fix(FixConfig {
                paths,
                classpath,
                check,
                format,
                output,
                config,
                jobs,
                rules,
                quiet,
            })?;
            if report.needs_attention() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Rules { format, config } => {
            init_logging(0);
            commands::list_rules(format, config.as_deref())
        }
        Commands::Init { force } => {
            let cwd = std::env::current_dir()?;
            commands::init_config(&cwd, force)
        }
    }
}
