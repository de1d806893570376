use clap::Parser;
use file_dispatch::config::cli::{Cli, Command};
use file_dispatch::utils::{logger, validation::Validate};
use file_dispatch::{AppConfig, FileSystem, FileSystemError, Written};
use std::io::Write;

fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config.display(), e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(2);
        }
    };

    if config.json_logs() && !cli.verbose {
        logger::init_json_logger(config.log_level());
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    let fs = FileSystem::new();
    if let Err(e) = config
        .validate()
        .and_then(|()| config.validate_components(fs.registry()))
    {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }
    config.apply(&fs);

    match run(&fs, &cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            match e.downcast_ref::<FileSystemError>() {
                Some(fs_error) => {
                    tracing::error!(category = ?fs_error.category(), "❌ {}", fs_error);
                    eprintln!("❌ {}", fs_error.user_friendly_message());
                    eprintln!("💡 {}", fs_error.recovery_suggestion());
                    std::process::exit(fs_error.exit_code());
                }
                None => {
                    eprintln!("❌ {:#}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Runs the requested command, returning the process exit code.
fn run(fs: &FileSystem, cli: &Cli) -> anyhow::Result<i32> {
    let options = cli.options();

    match &cli.command {
        Command::Write { name, filename, .. } => {
            let payload = cli
                .command
                .payload()?
                .ok_or_else(|| anyhow::anyhow!("write needs a payload"))?;
            match fs.write_with(name, filename, payload, &options)? {
                Some(Written::Name(written)) => println!("{}", written),
                Some(Written::Size(size)) => println!("{}", size),
                None => {
                    eprintln!("❌ Could not write '{}' to '{}'", filename, name);
                    return Ok(1);
                }
            }
        }
        Command::Read {
            name,
            filename,
            output,
        } => {
            let Some(data) = fs.read_with(name, filename, &options)? else {
                eprintln!("❌ Could not read '{}' from '{}'", filename, name);
                return Ok(1);
            };
            match output {
                Some(path) => std::fs::write(path, &data)?,
                None => std::io::stdout().write_all(&data)?,
            }
        }
        Command::Delete { name, filename } => {
            if !fs.delete_with(name, filename, &options)? {
                eprintln!("❌ Could not delete '{}' from '{}'", filename, name);
                return Ok(1);
            }
        }
        Command::Exists { name, filename } => {
            let exists = fs.exists_with(name, filename, &options)?;
            println!("{}", exists);
            return Ok(if exists { 0 } else { 1 });
        }
        Command::Configs => {
            for (name, spec) in fs.configurations().unwrap_or_default() {
                println!("{}\t{}", name, spec.adapter);
            }
        }
    }

    Ok(0)
}
