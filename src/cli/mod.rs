mod build;
mod show_config;

use crate::{config::ProcForestConfig, prelude::*};
use clap::{
    Parser, Subcommand,
    builder::{Styles, styling},
};

fn create_styles() -> Styles {
    styling::Styles::styled()
        .header(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .literal(styling::AnsiColor::Yellow.on_default() | styling::Effects::BOLD)
        .placeholder(styling::AnsiColor::Cyan.on_default())
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Rebuild process trees from endpoint process snapshots",
    styles = create_styles()
)]
pub struct Cli {
    /// The configuration name to use
    /// If provided, the configuration will be loaded from ~/.config/procforest/{config-name}.yaml
    /// Otherwise, loads from ~/.config/procforest/config.yaml
    #[arg(long, env = "PROCFOREST_CONFIG_NAME", global = true)]
    pub config_name: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the process trees of a snapshot and print them as JSON
    #[command(alias = "b")]
    Build(build::BuildArgs),
    /// Show the configuration in effect
    ShowConfig,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = ProcForestConfig::load(cli.config_name.as_deref())?;

    match cli.command {
        Commands::Build(args) => build::run(args, &config)?,
        Commands::ShowConfig => show_config::run(&config)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_parse_build_command() {
        let cli = Cli::try_parse_from([
            "procforest",
            "--config-name",
            "triage",
            "build",
            "snapshot.json",
            "--pretty",
            "--missing-pid",
            "skip",
        ])
        .unwrap();

        assert_eq!(cli.config_name.as_deref(), Some("triage"));
        let Commands::Build(args) = cli.command else {
            panic!("expected the build command");
        };
        assert_eq!(args.snapshot, Path::new("snapshot.json"));
        assert!(args.pretty);
        assert!(!args.include_unreachable);
        assert_eq!(args.output, None);
        assert_eq!(
            args.missing_pid,
            Some(crate::config::MissingPidPolicy::Skip)
        );
    }

    #[test]
    fn test_build_alias() {
        let cli = Cli::try_parse_from(["procforest", "b", "-"]).unwrap();
        assert!(matches!(cli.command, Commands::Build(_)));
    }

    #[test]
    fn test_build_requires_a_snapshot() {
        assert!(Cli::try_parse_from(["procforest", "build"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
