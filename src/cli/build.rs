use std::path::{Path, PathBuf};

use crate::config::{MissingPidPolicy, ProcForestConfig};
use crate::prelude::*;
use crate::{output, snapshot};
use clap::Args;
use process_forest::{Pid, ProcessForest, build_forest};

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Path to the process snapshot (JSON), or `-` to read it from stdin
    pub snapshot: PathBuf,

    /// Write the forest to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,

    /// List the pids that could not be placed in any tree because of cycles
    #[arg(long)]
    pub include_unreachable: bool,

    /// What to do with processes that have no pid. Defaults to the configured policy
    #[arg(long, value_enum)]
    pub missing_pid: Option<MissingPidPolicy>,
}

/// Settings of one build, flags taking precedence over the configuration
#[derive(Debug, PartialEq)]
struct BuildSettings {
    pretty: bool,
    include_unreachable: bool,
    missing_pid: MissingPidPolicy,
}

impl BuildSettings {
    fn resolve(args: &BuildArgs, config: &ProcForestConfig) -> Self {
        Self {
            pretty: args.pretty || config.output.pretty,
            include_unreachable: args.include_unreachable || config.output.include_unreachable,
            missing_pid: args.missing_pid.unwrap_or(config.validation.missing_pid),
        }
    }
}

pub fn run(args: BuildArgs, config: &ProcForestConfig) -> Result<()> {
    let settings = BuildSettings::resolve(&args, config);
    debug!("Build settings: {settings:?}");

    let forest = build_from_snapshot(&args.snapshot, settings.missing_pid)?;
    let unreachable = forest.unreachable_pids();
    report(&forest, &unreachable);

    let mut view = forest.to_view()?;
    if settings.include_unreachable {
        view = view.with_unreachable_pids(unreachable);
    }
    output::write_json(&view, args.output.as_deref(), settings.pretty)
}

fn build_from_snapshot(path: &Path, missing_pid: MissingPidPolicy) -> Result<ProcessForest> {
    let raw = snapshot::load(path)?;
    let records = snapshot::prepare_records(raw, missing_pid)?;
    Ok(build_forest(records))
}

fn report(forest: &ProcessForest, unreachable: &[Pid]) {
    info!(
        "Built {} process trees from {} processes",
        forest.root_ids().len(),
        forest.len()
    );

    if forest.duplicate_pids() > 0 {
        warn!(
            "{} process records share their pid with a later record, they are kept as roots without children",
            forest.duplicate_pids()
        );
    }

    if forest.detected_cycles() {
        warn!(
            "There are cycles in the process tree, the tree may be incomplete ({} processes unreachable)",
            unreachable.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputConfig, ValidationConfig};
    use serde_json::{Value, json};
    use std::fs;
    use tempfile::TempDir;

    fn args(snapshot: PathBuf, output: PathBuf) -> BuildArgs {
        BuildArgs {
            snapshot,
            output: Some(output),
            pretty: false,
            include_unreachable: false,
            missing_pid: None,
        }
    }

    fn run_on(
        content: &str,
        config: &ProcForestConfig,
        tweak: impl FnOnce(&mut BuildArgs),
    ) -> Result<Value> {
        let dir = TempDir::new().unwrap();
        let snapshot = dir.path().join("snapshot.json");
        let output = dir.path().join("forest.json");
        fs::write(&snapshot, content).unwrap();

        let mut args = args(snapshot, output.clone());
        tweak(&mut args);
        run(args, config)?;

        Ok(serde_json::from_slice(&fs::read(&output).unwrap()).unwrap())
    }

    #[test]
    fn test_settings_flags_override_config() {
        let config = ProcForestConfig {
            output: OutputConfig {
                pretty: false,
                include_unreachable: true,
            },
            validation: ValidationConfig {
                missing_pid: MissingPidPolicy::Skip,
            },
        };
        let mut build_args = args(PathBuf::from("-"), PathBuf::from("out.json"));
        build_args.pretty = true;
        build_args.missing_pid = Some(MissingPidPolicy::Error);

        assert_eq!(
            BuildSettings::resolve(&build_args, &config),
            BuildSettings {
                pretty: true,
                include_unreachable: true,
                missing_pid: MissingPidPolicy::Error,
            }
        );
    }

    #[test_log::test]
    fn test_build_writes_the_forest() {
        let value = run_on(
            r#"[{"pid": 1, "name": "init"}, {"pid": 2, "ppid": 1}, {"pid": 3, "ppid": 77}]"#,
            &ProcForestConfig::default(),
            |_| {},
        )
        .unwrap();

        assert_eq!(
            value,
            json!({
                "root_nodes": [
                    {"pid": 1, "name": "init", "children": [{"pid": 2, "ppid": 1, "children": []}]},
                    {"pid": 3, "ppid": 77, "children": []},
                ],
                "detected_cycles": false,
                "duplicate_pids": 0,
            })
        );
    }

    #[test_log::test]
    fn test_build_with_cycles_still_writes_the_forest() {
        let value = run_on(
            r#"[{"pid": 1}, {"pid": 2, "ppid": 4}, {"pid": 3, "ppid": 2}, {"pid": 4, "ppid": 3}]"#,
            &ProcForestConfig::default(),
            |args| args.include_unreachable = true,
        )
        .unwrap();

        assert_eq!(value["detected_cycles"], json!(true));
        assert_eq!(value["root_nodes"], json!([{"pid": 1, "children": []}]));
        assert_eq!(value["unreachable_pids"], json!([2, 3, 4]));
    }

    #[test]
    fn test_build_rejects_missing_pid_by_default() {
        let err = run_on(
            r#"[{"pid": 1}, {"ppid": 1}]"#,
            &ProcForestConfig::default(),
            |_| {},
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "1 process records missing a process id (positions: 1)"
        );
    }

    #[test_log::test]
    fn test_build_skips_missing_pid_when_configured() {
        let config = ProcForestConfig {
            validation: ValidationConfig {
                missing_pid: MissingPidPolicy::Skip,
            },
            ..Default::default()
        };
        let value = run_on(r#"[{"pid": 1}, {"ppid": 1}]"#, &config, |_| {}).unwrap();
        assert_eq!(value["root_nodes"], json!([{"pid": 1, "children": []}]));
    }

    #[test_log::test]
    fn test_build_keeps_shadowed_duplicates_as_roots() {
        let value = run_on(
            r#"[{"pid": 2, "ppid": 1, "name": "first"}, {"pid": 1}, {"pid": 2, "ppid": 1, "name": "second"}]"#,
            &ProcForestConfig::default(),
            |args| args.include_unreachable = true,
        )
        .unwrap();

        assert_eq!(
            value,
            json!({
                "root_nodes": [
                    {"pid": 2, "ppid": 1, "name": "first", "children": []},
                    {"pid": 1, "children": [{"pid": 2, "ppid": 1, "name": "second", "children": []}]},
                ],
                "detected_cycles": false,
                "duplicate_pids": 1,
                "unreachable_pids": [],
            })
        );
    }

    #[test]
    fn test_build_refuses_trees_too_deep_to_write() {
        let chain = (1..=300)
            .map(|pid| json!({"pid": pid, "ppid": pid - 1}))
            .collect::<Vec<_>>();
        let err = run_on(
            &serde_json::to_string(&chain).unwrap(),
            &ProcForestConfig::default(),
            |_| {},
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "process tree is nested deeper than 256 levels (at pid 257)"
        );
    }
}
