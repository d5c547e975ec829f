//! CLI argument parsing and validation module
//!
//! The supervisor normally runs with the fixed device layout; the flags here
//! exist to relocate pieces of it, mainly for development machines and the
//! integration tests:
//! - install root (certificates and daemon config file)
//! - parameter file and control socket locations
//! - daemon program and stop grace period

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Arg, ArgMatches, Command};

use crate::config::RunConfig;

/// Parse command line arguments into the runtime configuration.
pub fn parse_args() -> Result<RunConfig> {
    config_from_matches(&build_command().get_matches())
}

fn build_command() -> Command {
    Command::new("dockerdmon")
        .version(env!("DOCKERDMON_VERSION"))
        .about("Supervise the container-engine daemon on the device")
        .long_about(
            "Resolves the daemon's startup configuration from the device parameters, \
             launches it, and restarts it whenever a watched parameter changes.",
        )
        .arg(
            Arg::new("install-root")
                .long("install-root")
                .value_name("DIR")
                .help("Install prefix holding certificates and the daemon config file"),
        )
        .arg(
            Arg::new("parameters")
                .long("parameters")
                .value_name("FILE")
                .help("Parameter file backing the parameter store"),
        )
        .arg(
            Arg::new("socket")
                .long("socket")
                .value_name("PATH")
                .help("Unix socket accepting runtime parameter updates"),
        )
        .arg(
            Arg::new("daemon")
                .long("daemon")
                .value_name("PROGRAM")
                .help("Daemon program to supervise instead of the default"),
        )
        .arg(
            Arg::new("grace")
                .long("grace")
                .value_name("SECONDS")
                .help("Seconds to wait after SIGTERM before escalating to SIGKILL"),
        )
}

fn config_from_matches(matches: &ArgMatches) -> Result<RunConfig> {
    let mut cfg = RunConfig::default();

    if let Some(root) = matches.get_one::<String>("install-root") {
        cfg = cfg.with_install_root(PathBuf::from(root).as_path());
    }
    if let Some(path) = matches.get_one::<String>("parameters") {
        cfg.param_file = PathBuf::from(path);
    }
    if let Some(path) = matches.get_one::<String>("socket") {
        cfg.control_socket = PathBuf::from(path);
    }
    if let Some(program) = matches.get_one::<String>("daemon") {
        cfg.daemon_program = program.clone();
    }
    if let Some(grace) = matches.get_one::<String>("grace") {
        let seconds: u64 = grace
            .parse()
            .map_err(|_| anyhow!("invalid --grace value: {grace}"))?;
        cfg.stop_grace = Duration::from_secs(seconds);
    }

    Ok(cfg)
}
