use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Arg, ArgAction, Command};
use tracing::error;

use hlx_proto::VersionSet;
use simulator::{SimulatorOptions, DEFAULT_CONFIG_PATH};

fn cli() -> Command {
    Command::new("hlxsimd")
        .version(env!("CARGO_PKG_VERSION"))
        .about("An HLX amplifier simulator")
        .arg(
            Arg::new("ipv4_only")
                .help("Force hlxsimd to use IPv4 addresses only")
                .short('4')
                .long("ipv4-only")
                .action(ArgAction::SetTrue)
                .conflicts_with("ipv6_only"),
        )
        .arg(
            Arg::new("ipv6_only")
                .help("Force hlxsimd to use IPv6 addresses only")
                .short('6')
                .long("ipv6-only")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .help("Enable diagnostic output, optionally at level LEVEL")
                .short('d')
                .long("debug")
                .value_name("LEVEL")
                .num_args(0..=1)
                .default_missing_value("1")
                .value_parser(clap::value_parser!(u8)),
        )
        .arg(
            Arg::new("verbose")
                .help("Enable verbose output, optionally at level LEVEL")
                .short('v')
                .long("verbose")
                .value_name("LEVEL")
                .num_args(0..=1)
                .default_missing_value("1")
                .value_parser(clap::value_parser!(u8)),
        )
        .arg(
            Arg::new("quiet")
                .help("Run silently, suppressing all non-error output")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("syslog")
                .help("Write output to the system log only, not the console")
                .short('s')
                .long("syslog")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("configuration_file")
                .help("Use FILE as the configuration backing store")
                .long("configuration-file")
                .value_name("FILE")
                .default_value(DEFAULT_CONFIG_PATH)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("url")
                .help("URL or host[:port] to listen at")
                .value_name("URL"),
        )
}

fn default_filter(matches: &clap::ArgMatches) -> &'static str {
    // The syslog subsystem lives outside this binary; `-s` keeps the
    // console at error level just as `-q` does.
    if matches.get_flag("quiet") || matches.get_flag("syslog") {
        return "error";
    }
    match matches.get_one::<u8>("debug") {
        Some(level) if *level >= 2 => "trace",
        Some(_) => "debug",
        None => {
            if matches.get_one::<u8>("verbose").is_some() {
                "info"
            } else {
                "warn"
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter(&matches))),
        )
        .init();

    let versions = if matches.get_flag("ipv4_only") {
        VersionSet::IPV4_ONLY
    } else if matches.get_flag("ipv6_only") {
        VersionSet::IPV6_ONLY
    } else {
        VersionSet::ANY
    };

    let options = SimulatorOptions {
        versions,
        bind: matches.get_one::<String>("url").cloned(),
        configuration_file: matches
            .get_one::<PathBuf>("configuration_file")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
    };

    match simulator::run(options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, code = err.errno(), "hlxsimd failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn family_flags_are_mutually_exclusive() {
        assert!(cli().try_get_matches_from(["hlxsimd", "-4", "-6"]).is_err());
        assert!(cli().try_get_matches_from(["hlxsimd", "-4"]).is_ok());
    }

    #[test]
    fn verbosity_flags_map_onto_filters() {
        let m = cli().try_get_matches_from(["hlxsimd"]).unwrap();
        assert_eq!(default_filter(&m), "warn");
        let m = cli().try_get_matches_from(["hlxsimd", "-v"]).unwrap();
        assert_eq!(default_filter(&m), "info");
        let m = cli().try_get_matches_from(["hlxsimd", "-d"]).unwrap();
        assert_eq!(default_filter(&m), "debug");
        let m = cli()
            .try_get_matches_from(["hlxsimd", "--debug=2"])
            .unwrap();
        assert_eq!(default_filter(&m), "trace");
        let m = cli().try_get_matches_from(["hlxsimd", "-q"]).unwrap();
        assert_eq!(default_filter(&m), "error");
    }

    #[test]
    fn positional_url_and_store_path_are_accepted() {
        let m = cli()
            .try_get_matches_from([
                "hlxsimd",
                "--configuration-file=/tmp/amp.json",
                "telnet://127.0.0.1:2300",
            ])
            .unwrap();
        assert_eq!(
            m.get_one::<String>("url").map(String::as_str),
            Some("telnet://127.0.0.1:2300")
        );
        assert_eq!(
            m.get_one::<PathBuf>("configuration_file").unwrap(),
            &PathBuf::from("/tmp/amp.json")
        );
    }
}
