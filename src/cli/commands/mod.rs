pub mod fingerprint;
pub mod logging;

use crate::config::DEFAULT_API_BASE_URL;
use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};
use std::path::PathBuf;

pub const ARG_API_URL: &str = "api-url";
pub const ARG_STATE_DIR: &str = "state-dir";
pub const ARG_TIMEOUT: &str = "timeout";
pub const ARG_HEARTBEAT_INTERVAL: &str = "heartbeat-interval";

const DEFAULT_TIMEOUT_SECONDS: &str = "10";
const DEFAULT_HEARTBEAT_SECONDS: &str = "60";

pub const CMD_LOGIN: &str = "login";
pub const CMD_LOGOUT: &str = "logout";
pub const CMD_STATUS: &str = "status";
pub const CMD_FINGERPRINT: &str = "fingerprint";
pub const CMD_POSTS: &str = "posts";
pub const CMD_CHANGE_PASSWORD: &str = "change-password";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("sessionwarden")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(ARG_API_URL)
                .long("api-url")
                .help("Base URL of the posts API")
                .default_value(DEFAULT_API_BASE_URL)
                .env("SESSIONWARDEN_API_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_STATE_DIR)
                .long("state-dir")
                .help("Directory holding the persisted session")
                .long_help(
                    "Directory holding the persisted session. Defaults to the platform data directory.",
                )
                .env("SESSIONWARDEN_STATE_DIR")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long("timeout")
                .help("Per-request timeout in seconds")
                .default_value(DEFAULT_TIMEOUT_SECONDS)
                .env("SESSIONWARDEN_TIMEOUT")
                .global(true)
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_HEARTBEAT_INTERVAL)
                .long("heartbeat-interval")
                .help("Seconds between heartbeats while a session is watched")
                .default_value(DEFAULT_HEARTBEAT_SECONDS)
                .env("SESSIONWARDEN_HEARTBEAT_INTERVAL")
                .global(true)
                .value_parser(clap::value_parser!(u64)),
        )
        .subcommand(login())
        .subcommand(Command::new(CMD_LOGOUT).about("End the persisted session"))
        .subcommand(
            Command::new(CMD_STATUS).about("Show the authentication state, restoring it if persisted"),
        )
        .subcommand(fingerprint::with_args(
            Command::new(CMD_FINGERPRINT).about("Print the device fingerprint and its hash"),
        ))
        .subcommand(Command::new(CMD_POSTS).about("List posts (requires a session)"))
        .subcommand(change_password());

    logging::with_args(command)
}

fn login() -> Command {
    let command = Command::new(CMD_LOGIN)
        .about("Log in and persist the session")
        .arg(
            Arg::new("username")
                .short('u')
                .long("username")
                .help("Account username")
                .env("SESSIONWARDEN_USERNAME")
                .required(true),
        )
        .arg(
            Arg::new("password")
                .short('p')
                .long("password")
                .help("Account password")
                .env("SESSIONWARDEN_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("watch")
                .short('w')
                .long("watch")
                .help("Keep the session alive with heartbeats until Ctrl-C or a forced logout")
                .action(ArgAction::SetTrue),
        );

    fingerprint::with_args(command)
}

fn change_password() -> Command {
    Command::new(CMD_CHANGE_PASSWORD)
        .about("Change the password of the logged-in user (ends the session)")
        .arg(
            Arg::new("old-password")
                .long("old-password")
                .help("Current password")
                .env("SESSIONWARDEN_OLD_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("new-password")
                .long("new-password")
                .help("New password")
                .env("SESSIONWARDEN_NEW_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "sessionwarden");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some(env!("CARGO_PKG_DESCRIPTION").to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_default_durations_match_config() {
        use crate::config::{DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_REQUEST_TIMEOUT};

        assert_eq!(
            DEFAULT_TIMEOUT_SECONDS.parse::<u64>().ok(),
            Some(DEFAULT_REQUEST_TIMEOUT.as_secs())
        );
        assert_eq!(
            DEFAULT_HEARTBEAT_SECONDS.parse::<u64>().ok(),
            Some(DEFAULT_HEARTBEAT_INTERVAL.as_secs())
        );
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("SESSIONWARDEN_API_URL", None::<&str>),
                ("SESSIONWARDEN_TIMEOUT", None),
                ("SESSIONWARDEN_HEARTBEAT_INTERVAL", None),
                ("SESSIONWARDEN_STATE_DIR", None),
            ],
            || {
                let matches = new().get_matches_from(vec!["sessionwarden", "status"]);
                assert_eq!(
                    matches.get_one::<String>(ARG_API_URL).cloned(),
                    Some(DEFAULT_API_BASE_URL.to_string())
                );
                assert_eq!(matches.get_one::<u64>(ARG_TIMEOUT).copied(), Some(10));
                assert_eq!(
                    matches.get_one::<u64>(ARG_HEARTBEAT_INTERVAL).copied(),
                    Some(60)
                );
                assert_eq!(matches.get_one::<PathBuf>(ARG_STATE_DIR), None);
                assert_eq!(matches.subcommand_name(), Some(CMD_STATUS));
            },
        );
    }

    #[test]
    fn test_login_args() {
        temp_env::with_vars(
            [
                ("SESSIONWARDEN_USERNAME", None::<&str>),
                ("SESSIONWARDEN_PASSWORD", None),
            ],
            || {
                let matches = new().get_matches_from(vec![
                    "sessionwarden",
                    "login",
                    "--username",
                    "alice",
                    "--password",
                    "hunter22",
                    "--watch",
                    "--screen",
                    "1280x800",
                    "--api-url",
                    "https://posts.example",
                ]);

                assert_eq!(
                    matches.get_one::<String>(ARG_API_URL).cloned(),
                    Some("https://posts.example".to_string())
                );
                let (name, sub) = matches.subcommand().unwrap();
                assert_eq!(name, CMD_LOGIN);
                assert_eq!(
                    sub.get_one::<String>("username").cloned(),
                    Some("alice".to_string())
                );
                assert!(sub.get_flag("watch"));
            },
        );
    }

    #[test]
    fn test_login_requires_credentials() {
        temp_env::with_vars(
            [
                ("SESSIONWARDEN_USERNAME", None::<&str>),
                ("SESSIONWARDEN_PASSWORD", None),
            ],
            || {
                let result = new().try_get_matches_from(vec!["sessionwarden", "login", "-u", "alice"]);
                assert_eq!(
                    result.map_err(|e| e.kind()).err(),
                    Some(clap::error::ErrorKind::MissingRequiredArgument)
                );
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("SESSIONWARDEN_API_URL", Some("https://posts.example:8443")),
                ("SESSIONWARDEN_STATE_DIR", Some("/tmp/sessionwarden")),
                ("SESSIONWARDEN_TIMEOUT", Some("3")),
                ("SESSIONWARDEN_HEARTBEAT_INTERVAL", Some("15")),
                ("SESSIONWARDEN_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["sessionwarden", "status"]);
                assert_eq!(
                    matches.get_one::<String>(ARG_API_URL).cloned(),
                    Some("https://posts.example:8443".to_string())
                );
                assert_eq!(
                    matches.get_one::<PathBuf>(ARG_STATE_DIR).cloned(),
                    Some(PathBuf::from("/tmp/sessionwarden"))
                );
                assert_eq!(matches.get_one::<u64>(ARG_TIMEOUT).copied(), Some(3));
                assert_eq!(
                    matches.get_one::<u64>(ARG_HEARTBEAT_INTERVAL).copied(),
                    Some(15)
                );
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("SESSIONWARDEN_LOG_LEVEL", Some(level))], || {
                let matches = new().get_matches_from(vec!["sessionwarden", "status"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("SESSIONWARDEN_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["sessionwarden".to_string(), "status".to_string()];

                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_subcommand_required() {
        let result = new().try_get_matches_from(vec!["sessionwarden"]);
        assert!(result.is_err());
    }
}
