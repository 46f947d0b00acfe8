use crate::{
    cli::{
        actions::{change_password, fingerprint, login, logout, posts, status, Action},
        commands::{self, fingerprint as signal_args},
        globals::GlobalArgs,
    },
    fingerprint::{HostSignals, ScreenInfo},
};
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;
use std::path::PathBuf;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("missing subcommand"))?;

    if name == commands::CMD_FINGERPRINT {
        return Ok(Action::Fingerprint(fingerprint::Args {
            signals: host_signals(sub),
        }));
    }

    let globals = global_args(matches)?;

    let action = match name {
        commands::CMD_LOGIN => Action::Login(login::Args {
            globals,
            username: required(sub, "username")?,
            password: SecretString::from(required(sub, "password")?),
            watch: sub.get_flag("watch"),
            signals: host_signals(sub),
        }),
        commands::CMD_LOGOUT => Action::Logout(logout::Args { globals }),
        commands::CMD_STATUS => Action::Status(status::Args { globals }),
        commands::CMD_POSTS => Action::Posts(posts::Args { globals }),
        commands::CMD_CHANGE_PASSWORD => Action::ChangePassword(change_password::Args {
            globals,
            old_password: SecretString::from(required(sub, "old-password")?),
            new_password: SecretString::from(required(sub, "new-password")?),
        }),
        other => return Err(anyhow!("unknown subcommand: {other}")),
    };

    Ok(action)
}

fn global_args(matches: &ArgMatches) -> Result<GlobalArgs> {
    let api_url = required(matches, commands::ARG_API_URL)?;
    let state_dir = matches.get_one::<PathBuf>(commands::ARG_STATE_DIR).cloned();
    let timeout = matches
        .get_one::<u64>(commands::ARG_TIMEOUT)
        .copied()
        .unwrap_or(0);
    let heartbeat = matches
        .get_one::<u64>(commands::ARG_HEARTBEAT_INTERVAL)
        .copied()
        .unwrap_or(0);

    GlobalArgs::parse(&api_url, state_dir, timeout, heartbeat)
}

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .with_context(|| format!("missing required argument: --{id}"))
}

fn host_signals(matches: &ArgMatches) -> HostSignals {
    let mut signals = HostSignals::new();

    if let Some(user_agent) = matches.get_one::<String>(signal_args::ARG_USER_AGENT) {
        signals = signals.with_user_agent(user_agent.clone());
    }
    if let Some(screen) = matches.get_one::<ScreenInfo>(signal_args::ARG_SCREEN) {
        signals = signals.with_screen(screen.width, screen.height);
    }
    if let Some(ratio) = matches.get_one::<f64>(signal_args::ARG_PIXEL_RATIO) {
        signals = signals.with_device_pixel_ratio(*ratio);
    }
    if let Some(depth) = matches.get_one::<u32>(signal_args::ARG_COLOR_DEPTH) {
        signals = signals.with_color_depth(*depth);
    }
    if matches.get_flag(signal_args::ARG_TOUCH) {
        signals = signals.with_touch_support(true);
    }

    signals
}
