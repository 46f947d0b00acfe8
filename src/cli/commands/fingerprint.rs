use crate::fingerprint::ScreenInfo;
use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_USER_AGENT: &str = "user-agent";
pub const ARG_SCREEN: &str = "screen";
pub const ARG_PIXEL_RATIO: &str = "pixel-ratio";
pub const ARG_COLOR_DEPTH: &str = "color-depth";
pub const ARG_TOUCH: &str = "touch";

/// Parses `WIDTHxHEIGHT`, e.g. `1920x1080`.
#[must_use]
pub fn validator_screen() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<ScreenInfo, String> {
        let (width, height) = value
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;

        let width = width
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid screen width: {width}"))?;
        let height = height
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid screen height: {height}"))?;

        Ok(ScreenInfo { width, height })
    })
}

/// Overrides for signals a terminal cannot observe on its own.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_USER_AGENT)
                .long("user-agent")
                .help("User agent reported in the fingerprint")
                .env("SESSIONWARDEN_USER_AGENT"),
        )
        .arg(
            Arg::new(ARG_SCREEN)
                .long("screen")
                .help("Screen size as WIDTHxHEIGHT")
                .env("SESSIONWARDEN_SCREEN")
                .value_parser(validator_screen()),
        )
        .arg(
            Arg::new(ARG_PIXEL_RATIO)
                .long("pixel-ratio")
                .help("Device pixel ratio")
                .env("SESSIONWARDEN_PIXEL_RATIO")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new(ARG_COLOR_DEPTH)
                .long("color-depth")
                .help("Color depth in bits")
                .env("SESSIONWARDEN_COLOR_DEPTH")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_TOUCH)
                .long("touch")
                .help("Report touch support")
                .action(ArgAction::SetTrue),
        )
}
