// Copyright 2021 Locha Mesh Developers <contact@locha.io>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{fmt, path::PathBuf, process};

use chronos_cbm::{ports, Options, Session, Status, Units};
use serial::SystemPort;

use anyhow::{Context, Result};
use clap::{
    crate_authors, crate_version, App, AppSettings, Arg, ArgMatches, SubCommand,
};
use dialoguer::{theme::ColorfulTheme, Confirm};
use log::LevelFilter;

mod accel;
mod flash;
mod list;
mod sync;

const LOG_ENV: &str = "CHRONOS_TOOL_LOG";

fn main() {
    let args = cli().get_matches();

    init_logger(args.occurrences_of("verbose"));

    if let Err(e) = run(&args) {
        eprintln!("Error: {:?}", e);

        let code = e.downcast_ref::<Failure>().map_or(1, Failure::exit_code);
        process::exit(code);
    }
}

fn run(args: &ArgMatches<'_>) -> Result<()> {
    let global_args = GlobalArgs {
        device: args.value_of("device").map(PathBuf::from),
        options: Options {
            reset: !args.is_present("noreset"),
            units: if args.is_present("raw") {
                Units::Raw
            } else {
                Units::Gravity
            },
            ..Options::default()
        },
    };

    match args.subcommand() {
        ("list", Some(_)) => list::list(),
        ("status", Some(_)) => status(&global_args),
        ("rfbsl", Some(m)) => {
            let path = flash::file_arg(m)?;
            let mut session = global_args.open_session()?;
            let image = flash::load_image(&path)?;
            flash::flash(&mut session, &image)
        }
        ("sync", Some(m)) => {
            let sync_args = sync::SyncArgs::from_matches(m)?;
            let mut session = global_args.open_session()?;
            sync::sync(&mut session, &sync_args)
        }
        ("prg", Some(m)) => {
            let path = flash::file_arg(m)?;
            let sync_args = sync::SyncArgs::from_matches(m)?;
            let mut session = global_args.open_session()?;
            let image = flash::load_image(&path)?;
            flash::flash(&mut session, &image)?;
            sync::sync(&mut session, &sync_args)
        }
        ("accel", Some(_)) => {
            let mut session = global_args.open_session()?;
            accel::accel(&mut session)
        }
        ("", None) => {
            println!("{}", args.usage());
            Err(Failure::MissingCommand.into())
        }
        (name, _) => Err(Failure::InvalidCommand(name.to_owned()).into()),
    }
}

fn status(global_args: &GlobalArgs) -> Result<()> {
    let mut session = global_args.open_session()?;
    let status = session.all_status().context("Couldn't read status")?;

    print!("{}", format_status(&status, session.max_burst_len()));

    Ok(())
}

fn format_status(status: &Status, max_burst_len: usize) -> String {
    format!(
        "Base module:      {}\nWBSL:             {}\nWBSL packet:      {}\nMax burst length: {}\n",
        hex::encode_upper(&status.base),
        hex::encode_upper(&status.wbsl),
        hex::encode_upper(&status.packet),
        max_burst_len
    )
}

struct GlobalArgs {
    device: Option<PathBuf>,
    options: Options,
}

impl GlobalArgs {
    fn open_session(&self) -> Result<Session<SystemPort>> {
        let device = match &self.device {
            Some(device) => device.clone(),
            None => ports::guess_device().ok_or(Failure::NoDevice)?,
        };

        log::info!("Opening base module `{}`", device.display());
        let port = chronos_cbm::open_port(&device).map_err(|e| {
            anyhow::Error::new(e).context(Failure::Device(device.clone()))
        })?;

        log::info!("Initializing communications with the base module");
        let session = Session::new(port, self.options)
            .context("Failed to initialize the base module")?;
        log::debug!("{:?}", session);

        Ok(session)
    }
}

/// Failures with a dedicated exit code.
#[derive(Debug)]
pub enum Failure {
    InvalidCommand(String),
    MissingCommand,
    MissingFile,
    NoDevice,
    Device(PathBuf),
    File(PathBuf),
}

impl Failure {
    fn exit_code(&self) -> i32 {
        match self {
            Failure::InvalidCommand(_) => 4,
            Failure::MissingCommand | Failure::MissingFile => 5,
            Failure::NoDevice | Failure::Device(_) => 6,
            Failure::File(_) => 7,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::InvalidCommand(name) => write!(fmt, "invalid command `{}`", name),
            Failure::MissingCommand => write!(fmt, "sub-command required"),
            Failure::MissingFile => write!(fmt, "missing firmware file argument"),
            Failure::NoDevice => write!(
                fmt,
                "couldn't find the base module, use --device to select it"
            ),
            Failure::Device(path) => write!(fmt, "bad device `{}`", path.display()),
            Failure::File(path) => write!(fmt, "bad file `{}`", path.display()),
        }
    }
}

impl std::error::Error for Failure {}

/// Asks the operator to go on. Declining, Esc or a closed terminal cancel.
pub fn confirm(prompt: &str) -> bool {
    match Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(true)
        .interact_opt()
    {
        Ok(Some(answer)) => answer,
        Ok(None) => false,
        Err(e) => {
            log::debug!("Confirmation prompt failed: {}", e);
            false
        }
    }
}

fn init_logger(verbosity: u64) {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    #[cfg(feature = "pretty-env-logger")]
    let mut builder = pretty_env_logger::formatted_builder();
    #[cfg(not(feature = "pretty-env-logger"))]
    let mut builder = env_logger::Builder::new();

    builder.filter_level(level);
    if let Ok(filters) = std::env::var(LOG_ENV) {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn cli() -> App<'static, 'static> {
    let temperature = Arg::with_name("TEMP")
        .takes_value(true)
        .default_value("0")
        .help("Temperature in degrees Celsius");
    let altitude = Arg::with_name("ALTITUDE")
        .takes_value(true)
        .default_value("0")
        .help("Altitude in meters");
    let file = Arg::with_name("FILE")
        .takes_value(true)
        .help("Firmware file in TI-TXT format");

    App::new("chronos-tool")
        .usage("chronos-tool [OPTIONS] [SUBCOMMAND]")
        .setting(AppSettings::ColoredHelp)
        .setting(AppSettings::AllowExternalSubcommands)
        .version(crate_version!())
        .author(crate_authors!())
        .about("Talk to the eZ430-Chronos watch through its RF access point")
        .arg(
            opt("device", "Serial device of the base module (detected by default)")
                .short("d")
                .takes_value(true)
        )
        .arg(
            opt("noreset", "Don't reset the base module, resume a running stream")
                .short("n")
        )
        .arg(
            opt("raw", "Print raw accelerometer values instead of g")
                .short("r")
        )
        .arg(
            opt("verbose", "Use verbose output: -v (debug), -vv (trace)")
                .short("v")
                .multiple(true)
        )
        .subcommand(
            SubCommand::with_name("rfbsl")
                .about("Upload a firmware through the wireless bootloader")
                .setting(AppSettings::ColoredHelp)
                .arg(file.clone())
        )
        .subcommand(
            SubCommand::with_name("sync")
                .about("Synchronize time, temperature and altitude")
                .setting(AppSettings::ColoredHelp)
                .setting(AppSettings::AllowNegativeNumbers)
                .arg(temperature.clone())
                .arg(altitude.clone())
        )
        .subcommand(
            SubCommand::with_name("prg")
                .about("Upload a firmware, then synchronize the watch")
                .setting(AppSettings::ColoredHelp)
                .setting(AppSettings::AllowNegativeNumbers)
                .arg(file)
                .arg(temperature)
                .arg(altitude)
        )
        .subcommand(
            SubCommand::with_name("accel")
                .about("Stream accelerometer readings as `x y z` lines")
                .setting(AppSettings::ColoredHelp)
        )
        .subcommand(
            SubCommand::with_name("status")
                .about("Print the base module status")
                .setting(AppSettings::ColoredHelp)
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("List serial ports")
                .setting(AppSettings::ColoredHelp)
        )
}

fn opt(name: &'static str, help: &'static str) -> Arg<'static, 'static> {
    Arg::with_name(name).long(name).help(help)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exit_code(argv: &[&str]) -> Option<i32> {
        let args = cli().get_matches_from_safe(argv).unwrap();
        run(&args)
            .err()
            .map(|e| e.downcast_ref::<Failure>().map_or(1, Failure::exit_code))
    }

    #[test]
    fn test_missing_file_argument() {
        assert_eq!(exit_code(&["chronos-tool", "rfbsl"]), Some(5));
        assert_eq!(exit_code(&["chronos-tool", "prg"]), Some(5));
    }

    #[test]
    fn test_device_checked_before_file() {
        for cmd in ["rfbsl", "prg"] {
            let argv = [
                "chronos-tool",
                "-d",
                "/nonexistent/ttyACM9",
                cmd,
                "/nonexistent/firmware.txt",
            ];
            assert_eq!(exit_code(&argv), Some(6));
        }
    }

    #[test]
    fn test_command_exit_codes() {
        assert_eq!(exit_code(&["chronos-tool"]), Some(5));
        assert_eq!(exit_code(&["chronos-tool", "flash"]), Some(4));
    }

    #[test]
    fn test_format_status() {
        let status = Status {
            base: vec![0x03],
            wbsl: vec![0x0A, 0xFF],
            packet: vec![0x01],
        };

        assert_eq!(
            format_status(&status, 0xF7),
            "Base module:      03\nWBSL:             0AFF\nWBSL packet:      01\nMax burst length: 247\n"
        );
    }
}
