use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use hexview::{parse_hex, run, CommandKind, CommonOptions};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!(error = %message, "command_failed");
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn run_cli() -> Result<(), String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        return Err(usage_text());
    }
    if args[0] == "-h" || args[0] == "--help" {
        print_usage();
        return Ok(());
    }

    let mut options = CommonOptions::default();
    let mut index = 0usize;
    while index < args.len() {
        let slot = match args[index].as_str() {
            "--settings" => &mut options.settings,
            "--protos" => &mut options.protos,
            "--sprites" => &mut options.sprites,
            "--hex-mask" => &mut options.hex_mask,
            "--editing" => {
                options.editing = true;
                index += 1;
                continue;
            }
            "--json" => {
                options.json = true;
                index += 1;
                continue;
            }
            _ => break,
        };
        let flag = &args[index];
        let value = args
            .get(index + 1)
            .ok_or_else(|| format!("missing value for {flag}"))?;
        *slot = Some(PathBuf::from(value));
        index += 2;
    }

    let command = args
        .get(index)
        .ok_or_else(|| "missing subcommand".to_string())?
        .as_str();
    let command_args = &args[(index + 1)..];
    let map = || {
        command_args
            .first()
            .map(PathBuf::from)
            .ok_or_else(|| format!("{command} requires a map file"))
    };
    let hex_arg = |position: usize, name: &str| {
        command_args
            .get(position)
            .ok_or_else(|| format!("{command} requires {name} as x,y"))
            .and_then(|raw| parse_hex(raw))
    };
    let expect_args = |count: usize| {
        if command_args.len() > count {
            Err(format!("too many arguments for {command}"))
        } else {
            Ok(())
        }
    };

    let kind = match command {
        "info" => {
            expect_args(1)?;
            CommandKind::Info { map: map()? }
        }
        "hash" => {
            expect_args(1)?;
            CommandKind::Hash { map: map()? }
        }
        "path" => {
            expect_args(4)?;
            let cut = command_args
                .get(3)
                .map(|raw| {
                    raw.parse::<u32>()
                        .map_err(|_| format!("invalid cut value '{raw}' (expected u32)"))
                })
                .transpose()?;
            CommandKind::Path {
                map: map()?,
                from: hex_arg(1, "<from>")?,
                to: hex_arg(2, "<to>")?,
                cut,
            }
        }
        "trace" => {
            expect_args(3)?;
            CommandKind::Trace {
                map: map()?,
                from: hex_arg(1, "<from>")?,
                to: hex_arg(2, "<to>")?,
            }
        }
        "light" => {
            expect_args(3)?;
            let radius = match command_args.get(2) {
                Some(raw) => raw
                    .parse::<u32>()
                    .map_err(|_| format!("invalid radius '{raw}' (expected u32)"))?,
                None => 3,
            };
            CommandKind::Light {
                map: map()?,
                center: hex_arg(1, "<center>")?,
                radius,
            }
        }
        "draw" => {
            expect_args(2)?;
            let center = if command_args.len() > 1 {
                Some(hex_arg(1, "<center>")?)
            } else {
                None
            };
            CommandKind::Draw { map: map()?, center }
        }
        other => return Err(format!("unknown subcommand '{other}'")),
    };

    run(kind, &options, &mut io::stdout())
}

fn print_usage() {
    println!("{}", usage_text());
}

fn usage_text() -> String {
    [
        "hexview - inspect hex maps",
        "",
        "Usage:",
        "  hexview [options] info <map>",
        "  hexview [options] hash <map>",
        "  hexview [options] path <map> <from x,y> <to x,y> [cut]",
        "  hexview [options] trace <map> <from x,y> <to x,y>",
        "  hexview [options] light <map> <center x,y> [radius]",
        "  hexview [options] draw <map> [center x,y]",
        "",
        "Options:",
        "  --settings <file>   hex settings JSON (defaults built in)",
        "  --protos <file>     item proto table JSON",
        "  --sprites <file>    sprite metrics JSON keyed by sprite hash",
        "  --hex-mask <file>   PNG hex mask for pixel picking",
        "  --editing           enable editing features",
        "  --json              machine-readable info output",
        "",
        "Logging follows RUST_LOG (default info).",
    ]
    .join("\n")
}
