// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod render;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use cointrack_app::SortDirection;
use cointrack_app::timestamp::{parse_date, parse_timestamp};
use cointrack_client::ApiClient;
use config::Config;
use runtime::PageSizes;
use std::env;
use std::path::PathBuf;
use time::{Date, OffsetDateTime};

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `cointrack --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;
    init_logging(config.log_level());

    let session_cookie = config.session_cookie();
    let client = ApiClient::new(
        config.base_url(),
        config.timeout()?,
        session_cookie.as_deref(),
    )
    .with_context(|| {
        format!(
            "invalid [server] config in {}; fix base_url/timeout/session_cookie values",
            options.config_path.display()
        )
    })?;
    if options.check_only {
        log::info!("config ok, server {}", client.base_url());
        return Ok(());
    }
    if session_cookie.is_none() {
        log::warn!("no session cookie configured; set {}", config::SESSION_ENV);
    }

    let sizes = PageSizes {
        users: config.users_page_size(),
        history: config.history_page_size(),
    };
    let output = runtime::execute(&options.command, client, sizes)?;
    print!("{output}");
    Ok(())
}

fn init_logging(level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

/// Sort, filter, and paging flags shared by the table commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ViewArgs {
    pub sort: Option<String>,
    pub direction: Option<SortDirection>,
    pub filter: Option<String>,
    pub source: Option<String>,
    pub from: Option<Date>,
    pub to: Option<Date>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Summary,
    Transactions(ViewArgs),
    History(ViewArgs),
    Add {
        amount: i64,
        source: String,
        date: Option<OffsetDateTime>,
    },
    Delete {
        id: String,
    },
    Import {
        path: PathBuf,
    },
    Profiles,
    SwitchProfile {
        name: String,
    },
    CreateProfile {
        name: String,
    },
    Whoami,
    Users(ViewArgs),
    Stats,
    DeleteUser {
        id: String,
    },
    Broadcast {
        message: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    command: Command,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
        command: Command::Summary,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown if unknown.starts_with('-') => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
            name => {
                let rest: Vec<String> = iter.map(|value| value.as_ref().to_owned()).collect();
                options.command = parse_command(name, rest)?;
                break;
            }
        }
    }

    Ok(options)
}

fn parse_command(name: &str, args: Vec<String>) -> Result<Command> {
    let command = match name {
        "summary" => {
            no_arguments(name, &args)?;
            Command::Summary
        }
        "transactions" => Command::Transactions(parse_view_args(name, args)?),
        "history" => Command::History(parse_view_args(name, args)?),
        "users" => Command::Users(parse_view_args(name, args)?),
        "add" => parse_add(args)?,
        "delete" => Command::Delete {
            id: single_argument(name, "transaction id", args)?,
        },
        "import" => Command::Import {
            path: PathBuf::from(single_argument(name, "file path", args)?),
        },
        "profiles" => {
            no_arguments(name, &args)?;
            Command::Profiles
        }
        "switch-profile" => Command::SwitchProfile {
            name: single_argument(name, "profile name", args)?,
        },
        "create-profile" => Command::CreateProfile {
            name: single_argument(name, "profile name", args)?,
        },
        "whoami" => {
            no_arguments(name, &args)?;
            Command::Whoami
        }
        "stats" => {
            no_arguments(name, &args)?;
            Command::Stats
        }
        "delete-user" => Command::DeleteUser {
            id: single_argument(name, "user id", args)?,
        },
        "broadcast" => Command::Broadcast {
            message: (!args.is_empty()).then(|| args.join(" ")),
        },
        unknown => {
            bail!("unknown command {unknown:?}; run with --help to see supported commands");
        }
    };
    Ok(command)
}

fn no_arguments(name: &str, args: &[String]) -> Result<()> {
    match args.first() {
        Some(extra) => bail!("{name} takes no arguments, got {extra:?}"),
        None => Ok(()),
    }
}

fn single_argument(name: &str, what: &str, args: Vec<String>) -> Result<String> {
    let mut iter = args.into_iter();
    let value = iter
        .next()
        .ok_or_else(|| anyhow!("{name} requires a {what}"))?;
    if let Some(extra) = iter.next() {
        bail!("{name} takes a single {what}, got extra argument {extra:?}");
    }
    Ok(value)
}

fn parse_add(args: Vec<String>) -> Result<Command> {
    let mut positional = Vec::new();
    let mut date = None;
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--date" {
            let raw = iter
                .next()
                .ok_or_else(|| anyhow!("--date requires a value"))?;
            date = Some(parse_timestamp(&raw).ok_or_else(|| {
                anyhow!("--date expects YYYY-MM-DD or an ISO-8601 date-time, got {raw:?}")
            })?);
        } else if arg.starts_with("--") {
            bail!("unknown add option {arg:?}; only --date is supported");
        } else {
            positional.push(arg);
        }
    }

    let [amount, source] = <[String; 2]>::try_from(positional)
        .map_err(|_| anyhow!("add requires <amount> <source>, for example: add -25 Snacks"))?;
    let amount = amount
        .parse()
        .with_context(|| format!("amount must be a whole number of coins, got {amount:?}"))?;
    Ok(Command::Add {
        amount,
        source,
        date,
    })
}

fn parse_view_args(name: &str, args: Vec<String>) -> Result<ViewArgs> {
    let mut view = ViewArgs::default();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .ok_or_else(|| anyhow!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--sort" => view.sort = Some(value("--sort")?),
            "--asc" => view.direction = Some(SortDirection::Ascending),
            "--desc" => view.direction = Some(SortDirection::Descending),
            "--filter" => view.filter = Some(value("--filter")?),
            "--source" => view.source = Some(value("--source")?),
            "--from" => view.from = Some(date_flag("--from", &value("--from")?)?),
            "--to" => view.to = Some(date_flag("--to", &value("--to")?)?),
            "--page" => view.page = Some(count_flag("--page", &value("--page")?)?),
            "--page-size" => {
                view.page_size = Some(count_flag("--page-size", &value("--page-size")?)?);
            }
            unknown => {
                bail!("unknown {name} option {unknown:?}; run with --help to see view flags");
            }
        }
    }
    Ok(view)
}

fn date_flag(flag: &str, raw: &str) -> Result<Date> {
    parse_date(raw).ok_or_else(|| anyhow!("{flag} expects YYYY-MM-DD, got {raw:?}"))
}

fn count_flag(flag: &str, raw: &str) -> Result<u32> {
    match raw.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => bail!("{flag} expects a positive whole number, got {raw:?}"),
    }
}

fn print_help() {
    println!("cointrack");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config and exit");
    println!("  --help                   Show this help");
    println!();
    println!("commands (default: summary)");
    println!("  summary                  Balance, goal, and recent totals");
    println!("  transactions [view]      Transactions from the loaded snapshot");
    println!("  history [view]           Transactions paged by the server");
    println!("  add <amount> <source> [--date <when>]");
    println!("  delete <transaction-id>");
    println!("  import <file>            Replace the ledger with an exported file");
    println!("  profiles                 List profiles; * marks the current one");
    println!("  switch-profile <name>");
    println!("  create-profile <name>");
    println!("  whoami");
    println!("  users [view]             Admin: list users");
    println!("  stats                    Admin: totals and sign-ups");
    println!("  delete-user <user-id>    Admin: delete a user and their data");
    println!("  broadcast [<message>]    Show the broadcast, or set it (admin)");
    println!();
    println!("view flags");
    println!("  --sort <key> --asc --desc --filter <text> --source <name>");
    println!("  --from <YYYY-MM-DD> --to <YYYY-MM-DD> --page <n> --page-size <n>");
}
