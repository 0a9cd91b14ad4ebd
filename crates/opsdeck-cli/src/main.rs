use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use opsdeck_cli::commands::{collect, ListOptions};
use opsdeck_cli::render::{write_json, write_text, Summary, Tabular};
use opsdeck_cli::{logging, OpsdeckConfig};
use opsdeck_query::{ListViewConfig, PageSource, RecordId};
use opsdeck_resources::{ApiClient, LogsSource, StaticSession, TransfersSource, UsersSource};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

fn list_command(name: &'static str, about: &'static str) -> Command {
    Command::new(name)
        .about(about)
        .arg(Arg::new("search").long("search").short('s').help("Free-text search"))
        .arg(Arg::new("status").long("status").help("Status filter (\"all\" means unfiltered)"))
        .arg(Arg::new("channel").long("channel").help("Channel filter"))
        .arg(
            Arg::new("from")
                .long("from")
                .help("Start date, YYYY-MM-DD or RFC 3339"),
        )
        .arg(
            Arg::new("to")
                .long("to")
                .help("End date, YYYY-MM-DD or RFC 3339"),
        )
        .arg(
            Arg::new("page")
                .long("page")
                .short('p')
                .default_value("1")
                .value_parser(value_parser!(u32).range(1..))
                .help("Page to show when filters are active"),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .value_parser(value_parser!(u32).range(1..))
                .help("Records per page"),
        )
        .arg(Arg::new("sort").long("sort").help("Sort field"))
        .arg(
            Arg::new("asc")
                .long("asc")
                .action(ArgAction::SetTrue)
                .help("Sort ascending"),
        )
        .arg(
            Arg::new("all")
                .long("all")
                .action(ArgAction::SetTrue)
                .help("Keep loading until the stream is exhausted"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Output as JSON"),
        )
}

fn record_id_arg() -> Arg {
    Arg::new("id").required(true).help("Transfer request id")
}

fn cli() -> Command {
    Command::new("opsdeck")
        .version(opsdeck_query::VERSION)
        .about("Operations dashboard lists from the terminal")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Config file (default: ./opsdeck.toml)"),
        )
        .subcommand(list_command("logs", "List activity logs"))
        .subcommand(list_command("transfers", "List transfer requests"))
        .subcommand(list_command("users", "List registered users"))
        .subcommand(
            Command::new("approve")
                .about("Approve a transfer request")
                .arg(record_id_arg()),
        )
        .subcommand(
            Command::new("reject")
                .about("Reject a transfer request")
                .arg(record_id_arg()),
        )
        .subcommand(
            Command::new("automation")
                .about("Switch automatic transfer processing")
                .arg(
                    Arg::new("state")
                        .required(true)
                        .value_parser(["on", "off"])
                        .help("on or off"),
                ),
        )
}

fn list_options(args: &ArgMatches) -> ListOptions {
    let text = |name: &str| args.get_one::<String>(name).cloned();
    ListOptions {
        search: text("search"),
        status: text("status"),
        channel: text("channel"),
        from: text("from"),
        to: text("to"),
        page: args.get_one::<u32>("page").copied().unwrap_or(1),
        limit: args.get_one::<u32>("limit").copied(),
        sort: text("sort"),
        ascending: args.get_flag("asc"),
        all: args.get_flag("all"),
    }
}

async fn run_list<P>(source: P, config: ListViewConfig, args: &ArgMatches) -> anyhow::Result<()>
where
    P: PageSource,
    P::Record: Tabular + Serialize,
    P::Stats: Summary + Serialize,
{
    let name = source.name().to_string();
    let listing = collect(Arc::new(source), config, &list_options(args))
        .await
        .with_context(|| format!("listing {name}"))?;

    let mut out = std::io::stdout().lock();
    if args.get_flag("json") {
        write_json(&mut out, &listing)?;
    } else {
        write_text(&mut out, &listing)?;
    }
    Ok(())
}

fn record_id(args: &ArgMatches) -> anyhow::Result<RecordId> {
    match args.get_one::<String>("id") {
        Some(id) => Ok(RecordId::new(id.as_str())),
        None => bail!("missing transfer request id"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let config = OpsdeckConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))
        .context("loading configuration")?;
    logging::init(&config.logging.level, config.logging.format)?;

    let mut session = StaticSession::new(config.tenant()?);
    if let Some(token) = &config.api.token {
        session = session.with_token(token.clone());
    }
    let client = ApiClient::new(Arc::new(session)).context("building HTTP client")?;

    match matches.subcommand() {
        Some(("logs", args)) => {
            run_list(LogsSource::new(client), config.views.logs, args).await?;
        }
        Some(("transfers", args)) => {
            run_list(TransfersSource::new(client), config.views.transfers, args).await?;
        }
        Some(("users", args)) => {
            run_list(UsersSource::new(client), config.views.users, args).await?;
        }
        Some(("approve", args)) => {
            let id = record_id(args)?;
            TransfersSource::new(client)
                .approve(&id)
                .await
                .with_context(|| format!("approving {id}"))?;
            println!("approved {id}");
        }
        Some(("reject", args)) => {
            let id = record_id(args)?;
            TransfersSource::new(client)
                .reject(&id)
                .await
                .with_context(|| format!("rejecting {id}"))?;
            println!("rejected {id}");
        }
        Some(("automation", args)) => {
            let enabled = args.get_one::<String>("state").is_some_and(|s| s == "on");
            TransfersSource::new(client)
                .set_automation(enabled)
                .await
                .context("switching automation")?;
            println!("automation {}", if enabled { "on" } else { "off" });
        }
        _ => bail!("unknown command"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn list_flags_map_to_options() {
        let matches = cli()
            .try_get_matches_from([
                "opsdeck", "transfers", "--search", "acme", "--page", "3", "--limit", "50",
                "--asc",
            ])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        let options = list_options(args);

        assert_eq!(options.search.as_deref(), Some("acme"));
        assert_eq!(options.page, 3);
        assert_eq!(options.limit, Some(50));
        assert!(options.ascending);
        assert!(!options.all);
    }

    #[test]
    fn page_zero_is_rejected() {
        assert!(cli()
            .try_get_matches_from(["opsdeck", "users", "--page", "0"])
            .is_err());
    }
}
