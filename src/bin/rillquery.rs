use clap::{ArgAction, Parser};
use rillquery::{
    Client, ClientConfig, Error, FilterKind, Predicate, QueryBuilder, SortDirection, WithContext,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rillquery", version, about = "Compile and send a query to a remote data service")]
struct Cli {
    /// Query endpoint. Falls back to RILLQUERY_URL.
    #[arg(long)]
    url: Option<String>,

    /// API key sent as a bearer token. Falls back to RILLQUERY_API_KEY.
    #[arg(long)]
    api_key: Option<String>,

    /// Collection to query
    collection: String,

    /// Columns to select
    #[arg(long, default_value = "*")]
    select: String,

    /// Equality filter `column=value` (repeatable)
    #[arg(long, action = ArgAction::Append, value_name = "COLUMN=VALUE")]
    eq: Vec<String>,

    /// Inequality filter `column=value` (repeatable)
    #[arg(long, action = ArgAction::Append, value_name = "COLUMN=VALUE")]
    neq: Vec<String>,

    /// Greater-than filter `column=value` (repeatable)
    #[arg(long, action = ArgAction::Append, value_name = "COLUMN=VALUE")]
    gt: Vec<String>,

    /// Greater-or-equal filter `column=value` (repeatable)
    #[arg(long, action = ArgAction::Append, value_name = "COLUMN=VALUE")]
    gte: Vec<String>,

    /// Less-than filter `column=value` (repeatable)
    #[arg(long, action = ArgAction::Append, value_name = "COLUMN=VALUE")]
    lt: Vec<String>,

    /// Less-or-equal filter `column=value` (repeatable)
    #[arg(long, action = ArgAction::Append, value_name = "COLUMN=VALUE")]
    lte: Vec<String>,

    /// Null-aware filter `column=value` (repeatable)
    #[arg(long, action = ArgAction::Append, value_name = "COLUMN=VALUE")]
    is: Vec<String>,

    /// Negated filter `column=operator:value`, e.g. `status=eq:archived` (repeatable)
    #[arg(long, action = ArgAction::Append, value_name = "COLUMN=OP:VALUE")]
    not: Vec<String>,

    /// Membership filter `column=a,b,c` (repeatable)
    #[arg(long = "in", action = ArgAction::Append, value_name = "COLUMN=LIST")]
    in_list: Vec<String>,

    /// Column to order by
    #[arg(long)]
    order: Option<String>,

    /// Order descending instead of ascending
    #[arg(long, requires = "order")]
    desc: bool,

    #[arg(long)]
    limit: Option<i64>,

    /// Expect exactly one row
    #[arg(long, conflicts_with = "maybe_single")]
    single: bool,

    /// Expect at most one row
    #[arg(long)]
    maybe_single: bool,

    /// Print the request body instead of sending it
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> rillquery::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match cli.url.clone() {
        Some(url) => ClientConfig::new(url),
        None if cli.dry_run => ClientConfig::new("http://localhost"),
        None => match ClientConfig::from_env().context("reading client settings from the environment") {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: --url or env RILLQUERY_URL is required ({e})");
                std::process::exit(2);
            }
        },
    };
    if let Some(key) = cli.api_key.clone() {
        config.api_key = Some(key);
    }

    let client = Client::from_config(config)?;
    let query = build_query(&client, &cli)?;

    if cli.dry_run {
        println!("{}", serde_json::to_string_pretty(&query.to_wire())?);
        return Ok(());
    }

    let response = query.await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    if response.is_error() {
        std::process::exit(1);
    }
    Ok(())
}

fn build_query(client: &Client, cli: &Cli) -> rillquery::Result<QueryBuilder> {
    let mut query = client.from(&cli.collection).select(&cli.select);

    let scalar_filters = [
        (FilterKind::Eq, &cli.eq),
        (FilterKind::Neq, &cli.neq),
        (FilterKind::Gt, &cli.gt),
        (FilterKind::Gte, &cli.gte),
        (FilterKind::Lt, &cli.lt),
        (FilterKind::Lte, &cli.lte),
        (FilterKind::Is, &cli.is),
    ];
    for (kind, args) in scalar_filters {
        for arg in args {
            let (column, raw) = split_pair(arg)?;
            let value = parse_value(raw);
            query = query.filter(match kind {
                FilterKind::Eq => Predicate::eq(column, value),
                FilterKind::Neq => Predicate::neq(column, value),
                FilterKind::Gt => Predicate::gt(column, value),
                FilterKind::Gte => Predicate::gte(column, value),
                FilterKind::Lt => Predicate::lt(column, value),
                FilterKind::Lte => Predicate::lte(column, value),
                _ => Predicate::is(column, value),
            });
        }
    }
    for arg in &cli.not {
        let (column, rest) = split_pair(arg)?;
        let (operator, raw) = rest
            .split_once(':')
            .ok_or_else(|| Error::Config(format!("expected COLUMN=OP:VALUE, got `{arg}`")))?;
        let operator = parse_operator(operator)?;
        query = query.not(column, operator, parse_value(raw));
    }
    for arg in &cli.in_list {
        let (column, raw) = split_pair(arg)?;
        let values = raw
            .split(',')
            .filter(|item| !item.is_empty())
            .map(parse_value)
            .collect::<Vec<_>>();
        query = query.r#in(column, values);
    }

    if let Some(column) = &cli.order {
        let direction = if cli.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        query = query.order(column, direction);
    }
    if let Some(limit) = cli.limit {
        query = query.limit(limit);
    }
    if cli.single {
        query = query.single();
    }
    if cli.maybe_single {
        query = query.maybe_single();
    }
    Ok(query)
}

fn split_pair(arg: &str) -> rillquery::Result<(&str, &str)> {
    arg.split_once('=')
        .ok_or_else(|| Error::Config(format!("expected COLUMN=VALUE, got `{arg}`")))
}

fn parse_operator(raw: &str) -> rillquery::Result<FilterKind> {
    serde_json::from_value(Value::String(raw.to_ascii_lowercase()))
        .map_err(|_| Error::Config(format!("unknown filter operator `{raw}`")))
}

/// JSON literals (`true`, `42`, `null`, `"x"`) are taken as-is, anything else as a string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
