//! Purpose: `csw-publish` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, wires the publisher, prints the catalogue response on stdout.
//! Invariants: stdout carries only the response text (publish) or request body (render).
//! Invariants: Non-interactive errors and notices are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use csw_publish::api::{
    Error, ErrorKind, HarvestRequest, HttpTransport, PublishOptions, Publisher, StaticForm,
    StdoutNotifier, parse_endpoint, to_exit_code,
};
use csw_publish::notice::{Notice, notice_json};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

fn main() {
    let exit_code = match run() {
        Ok(()) => 0,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    std::process::exit(2);
                }
                return Ok(());
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `csw-publish --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();
    let color_mode = cli.color;
    let result = match cli.command {
        Command::Publish(args) => run_publish(args, color_mode),
        Command::Render(args) => run_render(args),
    };
    result
        .map_err(add_kind_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "csw-publish",
    version,
    about = "Publish resources to an OGC CSW 2.0.2 catalogue",
    long_about = None,
    after_help = r#"EXAMPLES
  $ csw-publish publish --endpoint http://localhost:8000/csw \
      --resource-type service --source http://example.org/wms
  $ csw-publish render --resource-type service --source http://example.org/wms

ENVIRONMENT
  CSW_ENDPOINT, CSW_RESOURCE_TYPE, CSW_SOURCE, CSW_TOKEN fill the matching flags.
  RUST_LOG controls diagnostics on stderr (default: warn)."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics"
    )]
    color: ColorMode,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Send a Harvest request and print the catalogue response")]
    Publish(PublishArgs),
    #[command(about = "Print the Harvest request body without sending it")]
    Render(RequestArgs),
}

#[derive(Args)]
struct RequestArgs {
    #[arg(long, env = "CSW_RESOURCE_TYPE", help = "Resource type label, e.g. service")]
    resource_type: String,
    #[arg(
        long,
        env = "CSW_SOURCE",
        value_hint = ValueHint::Url,
        help = "URL of the resource the catalogue should harvest"
    )]
    source: String,
    #[arg(long, help = "XML-escape the values (sent verbatim by default)")]
    escape: bool,
}

#[derive(Args)]
struct PublishArgs {
    #[arg(
        long,
        env = "CSW_ENDPOINT",
        value_hint = ValueHint::Url,
        help = "CSW service endpoint URL"
    )]
    endpoint: String,
    #[command(flatten)]
    request: RequestArgs,
    #[arg(
        long,
        env = "CSW_TOKEN",
        hide_env_values = true,
        help = "Bearer token sent as Authorization header"
    )]
    token: Option<String>,
    #[arg(long, help = "Request timeout, e.g. 500ms, 10s, 2m")]
    timeout: Option<String>,
    #[arg(long, value_hint = ValueHint::FilePath, help = "PEM file with trusted CA certificates")]
    tls_ca: Option<PathBuf>,
    #[arg(long, help = "Disable TLS certificate verification")]
    tls_skip_verify: bool,
}

fn run_publish(args: PublishArgs, color_mode: ColorMode) -> Result<(), Error> {
    let endpoint = parse_endpoint(&args.endpoint)?;
    let request = HarvestRequest::new(&args.request.resource_type, &args.request.source);
    if !args.request.escape && request.markup_chars() {
        emit_notice(&unescaped_markup_notice(&request, endpoint.as_str()), color_mode);
    }

    let mut transport = HttpTransport::new();
    if let Some(token) = args.token {
        transport = transport.with_token(token);
    }
    if let Some(raw) = args.timeout.as_deref() {
        transport = transport.with_timeout(parse_duration(raw)?);
    }
    if let Some(path) = args.tls_ca {
        transport = transport.with_tls_ca_file(path)?;
    }
    if args.tls_skip_verify {
        transport = transport.with_tls_skip_verify();
    }

    let form = StaticForm::new(request.resource_type, request.source, endpoint.as_str());
    let publisher = Publisher::new(Arc::new(form), Arc::new(transport), Arc::new(StdoutNotifier))
        .with_options(PublishOptions {
            escape: args.request.escape,
        });
    publisher.publish().map(|_| ())
}

fn run_render(args: RequestArgs) -> Result<(), Error> {
    let request = HarvestRequest::new(args.resource_type, args.source);
    let body = if args.escape {
        request.to_xml_escaped()
    } else {
        request.to_xml()
    };
    println!("{body}");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn parse_duration(input: &str) -> Result<Duration, Error> {
    let invalid = || {
        Error::new(ErrorKind::Usage)
            .with_message(format!("invalid duration `{input}`"))
            .with_hint("Use a number plus ms|s|m|h (e.g. 10s).")
    };
    let trimmed = input.trim();
    let split = trimmed
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map(|(idx, _)| idx)
        .ok_or_else(invalid)?;
    let (num_str, unit) = trimmed.split_at(split);
    let value: u64 = num_str.parse().map_err(|_| invalid())?;
    let millis = match unit {
        "ms" => Some(value),
        "s" => value.checked_mul(1_000),
        "m" => value.checked_mul(60_000),
        "h" => value.checked_mul(3_600_000),
        _ => None,
    }
    .ok_or_else(invalid)?;
    if millis == 0 {
        return Err(invalid());
    }
    Ok(Duration::from_millis(millis))
}

fn unescaped_markup_notice(request: &HarvestRequest, endpoint: &str) -> Notice {
    let mut details = Map::new();
    details.insert("resource_type".to_string(), json!(request.resource_type));
    details.insert("source".to_string(), json!(request.source));
    Notice {
        kind: "unescaped_markup".to_string(),
        time: notice_time_now().unwrap_or_default(),
        cmd: "publish".to_string(),
        endpoint: Some(endpoint.to_string()),
        message: "values contain <, > or & and are sent unescaped (use --escape to encode them)"
            .to_string(),
        details,
    }
}

fn notice_time_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_notice(notice: &Notice, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} {}", notice.message);
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    let fallback = match err.kind() {
        ErrorKind::Internal => "internal error",
        ErrorKind::Usage => "usage error",
        ErrorKind::NotFound => "not found",
        ErrorKind::Permission => "permission denied",
        ErrorKind::Remote => "catalogue error",
        ErrorKind::Io => "i/o error",
    };
    fallback.to_string()
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(endpoint) = err.endpoint() {
        inner.insert("endpoint".to_string(), json!(endpoint));
    }
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    if let Some(detail) = err.detail() {
        inner.insert("detail".to_string(), json!(detail));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));
    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(endpoint) = err.endpoint() {
        lines.push(format!(
            "{} {endpoint}",
            colorize_label("endpoint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(status) = err.status() {
        lines.push(format!(
            "{} {status}",
            colorize_label("status:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(detail) = err.detail() {
        lines.push(format!(
            "{}\n{detail}",
            colorize_label("response:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
}

fn add_kind_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Permission => {
            err.with_hint("The catalogue refused the request. Check --token or server access rules.")
        }
        ErrorKind::NotFound => err.with_hint("No CSW service at this URL. Check --endpoint."),
        ErrorKind::Remote => {
            err.with_hint("The catalogue failed while harvesting. See the response for details.")
        }
        ErrorKind::Io => err.with_hint(
            "Could not reach the catalogue. Check the endpoint host, network and --timeout.",
        ),
        ErrorKind::Internal => err.with_hint(
            "Unexpected internal failure. Retry with RUST_LOG=debug and share the output if it persists.",
        ),
        ErrorKind::Usage => err,
    }
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
