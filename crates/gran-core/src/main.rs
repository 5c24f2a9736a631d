//! gran_detecto - persistent-memory store granularity probe
//!
//! Resolves the store granularity of a path and reports it on stdout and
//! through the exit status:
//! - `PMEM2_FORCE_GRANULARITY` / `--force-granularity` force a result
//! - `-p` / `-c` / `-b` assert the expected granularity (exit 1 on mismatch)
//! - `--require` fails when the medium is coarser than needed

use clap::error::ErrorKind;
use clap::{ArgGroup, Parser};
use gran_common::{Granularity, OutputFormat};
use gran_config::{load_settings, parse_granularity, resolve_override, ENV_FORCE_GRANULARITY};
use gran_core::exit_codes::ExitCode;
use gran_core::log_event;
use gran_core::logging::{
    event_names, generate_run_id, get_host_id, init_logging, level_from_verbosity, LogConfig,
    LogContext, LogFormat, Stage,
};
use gran_core::report::{ErrorReport, ProbeReport};
use gran_core::resolver::{require, ResolutionError, Resolver};
use gran_core::probe::SystemProber;
use std::path::PathBuf;

/// Persistent-memory store granularity probe
#[derive(Parser, Debug)]
#[command(name = "gran_detecto")]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("expect").args(["page", "cache_line", "byte"])))]
struct Cli {
    /// File, directory or device to probe
    path: PathBuf,

    /// Expect page granularity
    #[arg(short = 'p', long = "expect-page")]
    page: bool,

    /// Expect cache-line granularity
    #[arg(short = 'c', long = "expect-cache-line")]
    cache_line: bool,

    /// Expect byte granularity
    #[arg(short = 'b', long = "expect-byte")]
    byte: bool,

    /// Force a granularity instead of detecting it (byte, cache_line, page)
    #[arg(long, value_name = "TOKEN")]
    force_granularity: Option<String>,

    /// Fail unless the granularity is at least this fine
    #[arg(long, value_name = "GRANULARITY", value_parser = parse_required)]
    require: Option<Granularity>,

    /// Settings file (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', default_value = "summary")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// Log format on stderr
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Cli {
    fn expected(&self) -> Option<Granularity> {
        if self.page {
            Some(Granularity::Page)
        } else if self.cache_line {
            Some(Granularity::CacheLine)
        } else if self.byte {
            Some(Granularity::Byte)
        } else {
            None
        }
    }
}

fn parse_required(value: &str) -> Result<Granularity, String> {
    parse_granularity(value).map_err(|e| e.to_string())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::Clean,
                _ => ExitCode::ArgsError,
            };
            // Nothing useful to do if stdout/stderr is already gone.
            let _ = err.print();
            std::process::exit(code.as_i32());
        }
    };

    // The environment is consulted here and nowhere else.
    let env_override = std::env::var_os(ENV_FORCE_GRANULARITY)
        .map(|v| v.to_string_lossy().into_owned());

    let log_config = LogConfig::from_env(
        level_from_verbosity(cli.verbose, cli.quiet),
        cli.log_format,
    );
    init_logging(&log_config);

    let ctx = LogContext::new(generate_run_id(), get_host_id());
    // Library events inherit the correlation IDs from this span.
    let span = tracing::info_span!("run", run_id = %ctx.run_id, host_id = %ctx.host_id);
    let _guard = span.enter();
    let code = run(&cli, env_override.as_deref(), &ctx);

    log_event!(
        ctx,
        INFO,
        event_names::RUN_FINISHED,
        Stage::Report,
        "granularity probe finished",
        exit_code = code.as_i32()
    );
    std::process::exit(code.as_i32());
}

fn run(cli: &Cli, env_override: Option<&str>, ctx: &LogContext) -> ExitCode {
    let path = cli.path.display().to_string();
    log_event!(
        ctx,
        INFO,
        event_names::RUN_STARTED,
        Stage::Init,
        "granularity probe started",
        path = path.as_str()
    );

    let resolved = match load_settings(cli.config.as_deref()) {
        Ok(resolved) => resolved,
        Err(e) => {
            log_event!(
                ctx,
                DEBUG,
                event_names::CONFIG_ERROR,
                Stage::Init,
                "settings could not be loaded"
            );
            return fail(cli.format, ctx, &ResolutionError::from(e));
        }
    };
    match &resolved.path {
        Some(p) => log_event!(
            ctx,
            INFO,
            event_names::CONFIG_LOADED,
            Stage::Init,
            "settings loaded",
            file = p.display().to_string().as_str(),
            source = resolved.source.to_string().as_str()
        ),
        None => log_event!(
            ctx,
            DEBUG,
            event_names::CONFIG_DEFAULT_USED,
            Stage::Init,
            "no settings file, using defaults"
        ),
    }

    let directive = resolve_override(
        cli.force_granularity.as_deref(),
        env_override,
        &resolved.settings,
    );
    match &directive {
        Some(d) => log_event!(
            ctx,
            INFO,
            event_names::OVERRIDE_SELECTED,
            Stage::Override,
            "override directive present",
            token = d.token.as_str(),
            source = d.source.to_string().as_str()
        ),
        None => log_event!(
            ctx,
            DEBUG,
            event_names::OVERRIDE_ABSENT,
            Stage::Override,
            "no override, detecting"
        ),
    }

    let resolver = Resolver::new(SystemProber::from_settings(&resolved.settings.probe));
    let result = match resolver.resolve_directive(&cli.path, directive.as_ref()) {
        Ok(result) => result,
        Err(e) => return fail(cli.format, ctx, &e),
    };

    if result.is_forced() {
        log_event!(
            ctx,
            INFO,
            event_names::RESOLVE_FORCED,
            Stage::Override,
            "granularity forced",
            granularity = result.granularity.as_str()
        );
    } else {
        log_event!(
            ctx,
            INFO,
            event_names::RESOLVE_DETECTED,
            Stage::Classify,
            "granularity detected",
            granularity = result.granularity.as_str(),
            medium = result.medium.map(|m| m.to_string()).unwrap_or_default().as_str()
        );
    }

    if let Some(required) = cli.require {
        if let Err(e) = require(&result, required) {
            log_event!(
                ctx,
                WARN,
                event_names::REPORT_REQUIREMENT_FAILED,
                Stage::Report,
                "granularity requirement not met",
                required = required.as_str(),
                available = result.granularity.as_str()
            );
            return fail(cli.format, ctx, &e);
        }
    }

    let report = ProbeReport::new(&cli.path, result)
        .with_override_source(directive.map(|d| d.source))
        .with_expectation(cli.expected());

    let rendered = match report.render(cli.format) {
        Ok(rendered) => rendered,
        Err(e) => {
            log_event!(
                ctx,
                ERROR,
                event_names::INTERNAL_ERROR,
                Stage::Report,
                "report serialization failed"
            );
            let err = ErrorReport::internal(format!("failed to serialize report: {}", e));
            eprintln!("{}", err.to_text());
            return ExitCode::InternalError;
        }
    };
    if !rendered.is_empty() {
        println!("{}", rendered);
    }

    let code = report.exit_code();
    if code == ExitCode::Mismatch {
        log_event!(
            ctx,
            WARN,
            event_names::REPORT_MISMATCH,
            Stage::Report,
            "granularity differs from expectation",
            expected = report.expected.map(|g| g.as_str()).unwrap_or_default(),
            actual = report.granularity.as_str()
        );
    }
    code
}

/// Report a failed run and return its exit code.
fn fail(format: OutputFormat, ctx: &LogContext, err: &ResolutionError) -> ExitCode {
    let report = ErrorReport::from_resolution(err);
    log_event!(
        ctx,
        DEBUG,
        event_names::RESOLVE_FAILED,
        Stage::Report,
        "resolution failed",
        code_name = report.code_name,
        category = report.category.to_string().as_str()
    );

    match format {
        OutputFormat::Json => println!("{}", report.to_json()),
        OutputFormat::Summary | OutputFormat::Exitcode => eprintln!("{}", report.to_text()),
    }
    err.exit_code()
}
