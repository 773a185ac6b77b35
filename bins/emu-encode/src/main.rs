use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use emu_api::{EncoderConfig, Row, Schema, TimestampCompat};
use emu_engine::{Encoded, OutputChannel, ResultSet};
use emu_format_json::JobReference;
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "emu-encode", about = "Encode an emulator result set for one output channel")]
struct Cli {
    /// JSON file holding `{"schema": {"fields": [...]}, "rows": [{"f": [...]}]}`.
    #[arg(long, env = "EMU_INPUT")]
    input: PathBuf,

    #[arg(long, value_enum, default_value_t = Channel::Rest)]
    channel: Channel,

    /// TOML file with encoder options; flags below override it.
    #[arg(long, env = "EMU_CONFIG")]
    config: Option<PathBuf>,

    /// Rewrite TIMESTAMP values to integer microseconds.
    #[arg(long, env = "EMU_USE_INT64_TIMESTAMP")]
    use_int64_timestamp: bool,

    #[arg(long, value_enum, env = "EMU_TIMESTAMP_COMPAT")]
    timestamp_compat: Option<Compat>,

    /// Wrap REST rows in a query response with this job id.
    #[arg(long)]
    job_id: Option<String>,

    /// Destination of the Avro container file.
    #[arg(long, default_value = "rows.avro")]
    output: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Channel {
    Rest,
    Avro,
    Arrow,
}

#[derive(Clone, Copy, ValueEnum)]
enum Compat {
    Legacy,
    Unified,
}

#[derive(Deserialize)]
struct Input {
    schema: Schema,
    #[serde(default)]
    rows: Vec<Row>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        tracing::error!(error = %e, "encoding failed");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(cli)?;

    tracing::info!(input = %cli.input.display(), "loading result set");
    let input: Input = serde_json::from_str(&std::fs::read_to_string(&cli.input)?)?;
    let result_set = ResultSet::try_new(input.schema, input.rows)?;
    let prepared = result_set.prepare(&config);

    match (cli.channel, &cli.job_id) {
        (Channel::Rest, Some(job_id)) => {
            let response = prepared.query_response(JobReference::new("emulator", job_id));
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        (Channel::Rest, None) => {
            if let Encoded::Rest(rows) = prepared.encode(OutputChannel::Rest)? {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
        }
        (Channel::Avro, _) => {
            let bytes = prepared.avro_container()?;
            std::fs::write(&cli.output, &bytes)?;
            tracing::info!(
                output = %cli.output.display(),
                bytes = bytes.len(),
                "avro container written"
            );
        }
        (Channel::Arrow, _) => {
            if let Encoded::Arrow(batch) = prepared.encode(OutputChannel::Arrow)? {
                println!("{}", arrow::util::pretty::pretty_format_batches(&[batch])?);
            }
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<EncoderConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!(config = %path.display(), "loading configuration");
            EncoderConfig::from_toml_str(&std::fs::read_to_string(path)?)?
        }
        None => EncoderConfig::default(),
    };
    if cli.use_int64_timestamp {
        config.use_int64_timestamp = true;
    }
    if let Some(compat) = cli.timestamp_compat {
        config.timestamp_compat = match compat {
            Compat::Legacy => TimestampCompat::Legacy,
            Compat::Unified => TimestampCompat::Unified,
        };
    }
    Ok(config)
}
