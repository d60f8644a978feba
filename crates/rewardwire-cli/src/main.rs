//! rewardwire - Decode captured loyalty responses and build location payloads
//!
//! This tool works offline on response bodies captured from the loyalty
//! service. It can dump the schema-less decode of a body, list the rewards it
//! contains, and produce the protobuf location payload sent with requests.

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::FixedOffset;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rewardwire_core::{
    DecodeOutcome, LocationPayload, ProjectorConfig, RewardProjector, RewardRecord, StatusFilter,
    Tree,
};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, Level};
use tracing_subscriber::EnvFilter;

/// Decode captured loyalty responses and build location payloads
#[derive(Parser, Debug)]
#[command(name = "rewardwire")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the schema-less decode of a response body as JSON
    Decode {
        #[command(flatten)]
        input: InputArgs,

        /// Print compact JSON on a single line
        #[arg(long)]
        compact: bool,
    },

    /// List the rewards contained in a loyalty summary response
    Rewards {
        #[command(flatten)]
        input: InputArgs,

        /// Also list redeemed rewards
        #[arg(long, conflicts_with = "all")]
        include_redeemed: bool,

        /// List every entry, whatever its status
        #[arg(long)]
        all: bool,

        /// Write the rewards to this JSON file instead of printing a report
        #[arg(long, value_name = "PATH")]
        json: Option<PathBuf>,

        /// Overwrite an existing JSON file
        #[arg(long, requires = "json")]
        force: bool,

        /// Offset from UTC, in minutes, for redemption times
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        utc_offset_minutes: i32,
    },

    /// Encode the location payload for the given coordinates
    EncodeLocation {
        /// Latitude in decimal degrees
        #[arg(long, env = "REWARDWIRE_LATITUDE", allow_negative_numbers = true)]
        lat: f32,

        /// Longitude in decimal degrees
        #[arg(long, env = "REWARDWIRE_LONGITUDE", allow_negative_numbers = true)]
        lon: f32,

        /// Value of field 3 (must be below 128)
        #[arg(long, default_value_t = rewardwire_core::encode::DEFAULT_FLAG_A)]
        flag_a: u32,

        /// Value of field 4 (must be below 128)
        #[arg(long, default_value_t = rewardwire_core::encode::DEFAULT_FLAG_B)]
        flag_b: u32,

        /// Output encoding
        #[arg(long, value_enum, default_value = "base64")]
        format: TextEncoding,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Response body to read ("-" for stdin)
    input: PathBuf,

    /// How the response body is stored
    #[arg(long, value_enum, default_value = "raw")]
    input_format: InputFormat,
}

/// Storage format of a captured body
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    /// Binary protobuf as received
    Raw,
    /// Hex text
    Hex,
    /// Standard base64 text
    Base64,
}

/// Text encoding for binary output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TextEncoding {
    /// Standard base64
    Base64,
    /// Lowercase hex
    Hex,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Decode { input, compact } => run_decode(&input, compact),
        Command::Rewards {
            input,
            include_redeemed,
            all,
            json,
            force,
            utc_offset_minutes,
        } => {
            let filter = if all {
                StatusFilter::Any
            } else if include_redeemed {
                StatusFilter::AvailableAndRedeemed
            } else {
                StatusFilter::Available
            };
            let config = ProjectorConfig::new()
                .status_filter(filter)
                .utc_offset(utc_offset(utc_offset_minutes)?);
            run_rewards(&input, config, json.as_deref(), force)
        }
        Command::EncodeLocation {
            lat,
            lon,
            flag_a,
            flag_b,
            format,
        } => {
            let payload = LocationPayload::new(lat, lon).flags(flag_a, flag_b);
            println!("{}", encode_location(&payload, format)?);
            Ok(())
        }
    }
}

/// Dump the decoded tree, or the failure with the raw hex
fn run_decode(input: &InputArgs, compact: bool) -> Result<()> {
    let body = read_body(input)?;
    let outcome = DecodeOutcome::from_bytes(&body);

    let rendered = if compact {
        serde_json::to_string(&outcome)?
    } else {
        serde_json::to_string_pretty(&outcome)?
    };
    println!("{}", rendered);

    if let DecodeOutcome::Failed { error, .. } = outcome {
        bail!("Failed to decode {}: {}", input.input.display(), error);
    }
    Ok(())
}

/// Project the body into rewards and print or save them
fn run_rewards(
    input: &InputArgs,
    config: ProjectorConfig,
    json: Option<&Path>,
    force: bool,
) -> Result<()> {
    let body = read_body(input)?;
    let filter = config.status_filter;

    info!("Decoding {} byte response", body.len());
    let tree = decode_body(&body, &input.input)?;

    let records = RewardProjector::with_config(config).project(&tree);
    debug!("Found {} rewards", records.len());

    match json {
        Some(path) => {
            write_records(path, &records, force)?;
            println!("Data saved to {}", path.display());
        }
        None => print!("{}", render_report(&records, filter)),
    }
    Ok(())
}

/// Decode a body, keeping the raw hex in the error on failure
fn decode_body(body: &[u8], source: &Path) -> Result<Tree> {
    match DecodeOutcome::from_bytes(body) {
        DecodeOutcome::Failed { error, raw_hex } => Err(anyhow::Error::new(error).context(
            format!("Failed to decode {} (raw_hex: {})", source.display(), raw_hex),
        )),
        outcome => outcome.into_result().map_err(Into::into),
    }
}

/// Read the input body and undo its text encoding
fn read_body(input: &InputArgs) -> Result<Vec<u8>> {
    let raw = if input.input.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        trace!("Reading {}", input.input.display());
        fs::read(&input.input)
            .with_context(|| format!("Failed to read input file: {}", input.input.display()))?
    };

    decode_text(&raw, input.input_format)
}

/// Convert a captured body in `format` to raw protobuf bytes
fn decode_text(raw: &[u8], format: InputFormat) -> Result<Vec<u8>> {
    let text = || -> Result<String> {
        let text = std::str::from_utf8(raw).context("Encoded input is not valid UTF-8")?;
        Ok(text.split_whitespace().collect())
    };

    match format {
        InputFormat::Raw => Ok(raw.to_vec()),
        InputFormat::Hex => hex::decode(text()?).context("Input is not valid hex"),
        InputFormat::Base64 => BASE64.decode(text()?).context("Input is not valid base64"),
    }
}

/// Encode the location payload and render it as text
fn encode_location(payload: &LocationPayload, format: TextEncoding) -> Result<String> {
    let bytes = payload
        .encode()
        .context("Failed to encode location payload")?;
    Ok(match format {
        TextEncoding::Base64 => BASE64.encode(&bytes),
        TextEncoding::Hex => hex::encode(&bytes),
    })
}

/// Build a UTC offset from a number of minutes
fn utc_offset(minutes: i32) -> Result<FixedOffset> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .with_context(|| format!("Invalid UTC offset: {} minutes", minutes))
}

/// Human-readable listing of rewards
fn render_report(records: &[RewardRecord], filter: StatusFilter) -> String {
    let rule = "=".repeat(40);
    let heading = match filter {
        StatusFilter::Available => "AVAILABLE REGIONAL REWARDS",
        StatusFilter::AvailableAndRedeemed | StatusFilter::Any => "REGIONAL REWARDS",
    };

    let mut out = format!("\n{}\n       {}\n{}\n", rule, heading, rule);
    if records.is_empty() {
        out.push_str("No rewards found in response.\n");
        return out;
    }

    for (i, record) in records.iter().enumerate() {
        out.push_str(&format!("\nOFFER #{}: {}\n{}\n", i + 1, record, "-".repeat(40)));
    }
    out.push_str(&format!("\nTotal Rewards Found: {}\n", records.len()));
    out
}

/// Write the records as JSON, refusing to overwrite unless forced
fn write_records(path: &Path, records: &[RewardRecord], force: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    if path.exists() && !force {
        bail!(
            "File already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    serde_json::to_writer_pretty(&mut file, records)
        .with_context(|| format!("Failed to write file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("Failed to write file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewardwire_core::{DateLabel, Scope};
    use tempfile::TempDir;

    fn record(title: &str) -> RewardRecord {
        RewardRecord {
            title: title.to_string(),
            scope: Scope::National,
            item: "Chicken Sandwich".to_string(),
            context: String::new(),
            date_label: DateLabel::Expires,
            date_value: "3/15/2026".to_string(),
        }
    }

    #[test]
    fn test_decode_text_formats() {
        let expected = vec![0x08, 0x96, 0x01];
        assert_eq!(decode_text(&expected, InputFormat::Raw).unwrap(), expected);
        assert_eq!(decode_text(b"08 96\n01\n", InputFormat::Hex).unwrap(), expected);
        assert_eq!(decode_text(b"CJYB\n", InputFormat::Base64).unwrap(), expected);
        assert!(decode_text(b"zz", InputFormat::Hex).is_err());
    }

    #[test]
    fn test_decode_body_failure_carries_hex() {
        let err = decode_body(&[0x0A, 0x05, 0xAB], Path::new("body.bin")).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("raw_hex: 0a05ab"), "{}", message);
        assert!(message.contains("truncated message"), "{}", message);
    }

    #[test]
    fn test_run_rewards_truncated_body() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("body.hex");
        fs::write(&path, "0a05ab\n").unwrap();
        let input = InputArgs {
            input: path,
            input_format: InputFormat::Hex,
        };

        let err = run_rewards(&input, ProjectorConfig::new(), None, false).unwrap_err();
        assert!(err.to_string().contains("raw_hex: 0a05ab"));
    }

    #[test]
    fn test_decode_body_empty() {
        assert!(decode_body(&[], Path::new("-")).unwrap().is_empty());
    }

    #[test]
    fn test_encode_location_zero() {
        let payload = LocationPayload::new(0.0, 0.0);
        assert_eq!(
            encode_location(&payload, TextEncoding::Hex).unwrap(),
            "0d00000000150000000018022001"
        );
        assert_eq!(
            encode_location(&payload, TextEncoding::Base64).unwrap(),
            "DQAAAAAVAAAAABgCIAE="
        );
    }

    #[test]
    fn test_encode_location_rejects_large_flag() {
        let payload = LocationPayload::new(0.0, 0.0).flags(200, 1);
        assert!(encode_location(&payload, TextEncoding::Hex).is_err());
    }

    #[test]
    fn test_render_report() {
        let report = render_report(&[record("Free Sandwich")], StatusFilter::Available);
        assert!(report.contains("AVAILABLE REGIONAL REWARDS"));
        assert!(report.contains("OFFER #1: Free Sandwich"));
        assert!(report.contains("Total Rewards Found: 1"));

        let report = render_report(&[], StatusFilter::Any);
        assert!(report.contains("No rewards found in response."));
    }

    #[test]
    fn test_write_records() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out").join("data.json");
        let records = vec![record("Free Sandwich"), record("Free Fries")];

        write_records(&path, &records, false).unwrap();
        let written: Vec<RewardRecord> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, records);

        // Existing file needs --force
        assert!(write_records(&path, &records, false).is_err());
        assert!(write_records(&path, &records[..1], true).is_ok());
    }

    #[test]
    fn test_utc_offset() {
        assert_eq!(utc_offset(0).unwrap().local_minus_utc(), 0);
        assert_eq!(utc_offset(-300).unwrap().local_minus_utc(), -18_000);
        assert!(utc_offset(24 * 60).is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
