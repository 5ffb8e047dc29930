//! `signjson`: sign, verify or strip embedded signatures in JSON files.
//!
//! Every file named on the command line is processed even if an earlier one
//! fails; the exit status is non-zero if any file failed.

use clap::{Args, Parser, Subcommand, ValueEnum};
use json_sign::{
    process_files, Algorithm, BatchReport, Layout, Operation, SecretKey, Signer, VerificationKey,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "signjson",
    version,
    about = "Sign JSON files with an embedded signature"
)]
struct Arguments {
    /// Log more (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign JSON files in place
    Sign(SignArgs),
    /// Verify the embedded signature of JSON files
    Verify(VerifyArgs),
    /// Remove the embedded signature from JSON files in place
    Strip(StripArgs),
}

#[derive(Args, Debug)]
struct SignArgs {
    /// The base64-encoded secret key
    #[arg(
        short = 'k',
        long = "secretkey",
        env = "SIGNJSON_SECRET_KEY",
        hide_env_values = true
    )]
    secret_key: String,

    /// Signature algorithm the key is for
    #[arg(short, long, value_enum, default_value_t = AlgorithmArg::HmacSha256)]
    algorithm: AlgorithmArg,

    /// Key identifier to record in the signature block
    #[arg(long)]
    key_id: Option<String>,

    /// How to write the signed file
    #[arg(long, value_enum, default_value_t = LayoutArg::Preserve)]
    layout: LayoutArg,

    /// Replace an existing signature instead of failing
    #[arg(long)]
    resign: bool,

    /// A list of json files to sign
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// The base64-encoded verification key (the shared secret for hmac-sha256)
    #[arg(
        short = 'k',
        long = "key",
        env = "SIGNJSON_VERIFY_KEY",
        hide_env_values = true
    )]
    key: String,

    /// Signature algorithm the key is for
    #[arg(short, long, value_enum, default_value_t = AlgorithmArg::HmacSha256)]
    algorithm: AlgorithmArg,

    /// A list of json files to verify
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct StripArgs {
    /// How to write the stripped file
    #[arg(long, value_enum, default_value_t = LayoutArg::Pretty)]
    layout: LayoutArg,

    /// A list of json files to strip
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum AlgorithmArg {
    #[value(name = "hmac-sha256")]
    HmacSha256,
    #[value(name = "ed25519")]
    Ed25519,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::HmacSha256 => Algorithm::HmacSha256,
            AlgorithmArg::Ed25519 => Algorithm::Ed25519,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum LayoutArg {
    Preserve,
    Compact,
    Pretty,
}

impl From<LayoutArg> for Layout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Preserve => Layout::Preserve,
            LayoutArg::Compact => Layout::Compact,
            LayoutArg::Pretty => Layout::Pretty,
        }
    }
}

fn main() -> ExitCode {
    let args = Arguments::parse();
    init_logging(args.verbose);

    match run(args.command) {
        Ok(report) if !report.any_failed() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Command) -> json_sign::Result<BatchReport> {
    let (report, verb, action) = match command {
        Command::Sign(args) => {
            let key = SecretKey::from_base64(args.algorithm.into(), &args.secret_key)?;
            let mut signer = Signer::new(&key).with_layout(args.layout.into());
            if let Some(key_id) = args.key_id {
                signer = signer.with_key_id(key_id);
            }
            let operation = Operation::Sign {
                signer,
                resign: args.resign,
            };
            (process_files(&args.files, &operation), operation.verb(), "sign")
        }
        Command::Verify(args) => {
            let key = VerificationKey::from_base64(args.algorithm.into(), &args.key)?;
            let operation = Operation::Verify(&key);
            (process_files(&args.files, &operation), operation.verb(), "verify")
        }
        Command::Strip(args) => {
            let operation = Operation::Strip(args.layout.into());
            (process_files(&args.files, &operation), operation.verb(), "strip")
        }
    };

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(()) => println!("{} file: {}", verb, outcome.path.display()),
            Err(e) => eprintln!(
                "Failed to {} file \"{}\" with error: {}",
                action,
                outcome.path.display(),
                e
            ),
        }
    }

    Ok(report)
}
