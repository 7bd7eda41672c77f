//! RelaySMS encryption binary.
//!
//! Encrypts one message for one correspondent, creating or resuming the
//! stored Double Ratchet session, and prints the base64 payload.
//!
//! # Usage
//!
//! ```bash
//! # Encrypt (state under $HOME/.local/share/relaysms/storage)
//! relaysms -c "hello" -p +15550000000 -s <sk base64> -k <peer public key base64>
//!
//! # Explicit storage directory
//! relaysms -c "hello" -p +15550000000 -s <sk> -k <ppk> -b /var/lib/relaysms
//!
//! # Drop the stored session for a correspondent
//! relaysms -p +15550000000 --forget
//! ```
//!
//! The payload is the only thing written to standard output. Logs and errors
//! go to standard error.

use std::{
    error::Error,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use relaysms_core::{SessionOrchestrator, StorageConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// RelaySMS Double Ratchet encryption
#[derive(Parser, Debug)]
#[command(name = "relaysms")]
#[command(about = "Encrypt an SMS payload with a per-correspondent Double Ratchet session")]
#[command(version)]
struct Args {
    /// Message to encrypt
    #[arg(short, long, required_unless_present = "forget")]
    content: Option<String>,

    /// Correspondent phone number (session identifier)
    #[arg(short, long, alias = "phone_number")]
    phone_number: String,

    /// Shared secret key (base64)
    #[arg(short, long, required_unless_present = "forget")]
    sk: Option<String>,

    /// Correspondent's public key (base64)
    #[arg(short = 'k', long, required_unless_present = "forget")]
    ppk: Option<String>,

    /// Storage directory [default: $HOME/.local/share/relaysms/storage]
    #[arg(short, long, alias = "base_dir")]
    base_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Delete the stored session for the phone number and exit
    #[arg(long, conflicts_with_all = ["content", "sk", "ppk"])]
    forget: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&*err);
            ExitCode::FAILURE
        },
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = StorageConfig::resolve(args.base_dir, std::env::var_os("HOME"))?;
    tracing::debug!(base_dir = %config.base_dir.display(), "resolved storage");

    let orchestrator = SessionOrchestrator::open(&config)?;

    if args.forget {
        return Ok(orchestrator.forget(&args.phone_number)?);
    }

    let (Some(content), Some(sk), Some(ppk)) = (args.content, args.sk, args.ppk) else {
        return Err("--content, --sk and --ppk are required to encrypt".into());
    };

    let payload = orchestrator.encrypt(&args.phone_number, &content, &sk, &ppk)?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{payload}")?;
    stdout.flush()?;
    Ok(())
}

/// Print the error and every cause on standard error.
fn report(err: &dyn Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "Oops! An error occurred:");
    let _ = writeln!(stderr, "  {err}");

    let mut source = err.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  caused by: {cause}");
        source = cause.source();
    }
}
