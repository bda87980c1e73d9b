use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::Parser;

use llsd_transcoder::config::ObservabilityConfig;
use llsd_transcoder::convert::{self, Encoding};
use llsd_transcoder::observability::logging;

#[derive(Parser)]
#[command(name = "llsd-convert")]
#[command(about = "Convert documents between LLSD encodings and JSON", long_about = None)]
struct Cli {
    /// Input encoding; guessed from the input file extension when omitted
    #[arg(short, long, value_enum)]
    from: Option<Encoding>,

    /// Output encoding
    #[arg(short, long, value_enum, default_value = "json")]
    to: Encoding,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Input file (stdin when omitted)
    input: Option<PathBuf>,
}

fn guess(path: Option<&Path>) -> Option<Encoding> {
    path?.extension()?.to_str().and_then(Encoding::from_extension)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(&ObservabilityConfig {
        log_level: "warn".into(),
    })?;

    let from = cli
        .from
        .or_else(|| guess(cli.input.as_deref()))
        .ok_or("cannot tell the input encoding, pass --from")?;

    let input = match &cli.input {
        Some(path) => fs::read(path)?,
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    let output = convert::convert(&input, from, cli.to)?;
    tracing::debug!(%from, to = %cli.to, input_bytes = input.len(), output_bytes = output.len(), "Converted");

    match &cli.output {
        Some(path) => fs::write(path, output)?,
        None => io::stdout().write_all(&output)?,
    }
    Ok(())
}
