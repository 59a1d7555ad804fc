use clap::Parser;
use directive_lines::{DirectiveLineStream, LineRecord, StreamConfig, StreamError};
use log::debug;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Flatten a file, resolving include / require / divert directives
#[derive(Parser, Debug)]
#[command(name = "directive-lines", version)]
struct Args {
    /// Root file to read
    file: PathBuf,

    /// Emit one JSON object per line
    #[arg(long, conflicts_with = "numbered")]
    json: bool,

    /// Prefix every line with `path:line:`
    #[arg(short, long)]
    numbered: bool,

    /// Directory that `/`-rooted targets resolve against
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Maximum number of nested included files
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputMode {
    Plain,
    Numbered,
    Json,
}

impl Args {
    fn mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.numbered {
            OutputMode::Numbered
        } else {
            OutputMode::Plain
        }
    }
}

fn write_record(out: &mut impl Write, record: &LineRecord, mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Plain => writeln!(out, "{}", record.text),
        OutputMode::Numbered => writeln!(out, "{}", record),
        OutputMode::Json => {
            serde_json::to_writer(&mut *out, record)?;
            writeln!(out)
        }
    }
}

fn run(args: Args) -> Result<(), StreamError> {
    let mode = args.mode();
    let mut config = match &args.config {
        Some(path) => StreamConfig::from_json_file(path)?,
        None => StreamConfig::default(),
    };
    if let Some(root) = args.root {
        config.rooted_base = Some(root);
    }
    if args.max_depth.is_some() {
        config.max_depth = args.max_depth;
    }
    debug!("config: {:?}", config);

    let stream = DirectiveLineStream::open_with_config(&args.file, config)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for record in stream {
        let record = record?;
        write_record(&mut out, &record, mode).map_err(|e| StreamError::Io {
            path: PathBuf::from("<stdout>"),
            source: e,
        })?;
    }

    out.flush().map_err(|e| StreamError::Io {
        path: PathBuf::from("<stdout>"),
        source: e,
    })
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}
