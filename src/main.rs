use anyhow::Result;
use clap::CommandFactory;
use ironmill::cli::{self, Cli};
use ironmill::error::UsageError;
use ironmill::io::glob::expand_inputs;
use ironmill::io::memory::VecRecordReader;
use ironmill::io::sink::WriterSink;
use ironmill::io::{RecordReader, STDIN_NAME, create_record_reader, create_record_writer};
use std::io::BufWriter;
use std::process::ExitCode;
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout carries records. `RUST_LOG` overrides `-v`.
fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2)
        .with_thread_names(cli.verbose >= 2)
        .init();
    debug!("ironmill started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
}

fn run(cli: &Cli) -> Result<()> {
    let chain = cli.build_chain()?;
    let files = expand_inputs(&cli.from)?;
    // seqgen ignores its input, so without --from it must not wait on a terminal.
    let reader: Box<dyn RecordReader> =
        if files.is_empty() && chain.verb_names().first() == Some(&"seqgen") {
            Box::new(VecRecordReader::new(Vec::new()).with_filename(STDIN_NAME))
        } else {
            create_record_reader(&cli.reader_options())?
        };
    let writer = create_record_writer(&cli.writer_options())?;
    let stdout = std::io::stdout();
    let mut sink = WriterSink::new(writer, BufWriter::new(stdout.lock()));
    let summary = chain.run(reader, &files, &mut sink)?;
    debug!(
        read = summary.records_read,
        written = summary.records_written,
        "run complete"
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = match cli::parse(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too, on stdout.
            let failed = e.use_stderr();
            e.print().ok();
            return if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };
    init_logging(&cli);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(usage) = e.downcast_ref::<UsageError>() {
                eprintln!("ironmill: {usage}");
                eprintln!("{}", Cli::command().render_usage());
            } else {
                eprintln!("ironmill: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}
