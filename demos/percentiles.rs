/// Reads numbers from stdin, one per line, records them from a pool of writer threads through an
/// interval recorder, and prints the percentile distribution of everything read on stdout.
///
/// Set `RUST_LOG=info` to see each interval as it is sampled.
use std::io;
use std::io::BufRead;
use std::thread;

use clap::{App, Arg};
use crossbeam_channel::bounded;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hdrinterval::sync::IntervalRecorder;
use hdrinterval::{CreationError, Format, Histogram, RecordError};

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let default_max = format!("{}", i64::max_value());
    let matches = App::new("hdrinterval percentiles")
        .about("Percentile distribution of number-per-line input from stdin")
        .arg(
            Arg::with_name("min")
                .long("min")
                .help("Minimum discernible value")
                .takes_value(true)
                .default_value("1"),
        )
        .arg(
            Arg::with_name("max")
                .long("max")
                .help("Maximum trackable value")
                .takes_value(true)
                .default_value(default_max.as_str()),
        )
        .arg(
            Arg::with_name("sigfig")
                .long("sigfig")
                .help("Number of significant digits")
                .takes_value(true)
                .default_value("3"),
        )
        .arg(
            Arg::with_name("ticks")
                .short("t")
                .long("ticks-per-half")
                .help("Ticks per half distance")
                .takes_value(true)
                .default_value("5"),
        )
        .arg(
            Arg::with_name("scale")
                .long("scale")
                .help("Divide every printed value by this")
                .takes_value(true)
                .default_value("1.0"),
        )
        .arg(
            Arg::with_name("writers")
                .short("w")
                .long("writers")
                .help("Number of recording threads")
                .takes_value(true)
                .default_value("4"),
        )
        .arg(
            Arg::with_name("interval")
                .short("i")
                .long("interval")
                .help("Sample the recorder every this many input lines")
                .takes_value(true)
                .default_value("10000"),
        )
        .arg(
            Arg::with_name("csv")
                .long("csv")
                .help("Write comma separated values"),
        )
        .get_matches();

    let min = matches.value_of("min").unwrap().parse().unwrap();
    let max = matches.value_of("max").unwrap().parse().unwrap();
    let sigfig = matches.value_of("sigfig").unwrap().parse().unwrap();
    let ticks = matches.value_of("ticks").unwrap().parse().unwrap();
    let scale = matches.value_of("scale").unwrap().parse().unwrap();
    let writers = matches.value_of("writers").unwrap().parse().unwrap();
    let interval = matches.value_of("interval").unwrap().parse().unwrap();
    let format = if matches.is_present("csv") {
        Format::Csv
    } else {
        Format::Classic
    };

    let stdin = io::stdin();
    let stdout = io::stdout();

    let settings = Settings {
        min,
        max,
        sigfig,
        writers,
        interval,
    };
    let total = record(stdin.lock(), settings).expect("Recording failed");

    total
        .percentiles_print(stdout.lock(), ticks, scale, format)
        .expect("Printing failed");
}

struct Settings {
    min: i64,
    max: i64,
    sigfig: u8,
    writers: usize,
    interval: usize,
}

/// Feed every line of `reader` to the writer threads, sampling the recorder every
/// `settings.interval` lines, and return the merge of all intervals.
fn record<R: BufRead>(reader: R, settings: Settings) -> Result<Histogram<u64>, CliError> {
    let recorder = IntervalRecorder::<u64>::new_with_bounds(
        settings.min,
        settings.max,
        settings.sigfig,
    )?;
    let total = Histogram::<u64>::new_with_bounds(settings.min, settings.max, settings.sigfig)?;

    thread::scope(|s| -> Result<(), CliError> {
        let (tx, rx) = bounded::<i64>(1024);
        let handles: Vec<_> = (0..settings.writers.max(1))
            .map(|_| {
                let rx = rx.clone();
                let recorder = &recorder;
                s.spawn(move || -> Result<(), RecordError> {
                    for v in rx {
                        recorder.record_value(v)?;
                    }
                    Ok(())
                })
            })
            .collect();
        drop(rx);

        for (n, line) in reader.lines().enumerate() {
            let v = line?.trim().parse().map_err(|_| CliError::Parse(n + 1))?;
            if tx.send(v).is_err() {
                // every writer has stopped; its error is reported below
                break;
            }

            if (n + 1) % settings.interval.max(1) == 0 {
                sample_into(&recorder, &total);
            }
        }
        drop(tx);

        for h in handles {
            h.join().expect("writer thread panicked")?;
        }
        Ok(())
    })?;

    sample_into(&recorder, &total);
    Ok(total)
}

fn sample_into(recorder: &IntervalRecorder<u64>, total: &Histogram<u64>) {
    let mut snapshot = recorder.sample();
    info!(
        count = snapshot.total_count(),
        p50 = snapshot.value_at_percentile(50.0),
        p99 = snapshot.value_at_percentile(99.0),
        max = snapshot.max(),
        "interval"
    );
    // same layout, so nothing is dropped
    total.add(&*snapshot);
    snapshot.reset();
}

#[derive(Debug)]
enum CliError {
    Io(io::Error),
    Parse(usize),
    HistogramCreation(CreationError),
    HistogramRecord(RecordError),
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<CreationError> for CliError {
    fn from(e: CreationError) -> Self {
        CliError::HistogramCreation(e)
    }
}

impl From<RecordError> for CliError {
    fn from(e: RecordError) -> Self {
        CliError::HistogramRecord(e)
    }
}
