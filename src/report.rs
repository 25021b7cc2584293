//! Textual percentile distribution output.

use crate::core::counter::Counter;
use crate::Histogram;
use std::io::{self, Write};

/// Layout of a percentile distribution dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Right-aligned 12-wide columns followed by a summary footer.
    Classic,
    /// Comma separated values, no footer.
    Csv,
}

impl Default for Format {
    fn default() -> Self {
        Format::Classic
    }
}

const HEADERS: [&str; 4] = ["Value", "Percentile", "TotalCount", "1/(1-Percentile)"];

impl<C: Counter> Histogram<C> {
    /// Write the percentile distribution of this histogram to `writer`.
    ///
    /// One row is written per item of `iter_percentiles(ticks_per_half_distance)`: the value
    /// (divided by `value_scale`, printed with as many decimals as the histogram has
    /// significant figures), the percentile as a fraction, the cumulative count, and
    /// `1/(1-percentile)`. The classic format ends with a footer carrying the mean, standard
    /// deviation, max, total count, and bucket layout.
    pub fn percentiles_print<W: Write>(
        &self,
        mut writer: W,
        ticks_per_half_distance: u32,
        value_scale: f64,
        format: Format,
    ) -> io::Result<()> {
        let precision = usize::from(self.significant_figures());

        match format {
            Format::Classic => writeln!(
                writer,
                "{:>12} {:>12} {:>12} {:>12}\n",
                HEADERS[0], HEADERS[1], HEADERS[2], HEADERS[3]
            )?,
            Format::Csv => writeln!(
                writer,
                "{},{},{},{}",
                HEADERS[0], HEADERS[1], HEADERS[2], HEADERS[3]
            )?,
        }

        for v in self.iter_percentiles(ticks_per_half_distance) {
            let value = v.value_iterated_to() as f64 / value_scale;
            let percentile = v.percentile() / 100.0;
            let inverted_percentile = 1.0 / (1.0 - percentile);

            match format {
                Format::Classic => writeln!(
                    writer,
                    "{:12.precision$} {:12.6} {:12} {:12.2}",
                    value,
                    percentile,
                    v.cumulative_count(),
                    inverted_percentile,
                    precision = precision
                )?,
                Format::Csv => writeln!(
                    writer,
                    "{:.precision$},{:.6},{},{:.2}",
                    value,
                    percentile,
                    v.cumulative_count(),
                    inverted_percentile,
                    precision = precision
                )?,
            }
        }

        if format == Format::Classic {
            writeln!(
                writer,
                "#[Mean    = {:12.3}, StdDeviation   = {:12.3}]",
                self.mean() / value_scale,
                self.stddev() / value_scale
            )?;
            writeln!(
                writer,
                "#[Max     = {:12.3}, Total count    = {:12}]",
                self.max() as f64 / value_scale,
                self.total_count()
            )?;
            writeln!(
                writer,
                "#[Buckets = {:12}, SubBuckets     = {:12}]",
                self.bucket_count(),
                self.sub_bucket_count()
            )?;
        }

        writer.flush()
    }
}
