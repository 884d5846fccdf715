//! Presentation of a finished run.
//!
//! The coordinator is the only rank with anything to show, so reporting
//! happens after [`run`](crate::driver::run) has returned.

use std::io::{self, Write};

use chrono::TimeDelta;

use crate::driver::RunOutcome;
use crate::matrix::Matrix;

/// Renders the outcome of a run somewhere.
pub trait Reporter {
    fn report(&mut self, outcome: &RunOutcome) -> io::Result<()>;
}

/// Writes matrices as tab-separated rows, followed by the elapsed time.
pub struct ConsoleReporter<W: Write> {
    out: W,
    show_matrices: bool,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            show_matrices: true,
        }
    }

    /// Only prints the elapsed time.
    pub fn timing_only(out: W) -> Self {
        Self {
            out,
            show_matrices: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

/// Writes every element followed by a tab, one row per line.
pub fn write_matrix<W: Write>(out: &mut W, matrix: &Matrix) -> io::Result<()> {
    for row in matrix.rows() {
        for value in row {
            write!(out, "{value}\t")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Seconds with microsecond precision.
pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let micros = elapsed.num_microseconds().unwrap_or(i64::MAX);
    format!("{:.6}", micros as f64 / 1_000_000.0)
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn report(&mut self, outcome: &RunOutcome) -> io::Result<()> {
        if self.show_matrices {
            writeln!(self.out, "Matrix A:")?;
            write_matrix(&mut self.out, &outcome.a)?;
            writeln!(self.out, "\nMatrix B:")?;
            write_matrix(&mut self.out, &outcome.b)?;
            writeln!(self.out, "\nResult of matrix multiplication:")?;
            write_matrix(&mut self.out, &outcome.c)?;
            writeln!(self.out)?;
        }
        writeln!(
            self.out,
            "Elapsed: {} seconds",
            format_elapsed(outcome.elapsed)
        )?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::DistributionPlan;

    fn outcome() -> RunOutcome {
        let a = Matrix::from_vec(2, vec![1, 2, 3, 4]).unwrap();
        let b = Matrix::from_vec(2, vec![0, 1, 1, 0]).unwrap();
        let c = a.product(&b).unwrap();
        RunOutcome {
            a,
            b,
            c,
            plan: DistributionPlan::new(2, 2).unwrap(),
            elapsed: TimeDelta::microseconds(1_500_250),
        }
    }

    #[test]
    fn test_console_layout() {
        let mut reporter = ConsoleReporter::new(Vec::new());
        reporter.report(&outcome()).unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(
            text,
            "Matrix A:\n1\t2\t\n3\t4\t\n\
             \nMatrix B:\n0\t1\t\n1\t0\t\n\
             \nResult of matrix multiplication:\n2\t1\t\n4\t3\t\n\
             \nElapsed: 1.500250 seconds\n"
        );
    }

    #[test]
    fn test_timing_only() {
        let mut reporter = ConsoleReporter::timing_only(Vec::new());
        reporter.report(&outcome()).unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(text, "Elapsed: 1.500250 seconds\n");
    }
}
