use std::io::{self, Write};

use clap::Parser;
use libchipflow::Registry;

use super::TableArgs;

#[derive(Parser, Debug)]
pub struct SummaryCmd {
    #[clap(flatten)]
    pub table: TableArgs,
}

impl SummaryCmd {
    /// Prints every sample and any problem with the table. Fails if there is
    /// at least one problem.
    pub fn run(self) -> eyre::Result<()> {
        let registry = Registry::open(&self.table.table, &self.table.columns())?;
        let report = registry.validate();

        let mut out = io::stdout().lock();
        writeln!(out, "{}: {} samples", registry.source().display(), registry.len())?;
        for sample in registry.samples() {
            writeln!(
                out,
                "{}\t{}\t{}",
                sample.name(),
                sample.file_path().display(),
                sample.background().unwrap_or("NONE")
            )?;
        }
        write!(out, "{report}")?;

        if report.is_ok() {
            Ok(())
        } else {
            Err(eyre::eyre!(
                "Sample table has {} problem(s)",
                report.problems().len()
            ))
        }
    }
}
