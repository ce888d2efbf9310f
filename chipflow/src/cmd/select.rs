use std::io::{self, Write};

use clap::Parser;
use libchipflow::{select::select_pattern, Registry};

use super::{SelectionArgs, TableArgs};

#[derive(Parser, Debug)]
pub struct SelectCmd {
    #[clap(flatten)]
    pub table: TableArgs,

    #[clap(flatten)]
    pub selection: SelectionArgs,
}

impl SelectCmd {
    pub fn run(self) -> eyre::Result<()> {
        let registry = Registry::load(&self.table.table, &self.table.columns())?;
        let names = select_pattern(&registry, &self.selection.pattern());
        let mut out = io::stdout().lock();
        for name in names {
            writeln!(out, "{name}")?;
        }
        Ok(())
    }
}
