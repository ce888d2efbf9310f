use clap::Parser;
use libchipflow::{pipeline::run_peak_calls, select::select_pattern, Registry};
use log::LevelFilter;

use super::StageArgs;

#[derive(Parser, Debug)]
pub struct CallPeaksCmd {
    #[clap(flatten)]
    pub stage: StageArgs,

    /// Do not write recorded enriched region files back to the sample table
    #[clap(long, default_value_t = false)]
    pub no_update_table: bool,
}

impl CallPeaksCmd {
    pub fn run(self, log_level_filter: LevelFilter) -> eyre::Result<()> {
        let setup = self.stage.setup("call_peaks", log_level_filter)?;
        let table = &self.stage.table.table;
        let mut registry = Registry::load(table, setup.config.table_columns())?;
        let names = select_pattern(&registry, &self.stage.selection.pattern());

        let state = run_peak_calls(
            &mut registry,
            &names,
            &setup.config,
            &setup.analysis_name,
            &setup.dispatcher,
        )?;
        if !self.no_update_table {
            registry.write(table)?;
        }
        log::info!("Peak calling {state}");
        eprintln!("{}: peak calling {state}", setup.analysis_name);
        Ok(())
    }
}
