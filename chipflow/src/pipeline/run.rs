use clap::Parser;
use libchipflow::pipeline::{self, RunOptions};
use log::LevelFilter;

use super::StageArgs;

#[derive(Parser, Debug)]
pub struct RunCmd {
    #[clap(flatten)]
    pub stage: StageArgs,

    /// Rerun the landscape tool unless its enhancer table has at least this
    /// many lines
    #[clap(long, default_value_t = 0)]
    pub min_rows: usize,

    /// Do not write recorded enriched region files back to the sample table
    #[clap(long, default_value_t = false)]
    pub no_update_table: bool,
}

impl RunCmd {
    pub fn run(self, log_level_filter: LevelFilter) -> eyre::Result<()> {
        let setup = self.stage.setup("run", log_level_filter)?;
        let options = RunOptions {
            analysis_name: setup.analysis_name.clone(),
            pattern: self.stage.selection.pattern(),
            min_rows: self.min_rows,
            update_table: !self.no_update_table,
        };
        let summary = pipeline::run(
            &setup.config,
            self.stage.table.table.as_ref(),
            &options,
            &setup.dispatcher,
        )?;
        log::info!("{summary:?}");
        eprintln!(
            "{}: peak calling {}, landscape {}",
            setup.analysis_name, summary.peaks, summary.landscape
        );
        Ok(())
    }
}
