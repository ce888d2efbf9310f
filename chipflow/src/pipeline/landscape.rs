use clap::Parser;
use libchipflow::{
    pipeline::run_landscape, select::select_pattern, AnalysisGroup, AnalysisParameters,
    LandscapeTemplate, Registry,
};
use log::LevelFilter;

use super::StageArgs;

#[derive(Parser, Debug)]
pub struct LandscapeCmd {
    #[clap(flatten)]
    pub stage: StageArgs,

    /// Rerun unless the enhancer table has at least this many lines
    #[clap(long, default_value_t = 0)]
    pub min_rows: usize,
}

impl LandscapeCmd {
    pub fn run(self, log_level_filter: LevelFilter) -> eyre::Result<()> {
        let setup = self.stage.setup("landscape", log_level_filter)?;
        let registry = Registry::load(&self.stage.table.table, setup.config.table_columns())?;
        let names = select_pattern(&registry, &self.stage.selection.pattern());
        let group = AnalysisGroup::new(
            setup.analysis_name.clone(),
            names,
            AnalysisParameters::from_config(&setup.config),
        );
        let template = LandscapeTemplate::from_config(&setup.config);

        let state = run_landscape(
            &group,
            &registry,
            &template,
            self.min_rows,
            &setup.dispatcher,
        )?;
        log::info!("Landscape {state}");
        eprintln!("{}: landscape {state}", setup.analysis_name);
        Ok(())
    }
}
