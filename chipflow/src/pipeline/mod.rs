mod landscape;
mod peaks;
mod run;

use std::{fs, path::PathBuf};

use clap::{Args, Subcommand};
use libchipflow::{select::analysis_name_from_table, GenomeBuild, PipelineConfig, ShellDispatcher};
use log::LevelFilter;

use self::{landscape::LandscapeCmd, peaks::CallPeaksCmd, run::RunCmd};
use crate::{
    cmd::{SelectionArgs, TableArgs},
    file::ValidPathBuf,
};

#[derive(Subcommand, Debug)]
pub enum PipelineCmds {
    /// Call peaks for every selected sample that does not have them yet
    CallPeaks(CallPeaksCmd),

    /// Stitch the enriched regions of the selected samples into an enhancer
    /// landscape
    Landscape(LandscapeCmd),

    /// Check the table, call peaks, then build the enhancer landscape
    Run(RunCmd),
}

impl PipelineCmds {
    pub fn run(self, log_level_filter: LevelFilter) -> eyre::Result<()> {
        match self {
            PipelineCmds::CallPeaks(cmd) => cmd.run(log_level_filter),
            PipelineCmds::Landscape(cmd) => cmd.run(log_level_filter),
            PipelineCmds::Run(cmd) => cmd.run(log_level_filter),
        }
    }
}

/// Project layout, tool locations and analysis parameters.
#[derive(Debug, Args)]
pub struct ProjectArgs {
    /// Project folder, stage outputs are written in standard folders below it
    #[clap(short, long)]
    pub project_dir: PathBuf,

    /// Folder holding the landscape tool, generated scripts cd here first
    #[clap(long)]
    pub tool_dir: PathBuf,

    /// Genome build, ie mm10 or hg19
    #[clap(short, long)]
    pub genome: String,

    /// Bed file of regions to mask, ie a blacklist
    #[clap(long)]
    pub mask: Option<ValidPathBuf>,

    /// Interpreter used to launch the landscape tool, ie a python2 binary. If
    /// not given the tool is executed directly
    #[clap(long)]
    pub interpreter: Option<PathBuf>,

    /// File name of the landscape tool inside --tool-dir
    #[clap(long, default_value = "ROSE2_META.py")]
    pub landscape_tool: String,

    /// Path to the peak caller, if not specified the generated script looks
    /// for macs14 in $PATH
    #[clap(long)]
    pub macs_path: Option<PathBuf>,

    /// p-value cutoff for peak calling
    #[clap(long, default_value = "1e-9")]
    pub p_value: String,

    /// Distance around TSSs excluded from stitching, in bp
    #[clap(long, default_value_t = 2500)]
    pub tss: u32,

    /// Fixed stitching distance, by default the landscape tool picks one
    #[clap(long)]
    pub stitch: Option<u32>,

    /// Do not pass background samples to the tools
    #[clap(long, default_value_t = false)]
    pub no_background: bool,

    /// Path to bash, if not specified will look in $PATH
    #[clap(long)]
    pub bash_path: Option<PathBuf>,

    /// Name of the analysis, defaults to the sample table file name without
    /// extensions
    #[clap(short = 'n', long)]
    pub analysis_name: Option<String>,
}

impl ProjectArgs {
    pub fn config(&self, table: &TableArgs) -> eyre::Result<PipelineConfig> {
        let mut config = PipelineConfig::new(
            &self.project_dir,
            &self.tool_dir,
            GenomeBuild::new(&self.genome),
        )?;
        config
            .landscape_tool(&self.landscape_tool)
            .interpreter(self.interpreter.clone())
            .peak_p_value(&self.p_value)
            .mask(self.mask.clone().map(ValidPathBuf::into_inner))
            .tss_distance(self.tss)
            .stitch(self.stitch)
            .use_background(!self.no_background)
            .columns(table.columns())
            .shell(self.bash_path.clone());
        if let Some(macs) = &self.macs_path {
            config.peak_caller(macs);
        }
        Ok(config)
    }

    pub fn analysis_name(&self, table: &TableArgs) -> eyre::Result<String> {
        match &self.analysis_name {
            Some(name) => Ok(name.clone()),
            None => analysis_name_from_table(&table.table).ok_or_else(|| {
                eyre::eyre!("Cannot derive an analysis name, pass --analysis-name")
            }),
        }
    }
}

/// Arguments every pipeline command takes.
#[derive(Debug, Args)]
pub struct StageArgs {
    #[clap(flatten)]
    pub project: ProjectArgs,

    #[clap(flatten)]
    pub table: TableArgs,

    #[clap(flatten)]
    pub selection: SelectionArgs,
}

/// Everything a pipeline command needs once its arguments are checked.
pub struct Setup {
    pub config: PipelineConfig,
    pub analysis_name: String,
    pub dispatcher: ShellDispatcher,
}

impl StageArgs {
    /// Builds the config, creates the project folders and starts logging to
    /// `logs/<analysis>_<command>.log.txt` in the project.
    pub fn setup(&self, command: &str, log_level_filter: LevelFilter) -> eyre::Result<Setup> {
        let config = self.project.config(&self.table)?;
        let analysis_name = self.project.analysis_name(&self.table)?;
        config.folders().create_all()?;

        let log_file_path = config
            .folders()
            .logs()
            .join(format!("{analysis_name}_{command}.log.txt"));
        let log_file = fs::File::create(&log_file_path)?;
        simple_logging::log_to(log_file, log_level_filter);
        log::info!("{self:?}");
        eprintln!("Logging to {}", log_file_path.display());

        let dispatcher = ShellDispatcher::from_config(&config)?;
        Ok(Setup {
            config,
            analysis_name,
            dispatcher,
        })
    }
}
