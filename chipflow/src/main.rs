mod cmd;
mod file;
mod pipeline;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::Verbosity;
use eyre::Result;
use human_panic::setup_panic;
use pipeline::PipelineCmds;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about=None)]
/// Sample table driven peak calling and enhancer landscapes.
struct Args {
    #[clap(flatten)]
    verbose: Verbosity,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that every sample's bam file, index and background exist
    Summary(cmd::summary::SummaryCmd),

    /// Print the samples a name pattern selects, in table order
    Select(cmd::select::SelectCmd),

    /// Pipelines that generate and run scripts for external tools
    #[clap(subcommand)]
    Pipeline(PipelineCmds),
}

fn main() -> Result<()> {
    setup_panic!();
    jane_eyre::install()?;

    let args = Args::parse();
    let log_level_filter = args.verbose.log_level_filter();

    match args.command {
        Commands::Summary(cmd) => {
            env_logger::Builder::new()
                .filter_level(log_level_filter)
                .init();
            cmd.run()?
        }
        Commands::Select(cmd) => {
            env_logger::Builder::new()
                .filter_level(log_level_filter)
                .init();
            cmd.run()?
        }
        Commands::Pipeline(plcmd) => plcmd.run(log_level_filter)?,
    }
    Ok(())
}
