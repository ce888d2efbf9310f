pub mod select;
pub mod summary;

use clap::Args;
use libchipflow::{
    table::{TableColumns, ENRICH_STAGE},
    NamePattern,
};

use crate::file::ValidPathBuf;

#[derive(Debug, Args)]
pub struct TableArgs {
    /// Tab-delimited sample table, one row per sample
    #[clap(short, long)]
    pub table: ValidPathBuf,

    /// Column holding the unique sample name
    #[clap(long, default_value = "NAME")]
    pub name_column: String,

    /// Column holding the path to the sample's bam file
    #[clap(long, default_value = "FILE_PATH")]
    pub file_column: String,

    /// Column naming the background (control) sample, NONE if there is none
    #[clap(long, default_value = "BACKGROUND")]
    pub background_column: String,

    /// Column holding the enriched regions file from peak calling
    #[clap(long, default_value = "ENRICHED_MACS")]
    pub enriched_column: String,
}

impl TableArgs {
    pub fn columns(&self) -> TableColumns {
        TableColumns {
            name: self.name_column.clone(),
            file: self.file_column.clone(),
            background: self.background_column.clone(),
            stages: vec![(ENRICH_STAGE.to_string(), self.enriched_column.clone())],
        }
    }
}

#[derive(Debug, Args)]
pub struct SelectionArgs {
    /// Use samples whose name contains this exactly once, ignoring case
    #[clap(short, long)]
    pub include: String,

    /// Skip samples whose name contains any of these, separated by commas
    #[clap(short, long, num_args = 1.., value_delimiter = ',')]
    pub exclude: Vec<String>,
}

impl SelectionArgs {
    pub fn pattern(&self) -> NamePattern {
        NamePattern::new(self.include.clone(), self.exclude.clone())
    }
}
