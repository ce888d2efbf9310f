use std::path::{Path, PathBuf};

use crate::{
    config::{GenomeBuild, PipelineConfig},
    table::Registry,
};

/// Inclusion/exclusion substrings used to pick samples by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamePattern {
    pub include: String,
    pub exclude: Vec<String>,
}

impl NamePattern {
    pub fn new<S: Into<String>>(include: S, exclude: Vec<String>) -> Self {
        Self {
            include: include.into(),
            exclude,
        }
    }

    /// A name matches if it contains `include` exactly once and none of
    /// `exclude`, ignoring case. Names with the marker twice are ambiguous and
    /// never match. An empty `include` accepts every name.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_uppercase();
        let include = self.include.to_uppercase();
        let included = include.is_empty() || name.matches(include.as_str()).count() == 1;
        included
            && !self
                .exclude
                .iter()
                .filter(|ex| !ex.is_empty())
                .any(|ex| name.contains(ex.to_uppercase().as_str()))
    }
}

/// Names of all samples matching the pattern, in table order.
pub fn select<S: AsRef<str>>(registry: &Registry, include: &str, exclude: &[S]) -> Vec<String> {
    let pattern = NamePattern::new(
        include,
        exclude.iter().map(|s| s.as_ref().to_string()).collect(),
    );
    select_pattern(registry, &pattern)
}

pub fn select_pattern(registry: &Registry, pattern: &NamePattern) -> Vec<String> {
    let names: Vec<String> = registry
        .names()
        .filter(|name| pattern.matches(name))
        .map(String::from)
        .collect();
    log::info!("Pattern {pattern:?} selected {} samples: {names:?}", names.len());
    names
}

/// Analysis name derived from a sample table file name, ie
/// `/a/mm10_liver_CHIP_data_table.txt` gives `mm10_liver_CHIP_data_table`.
pub fn analysis_name_from_table<P: AsRef<Path>>(table: P) -> Option<String> {
    let file_name = table.as_ref().file_name()?.to_str()?;
    let name = file_name.split('.').next()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisParameters {
    pub genome: GenomeBuild,
    pub tss_distance: u32,
    pub stitch: Option<u32>,
    pub mask: Option<PathBuf>,
    pub use_background: bool,
}

impl AnalysisParameters {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            genome: config.genome().clone(),
            tss_distance: config.tss(),
            stitch: config.stitch_distance(),
            mask: config.mask_path().map(Path::to_path_buf),
            use_background: config.background(),
        }
    }
}

/// Ordered set of samples submitted together to the landscape stage.
///
/// Member order decides the position of each sample in every comma joined
/// list handed to the tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisGroup {
    analysis_name: String,
    member_names: Vec<String>,
    parameters: AnalysisParameters,
}

impl AnalysisGroup {
    pub fn new<S: Into<String>>(
        analysis_name: S,
        member_names: Vec<String>,
        parameters: AnalysisParameters,
    ) -> Self {
        Self {
            analysis_name: analysis_name.into(),
            member_names,
            parameters,
        }
    }

    pub fn analysis_name(&self) -> &str {
        &self.analysis_name
    }

    pub fn member_names(&self) -> &[String] {
        &self.member_names
    }

    pub fn parameters(&self) -> &AnalysisParameters {
        &self.parameters
    }

    pub fn is_empty(&self) -> bool {
        self.member_names.is_empty()
    }
}
