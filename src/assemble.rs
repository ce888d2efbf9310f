//! Builds the landscape (region stitching) tool invocation for a group of
//! samples.

use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::{
    config::PipelineConfig,
    error::{PipelineError, Result},
    select::AnalysisGroup,
    table::{Registry, ENRICH_STAGE},
    utils::shell_quote,
};

/// A fully built external tool call, ready to be written out as a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedInvocation {
    command_line: String,
    working_dir: PathBuf,
    script_path: PathBuf,
    expected_output_path: PathBuf,
}

impl GeneratedInvocation {
    pub fn new(
        command_line: String,
        working_dir: PathBuf,
        script_path: PathBuf,
        expected_output_path: PathBuf,
    ) -> Self {
        Self {
            command_line,
            working_dir,
            script_path,
            expected_output_path,
        }
    }

    /// One or more shell commands, newline separated.
    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Existence of this file means a previous run finished.
    pub fn expected_output_path(&self) -> &Path {
        &self.expected_output_path
    }
}

/// Fixed parts of the landscape tool command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandscapeTemplate {
    pub interpreter: Option<PathBuf>,
    pub tool: PathBuf,
    pub tool_dir: PathBuf,
    pub landscape_dir: PathBuf,
    pub enriched_dir: PathBuf,
}

impl LandscapeTemplate {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            interpreter: config.interpreter_path().map(Path::to_path_buf),
            tool: config.landscape_tool_path(),
            tool_dir: config.tool_dir().to_path_buf(),
            landscape_dir: config.folders().meta_rose().to_path_buf(),
            enriched_dir: config.folders().macs_enriched().to_path_buf(),
        }
    }
}

pub fn landscape_output_dir<P: AsRef<Path>>(landscape_dir: P, analysis_name: &str) -> PathBuf {
    landscape_dir.as_ref().join(analysis_name)
}

/// `<landscape_dir>/<name>/<name>_AllEnhancers.table.txt`, the last file the
/// landscape tool writes.
pub fn landscape_output_path<P: AsRef<Path>>(landscape_dir: P, analysis_name: &str) -> PathBuf {
    landscape_output_dir(landscape_dir, analysis_name)
        .join(format!("{analysis_name}_AllEnhancers.table.txt"))
}

pub fn landscape_script_path<P: AsRef<Path>>(landscape_dir: P, analysis_name: &str) -> PathBuf {
    landscape_dir
        .as_ref()
        .join(format!("{analysis_name}_meta_rose.sh"))
}

/// Separates the per-member entries of the bam, control and bed lists.
const LIST_DELIMITER: &str = ",";

fn join_paths<'a, I>(paths: I) -> String
where
    I: IntoIterator<Item = &'a Path>,
{
    paths.into_iter().map(|p| p.display()).join(LIST_DELIMITER)
}

// An entry holding the delimiter would reach the tool as two entries
fn check_list_entry(registry: &Registry, sample: &str, path: &Path) -> Result<()> {
    if path.to_string_lossy().contains(LIST_DELIMITER) {
        return Err(PipelineError::malformed(
            registry.source(),
            format!(
                "path {} of sample {sample} contains the list delimiter '{LIST_DELIMITER}'",
                path.display()
            ),
        ));
    }
    Ok(())
}

/// Builds the landscape invocation for every member of `group`.
///
/// The bam, control and enriched region lists are built in member order and
/// always have one entry per member. A member without an enrichment output
/// fails the whole group.
pub fn assemble(
    group: &AnalysisGroup,
    registry: &Registry,
    template: &LandscapeTemplate,
) -> Result<GeneratedInvocation> {
    let analysis = group.analysis_name();
    if group.is_empty() {
        return Err(PipelineError::EmptyGroup {
            analysis: analysis.to_string(),
        });
    }

    let params = group.parameters();
    let n_members = group.member_names().len();
    let mut bams = Vec::with_capacity(n_members);
    let mut controls = Vec::with_capacity(n_members);
    let mut beds = Vec::with_capacity(n_members);
    for name in group.member_names() {
        let sample = registry.get(name).ok_or_else(|| {
            PipelineError::malformed(
                registry.source(),
                format!("analysis {analysis} uses unknown sample {name}"),
            )
        })?;
        check_list_entry(registry, name, sample.file_path())?;
        bams.push(sample.file_path());
        let control = registry.background_of(name)?.map(|bg| bg.file_path());
        if let (true, Some(control)) = (params.use_background, control) {
            check_list_entry(registry, name, control)?;
        }
        controls.push(control);

        let enriched = sample.stage_output(ENRICH_STAGE).ok_or_else(|| {
            PipelineError::DependencyNotReady {
                analysis: analysis.to_string(),
                sample: name.clone(),
                stage: ENRICH_STAGE.to_string(),
            }
        })?;
        let bed = template.enriched_dir.join(enriched);
        check_list_entry(registry, name, &bed)?;
        beds.push(bed);
    }

    let controls: Option<Vec<&Path>> = if params.use_background {
        let controls = controls.into_iter().collect::<Option<Vec<_>>>();
        if controls.is_none() {
            log::warn!("{analysis}: not every sample has a background, running without controls");
        }
        controls
    } else {
        None
    };

    let output_dir = landscape_output_dir(&template.landscape_dir, analysis);
    let mut args: Vec<String> = Vec::new();
    if let Some(interpreter) = &template.interpreter {
        args.push(interpreter.display().to_string());
    }
    args.push(template.tool.display().to_string());
    args.extend(["-g".to_string(), params.genome.to_string()]);
    args.extend([
        "-i".to_string(),
        join_paths(beds.iter().map(PathBuf::as_path)),
    ]);
    args.extend(["-r".to_string(), join_paths(bams)]);
    if let Some(controls) = controls {
        args.extend(["-c".to_string(), join_paths(controls)]);
    }
    args.extend(["-o".to_string(), format!("{}/", output_dir.display())]);
    args.extend(["-n".to_string(), analysis.to_string()]);
    args.extend(["-t".to_string(), params.tss_distance.to_string()]);
    if let Some(mask) = &params.mask {
        args.extend(["--mask".to_string(), mask.display().to_string()]);
    }
    if let Some(stitch) = params.stitch {
        args.extend(["-s".to_string(), stitch.to_string()]);
    }

    let command_line = args.iter().map(|a| shell_quote(a)).join(" ");
    log::info!("{analysis} landscape command: {command_line}");
    Ok(GeneratedInvocation::new(
        command_line,
        template.tool_dir.clone(),
        landscape_script_path(&template.landscape_dir, analysis),
        landscape_output_path(&template.landscape_dir, analysis),
    ))
}
