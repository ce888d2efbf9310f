//! Paths and parameters shared by every stage of a run.
//!
//! A [`PipelineConfig`] is built once at startup and handed to each component
//! by reference, nothing here is global.

use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};

use crate::{
    error::{PipelineError, Result},
    table::TableColumns,
    utils::{absolute_from, is_bare_command},
};

/// Default TSS exclusion distance for the landscape tool, in bp.
pub const DEFAULT_TSS_DISTANCE: u32 = 2500;

/// UCSC-style genome build identifier, ie mm10 or hg19.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomeBuild(String);

impl GenomeBuild {
    pub fn new<S: Into<String>>(build: S) -> Self {
        GenomeBuild(build.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Effective genome size shorthand understood by the peak caller.
    pub fn genome_size(&self) -> &str {
        let lower = self.0.to_lowercase();
        if lower.starts_with("hg") {
            "hs"
        } else if lower.starts_with("mm") {
            "mm"
        } else {
            &self.0
        }
    }
}

impl fmt::Display for GenomeBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Standard folder layout under a project directory.
#[derive(Debug, Clone)]
pub struct ProjectFolders {
    project: PathBuf,
    macs: PathBuf,
    macs_enriched: PathBuf,
    wiggles: PathBuf,
    meta_rose: PathBuf,
    logs: PathBuf,
}

impl ProjectFolders {
    pub fn new<P: AsRef<Path>>(project: P) -> Self {
        let project = project.as_ref().to_path_buf();
        Self {
            macs: project.join("macsFolder"),
            macs_enriched: project.join("macsEnriched"),
            wiggles: project.join("wiggles"),
            meta_rose: project.join("meta_rose"),
            logs: project.join("logs"),
            project,
        }
    }

    pub fn project(&self) -> &Path {
        &self.project
    }

    /// Where the peak caller runs and leaves its raw output.
    pub fn macs(&self) -> &Path {
        &self.macs
    }

    /// Where enriched region files recorded in the sample table live.
    pub fn macs_enriched(&self) -> &Path {
        &self.macs_enriched
    }

    pub fn wiggles(&self) -> &Path {
        &self.wiggles
    }

    /// Parent of every landscape analysis folder and script.
    pub fn meta_rose(&self) -> &Path {
        &self.meta_rose
    }

    pub fn logs(&self) -> &Path {
        &self.logs
    }

    pub fn all(&self) -> [&Path; 5] {
        [
            &self.macs,
            &self.macs_enriched,
            &self.wiggles,
            &self.meta_rose,
            &self.logs,
        ]
    }

    /// Creates any missing folder, existing ones are left untouched.
    pub fn create_all(&self) -> Result<()> {
        for folder in self.all() {
            fs::create_dir_all(folder).map_err(|e| PipelineError::io(folder, e))?;
            log::debug!("Folder ready: {}", folder.display());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    cwd: PathBuf,
    folders: ProjectFolders,
    tool_dir: PathBuf,
    landscape_tool: String,
    interpreter: Option<PathBuf>,
    peak_caller: PathBuf,
    peak_p_value: String,
    genome: GenomeBuild,
    mask: Option<PathBuf>,
    tss_distance: u32,
    stitch: Option<u32>,
    use_background: bool,
    columns: TableColumns,
    shell: Option<PathBuf>,
}

impl PipelineConfig {
    /// Relative project, tool and mask paths are resolved against the current
    /// directory here, since every generated script changes directory first.
    pub fn new<P, Q>(project: P, tool_dir: Q, genome: GenomeBuild) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let cwd = env::current_dir().map_err(|e| PipelineError::io(".", e))?;
        Ok(Self {
            folders: ProjectFolders::new(absolute_from(&cwd, project)),
            tool_dir: absolute_from(&cwd, tool_dir),
            landscape_tool: "ROSE2_META.py".to_string(),
            interpreter: None,
            peak_caller: PathBuf::from("macs14"),
            peak_p_value: "1e-9".to_string(),
            genome,
            mask: None,
            tss_distance: DEFAULT_TSS_DISTANCE,
            stitch: None,
            use_background: true,
            columns: TableColumns::default(),
            shell: None,
            cwd,
        })
    }

    /// Paths with a directory part are made absolute, bare names are left for
    /// $PATH lookup.
    fn resolve_command(&self, path: PathBuf) -> PathBuf {
        if is_bare_command(&path) {
            path
        } else {
            absolute_from(&self.cwd, path)
        }
    }

    pub fn landscape_tool<S: Into<String>>(&mut self, tool: S) -> &mut Self {
        self.landscape_tool = tool.into();
        self
    }

    /// Interpreter used to launch the landscape tool, ie a python2 binary.
    pub fn interpreter(&mut self, interpreter: Option<PathBuf>) -> &mut Self {
        self.interpreter = interpreter.map(|p| self.resolve_command(p));
        self
    }

    pub fn peak_caller<P: Into<PathBuf>>(&mut self, peak_caller: P) -> &mut Self {
        self.peak_caller = self.resolve_command(peak_caller.into());
        self
    }

    pub fn peak_p_value<S: Into<String>>(&mut self, p_value: S) -> &mut Self {
        self.peak_p_value = p_value.into();
        self
    }

    pub fn mask(&mut self, mask: Option<PathBuf>) -> &mut Self {
        self.mask = mask.map(|p| absolute_from(&self.cwd, p));
        self
    }

    pub fn tss_distance(&mut self, tss_distance: u32) -> &mut Self {
        self.tss_distance = tss_distance;
        self
    }

    pub fn stitch(&mut self, stitch: Option<u32>) -> &mut Self {
        self.stitch = stitch;
        self
    }

    pub fn use_background(&mut self, use_background: bool) -> &mut Self {
        self.use_background = use_background;
        self
    }

    pub fn columns(&mut self, columns: TableColumns) -> &mut Self {
        self.columns = columns;
        self
    }

    /// Shell used to run generated scripts, looked up in $PATH when unset.
    pub fn shell(&mut self, shell: Option<PathBuf>) -> &mut Self {
        self.shell = shell;
        self
    }

    pub fn folders(&self) -> &ProjectFolders {
        &self.folders
    }

    pub fn tool_dir(&self) -> &Path {
        &self.tool_dir
    }

    pub fn landscape_tool_path(&self) -> PathBuf {
        self.tool_dir.join(&self.landscape_tool)
    }

    pub fn interpreter_path(&self) -> Option<&Path> {
        self.interpreter.as_deref()
    }

    pub fn peak_caller_path(&self) -> &Path {
        &self.peak_caller
    }

    pub fn peak_p_value_str(&self) -> &str {
        &self.peak_p_value
    }

    pub fn genome(&self) -> &GenomeBuild {
        &self.genome
    }

    pub fn mask_path(&self) -> Option<&Path> {
        self.mask.as_deref()
    }

    pub fn tss(&self) -> u32 {
        self.tss_distance
    }

    pub fn stitch_distance(&self) -> Option<u32> {
        self.stitch
    }

    pub fn background(&self) -> bool {
        self.use_background
    }

    pub fn table_columns(&self) -> &TableColumns {
        &self.columns
    }

    pub fn shell_path(&self) -> Option<&Path> {
        self.shell.as_deref()
    }
}
