//! Sample table parsing, validation and write back.
//!
//! A sample table is a tab-delimited file with a header row and one sample per
//! row. Which columns hold the sample name, data file, background sample and
//! stage outputs is configured through [`TableColumns`]. Every other column is
//! carried along untouched so the table can be written back after a stage
//! records its outputs.

use std::{
    collections::BTreeMap,
    fmt,
    fs::{self, File},
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use csv::StringRecord;
use fnv::FnvHashMap;
use tempfile::NamedTempFile;

use crate::{
    error::{PipelineError, Result},
    utils,
};

/// Stage id of the per-sample peak calling stage.
pub const ENRICH_STAGE: &str = "enrich";

/// Cell value meaning "nothing here" in sample tables.
const NONE_VALUE: &str = "NONE";

fn is_none_value(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case(NONE_VALUE)
}

/// Column names used to read a sample table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumns {
    pub name: String,
    pub file: String,
    pub background: String,
    /// Pairs of (stage id, column name)
    pub stages: Vec<(String, String)>,
}

impl Default for TableColumns {
    fn default() -> Self {
        Self {
            name: "NAME".to_string(),
            file: "FILE_PATH".to_string(),
            background: "BACKGROUND".to_string(),
            stages: vec![(ENRICH_STAGE.to_string(), "ENRICHED_MACS".to_string())],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    name: String,
    file_path: PathBuf,
    background: Option<String>,
    stage_outputs: BTreeMap<String, String>,
}

impl Sample {
    pub fn new<S, P>(name: S, file_path: P, background: Option<String>) -> Self
    where
        S: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            name: name.into(),
            file_path: file_path.into(),
            background,
            stage_outputs: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Name of the control sample, if any.
    pub fn background(&self) -> Option<&str> {
        self.background.as_deref()
    }

    pub fn stage_output(&self, stage: &str) -> Option<&str> {
        self.stage_outputs.get(stage).map(String::as_str)
    }

    pub fn stage_outputs(&self) -> &BTreeMap<String, String> {
        &self.stage_outputs
    }
}

/// Something wrong with a sample table found by [`Registry::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    UnreadableArtifact { sample: String, path: PathBuf },
    MissingIndex { sample: String, path: PathBuf },
    DanglingBackground { sample: String, background: String },
}

impl Problem {
    pub fn sample(&self) -> &str {
        match self {
            Problem::UnreadableArtifact { sample, .. }
            | Problem::MissingIndex { sample, .. }
            | Problem::DanglingBackground { sample, .. } => sample,
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::UnreadableArtifact { sample, path } => {
                write!(f, "{sample}: cannot read data file {}", path.display())
            }
            Problem::MissingIndex { sample, path } => {
                write!(f, "{sample}: no .bai index found for {}", path.display())
            }
            Problem::DanglingBackground { sample, background } => {
                write!(f, "{sample}: background {background} is not in the table")
            }
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    problems: Vec<Problem>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return writeln!(f, "No problems found");
        }
        writeln!(f, "{} problem(s) found:", self.problems.len())?;
        for problem in &self.problems {
            writeln!(f, "  {problem}")?;
        }
        Ok(())
    }
}

/// True if the path is a regular file that can be opened for reading.
pub(crate) fn is_readable(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}

// samtools writes either sample.bam.bai or sample.bai
fn has_bam_index(path: &Path) -> bool {
    let mut appended = path.as_os_str().to_owned();
    appended.push(".bai");
    Path::new(&appended).exists() || path.with_extension("bai").exists()
}

fn is_bam(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("bam"))
}

fn column_index(header: &StringRecord, column: &str) -> Option<usize> {
    header.iter().position(|h| h.trim() == column)
}

/// All samples of a table, keyed by name and kept in declaration order.
#[derive(Debug, Clone)]
pub struct Registry {
    source: PathBuf,
    columns: TableColumns,
    header: StringRecord,
    comments: Vec<String>,
    rows: Vec<StringRecord>,
    samples: Vec<Sample>,
    index: FnvHashMap<String, usize>,
}

impl Registry {
    /// Reads and checks a sample table.
    ///
    /// Fails if the table is structurally broken, a background does not name
    /// another sample, or a data file is not readable.
    pub fn load<P: AsRef<Path>>(path: P, columns: &TableColumns) -> Result<Self> {
        let path = path.as_ref();
        let registry = Registry::open(path, columns)?;
        registry.check_backgrounds()?;
        for sample in registry.samples() {
            if !is_readable(sample.file_path()) {
                return Err(PipelineError::MissingArtifact {
                    sample: sample.name.clone(),
                    path: sample.file_path.clone(),
                });
            }
        }
        log::info!(
            "Loaded {} samples from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Reads a sample table from disk without resolving backgrounds or
    /// touching data files. Relative data file paths are made absolute using
    /// the table's own directory. `#` comment lines are kept for
    /// [`Registry::write`].
    pub fn open<P: AsRef<Path>>(path: P, columns: &TableColumns) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let table_path = utils::absolute(path).map_err(|e| PipelineError::io(path, e))?;
        let base_dir = table_path.parent().unwrap_or_else(|| Path::new("/"));
        let mut registry = Registry::parse(contents.as_bytes(), path, base_dir, columns)?;
        registry.comments = contents
            .lines()
            .filter(|line| line.starts_with('#'))
            .map(String::from)
            .collect();
        Ok(registry)
    }

    /// Parses a tab-delimited table. Relative data file paths are resolved
    /// against `base_dir`. `source` is only used for error messages and as
    /// the default location for [`Registry::write`].
    pub fn parse<R, P, Q>(reader: R, source: P, base_dir: Q, columns: &TableColumns) -> Result<Self>
    where
        R: Read,
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let source = source.as_ref().to_path_buf();
        let base_dir = base_dir.as_ref();
        let csv_err = |e: csv::Error| PipelineError::Csv {
            table: source.clone(),
            source: e,
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .comment(Some(b'#'))
            .from_reader(reader);
        let header = reader.headers().map_err(csv_err)?.clone();

        let required = |column: &str| {
            column_index(&header, column).ok_or_else(|| {
                PipelineError::malformed(&source, format!("missing column {column}"))
            })
        };
        let name_idx = required(&columns.name)?;
        let file_idx = required(&columns.file)?;
        let background_idx = required(&columns.background)?;
        let stage_idxs: Vec<(&str, Option<usize>)> = columns
            .stages
            .iter()
            .map(|(stage, column)| (stage.as_str(), column_index(&header, column)))
            .collect();

        let mut registry = Registry {
            source: source.clone(),
            columns: columns.clone(),
            header: header.clone(),
            comments: Vec::new(),
            rows: Vec::new(),
            samples: Vec::new(),
            index: FnvHashMap::default(),
        };

        for (row_idx, record) in reader.records().enumerate() {
            let record = record.map_err(csv_err)?;
            // Header is line 1
            let line = row_idx + 2;
            let field = |idx: usize, column: &str| {
                record
                    .get(idx)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| {
                        PipelineError::malformed(
                            &source,
                            format!("line {line} has no value for {column}"),
                        )
                    })
            };

            let name = field(name_idx, &columns.name)?;
            let file = Path::new(field(file_idx, &columns.file)?);
            let background = record
                .get(background_idx)
                .map(str::trim)
                .filter(|v| !is_none_value(v))
                .map(String::from);

            let mut sample = Sample::new(name, base_dir.join(file), background);
            for (stage, idx) in stage_idxs.iter() {
                let value = idx.and_then(|i| record.get(i)).map(str::trim);
                if let Some(value) = value.filter(|v| !is_none_value(v)) {
                    sample
                        .stage_outputs
                        .insert(stage.to_string(), value.to_string());
                }
            }

            if registry.index.contains_key(name) {
                return Err(PipelineError::malformed(
                    &source,
                    format!("line {line} repeats sample name {name}"),
                ));
            }
            log::debug!("Parsed sample {sample:?}");
            registry
                .index
                .insert(name.to_string(), registry.samples.len());
            registry.samples.push(sample);
            registry.rows.push(record);
        }
        Ok(registry)
    }

    fn check_backgrounds(&self) -> Result<()> {
        for sample in self.samples() {
            if let Some(background) = sample.background() {
                if !self.contains(background) {
                    return Err(PipelineError::malformed(
                        &self.source,
                        format!(
                            "sample {} has background {background} which is not in the table",
                            sample.name()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Checks every data file, index and background, collecting problems
    /// instead of failing on the first one.
    pub fn validate(&self) -> ValidationReport {
        let mut problems = Vec::new();
        for sample in self.samples() {
            let path = sample.file_path();
            if !is_readable(path) {
                problems.push(Problem::UnreadableArtifact {
                    sample: sample.name.clone(),
                    path: path.to_path_buf(),
                });
            } else if is_bam(path) && !has_bam_index(path) {
                problems.push(Problem::MissingIndex {
                    sample: sample.name.clone(),
                    path: path.to_path_buf(),
                });
            }
            if let Some(background) = sample.background() {
                if !self.contains(background) {
                    problems.push(Problem::DanglingBackground {
                        sample: sample.name.clone(),
                        background: background.to_string(),
                    });
                }
            }
        }
        ValidationReport { problems }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Sample> {
        self.index.get(name).map(|&i| &self.samples[i])
    }

    /// Samples in table order.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.samples.iter().map(Sample::name)
    }

    /// Looks up the control sample of `name`. Returns `Ok(None)` if the sample
    /// has no background.
    pub fn background_of(&self, name: &str) -> Result<Option<&Sample>> {
        let sample = self.get(name).ok_or_else(|| {
            PipelineError::malformed(&self.source, format!("no sample named {name}"))
        })?;
        match sample.background() {
            None => Ok(None),
            Some(background) => self.get(background).map(Some).ok_or_else(|| {
                PipelineError::malformed(
                    &self.source,
                    format!("sample {name} has background {background} which is not in the table"),
                )
            }),
        }
    }

    /// Records where a stage left its output for a sample, replacing any
    /// earlier value.
    pub fn record_stage_output<S: Into<String>>(
        &mut self,
        name: &str,
        stage: &str,
        value: S,
    ) -> Result<()> {
        let idx = *self.index.get(name).ok_or_else(|| {
            PipelineError::malformed(&self.source, format!("no sample named {name}"))
        })?;
        let value = value.into();
        log::debug!("{name}: {stage} -> {value}");
        self.samples[idx]
            .stage_outputs
            .insert(stage.to_string(), value);
        Ok(())
    }

    /// Writes the table back out with stage output columns filled in. Stage
    /// columns missing from the original header are appended.
    ///
    /// Comment lines read by [`Registry::open`] are written first, above the
    /// header, wherever they were in the original. The new table goes to a
    /// temporary file next to `path` and replaces it only once complete, so a
    /// failed write leaves the old table intact.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let csv_err = |e: csv::Error| PipelineError::Csv {
            table: path.to_path_buf(),
            source: e,
        };
        let io_err = |e: io::Error| PipelineError::io(path, e);

        let mut header = self.header.clone();
        let mut stage_idxs = Vec::with_capacity(self.columns.stages.len());
        for (stage, column) in self.columns.stages.iter() {
            let idx = match column_index(&header, column) {
                Some(idx) => idx,
                None => {
                    header.push_field(column);
                    header.len() - 1
                }
            };
            stage_idxs.push((stage.as_str(), idx));
        }

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            for comment in self.comments.iter() {
                writeln!(out, "{comment}").map_err(io_err)?;
            }
            let mut writer = csv::WriterBuilder::new()
                .delimiter(b'\t')
                .from_writer(&mut out);
            writer.write_record(&header).map_err(csv_err)?;
            for (sample, row) in self.samples.iter().zip(self.rows.iter()) {
                let mut fields: Vec<&str> = (0..header.len())
                    .map(|i| row.get(i).unwrap_or(""))
                    .collect();
                for (stage, idx) in stage_idxs.iter() {
                    fields[*idx] = sample.stage_output(stage).unwrap_or(NONE_VALUE);
                }
                writer.write_record(&fields).map_err(csv_err)?;
            }
            writer.flush().map_err(io_err)?;
            drop(writer);
            out.flush().map_err(io_err)?;
        }
        // Keep the permissions of the table being replaced
        if let Ok(metadata) = fs::metadata(path) {
            tmp.as_file()
                .set_permissions(metadata.permissions())
                .map_err(io_err)?;
        }
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        log::info!("Wrote sample table {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test {
    use assert_fs::{prelude::*, TempDir};
    use pretty_assertions::assert_eq;

    use super::*;

    pub(crate) const HEADER: &str =
        "FILE_PATH\tUNIQUE_ID\tGENOME\tNAME\tBACKGROUND\tENRICHED_REGION\tENRICHED_MACS\tCOLOR";

    /// Writes a table plus a BAM and index for every row into `dir`.
    pub(crate) fn write_table(dir: &TempDir, rows: &[(&str, &str, &str)]) -> PathBuf {
        let mut table = String::from(HEADER);
        table.push('\n');
        for (name, background, enriched) in rows {
            let bam = format!("{name}.bam");
            dir.child(&bam).write_str("bam").unwrap();
            dir.child(format!("{bam}.bai")).write_str("bai").unwrap();
            table.push_str(&format!(
                "{bam}\t{name}_id\tmm10\t{name}\t{background}\tNONE\t{enriched}\t0,0,0\n"
            ));
        }
        let table_path = dir.child("data_table.txt");
        table_path.write_str(&table).unwrap();
        table_path.to_path_buf()
    }

    pub(crate) fn standard_rows() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("LIVER_H3K27AC_1", "LIVER_WCE_1", "LIVER_H3K27AC_1_peaks.bed"),
            ("LIVER_H3K27AC_2", "LIVER_WCE_2", "NONE"),
            ("LIVER_WCE_1", "NONE", "NONE"),
            ("LIVER_WCE_2", "NONE", "NONE"),
        ]
    }

    #[test]
    fn test_load_well_formed() -> eyre::Result<()> {
        let temp_dir = TempDir::new()?;
        let table = write_table(&temp_dir, &standard_rows());
        let registry = Registry::load(&table, &TableColumns::default())?;

        assert_eq!(registry.len(), 4);
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec!["LIVER_H3K27AC_1", "LIVER_H3K27AC_2", "LIVER_WCE_1", "LIVER_WCE_2"]
        );
        let s1 = registry.get("LIVER_H3K27AC_1").unwrap();
        assert_eq!(s1.background(), Some("LIVER_WCE_1"));
        assert_eq!(s1.stage_output(ENRICH_STAGE), Some("LIVER_H3K27AC_1_peaks.bed"));
        assert_eq!(s1.file_path(), temp_dir.path().join("LIVER_H3K27AC_1.bam"));
        assert!(registry
            .get("LIVER_H3K27AC_2")
            .unwrap()
            .stage_output(ENRICH_STAGE)
            .is_none());
        assert!(registry.get("LIVER_WCE_1").unwrap().background().is_none());

        assert!(registry.validate().is_ok());
        Ok(())
    }

    #[test]
    fn test_dangling_background() -> eyre::Result<()> {
        let temp_dir = TempDir::new()?;
        let mut rows = standard_rows();
        rows[1].1 = "LIVER_WCE_9";
        let table = write_table(&temp_dir, &rows);

        let err = Registry::load(&table, &TableColumns::default()).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedTable { .. }));
        assert!(err.to_string().contains("LIVER_WCE_9"));

        let registry = Registry::open(&table, &TableColumns::default())?;
        let report = registry.validate();
        assert_eq!(
            report.problems(),
            &[Problem::DanglingBackground {
                sample: "LIVER_H3K27AC_2".to_string(),
                background: "LIVER_WCE_9".to_string(),
            }]
        );
        Ok(())
    }

    #[test]
    fn test_missing_artifact() -> eyre::Result<()> {
        let temp_dir = TempDir::new()?;
        let table = write_table(&temp_dir, &standard_rows());
        std::fs::remove_file(temp_dir.path().join("LIVER_WCE_2.bam"))?;

        let err = Registry::load(&table, &TableColumns::default()).unwrap_err();
        match err {
            PipelineError::MissingArtifact { sample, .. } => assert_eq!(sample, "LIVER_WCE_2"),
            other => panic!("unexpected error {other}"),
        }

        let report = Registry::open(&table, &TableColumns::default())?.validate();
        assert_eq!(report.problems().len(), 1);
        assert_eq!(report.problems()[0].sample(), "LIVER_WCE_2");
        Ok(())
    }

    #[test]
    fn test_missing_index() -> eyre::Result<()> {
        let temp_dir = TempDir::new()?;
        let table = write_table(&temp_dir, &standard_rows());
        std::fs::remove_file(temp_dir.path().join("LIVER_WCE_1.bam.bai"))?;
        let registry = Registry::load(&table, &TableColumns::default())?;
        let report = registry.validate();
        assert!(matches!(
            report.problems(),
            [Problem::MissingIndex { sample, .. }] if sample == "LIVER_WCE_1"
        ));

        // sample.bai is accepted too
        temp_dir.child("LIVER_WCE_1.bai").write_str("bai")?;
        assert!(registry.validate().is_ok());
        Ok(())
    }

    #[test]
    fn test_malformed() {
        let columns = TableColumns::default();

        let no_column = "NAME\tFILE_PATH\nA\ta.bam\n";
        let err = Registry::parse(no_column.as_bytes(), "t", ".", &columns).unwrap_err();
        assert!(err.to_string().contains("BACKGROUND"));

        let no_name = "NAME\tFILE_PATH\tBACKGROUND\n\ta.bam\tNONE\n";
        let err = Registry::parse(no_name.as_bytes(), "t", ".", &columns).unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let short_row = "NAME\tFILE_PATH\tBACKGROUND\nA\n";
        let err = Registry::parse(short_row.as_bytes(), "t", ".", &columns).unwrap_err();
        assert!(err.to_string().contains("FILE_PATH"));

        let duplicate = "NAME\tFILE_PATH\tBACKGROUND\nA\ta.bam\tNONE\nA\tb.bam\tNONE\n";
        let err = Registry::parse(duplicate.as_bytes(), "t", ".", &columns).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedTable { .. }));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_custom_columns() -> eyre::Result<()> {
        let columns = TableColumns {
            name: "sample".to_string(),
            file: "bam".to_string(),
            background: "control".to_string(),
            stages: vec![("enrich".to_string(), "peaks".to_string())],
        };
        let table = "sample\tbam\tcontrol\tpeaks\nA\t/data/a.bam\tB\ta.bed\nB\t/data/b.bam\t\t\n";
        let registry = Registry::parse(table.as_bytes(), "t", "/elsewhere", &columns)?;
        let a = registry.get("A").unwrap();
        assert_eq!(a.file_path(), Path::new("/data/a.bam"));
        assert_eq!(a.stage_output("enrich"), Some("a.bed"));
        assert_eq!(registry.background_of("A")?.map(Sample::name), Some("B"));
        assert!(registry.background_of("B")?.is_none());
        Ok(())
    }

    #[test]
    fn test_record_and_write() -> eyre::Result<()> {
        let temp_dir = TempDir::new()?;
        let table = write_table(&temp_dir, &standard_rows());
        let mut registry = Registry::load(&table, &TableColumns::default())?;
        registry.record_stage_output("LIVER_H3K27AC_2", ENRICH_STAGE, "LIVER_H3K27AC_2_peaks.bed")?;
        assert!(registry
            .record_stage_output("NOT_A_SAMPLE", ENRICH_STAGE, "x")
            .is_err());

        let rewritten = temp_dir.child("rewritten.txt");
        registry.write(&rewritten)?;
        let reloaded = Registry::open(&rewritten, &TableColumns::default())?;
        assert_eq!(
            reloaded
                .get("LIVER_H3K27AC_2")
                .unwrap()
                .stage_output(ENRICH_STAGE),
            Some("LIVER_H3K27AC_2_peaks.bed")
        );
        let contents = std::fs::read_to_string(rewritten.path())?;
        assert!(contents.starts_with(HEADER));
        assert!(contents.contains("LIVER_WCE_1_id\tmm10\tLIVER_WCE_1\tNONE\tNONE\tNONE\t0,0,0"));
        Ok(())
    }

    #[test]
    fn test_write_appends_stage_column() -> eyre::Result<()> {
        let temp_dir = TempDir::new()?;
        let table = "NAME\tFILE_PATH\tBACKGROUND\nA\ta.bam\tNONE\n";
        let mut registry =
            Registry::parse(table.as_bytes(), "t", temp_dir.path(), &TableColumns::default())?;
        registry.record_stage_output("A", ENRICH_STAGE, "A_peaks.bed")?;
        let output = temp_dir.child("out.txt");
        registry.write(&output)?;
        output.assert("NAME\tFILE_PATH\tBACKGROUND\tENRICHED_MACS\nA\ta.bam\tNONE\tA_peaks.bed\n");
        Ok(())
    }

    #[test]
    fn test_write_in_place_keeps_comments() -> eyre::Result<()> {
        let temp_dir = TempDir::new()?;
        temp_dir.child("a.bam").write_str("bam")?;
        temp_dir.child("b.bam").write_str("bam")?;
        let table = temp_dir.child("liver.txt");
        table.write_str(
            "# mouse liver, batch 3\nNAME\tFILE_PATH\tBACKGROUND\n\
             A\ta.bam\tB\n# B is the input\nB\tb.bam\tNONE\n",
        )?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(table.path(), fs::Permissions::from_mode(0o640))?;
        }

        let mut registry = Registry::load(table.path(), &TableColumns::default())?;
        registry.record_stage_output("A", ENRICH_STAGE, "A_peaks.bed")?;
        registry.write(table.path())?;

        table.assert(
            "# mouse liver, batch 3\n# B is the input\nNAME\tFILE_PATH\tBACKGROUND\tENRICHED_MACS\n\
             A\ta.bam\tB\tA_peaks.bed\nB\tb.bam\tNONE\tNONE\n",
        );
        let reloaded = Registry::load(table.path(), &TableColumns::default())?;
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.get("A").unwrap().stage_output(ENRICH_STAGE),
            Some("A_peaks.bed")
        );

        // Nothing left behind besides the table and its data files
        let mut entries: Vec<String> = fs::read_dir(temp_dir.path())?
            .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<std::io::Result<_>>()?;
        entries.sort();
        assert_eq!(entries, vec!["a.bam", "b.bam", "liver.txt"]);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(table.path())?.permissions().mode();
            assert_eq!(mode & 0o777, 0o640);
        }
        Ok(())
    }

    #[test]
    fn test_write_failure_keeps_table() -> eyre::Result<()> {
        let temp_dir = TempDir::new()?;
        let table = write_table(&temp_dir, &standard_rows());
        let before = fs::read_to_string(&table)?;
        let registry = Registry::load(&table, &TableColumns::default())?;

        // The target directory is gone so no temporary file can be created
        let err = registry
            .write(temp_dir.path().join("missing_dir/data_table.txt"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
        assert_eq!(fs::read_to_string(&table)?, before);
        Ok(())
    }

    #[test]
    fn test_relative_paths_resolved() -> eyre::Result<()> {
        let table = "NAME\tFILE_PATH\tBACKGROUND\nA\tdata/a.bam\tNONE\nB\t/abs/b.bam\tNONE\n";
        let registry =
            Registry::parse(table.as_bytes(), "t", "/home/lab/run", &TableColumns::default())?;
        assert_eq!(
            registry.get("A").unwrap().file_path(),
            Path::new("/home/lab/run/data/a.bam")
        );
        assert_eq!(registry.get("B").unwrap().file_path(), Path::new("/abs/b.bam"));
        Ok(())
    }
}
