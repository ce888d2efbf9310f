//! Per-sample peak calling, the enrichment stage.
//!
//! Every selected sample gets one peak caller call in a single script. The
//! caller runs inside the MACS folder, then its `<name>_peaks.bed` is copied to
//! the enriched regions folder and that file name is recorded as the sample's
//! enrichment output. The script stops at the first failing command, so a
//! failed sample surfaces as the script's exit status.

use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::{
    assemble::GeneratedInvocation,
    config::PipelineConfig,
    error::{PipelineError, Result},
    gate,
    table::{Registry, ENRICH_STAGE},
    utils::shell_quote,
};

/// First line of the peak calling script, any failing command ends the script.
pub const STRICT_MODE: &str = "set -eu";

pub fn enriched_file_name(sample: &str) -> String {
    format!("{sample}_peaks.bed")
}

pub fn peak_script_path(config: &PipelineConfig, analysis_name: &str) -> PathBuf {
    config
        .folders()
        .macs()
        .join(format!("{analysis_name}_macs.sh"))
}

fn quote_path(path: &Path) -> String {
    shell_quote(&path.display().to_string()).into_owned()
}

#[derive(Debug, Clone)]
pub struct PeakCallPlan {
    analysis_name: String,
    invocation: Option<GeneratedInvocation>,
    planned: Vec<String>,
    done: Vec<String>,
    enriched_dir: PathBuf,
}

impl PeakCallPlan {
    /// Script to run, `None` if every sample already has its peaks.
    pub fn invocation(&self) -> Option<&GeneratedInvocation> {
        self.invocation.as_ref()
    }

    /// Samples the script will call peaks for.
    pub fn planned(&self) -> &[String] {
        &self.planned
    }

    /// Samples whose enriched regions were already on disk.
    pub fn done(&self) -> &[String] {
        &self.done
    }

    /// Records the enriched region file of every sample whose file now
    /// exists. Returns the samples still missing one.
    pub fn record(&self, registry: &mut Registry) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for name in self.done.iter().chain(self.planned.iter()) {
            let file_name = enriched_file_name(name);
            if gate::is_complete(self.enriched_dir.join(&file_name), 0)? {
                registry.record_stage_output(name, ENRICH_STAGE, file_name)?;
            } else {
                log::warn!(
                    "{}: no enriched regions found for {name}",
                    self.analysis_name
                );
                missing.push(name.clone());
            }
        }
        Ok(missing)
    }
}

/// Plans peak calls for `names`, leaving out samples whose enriched region
/// file already exists.
pub fn assemble_peak_calls(
    registry: &Registry,
    names: &[String],
    config: &PipelineConfig,
    analysis_name: &str,
) -> Result<PeakCallPlan> {
    if names.is_empty() {
        return Err(PipelineError::EmptyGroup {
            analysis: analysis_name.to_string(),
        });
    }

    let folders = config.folders();
    let mut planned = Vec::new();
    let mut done = Vec::new();
    let mut lines = vec![STRICT_MODE.to_string()];
    for name in names {
        let sample = registry.get(name).ok_or_else(|| {
            PipelineError::malformed(
                registry.source(),
                format!("analysis {analysis_name} uses unknown sample {name}"),
            )
        })?;
        let enriched = folders.macs_enriched().join(enriched_file_name(name));
        if gate::is_complete(&enriched, 0)? {
            log::info!("{name}: enriched regions exist, skipping peak calling");
            done.push(name.clone());
            continue;
        }

        let mut args = vec![
            quote_path(config.peak_caller_path()),
            "-t".to_string(),
            quote_path(sample.file_path()),
        ];
        if config.background() {
            if let Some(control) = registry.background_of(name)? {
                args.push("-c".to_string());
                args.push(quote_path(control.file_path()));
            }
        }
        args.extend([
            "-f".to_string(),
            "BAM".to_string(),
            "-g".to_string(),
            config.genome().genome_size().to_string(),
            "-n".to_string(),
            shell_quote(name).into_owned(),
            "-p".to_string(),
            config.peak_p_value_str().to_string(),
            "-w".to_string(),
            "-S".to_string(),
            "--space=50".to_string(),
        ]);
        lines.push(args.join(" "));

        let wiggle = format!("{name}_MACS_wiggle");
        lines.push(format!(
            "if [ -d {0} ]; then rm -rf {1}; mv {0} {2}/; fi",
            shell_quote(&wiggle),
            quote_path(&folders.wiggles().join(&wiggle)),
            quote_path(folders.wiggles()),
        ));
        lines.push(format!(
            "cp {} {}",
            shell_quote(&enriched_file_name(name)),
            quote_path(&enriched)
        ));
        planned.push(name.clone());
    }

    let invocation = planned.last().map(|last| {
        GeneratedInvocation::new(
            lines.iter().join("\n"),
            folders.macs().to_path_buf(),
            peak_script_path(config, analysis_name),
            folders.macs_enriched().join(enriched_file_name(last)),
        )
    });
    log::info!(
        "{analysis_name}: {} samples need peaks, {} already done",
        planned.len(),
        done.len()
    );
    Ok(PeakCallPlan {
        analysis_name: analysis_name.to_string(),
        invocation,
        planned,
        done,
        enriched_dir: folders.macs_enriched().to_path_buf(),
    })
}
