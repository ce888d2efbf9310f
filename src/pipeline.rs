//! Drives one analysis through assembly, script emission, the completion gate
//! and dispatch, and chains the two stages for a full run.

use std::{fmt, path::Path};

use crate::{
    assemble::{assemble, GeneratedInvocation, LandscapeTemplate},
    config::PipelineConfig,
    dispatch::Dispatch,
    error::{PipelineError, Result},
    gate,
    peaks::{assemble_peak_calls, enriched_file_name},
    script,
    select::{select_pattern, AnalysisGroup, AnalysisParameters, NamePattern},
    table::Registry,
    utils::wrap_cmd,
};

/// Where an analysis is in its run. `Skipped`, `Succeeded` and `Failed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Selected,
    Assembled,
    Emitted,
    Skipped,
    Dispatched,
    Succeeded,
    Failed,
}

impl GroupState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GroupState::Skipped | GroupState::Succeeded | GroupState::Failed
        )
    }

    fn can_move_to(self, next: GroupState) -> bool {
        use GroupState::*;
        matches!(
            (self, next),
            (Selected, Assembled)
                | (Assembled, Emitted)
                | (Emitted, Skipped)
                | (Emitted, Dispatched)
                | (Dispatched, Succeeded)
                | (Dispatched, Failed)
        )
    }
}

impl fmt::Display for GroupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GroupState::Selected => "selected",
            GroupState::Assembled => "assembled",
            GroupState::Emitted => "emitted",
            GroupState::Skipped => "skipped",
            GroupState::Dispatched => "dispatched",
            GroupState::Succeeded => "succeeded",
            GroupState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

struct GroupRun<'a> {
    analysis: &'a str,
    state: GroupState,
}

impl<'a> GroupRun<'a> {
    fn new(analysis: &'a str) -> Self {
        log::info!("{analysis}: {}", GroupState::Selected);
        Self {
            analysis,
            state: GroupState::Selected,
        }
    }

    fn advance(&mut self, next: GroupState) {
        debug_assert!(
            self.state.can_move_to(next),
            "{} cannot move from {} to {next}",
            self.analysis,
            self.state
        );
        log::info!("{}: {} -> {next}", self.analysis, self.state);
        self.state = next;
    }
}

/// Emits the script, then runs it unless `min_rows` worth of expected output
/// is already on disk.
fn emit_and_dispatch<D>(
    run: &mut GroupRun,
    invocation: &GeneratedInvocation,
    min_rows: usize,
    dispatcher: &D,
) -> Result<GroupState>
where
    D: Dispatch + ?Sized,
{
    let script = script::emit(invocation)?;
    run.advance(GroupState::Emitted);

    let expected = invocation.expected_output_path();
    if gate::is_complete(expected, min_rows)? {
        log::info!(
            "{}: found {}, not running again",
            run.analysis,
            expected.display()
        );
        run.advance(GroupState::Skipped);
        return Ok(run.state);
    }

    run.advance(GroupState::Dispatched);
    let msg = format!("{}: {}", run.analysis, script.display());
    match wrap_cmd(&msg, || dispatcher.run(&script)) {
        Ok(_) => {
            run.advance(GroupState::Succeeded);
            if !expected.is_file() {
                log::warn!(
                    "{}: script succeeded but {} is missing",
                    run.analysis,
                    expected.display()
                );
            }
            Ok(run.state)
        }
        Err(e) => {
            run.advance(GroupState::Failed);
            log::error!("{}: {e}", run.analysis);
            Err(e)
        }
    }
}

/// Runs the landscape stage for one group, from assembly to a terminal state.
pub fn run_landscape<D>(
    group: &AnalysisGroup,
    registry: &Registry,
    template: &LandscapeTemplate,
    min_rows: usize,
    dispatcher: &D,
) -> Result<GroupState>
where
    D: Dispatch + ?Sized,
{
    let mut run = GroupRun::new(group.analysis_name());
    let invocation = assemble(group, registry, template)?;
    run.advance(GroupState::Assembled);
    emit_and_dispatch(&mut run, &invocation, min_rows, dispatcher)
}

/// Runs the peak calling stage for `names` and records the enriched region
/// file of every sample that has one afterwards. A sample still without one
/// fails the stage, even if the script exited cleanly.
pub fn run_peak_calls<D>(
    registry: &mut Registry,
    names: &[String],
    config: &PipelineConfig,
    analysis_name: &str,
    dispatcher: &D,
) -> Result<GroupState>
where
    D: Dispatch + ?Sized,
{
    let stage_name = format!("{analysis_name}_MACS");
    let mut run = GroupRun::new(&stage_name);
    let plan = assemble_peak_calls(registry, names, config, analysis_name)?;
    run.advance(GroupState::Assembled);

    let state = match plan.invocation() {
        Some(invocation) => emit_and_dispatch(&mut run, invocation, 0, dispatcher)?,
        None => {
            log::info!("{stage_name}: every sample already has peaks, no script written");
            GroupState::Skipped
        }
    };

    let missing = plan.record(registry)?;
    if let Some(sample) = missing.first() {
        log::error!("{stage_name}: still missing peaks for {missing:?}");
        return Err(PipelineError::MissingArtifact {
            sample: sample.clone(),
            path: config.folders().macs_enriched().join(enriched_file_name(sample)),
        });
    }
    Ok(state)
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub analysis_name: String,
    pub pattern: NamePattern,
    pub min_rows: usize,
    pub update_table: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub peaks: GroupState,
    pub landscape: GroupState,
}

/// Full run: load and check the table, call peaks for the selected samples,
/// then build their enhancer landscape.
pub fn run<D>(
    config: &PipelineConfig,
    table: &Path,
    options: &RunOptions,
    dispatcher: &D,
) -> Result<RunSummary>
where
    D: Dispatch + ?Sized,
{
    let mut registry = Registry::load(table, config.table_columns())?;
    let report = registry.validate();
    for problem in report.problems() {
        log::warn!("{problem}");
    }
    config.folders().create_all()?;

    let names = select_pattern(&registry, &options.pattern);
    if names.is_empty() {
        return Err(PipelineError::EmptyGroup {
            analysis: options.analysis_name.clone(),
        });
    }
    for name in names.iter() {
        if let Some(sample) = registry.get(name) {
            log::info!("Using {sample:?}");
        }
    }

    let peaks = run_peak_calls(
        &mut registry,
        &names,
        config,
        &options.analysis_name,
        dispatcher,
    )?;
    if options.update_table {
        registry.write(table)?;
    }

    let group = AnalysisGroup::new(
        options.analysis_name.clone(),
        names,
        AnalysisParameters::from_config(config),
    );
    let template = LandscapeTemplate::from_config(config);
    let landscape = run_landscape(&group, &registry, &template, options.min_rows, dispatcher)?;
    Ok(RunSummary { peaks, landscape })
}
