//! Sample-table driven ChIP-seq pipeline: per-sample peak calling followed by
//! a grouped enhancer landscape run.
//!
//! Each external tool call is written to a bash script before it runs, so any
//! step can be rerun by hand, and is skipped when its expected output already
//! exists.

pub mod assemble;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod peaks;
pub mod pipeline;
pub mod script;
pub mod select;
pub mod table;
pub mod utils;

pub use assemble::{assemble, GeneratedInvocation, LandscapeTemplate};
pub use config::{GenomeBuild, PipelineConfig};
pub use dispatch::{Dispatch, ShellDispatcher};
pub use error::PipelineError;
pub use gate::is_complete;
pub use script::emit;
pub use select::{select, AnalysisGroup, AnalysisParameters, NamePattern};
pub use table::{Registry, Sample, TableColumns, ValidationReport};
