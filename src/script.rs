use std::{
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::{
    assemble::GeneratedInvocation,
    error::{PipelineError, Result},
    utils::shell_quote,
};

pub const SHEBANG: &str = "#!/usr/bin/env bash";

fn render<W: Write>(writer: &mut W, invocation: &GeneratedInvocation) -> std::io::Result<()> {
    writeln!(writer, "{SHEBANG}")?;
    writeln!(writer)?;
    writeln!(
        writer,
        "cd {}",
        shell_quote(&invocation.working_dir().display().to_string())
    )?;
    writeln!(writer, "{}", invocation.command_line())?;
    Ok(())
}

#[cfg(unix)]
fn make_executable(file: &NamedTempFile) -> std::io::Result<()> {
    use std::{fs::Permissions, os::unix::fs::PermissionsExt};
    file.as_file().set_permissions(Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_file: &NamedTempFile) -> std::io::Result<()> {
    Ok(())
}

/// Writes `invocation` as a standalone bash script at its script path,
/// replacing whatever was there.
///
/// The script is written next to its destination and renamed into place once
/// complete, readers see either the old script or the whole new one. On error
/// the partial file is removed.
pub fn emit(invocation: &GeneratedInvocation) -> Result<PathBuf> {
    let script_path = invocation.script_path();
    let dir = script_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let io_err = |e: std::io::Error| PipelineError::io(script_path, e);

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        render(&mut writer, invocation).map_err(io_err)?;
        writer.flush().map_err(io_err)?;
    }
    tmp.as_file().sync_all().map_err(io_err)?;
    make_executable(&tmp).map_err(io_err)?;
    tmp.persist(script_path).map_err(|e| io_err(e.error))?;

    log::info!("Wrote script {}", script_path.display());
    Ok(script_path.to_path_buf())
}
