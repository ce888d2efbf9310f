use std::{
    borrow::Cow,
    env, io,
    path::{Path, PathBuf},
    time::Duration,
};

use eyre::Context;
use indicatif::{ProgressBar, ProgressStyle};
use which::which;

pub fn find_binary(name: &'static str, binary_filepath: Option<&Path>) -> eyre::Result<PathBuf> {
    if let Some(p) = binary_filepath {
        Ok(p.to_path_buf())
    } else {
        which(name).wrap_err_with(|| format!("Error finding {name}"))
    }
}

/// Runs `f` behind a spinner, marking the spinner as failed if `f` fails.
pub fn wrap_cmd<F, T, E>(msg: &str, f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    let p = ProgressBar::new_spinner().with_message(msg.to_string());
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
        p.set_style(style);
    }
    p.enable_steady_tick(Duration::from_millis(100));

    let res = f();
    match res {
        Ok(_) => p.finish_with_message(format!("✅ \"{msg}\" complete")),
        Err(_) => p.finish_with_message(format!("❌ \"{msg}\" failed, check the log")),
    }
    res
}

/// Joins a relative `path` onto `base`, absolute paths are kept as is.
pub fn absolute_from<P: AsRef<Path>>(base: &Path, path: P) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Resolves `path` against the current directory. Generated scripts `cd`
/// before running, so every path written into them has to be absolute.
pub fn absolute<P: AsRef<Path>>(path: P) -> io::Result<PathBuf> {
    let path = path.as_ref();
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(env::current_dir()?.join(path))
}

/// A bare command name like `macs14`, left for the shell to find in $PATH.
pub fn is_bare_command(path: &Path) -> bool {
    !path.is_absolute() && path.components().count() == 1
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || "/._-,:=+@%".contains(c)
}

/// Quotes an argument for a POSIX shell if it contains anything other than
/// characters that are safe unquoted.
pub fn shell_quote(arg: &str) -> Cow<'_, str> {
    if !arg.is_empty() && arg.chars().all(is_shell_safe) {
        Cow::Borrowed(arg)
    } else {
        Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
    }
}
