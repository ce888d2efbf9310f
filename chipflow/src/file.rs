use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use clap::{builder::PathBufValueParser, error::ErrorKind};

/// Path checked to exist when the command line is parsed.
#[derive(Clone, Debug)]
pub struct ValidPathBuf(pub PathBuf);

impl ValidPathBuf {
    pub fn into_inner(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for ValidPathBuf {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl clap::builder::ValueParserFactory for ValidPathBuf {
    type Parser = ValidPathBufParser;
    fn value_parser() -> Self::Parser {
        ValidPathBufParser
    }
}

#[derive(Clone)]
pub struct ValidPathBufParser;

impl clap::builder::TypedValueParser for ValidPathBufParser {
    type Value = ValidPathBuf;

    fn parse_ref(
        &self,
        cmd: &clap::Command,
        arg: Option<&clap::Arg>,
        value: &OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let val = PathBufValueParser::new().parse_ref(cmd, arg, value)?;
        if val.exists() {
            return Ok(ValidPathBuf(val));
        }
        let flag = arg
            .and_then(|a| a.get_long())
            .map(|l| format!(" for --{l}"))
            .unwrap_or_default();
        Err(clap::Error::raw(
            ErrorKind::ValueValidation,
            format!("Path {value:?}{flag} does not exist\n"),
        )
        .with_cmd(cmd))
    }
}
