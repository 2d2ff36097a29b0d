//! Immutable description of one test invocation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building a [`CommandSpec`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("command must contain at least one token")]
    Empty,
    #[error("command program token must not be empty")]
    EmptyProgram,
}

/// An argv-style command plus the knobs that govern how it is executed.
///
/// The token list is taken by value at construction, so the caller's list is
/// never aliased. Every builder method returns a new value; overlays derive
/// their commands from a base spec instead of mutating it.
///
/// A pre-joined command string is rejected at compile time because `&str` is
/// not an iterator of tokens:
///
/// ```compile_fail
/// use exectest::CommandSpec;
///
/// let spec = CommandSpec::new("sleep 60");
/// ```
///
/// ```
/// use exectest::CommandSpec;
///
/// let spec = CommandSpec::new(["sleep", "60"]).unwrap();
/// assert_eq!(spec.argv(), ["sleep", "60"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    argv: Vec<String>,
    timeout: Option<Duration>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Build a spec from an ordered list of tokens, with no timeout.
    pub fn new<I, S>(tokens: I) -> Result<Self, SpecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = tokens.into_iter().map(Into::into).collect();
        match argv.first() {
            None => Err(SpecError::Empty),
            Some(program) if program.is_empty() => Err(SpecError::EmptyProgram),
            Some(_) => Ok(Self {
                argv,
                timeout: None,
                env: BTreeMap::new(),
                cwd: None,
            }),
        }
    }

    /// Set the wall-clock deadline for the child process.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Remove any deadline.
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Add an environment override applied on top of the inherited environment.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Run the child in the given working directory.
    pub fn with_cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// New spec with `tokens` placed ahead of the current command.
    ///
    /// Timeout, environment and working directory carry over.
    pub fn with_prefix<I, S>(&self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv: Vec<String> = tokens.into_iter().map(Into::into).collect();
        argv.extend(self.argv.iter().cloned());
        Self {
            argv,
            ..self.clone()
        }
    }

    /// The effective command, program first.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Shell-quoted rendering, suitable for logs and copy-paste reproduction.
    pub fn display(&self) -> String {
        self.argv
            .iter()
            .map(|token| shell_escape::escape(token.as_str().into()).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Environment overrides rendered as `KEY=value` pairs.
    pub fn display_env(&self) -> String {
        self.env
            .iter()
            .map(|(key, value)| {
                format!("{key}={}", shell_escape::escape(value.as_str().into()))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
