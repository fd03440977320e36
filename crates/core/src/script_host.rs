// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script host registry: maps entry-script names to interpreter command lines.

use serde::Serialize;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Name of the preferred entry script, without extension.
const RUN_STEM: &str = "run";

/// Program used to launch a job's entry script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostProgram {
    /// The entry script is itself executable
    Direct,
    /// The entry script is passed to an interpreter
    Interpreter(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptHost {
    pub name: String,
    /// Lowercase extensions including the leading dot
    pub extensions: Vec<String>,
    /// Literal file names accepted regardless of extension
    pub file_names: Vec<String>,
    pub program: HostProgram,
    /// Interpreter arguments; `{script}` is replaced with the entry script name
    pub args_format: Vec<String>,
}

impl ScriptHost {
    pub fn interpreter(name: &str, program: &str, extensions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
            file_names: Vec::new(),
            program: HostProgram::Interpreter(PathBuf::from(program)),
            args_format: vec!["{script}".to_string()],
        }
    }

    pub fn with_args_format(mut self, args: &[&str]) -> Self {
        self.args_format = args.iter().map(|a| a.to_string()).collect();
        self
    }

    fn native() -> Self {
        Self {
            name: "native".to_string(),
            extensions: Vec::new(),
            file_names: vec![RUN_STEM.to_string()],
            program: HostProgram::Direct,
            args_format: Vec::new(),
        }
    }

    /// Build the program and argument list for `script`.
    ///
    /// Invocation arguments are split on whitespace and appended after the
    /// host's own arguments.
    pub fn command_line(&self, script: &Path, args: Option<&str>) -> (PathBuf, Vec<OsString>) {
        let script_name = script.file_name().map(OsString::from).unwrap_or_default();
        let (program, mut argv) = match &self.program {
            HostProgram::Direct => (script.to_path_buf(), Vec::new()),
            HostProgram::Interpreter(program) => {
                let argv = self
                    .args_format
                    .iter()
                    .map(|arg| match arg.as_str() {
                        "{script}" => script_name.clone(),
                        other => OsString::from(other),
                    })
                    .collect();
                (program.clone(), argv)
            }
        };
        if let Some(args) = args {
            argv.extend(args.split_whitespace().map(OsString::from));
        }
        (program, argv)
    }

    /// Whether this host can launch scripts here. Interpreters given by bare
    /// name are looked up in `search_path`.
    pub fn is_available(&self, search_path: Option<&OsStr>) -> bool {
        match &self.program {
            HostProgram::Direct => true,
            HostProgram::Interpreter(program) => find_program(program, search_path).is_some(),
        }
    }

    fn accepts_extension(&self, file_name: &str) -> Option<&str> {
        let lower = file_name.to_ascii_lowercase();
        self.extensions.iter().find(|ext| lower.ends_with(ext.as_str())).map(|ext| ext.as_str())
    }

    fn accepts_literal(&self, file_name: &str) -> bool {
        self.file_names.iter().any(|name| name.eq_ignore_ascii_case(file_name))
    }
}

fn find_program(program: &Path, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    std::env::split_paths(search_path?).map(|dir| dir.join(program)).find(|candidate| candidate.is_file())
}

/// Entry script chosen for a job directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScript {
    pub path: PathBuf,
    pub host: ScriptHost,
}

/// Ordered list of script hosts; earlier hosts take priority.
#[derive(Debug, Clone)]
pub struct ScriptHostRegistry {
    hosts: Vec<ScriptHost>,
}

impl Default for ScriptHostRegistry {
    fn default() -> Self {
        Self::new(vec![
            ScriptHost::native(),
            ScriptHost::interpreter("shell", "bash", &[".sh"]),
            ScriptHost::interpreter("powershell", "pwsh", &[".ps1"])
                .with_args_format(&["-ExecutionPolicy", "RemoteSigned", "-File", "{script}"]),
            ScriptHost::interpreter("python", "python3", &[".py"]).with_args_format(&["-u", "{script}"]),
            ScriptHost::interpreter("php", "php", &[".php"]),
            ScriptHost::interpreter("node", "node", &[".js"]),
            ScriptHost::interpreter("dotnet", "dotnet", &[".dll"]),
        ])
    }
}

impl ScriptHostRegistry {
    pub fn new(hosts: Vec<ScriptHost>) -> Self {
        Self { hosts }
    }

    /// The default hosts whose interpreters are installed on this machine.
    pub fn detect() -> Self {
        Self::default().available_on(std::env::var_os("PATH").as_deref())
    }

    /// Drop hosts that cannot run here, so their scripts are never resolved.
    pub fn available_on(self, search_path: Option<&OsStr>) -> Self {
        let (hosts, missing): (Vec<_>, Vec<_>) =
            self.hosts.into_iter().partition(|host| host.is_available(search_path));
        for host in &missing {
            tracing::debug!(host = %host.name, "script host not installed, skipping");
        }
        Self { hosts }
    }

    pub fn hosts(&self) -> &[ScriptHost] {
        &self.hosts
    }

    /// Pick the entry script among `files`.
    ///
    /// Hosts are tried in priority order. A `run.<ext>` file for any host is
    /// returned as soon as it is found; otherwise the first file accepted by
    /// the highest-priority host is used.
    pub fn resolve(&self, files: &[PathBuf]) -> Option<ResolvedScript> {
        let mut fallback: Option<ResolvedScript> = None;
        for host in &self.hosts {
            for file in files {
                let Some(file_name) = file.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if let Some(ext) = host.accepts_extension(file_name) {
                    let stem = &file_name[..file_name.len() - ext.len()];
                    if stem.eq_ignore_ascii_case(RUN_STEM) {
                        return Some(ResolvedScript { path: file.clone(), host: host.clone() });
                    }
                } else if !host.accepts_literal(file_name) {
                    continue;
                }
                if fallback.is_none() {
                    fallback = Some(ResolvedScript { path: file.clone(), host: host.clone() });
                }
            }
        }
        fallback
    }
}

#[cfg(test)]
#[path = "script_host_tests.rs"]
mod tests;
