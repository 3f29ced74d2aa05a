//! Aux file processing.
//!
//! LaTeX writes requests for repository files, argument files and command
//! output into the aux file. Each request is resolved through the
//! [`Store`], and the answers are appended to the aux file as macro
//! definitions that the next LaTeX pass picks up.

use std::collections::HashSet;
use std::convert::TryFrom;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use crate::store::{Limits, Store};

pub use error::Error;
pub use request::{Command, Kind, Request};

#[derive(Clone, Debug)]
pub struct Config {
    pub repo_dir: PathBuf,
    pub limits:   Limits,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Summary {
    pub resolved: usize,
    pub deleted:  usize,
    pub appended: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo_dir: PathBuf::from(REPO_DIR),
            limits:   Limits::default(),
        }
    }
}

pub async fn process(aux: &Path, config: &Config) -> Result<Summary> {
    let aux  = locate(aux)?;
    let text = fs::read_to_string(&aux).with_context(|| {
        format!("failed to read {}", aux.display())
    })?;

    if text.trim().is_empty() {
        info!("{} is empty, nothing to do", aux.display());
        return Ok(Summary::default());
    }

    let base = match aux.parent() {
        Some(dir) if dir.as_os_str().is_empty() => Path::new(".").canonicalize()?,
        Some(dir)                               => dir.canonicalize()?,
        None                                    => return Err(anyhow!("no directory for {}", aux.display())),
    };

    let mut lines    = Vec::new();
    let mut commands = Vec::new();
    let mut deleted  = 0;

    for (index, line) in text.lines().enumerate() {
        if line.trim().starts_with(request::NEEDS_PASS) {
            deleted += 1;
            continue;
        }

        let context = || format!("{}:{}", aux.display(), index + 1);
        if let Some(request) = Request::parse(line).with_context(context)? {
            commands.push(Command::try_from(request).with_context(context)?);
        }

        lines.push(line.to_owned());
    }

    debug!("{} has {} requests and {} markers", aux.display(), commands.len(), deleted);

    let resolved = commands.len();

    let mut store = None;
    let result    = respond(commands, &base, config, &mut store).await;
    let closed    = store.map(|mut store| store.close()).transpose();
    let responses = result?;
    closed?;

    if responses.is_empty() && deleted == 0 {
        info!("{} needs no changes", aux.display());
        return Ok(Summary { resolved, deleted, appended: 0 });
    }

    let mut seen = lines.iter().map(|line| line.trim().to_owned()).collect::<HashSet<_>>();
    let mut appended = 0;

    for response in responses {
        if seen.insert(response.clone()) {
            lines.push(response);
            appended += 1;
        }
    }

    let mut text = lines.join("\n");
    text.push('\n');

    fs::write(&aux, text).with_context(|| {
        format!("failed to write {}", aux.display())
    })?;

    let summary = Summary { resolved, deleted, appended };

    info!("{}: {} requests, {} markers deleted, {} definitions added", aux.display(), resolved, deleted, appended);

    Ok(summary)
}

fn locate(aux: &Path) -> Result<PathBuf> {
    if aux.is_file() {
        return Ok(aux.to_owned());
    }

    let mut name = aux.as_os_str().to_owned();
    name.push(".aux");
    let alternative = PathBuf::from(name);

    match alternative.is_file() {
        true  => Ok(alternative),
        false => Err(anyhow!("aux file {} not found", aux.display())),
    }
}

async fn respond(commands: Vec<Command>, base: &Path, config: &Config, store: &mut Option<Store>) -> Result<Vec<String>> {
    let mut lines = Vec::new();

    for command in commands {
        if store.is_none() {
            let dir = base.join(&config.repo_dir);
            info!("using store {}", dir.display());
            *store = Some(Store::open(&dir, config.limits).await?);
        }

        if let Some(store) = store.as_mut() {
            let name = command.name().to_owned();
            let more = resolve(store, command, base).await.with_context(|| {
                format!("failed to resolve request {}", name)
            })?;
            lines.extend(more);
        }
    }

    Ok(lines)
}

async fn resolve(store: &mut Store, command: Command, base: &Path) -> Result<Vec<String>> {
    Ok(match command {
        Command::GitFile { name, repo, path, command } => {
            let file = store.git_file(&repo, &path, &name, command.as_deref()).await?;
            debug!("{}: {} from {}", name, file.path.display(), file.repo.name());
            let mut lines = response::path(&name, &file.path, base, Some(&file.basename));
            lines.push(response::url(&name, &file.url));
            lines
        },
        Command::ArgFile { name, prefix, suffix } => {
            let (path, _) = store.argument_file(&name, prefix.as_deref(), suffix.as_deref())?;
            let basename  = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            debug!("{}: argument file {}", name, path.display());
            response::path(&name, &path, base, Some(&basename))
        },
        Command::Process { name, repo, dir, command } => {
            let path = store.output(&name, &command, repo.as_deref(), dir.as_deref()).await?;
            debug!("{}: output in {}", name, path.display());
            response::path(&name, &path, base, None)
        },
    })
}

const REPO_DIR: &str = "__git__";

mod error;
mod request;
mod response;

#[cfg(test)]
mod test;
