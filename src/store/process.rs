use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use crate::exec;
use super::{replace_base_path, GitPath, Limits, Repos};

/// Runs commands and keeps their output, on top of [`Repos`].
#[derive(Debug)]
pub struct Store {
    repos: Repos,
}

impl Store {
    pub async fn open(base: &Path, limits: Limits) -> Result<Self> {
        let repos = Repos::open(base, limits).await?;
        Ok(Self { repos })
    }

    pub fn argument_file(&mut self, name: &str, prefix: Option<&str>, suffix: Option<&str>) -> Result<(PathBuf, bool)> {
        let prefix = prefix.map(str::trim).filter(|s| !s.is_empty());
        let suffix = suffix.map(str::trim).filter(|s| !s.is_empty());
        self.repos.files().file(ARGS, name, prefix, suffix)
    }

    /// Map `(?name?)` to the path of an argument file; drop blank arguments.
    pub fn filter_argument(&mut self, arg: &str) -> Result<Option<String>> {
        let arg = arg.trim();

        if arg.is_empty() {
            return Ok(None);
        }

        match arg.strip_prefix("(?").and_then(|arg| arg.strip_suffix("?)")) {
            Some(name) if name.trim().is_empty() => Err(anyhow!("invalid argument file in {}", arg)),
            Some(name) => {
                let (path, _) = self.argument_file(name.trim(), None, None)?;
                Ok(Some(path.to_string_lossy().into_owned()))
            },
            None => Ok(Some(arg.to_owned())),
        }
    }

    /// Output of `command`, run once and cached under `name`.
    pub async fn output(&mut self, name: &str, command: &[String], repo: Option<&str>, dir: Option<&str>) -> Result<PathBuf> {
        let repo = repo.map(str::trim).filter(|s| !s.is_empty());
        let dir  = dir.map(str::trim).filter(|s| !s.is_empty());

        let location = match (repo, dir) {
            (Some(repo), Some(dir)) => Some((repo, dir)),
            (None, None)            => None,
            _                       => return Err(anyhow!("repository and directory of {} must be given together", name)),
        };

        let (path, new) = self.repos.files().file(OUTPUT, name, None, None)?;
        if !new {
            debug!("output {} cached in {}", name, path.display());
            return Ok(path);
        }

        let result = match location {
            Some((repo, dir)) => match self.repos.git_dir(repo, dir).await {
                Ok(cwd) => self.execute(&path, command, Some(&cwd.path), None).await,
                Err(e)  => Err(e),
            },
            None => self.execute(&path, command, None, None).await,
        };

        self.settle(OUTPUT, name, result)?;

        Ok(path)
    }

    /// A file of a repository, piped through `command` when one is given.
    pub async fn git_file(&mut self, url: &str, path: &str, name: &str, command: Option<&[String]>) -> Result<GitPath> {
        let source  = self.repos.git_file(url, path).await?;
        let command = command.filter(|command| command.iter().any(|word| !word.trim().is_empty()));

        let command = match command {
            Some(command) => command,
            None          => return Ok(source),
        };

        let (path, new) = self.repos.files().file(POSTPROCESSED, name, None, None)?;
        if new {
            let input  = fs::read(&source.path)?;
            let result = self.execute(&path, command, None, Some(&input)).await;
            self.settle(POSTPROCESSED, name, result)?;
        }

        Ok(GitPath { path, ..source })
    }

    pub fn close(&mut self) -> Result<()> {
        self.repos.close()
    }

    async fn execute(&mut self, dest: &Path, command: &[String], dir: Option<&Path>, input: Option<&[u8]>) -> Result<()> {
        let mut words = command.iter().map(|word| word.trim()).filter(|word| !word.is_empty());

        let mut argv = match words.next() {
            Some(program) => vec![program.to_owned()],
            None          => return Err(anyhow!("invalid command {:?}", command)),
        };

        for word in words {
            if let Some(arg) = self.filter_argument(word)? {
                argv.push(arg);
            }
        }

        let expiry = self.repos.limits().exec;
        let output = exec::output(&argv, dir, input, expiry).await?;

        let mut sensitive = self.repos.sensitive();
        sensitive.push(dest.to_owned());
        sensitive.sort_by_key(|path| std::cmp::Reverse(path.as_os_str().len()));

        let output = sensitive.iter().try_fold(output, |text, path| {
            replace_base_path(&text, path)
        })?;

        let mut text = String::with_capacity(output.len());
        for line in output.trim_end().lines() {
            text.push_str(line.trim_end());
            text.push('\n');
        }

        fs::write(dest, &text).with_context(|| format!("failed to write {}", dest.display()))?;

        debug!("wrote {} bytes of {} to {}", text.len(), argv[0], dest.display());

        Ok(())
    }

    fn settle(&mut self, realm: &str, name: &str, result: Result<()>) -> Result<()> {
        if let Err(e) = result {
            warn!("discarding {} {} after failure", realm, name);
            self.repos.files().forget(realm, name)?;
            return Err(e);
        }
        Ok(())
    }
}

const ARGS:          &str = "args";
const OUTPUT:        &str = "output";
const POSTPROCESSED: &str = "postprocessed";
