use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Result};
use log::{debug, info};
use url::Url;
use super::files::{basename, Files, Kind};
use super::{resolve_inside, Limits, Repository};

/// A file or directory inside a cloned repository.
#[derive(Clone, Debug)]
pub struct GitPath {
    pub path:     PathBuf,
    pub basename: String,
    pub url:      String,
    pub repo:     Repository,
}

/// Clones repositories into the `git` realm, each at most once.
#[derive(Debug)]
pub struct Repos {
    files:  Files,
    repos:  HashMap<(String, String), Repository>,
    limits: Limits,
}

impl Repos {
    pub async fn open(base: &Path, limits: Limits) -> Result<Self> {
        let files     = Files::open(base)?;
        let mut repos = HashMap::new();

        for dir in files.list(REALM, false, true)? {
            if dir.join(".git").is_dir() {
                let repo = Repository::open(&dir, None, &limits).await?;
                debug!("found {} in {}", repo.name(), dir.display());
                repos.insert(key(&repo.url), repo);
            }
        }

        Ok(Self { files, repos, limits })
    }

    pub fn files(&mut self) -> &mut Files {
        &mut self.files
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub async fn repository(&mut self, url: &str) -> Result<Repository> {
        let url = Url::parse(url.trim())?;
        let id  = key(&url);

        if let Some(repo) = self.repos.get(&id) {
            return Ok(repo.clone());
        }

        let name = format!("{}_{}", id.0, id.1);
        let (dir, new) = self.files.dir(REALM, &name)?;

        let result = match new {
            false if dir.join(".git").is_dir() => Repository::open(&dir, Some(url.as_str()), &self.limits).await,
            false                              => match fs::remove_dir_all(&dir) {
                Ok(()) => Repository::download(url.as_str(), &dir, &self.limits).await,
                Err(e) => Err(e.into()),
            },
            true => Repository::download(url.as_str(), &dir, &self.limits).await,
        };

        let repo = match result {
            Ok(repo) => repo,
            Err(e)   => {
                self.files.forget(REALM, &name)?;
                return Err(e);
            }
        };

        info!("using {} at commit {} ({})", repo.name(), repo.commit, repo.date);

        self.repos.insert(key(&repo.url), repo.clone());
        self.repos.insert(id, repo.clone());

        Ok(repo)
    }

    pub async fn git_file(&mut self, url: &str, path: &str) -> Result<GitPath> {
        self.git_path(url, path, Kind::File).await
    }

    pub async fn git_dir(&mut self, url: &str, path: &str) -> Result<GitPath> {
        self.git_path(url, path, Kind::Dir).await
    }

    pub fn sensitive(&self) -> Vec<PathBuf> {
        let mut paths = self.files.sensitive();
        paths.extend(self.repos.values().map(|repo| repo.path.clone()));
        paths
    }

    pub fn close(&mut self) -> Result<()> {
        self.files.close()
    }

    async fn git_path(&mut self, url: &str, path: &str, kind: Kind) -> Result<GitPath> {
        let repo = self.repository(url).await?;
        let path = resolve_inside(&repo.path, path.trim())?;

        match kind {
            Kind::File if !path.is_file() => return Err(anyhow!("no file {} in {}", path.display(), repo.name())),
            Kind::Dir  if !path.is_dir()  => return Err(anyhow!("no directory {} in {}", path.display(), repo.name())),
            _                             => (),
        }

        let url      = repo.url_for(&path)?;
        let basename = basename(&path);

        Ok(GitPath { path, basename, url, repo })
    }
}

/// Key of a repository url; scheme and `.git` suffix do not matter.
pub fn key(url: &Url) -> (String, String) {
    let host = match url.host_str() {
        Some(host) if host.eq_ignore_ascii_case("github.com") => "gh".to_owned(),
        Some(host)                                            => host.to_owned(),
        None                                                  => "local".to_owned(),
    };

    let mut path = url.path().trim_start_matches('/');
    while let Some(stripped) = path.strip_suffix(".git") {
        path = stripped;
    }
    let path = path.trim_end_matches('/').replace('/', "_");

    (host, path)
}

const REALM: &str = "git";
