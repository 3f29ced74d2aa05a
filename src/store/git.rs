use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use chrono::DateTime;
use log::{debug, info, warn};
use regex::Regex;
use url::Url;
use crate::exec;
use super::Limits;

/// A local clone of a git repository at a known commit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Repository {
    pub path:   PathBuf,
    pub url:    Url,
    pub commit: String,
    pub date:   String,
}

impl Repository {
    pub fn new(path: PathBuf, url: &str, commit: String, date: String) -> Result<Self> {
        if !path.is_dir() {
            return Err(anyhow!("repository {} is not a directory", path.display()));
        }

        if commit.len() != 40 || !commit.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow!("invalid commit {:?} for repository {}", commit, url));
        }

        if date.trim().is_empty() {
            return Err(anyhow!("missing date for repository {}", url));
        }

        let url = base_url(url)?;

        debug!("repository {} at {} from {} ({})", url, path.display(), commit, date);

        Ok(Self { path, url, commit, date })
    }

    /// Clone `url` into `dest` and open the result.
    pub async fn download(url: &str, dest: &Path, limits: &Limits) -> Result<Self> {
        let url = Url::parse(url.trim())?;

        fs::create_dir_all(dest)?;

        info!("cloning {} into {}", url, dest.display());

        if let Err(e) = clone(url.as_str(), dest, limits).await {
            let fallback = match url.as_str().strip_prefix("https://") {
                Some(rest) if rest.starts_with("github.com") => format!("ssh://git@{}", rest),
                _                                            => return Err(e),
            };

            warn!("clone of {} failed, retrying with {}: {:?}", url, fallback, e);

            fs::remove_dir_all(dest)?;
            fs::create_dir_all(dest)?;

            clone(&fallback, dest, limits).await?;
        }

        Self::open(dest, Some(url.as_str()), limits).await
    }

    /// Read commit, date and, unless given, origin url of a local clone.
    pub async fn open(path: &Path, url: Option<&str>, limits: &Limits) -> Result<Self> {
        let path = path.canonicalize().with_context(|| {
            format!("invalid repository {}", path.display())
        })?;

        let dir = path.to_string_lossy().into_owned();
        let git = |args: &[&str]| {
            let mut argv = vec!["git".to_owned(), "-C".to_owned(), dir.clone()];
            argv.extend(args.iter().map(|arg| arg.to_string()));
            argv
        };

        let log = exec::output(&git(&["log", "--no-abbrev-commit", "-1"]), Some(&path), None, limits.query).await?;
        let (commit, date) = parse_log(&log).with_context(|| {
            format!("no commit information in {}", path.display())
        })?;

        let url = match url {
            Some(url) => url.to_owned(),
            None      => {
                let config = git(&["config", "--get", "remote.origin.url"]);
                origin(&exec::output(&config, Some(&path), None, limits.query).await?)?
            },
        };

        Self::new(path, &url, commit, date)
    }

    /// Web url of a file or directory inside this repository.
    pub fn url_for(&self, path: &Path) -> Result<String> {
        let relative = path.strip_prefix(&self.path).map_err(|_| {
            anyhow!("{} is not inside {}", path.display(), self.path.display())
        })?;

        if !path.is_file() && !path.is_dir() {
            return Err(anyhow!("{} does not exist in {}", path.display(), self.url));
        }

        let relative = relative.iter().map(|part| part.to_string_lossy()).collect::<Vec<_>>().join("/");
        let url      = self.url.as_str().trim_end_matches('/');

        Ok(match self.url.host_str() {
            Some("github.com") => format!("{}/blob/{}/{}", url, self.commit, relative),
            _                  => format!("{}/{}", url, relative),
        })
    }

    /// Name of the repository as `user/name`.
    pub fn name(&self) -> String {
        let url = self.url.as_str().trim_end_matches('/');
        let url = url.strip_suffix(".git").unwrap_or(url);
        let mut parts = url.rsplitn(3, '/');
        match (parts.next(), parts.next()) {
            (Some(name), Some(user)) if !user.is_empty() && !user.ends_with(':') => format!("{}/{}", user, name),
            (Some(name), _)                                                      => name.to_owned(),
            _                                                                    => url.to_owned(),
        }
    }
}

async fn clone(url: &str, dest: &Path, limits: &Limits) -> Result<()> {
    let dir  = dest.to_string_lossy().into_owned();
    let argv = ["git", "-C", dir.as_str(), "clone", "--depth", "1", url, dir.as_str()];
    exec::output(&argv, Some(dest), None, limits.clone).await?;
    Ok(())
}

fn parse_log(log: &str) -> Result<(String, String)> {
    let commit = Regex::new(r"(?m)^\s*commit\s+(.+?)\s+")?;
    let date   = Regex::new(r"(?m)^\s*Date:\s+(.+?)$")?;

    let commit = commit.captures(log).map(|c| c[1].trim().to_owned());
    let date   = date.captures(log).map(|c| c[1].trim().to_owned());

    let commit = commit.ok_or_else(|| anyhow!("no commit"))?;
    let date   = date.ok_or_else(|| anyhow!("no date"))?;

    let date = DateTime::parse_from_str(&date, "%a %b %d %H:%M:%S %Y %z").with_context(|| {
        format!("invalid date {:?}", date)
    })?;

    Ok((commit, date.format("%Y-%m-%d %H:%M:%S").to_string()))
}

fn origin(output: &str) -> Result<String> {
    let url = output.trim().lines().next().map(str::trim).unwrap_or("");

    if url.is_empty() || url.contains(char::is_whitespace) {
        return Err(anyhow!("invalid origin {:?}", url));
    }

    let mut url = match url.strip_suffix("/.git") {
        Some(url) => format!("{}.git", url),
        None      => url.to_owned(),
    };

    if url.ends_with('/') {
        url.pop();
    }

    if let Some(rest) = url.strip_prefix("ssh://git@github.com") {
        url = format!("https://github.com{}", rest);
    }

    Ok(url)
}

fn base_url(url: &str) -> Result<Url> {
    let url = url.trim();

    let mut base = match url.get(..17) {
        Some(head) if head.eq_ignore_ascii_case("ssh://git@github.") => format!("https://{}", &url[10..]),
        _                                                             => url.to_owned(),
    };

    if base.to_ascii_lowercase().ends_with(".git") {
        base.truncate(base.len() - 4);
    }

    Url::parse(&base).with_context(|| format!("invalid repository url {}", url))
}

#[cfg(test)]
mod test {
    use std::fs;
    use anyhow::Result;
    use super::{base_url, origin, parse_log, Repository};

    #[test]
    fn log() -> Result<()> {
        let log = "commit 0123456789abcdef0123456789abcdef01234567 (HEAD -> main)\n\
                   Author: Some One <one@example.com>\n\
                   Date:   Thu Oct 5 10:20:30 2023 +0200\n\
                   \n    message\n";

        let (commit, date) = parse_log(log)?;
        assert_eq!("0123456789abcdef0123456789abcdef01234567", commit);
        assert_eq!("2023-10-05 10:20:30", date);

        assert!(parse_log("nothing here").is_err());

        Ok(())
    }

    #[test]
    fn urls() -> Result<()> {
        assert_eq!("https://github.com/user/repo", base_url("ssh://git@github.com/user/repo.git")?.as_str());
        assert_eq!("https://example.com/a/b",      base_url("https://example.com/a/b.GIT")?.as_str());
        assert!(base_url("not a url").is_err());

        assert_eq!("https://github.com/user/repo.git", origin("ssh://git@github.com/user/repo/.git\n")?);
        assert_eq!("https://example.com/a",            origin("https://example.com/a/\nextra")?);
        assert!(origin("\n").is_err());

        Ok(())
    }

    #[test]
    fn github() -> Result<()> {
        let dir    = tempfile::tempdir()?;
        let commit = "0123456789abcdef0123456789abcdef01234567";
        let date   = "2023-10-05 10:20:30";

        fs::create_dir(dir.path().join("src"))?;
        fs::write(dir.path().join("src").join("a.txt"), "a\n")?;

        let repo = Repository::new(dir.path().to_owned(), "ssh://git@github.com/user/repo.git", commit.into(), date.into())?;
        assert_eq!("https://github.com/user/repo", repo.url.as_str());
        assert_eq!("user/repo", repo.name());

        let file = repo.url_for(&dir.path().join("src").join("a.txt"))?;
        assert_eq!(format!("https://github.com/user/repo/blob/{}/src/a.txt", commit), file);

        let sub = repo.url_for(&dir.path().join("src"))?;
        assert_eq!(format!("https://github.com/user/repo/blob/{}/src", commit), sub);

        assert!(repo.url_for(&dir.path().join("missing.txt")).is_err());
        assert!(repo.url_for(&std::env::temp_dir()).is_err());

        let local = Repository::new(dir.path().to_owned(), "https://example.com/group/project.git", commit.into(), date.into())?;
        assert_eq!("group/project", local.name());
        assert_eq!("https://example.com/group/project/src/a.txt", local.url_for(&dir.path().join("src").join("a.txt"))?);

        assert!(Repository::new(dir.path().to_owned(), "https://github.com/user/repo", "abc".into(), date.into()).is_err());

        Ok(())
    }
}
