use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use super::resolve_inside;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Kind {
    File,
    Dir,
}

/// Assigns stable paths to realm/name pairs below a base directory.
///
/// A realm is a namespace with its own directory under `realms/`. The
/// same realm and name always yield the same path, which is created on
/// first use and never handed out for another name. Associations are
/// written to `.cache.json` on close and restored on the next open.
#[derive(Debug)]
pub struct Files {
    base:   PathBuf,
    realms: PathBuf,
    cache:  PathBuf,
    map:    BTreeMap<String, Realm>,
    open:   bool,
}

#[derive(Debug)]
struct Realm {
    dir:   PathBuf,
    names: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(transparent)]
struct Cache(BTreeMap<String, BTreeMap<String, String>>);

impl Files {
    pub fn open(base: &Path) -> Result<Self> {
        fs::create_dir_all(base).with_context(|| {
            format!("failed to create {}", base.display())
        })?;

        let base = base.canonicalize()?;
        ignore(&base)?;

        let realms = base.join(REALMS);
        fs::create_dir_all(&realms)?;
        ignore(&realms)?;

        let cache = base.join(CACHE);
        let map   = load(&cache, &realms)?;

        debug!("opened {} with {} realms", base.display(), map.len());

        Ok(Self { base, realms, cache, map, open: true })
    }

    pub fn file(&mut self, realm: &str, name: &str, prefix: Option<&str>, suffix: Option<&str>) -> Result<(PathBuf, bool)> {
        self.get(realm, name, Kind::File, prefix, suffix)
    }

    pub fn dir(&mut self, realm: &str, name: &str) -> Result<(PathBuf, bool)> {
        self.get(realm, name, Kind::Dir, None, None)
    }

    pub fn list(&self, realm: &str, files: bool, dirs: bool) -> Result<Vec<PathBuf>> {
        let realm = key(realm)?;
        Ok(match self.map.get(&realm) {
            Some(realm) => realm.names.values().filter(|path| {
                (files && path.is_file()) || (dirs && path.is_dir())
            }).cloned().collect(),
            None => Vec::new(),
        })
    }

    /// Drop the association of a name and delete whatever it points to.
    pub fn forget(&mut self, realm: &str, name: &str) -> Result<()> {
        self.check_open()?;

        let realm = key(realm)?;
        let name  = key(name)?;

        if let Some(path) = self.map.get_mut(&realm).and_then(|r| r.names.remove(&name)) {
            debug!("forgetting {} in realm {}", path.display(), realm);
            let result = match path.is_dir() {
                true  => fs::remove_dir_all(&path),
                false => fs::remove_file(&path),
            };
            match result {
                Ok(())                                    => (),
                Err(e) if e.kind() == ErrorKind::NotFound => (),
                Err(e)                                    => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// Paths that must not leak into captured command output.
    pub fn sensitive(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.base.clone(), self.realms.clone(), self.cache.clone()];
        paths.extend(self.map.values().map(|realm| realm.dir.clone()));
        paths
    }

    pub fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;

        match fs::remove_file(&self.cache) {
            Ok(())                                    => (),
            Err(e) if e.kind() == ErrorKind::NotFound => (),
            Err(e)                                    => return Err(e.into()),
        }

        if self.map.is_empty() {
            return Ok(());
        }

        let cache = Cache(self.map.iter().map(|(realm, Realm { dir, names })| {
            let names = names.iter().filter_map(|(name, path)| {
                let path = path.strip_prefix(dir).ok()?;
                Some((name.clone(), path.to_string_lossy().into_owned()))
            }).collect();
            (realm.clone(), names)
        }).collect());

        fs::write(&self.cache, serde_json::to_string(&cache)?)?;

        debug!("stored {} realms in {}", self.map.len(), self.cache.display());

        Ok(())
    }

    fn get(&mut self, realm: &str, name: &str, kind: Kind, prefix: Option<&str>, suffix: Option<&str>) -> Result<(PathBuf, bool)> {
        self.check_open()?;

        let realm  = key(realm)?;
        let name   = key(name)?;
        let prefix = prefix.map(key).transpose()?;
        let suffix = suffix.map(key).transpose()?;

        let realms = &self.realms;
        let realm  = match self.map.get_mut(&realm) {
            Some(realm) => realm,
            None        => {
                let dir = realms.join(&realm);
                fs::create_dir_all(&dir)?;
                ignore(&dir)?;
                let names = BTreeMap::new();
                self.map.entry(realm).or_insert(Realm { dir, names })
            },
        };

        let (path, new) = match realm.names.get(&name) {
            Some(path) => (path.clone(), false),
            None       => {
                let path = create(&realm.dir, &name, kind, prefix.as_deref(), suffix.as_deref())?;
                realm.names.insert(name, path.clone());
                (path, true)
            },
        };

        match kind {
            Kind::File if !path.is_file() => return Err(anyhow!("{} is not a file", path.display())),
            Kind::Dir  if !path.is_dir()  => return Err(anyhow!("{} is not a directory", path.display())),
            _                             => (),
        }

        let basename = basename(&path);
        if let Some(prefix) = &prefix {
            if !basename.starts_with(prefix.as_str()) {
                return Err(anyhow!("prefix {} but path {}", prefix, path.display()));
            }
        }
        if let Some(suffix) = &suffix {
            if !basename.ends_with(suffix.as_str()) {
                return Err(anyhow!("suffix {} but path {}", suffix, path.display()));
            }
        }

        Ok((path, new))
    }

    fn check_open(&self) -> Result<()> {
        match self.open {
            true  => Ok(()),
            false => Err(anyhow!("store {} already closed", self.base.display())),
        }
    }
}

impl Drop for Files {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to store cache {}: {:?}", self.cache.display(), e);
        }
    }
}

/// Validate a realm, name, prefix or suffix.
pub fn key(s: &str) -> Result<String> {
    let s = s.trim();
    if s.is_empty() {
        return Err(anyhow!("non-empty key expected"));
    }
    match s.chars().all(|c| filename_ok(c) || KEY_EXTRA.contains(c)) {
        true  => Ok(s.to_owned()),
        false => Err(anyhow!("key {:?} contains a forbidden character", s)),
    }
}

pub fn basename(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

fn filename_ok(c: char) -> bool {
    c.is_ascii_alphanumeric() || "+-_".contains(c)
}

fn load(cache: &Path, realms: &Path) -> Result<BTreeMap<String, Realm>> {
    let mut map = BTreeMap::new();

    if !cache.exists() {
        return Ok(map);
    }

    let text = fs::read_to_string(cache).with_context(|| {
        format!("failed to read {}", cache.display())
    })?;
    let Cache(stored) = serde_json::from_str(&text).with_context(|| {
        format!("invalid cache {}", cache.display())
    })?;

    for (realm, entries) in stored {
        let realm = key(&realm)?;
        let dir   = realms.join(&realm);

        let mut names = BTreeMap::new();
        for (name, path) in entries {
            let name = key(&name)?;
            let path = resolve_inside(&dir, &path)?;
            if path.is_file() || path.is_dir() {
                names.insert(name, path);
            }
        }

        if !names.is_empty() {
            map.insert(realm, Realm { dir, names });
        }
    }

    Ok(map)
}

fn create(dir: &Path, name: &str, kind: Kind, prefix: Option<&str>, suffix: Option<&str>) -> Result<PathBuf> {
    let root = match prefix {
        Some(prefix) => prefix.to_owned(),
        None         => name.chars().filter(|c| filename_ok(*c)).collect(),
    };
    let suffix = suffix.unwrap_or("");

    let preferred = format!("{}{}", root, suffix);
    if !preferred.is_empty() {
        let path = entry(dir, &preferred)?;
        if claim(&path, kind)? {
            return Ok(path);
        }
    }

    let mut rng = thread_rng();
    for _ in 0..ATTEMPTS {
        let random = (&mut rng).sample_iter(&Alphanumeric).take(8).map(char::from).collect::<String>();
        let path   = entry(dir, &format!("{}{}{}", root, random, suffix))?;
        if claim(&path, kind)? {
            return Ok(path);
        }
    }

    Err(anyhow!("unable to create a unique path for {} in {}", name, dir.display()))
}

/// A direct child of `dir` named exactly `file`.
fn entry(dir: &Path, file: &str) -> Result<PathBuf> {
    let path = resolve_inside(dir, file)?;
    match path.parent() == Some(dir) && path == dir.join(file) {
        true  => Ok(path),
        false => Err(anyhow!("{:?} is not a plain file name in {}", file, dir.display())),
    }
}

fn claim(path: &Path, kind: Kind) -> Result<bool> {
    let result = match kind {
        Kind::File => OpenOptions::new().write(true).create_new(true).open(path).map(drop),
        Kind::Dir  => fs::create_dir(path),
    };

    match result {
        Ok(())                                         => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e)                                         => Err(e.into()),
    }
}

fn ignore(dir: &Path) -> Result<()> {
    let gitignore = dir.join(".gitignore");
    if !gitignore.exists() {
        fs::write(&gitignore, "*\n**/*")?;
    }

    let nojekyll = dir.join(".nojekyll");
    if !nojekyll.exists() {
        fs::write(&nojekyll, "")?;
    }

    Ok(())
}

const REALMS:   &str  = "realms";
const CACHE:    &str  = ".cache.json";
const KEY_EXTRA: &str = ":.@/";
const ATTEMPTS: usize = 1024;
