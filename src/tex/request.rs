use std::convert::TryFrom;
use std::iter::Peekable;
use std::str::Chars;
use super::Error;

pub const GIT_FILE:   &str = r"\@texgit@gitFile";
pub const ARG_FILE:   &str = r"\@texgit@argFile";
pub const PROCESS:    &str = r"\@texgit@process";
pub const NEEDS_PASS: &str = r"\@texgit@needsTexgitPass";

const MAX_LINE: usize = 64 * 1024 * 1024;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Kind {
    GitFile,
    ArgFile,
    Process,
}

/// A request line split into its brace groups, each group split into words.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub kind:   Kind,
    pub groups: Vec<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    GitFile {
        name:    String,
        repo:    String,
        path:    String,
        command: Option<Vec<String>>,
    },
    ArgFile {
        name:   String,
        prefix: Option<String>,
        suffix: Option<String>,
    },
    Process {
        name:    String,
        repo:    Option<String>,
        dir:     Option<String>,
        command: Vec<String>,
    },
}

impl Kind {
    fn split(line: &str) -> Option<(Self, &str)> {
        [
            (Kind::GitFile, GIT_FILE),
            (Kind::ArgFile, ARG_FILE),
            (Kind::Process, PROCESS),
        ].iter().find_map(|(kind, header)| {
            line.strip_prefix(*header).map(|rest| (*kind, rest))
        })
    }
}

impl Request {
    /// Parse a single aux file line, returning `None` for lines
    /// that do not start with a request header.
    pub fn parse(line: &str) -> Result<Option<Self>, Error> {
        let line = line.trim();

        if line.len() >= MAX_LINE {
            return Err(Error::TooLong(line.len()));
        }

        let (kind, rest) = match Kind::split(line) {
            Some(split) => split,
            None        => return Ok(None),
        };

        let rest = rest.trim_start();
        if !rest.starts_with('{') {
            return Err(Error::NoGroup(line.to_owned()));
        }

        let mut chars  = rest.chars().peekable();
        let mut groups = Vec::new();

        while opens(&mut chars) {
            match group(&mut chars) {
                Some(words) => groups.push(words),
                None        => return Err(Error::Unclosed(line.to_owned())),
            }
        }

        Ok(Some(Self { kind, groups }))
    }
}

/// Advance to the next unescaped `{`. Escapes and doubled braces between
/// groups are literals, so they never open a group.
fn opens(chars: &mut Peekable<Chars<'_>>) -> bool {
    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('\\', Some(n)) if ESCAPED.contains(n) => { chars.next(); },
            ('{', Some('{')) | ('}', Some('}'))     => { chars.next(); },
            ('{', _)                                 => return true,
            _                                        => (),
        }
    }
    false
}

fn group(chars: &mut Peekable<Chars<'_>>) -> Option<Vec<String>> {
    let mut words = Vec::new();
    let mut word  = String::new();

    while let Some(c) = chars.next() {
        let next = chars.peek().copied();

        let literal = match (c, next) {
            ('\\', Some(n)) if ESCAPED.contains(n) => n,
            ('{', Some('{'))                        => '{',
            ('}', Some('}'))                        => '}',
            ('}', _) => {
                flush(&mut word, &mut words);
                return Some(words);
            },
            (c, _) if c.is_whitespace() => {
                flush(&mut word, &mut words);
                continue;
            },
            (c, _) => {
                word.push(c);
                continue;
            },
        };

        chars.next();
        word.push(literal);
    }

    None
}

fn flush(word: &mut String, words: &mut Vec<String>) {
    if !word.is_empty() {
        words.push(std::mem::take(word));
    }
}

const ESCAPED: &str = "\\{} ";

impl TryFrom<Request> for Command {
    type Error = Error;

    fn try_from(request: Request) -> Result<Self, Self::Error> {
        let Request { kind, groups } = request;
        let mut groups = groups.into_iter();

        Ok(match kind {
            Kind::GitFile => {
                let name    = required(groups.next(), "name")?;
                let repo    = required(groups.next(), "repository")?;
                let path    = required(groups.next(), "path")?;
                let command = rest(groups);
                let command = match command.is_empty() {
                    true  => None,
                    false => Some(command),
                };
                Command::GitFile { name, repo, path, command }
            },
            Kind::ArgFile => {
                let name   = required(groups.next(), "name")?;
                let prefix = single(groups.next(), "prefix")?;
                let suffix = single(groups.next(), "suffix")?;
                Command::ArgFile { name, prefix, suffix }
            },
            Kind::Process => {
                let name    = required(groups.next(), "name")?;
                let repo    = single(groups.next(), "repository")?;
                let dir     = single(groups.next(), "directory")?;
                let command = rest(groups);
                if command.is_empty() {
                    return Err(Error::Missing("command"));
                }
                Command::Process { name, repo, dir, command }
            },
        })
    }
}

impl Command {
    pub fn name(&self) -> &str {
        match self {
            Command::GitFile { name, .. } => name,
            Command::ArgFile { name, .. } => name,
            Command::Process { name, .. } => name,
        }
    }
}

fn single(group: Option<Vec<String>>, what: &'static str) -> Result<Option<String>, Error> {
    let mut words = group.unwrap_or_default();
    match words.len() {
        0 => Ok(None),
        1 => Ok(words.pop()),
        _ => Err(Error::Multiple(what, words)),
    }
}

fn required(group: Option<Vec<String>>, what: &'static str) -> Result<String, Error> {
    single(group, what)?.ok_or(Error::Missing(what))
}

fn rest<I: Iterator<Item = Vec<String>>>(groups: I) -> Vec<String> {
    groups.flatten().collect()
}
