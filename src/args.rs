use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::ops::Deref;
use std::rc::Rc;
use std::str::FromStr;
use clap::{ArgMatches, Error, ErrorKind};

#[derive(Debug)]
pub struct Args<'a, 'y> {
    args: &'a ArgMatches<'y>,
    vars: Rc<HashMap<String, String>>,
}

impl<'a, 'y> Args<'a, 'y> {
    pub fn new(args: &'a ArgMatches<'y>) -> Self {
        let vars = Rc::new(Self::vars());
        Self { args, vars }
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.args.is_present(name) || self.is_set(name)
    }

    pub fn subcommand(&self) -> Option<(&'a str, Args<'a, 'y>)> {
        match self.args.subcommand() {
            (name, Some(args)) => Some((name, self.subargs(args))),
            _                  => None,
        }
    }

    pub fn value(&self, name: &str) -> Option<String> {
        match self.args.value_of(name) {
            Some(value) => Some(value.to_owned()),
            None        => self.vars.get(name).cloned(),
        }
    }

    pub fn opt<T: FromStr>(&self, name: &str) -> Result<Option<T>, Error> where T::Err: Display {
        self.value(name).map(|v| T::from_str(&v)).transpose().map_err(|e| {
            let msg = format!("invalid value for {}: {}", name, e);
            Error::with_description(&msg, ErrorKind::InvalidValue)
        })
    }

    fn subargs(&self, args: &'a ArgMatches<'y>) -> Self {
        let vars = Rc::clone(&self.vars);
        Self { args, vars }
    }

    fn is_set(&self, name: &str) -> bool {
        self.vars.get(name).map(|value| {
            value == "" || value.eq_ignore_ascii_case("true")
        }).unwrap_or(false)
    }

    fn vars() -> HashMap<String, String> {
        let mut vars = HashMap::new();

        for (name, var) in VARS {
            if let Some(value) = env::var_os(var) {
                let name  = (*name).to_owned();
                let value = value.to_string_lossy().into_owned();
                vars.insert(name, value);
            }
        }

        vars
    }
}

impl<'a, 'y> Deref for Args<'a, 'y> {
    type Target = ArgMatches<'y>;

    fn deref(&self) -> &Self::Target {
        &self.args
    }
}

const VARS: &[(&str, &str)] = &[
    ("repo-dir", "TEXGIT_REPO_DIR"),
    ("timeout",  "TEXGIT_TIMEOUT"),
];

#[cfg(test)]
mod test {
    use anyhow::Result;
    use clap::{App, Arg};
    use super::Args;

    #[test]
    fn command_line_wins() -> Result<()> {
        let app = App::new("test").arg(Arg::with_name("repo-dir").long("repo-dir").takes_value(true));
        let matches = app.get_matches_from_safe(vec!["test", "--repo-dir", "cache"])?;
        let args = Args::new(&matches);

        assert_eq!(Some("cache".to_owned()), args.value("repo-dir"));
        assert_eq!(None, args.opt::<u64>("missing")?);

        Ok(())
    }

    #[test]
    fn invalid_value() -> Result<()> {
        let app = App::new("test").arg(Arg::with_name("timeout").long("timeout").takes_value(true));
        let matches = app.get_matches_from_safe(vec!["test", "--timeout", "soon"])?;
        let args = Args::new(&matches);

        assert!(args.opt::<u64>("timeout").is_err());

        Ok(())
    }
}
