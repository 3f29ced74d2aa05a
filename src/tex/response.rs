use std::path::{Component, Path};

pub const PATH:     &str = "@texgit@path@";
pub const NAME:     &str = "@texgit@name@";
pub const ESC_NAME: &str = "@texgit@escName@";
pub const URL:      &str = "@texgit@url@";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Def {
    Expanded,
    Global,
}

pub fn define(def: Def, prefix: &str, name: &str, value: &str) -> String {
    let def = match def {
        Def::Expanded => r"\xdef",
        Def::Global   => r"\gdef",
    };
    format!(r"\expandafter{}\csname {}{}\endcsname{{{}}}%", def, prefix.trim(), name.trim(), value)
}

/// Path definition, followed by name definitions when a basename is given.
/// The escaped name must stay a `\gdef` so that TeX does not expand it.
pub fn path(name: &str, path: &Path, base: &Path, basename: Option<&str>) -> Vec<String> {
    let mut lines = vec![define(Def::Expanded, PATH, name, &relative(path, base))];

    if let Some(basename) = basename {
        lines.push(define(Def::Expanded, NAME, name, basename));
        lines.push(define(Def::Global, ESC_NAME, name, &escape(basename)));
    }

    lines
}

pub fn url(name: &str, url: &str) -> String {
    define(Def::Expanded, URL, name, url)
}

pub fn escape(name: &str) -> String {
    name.replace('$', r"\$").replace('_', r"\_").replace(' ', "~")
}

pub fn relative(path: &Path, base: &Path) -> String {
    let path = match path.strip_prefix(base) {
        Ok(path) => path,
        Err(_)   => path,
    };

    path.components().filter_map(|c| match c {
        Component::CurDir => None,
        Component::RootDir => Some(String::new()),
        c => Some(c.as_os_str().to_string_lossy().into_owned()),
    }).collect::<Vec<_>>().join("/")
}
