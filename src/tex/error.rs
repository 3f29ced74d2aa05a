use std::fmt;

#[derive(Debug, PartialEq)]
pub enum Error {
    TooLong(usize),
    NoGroup(String),
    Unclosed(String),
    Missing(&'static str),
    Multiple(&'static str, Vec<String>),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::TooLong(n)       => write!(f, "line is {} characters long", n),
            Error::NoGroup(line)    => write!(f, "expected {{ after request in {:?}", line),
            Error::Unclosed(line)   => write!(f, "found {{ but no }} in {:?}", line),
            Error::Missing(what)    => write!(f, "request is missing the {}", what),
            Error::Multiple(what, words) => write!(f, "expected a single {}, got {:?}", what, words),
        }
    }
}
