use std::io::{self, Read, Write};
use anyhow::Result;
use clap::value_t;
use crate::args::Args;
use crate::snippet::*;

pub fn select(args: Args<'_, '_>) -> Result<()> {
    let lines     = split_line_choices(args.value_of("lines"))?;
    let labels    = split_labels(args.value_of("labels"));
    let comment   = args.value_of("comment").unwrap_or("#");
    let max_empty = value_t!(args, "max-empty", usize)?;
    let dedent    = args.is_present("dedent");

    let mut code = String::new();
    io::stdin().read_to_string(&mut code)?;
    let code = code.lines().collect::<Vec<_>>();

    let mut selected = select_lines(&code, lines.as_deref(), &labels, comment, max_empty)?;
    if dedent {
        selected = strip_common_whitespace_prefix(&selected);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in selected {
        writeln!(out, "{}", line)?;
    }

    Ok(())
}
