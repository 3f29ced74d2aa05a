use anyhow::Result;
use crate::args::Args;

pub fn process(args: Args<'_, '_>) -> Result<()> {
    process::process(args)
}

pub fn select(args: Args<'_, '_>) -> Result<()> {
    select::select(args)
}

mod process;
mod select;
