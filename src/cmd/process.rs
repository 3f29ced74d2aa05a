use std::path::Path;
use std::time::Duration;
use anyhow::{anyhow, Result};
use log::debug;
use tokio::runtime::Builder;
use crate::args::Args;
use crate::tex::{self, Config};

pub fn process(args: Args<'_, '_>) -> Result<()> {
    let aux = args.value("aux").ok_or_else(|| anyhow!("missing aux file"))?;

    let mut config = Config::default();

    if let Some(dir) = args.value("repo-dir") {
        config.repo_dir = dir.into();
    }

    if let Some(secs) = args.opt::<u64>("timeout")? {
        config.limits.exec = Duration::from_secs(secs);
    }

    debug!("processing {} with {:?}", aux, config);

    let runtime = Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(tex::process(Path::new(&aux), &config))?;

    Ok(())
}
