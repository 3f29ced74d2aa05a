use std::process;
use anyhow::Error;
use clap::{App, load_yaml};
use env_logger::Builder;
use log::error;
use log::LevelFilter::{Info, Debug, Trace};
use texgit::{args::Args, cmd};

fn main() {
    let ver  = env!("CARGO_PKG_VERSION");
    let yaml = load_yaml!("args.yml");
    let app  = App::from_yaml(&yaml).version(ver);
    let args = app.get_matches();
    let args = Args::new(&args);

    let verbose = match args.subcommand() {
        Some((_, sub)) => sub.occurrences_of("verbose").max(args.occurrences_of("verbose")),
        None           => args.occurrences_of("verbose"),
    };

    let (module, level) = match verbose {
        0 => (Some(module_path!()), Info),
        1 => (Some(module_path!()), Debug),
        2 => (Some(module_path!()), Trace),
        _ => (None,                 Trace),
    };
    Builder::from_default_env().filter(module, level).init();

    match args.subcommand() {
        Some(("select", args)) => cmd::select(args),
        Some(_)                => unreachable!(),
        None                   => cmd::process(args),
    }.unwrap_or_else(abort);
}

fn abort(e: Error) {
    match e.downcast_ref::<clap::Error>() {
        Some(e) => println!("{}", e.message),
        None    => error!("{:?}", e),
    }
    process::exit(1);
}
