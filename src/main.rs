use clap::{crate_description, crate_name, crate_version, Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use embedgen::{Config, EmbedgenError, CONFIG_FILE_NAME};
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

fn generation_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("paths")
                .help("Files and directories to embed")
                .value_parser(clap::value_parser!(PathBuf))
                .num_args(0..),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help(format!(
                    "Read settings from this file instead of ./{}",
                    CONFIG_FILE_NAME
                ))
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("namespace")
                .long("namespace")
                .help("Name of the generated module [default: assets]"),
        )
        .arg(
            Arg::new("variable")
                .long("variable")
                .help("Name of the generated filesystem static [default: ASSETS]"),
        )
        .arg(
            Arg::new("compress")
                .long("compress")
                .help("Store file contents gzip-compressed")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("strip-prefix")
                .long("strip-prefix")
                .help("Path prefix to remove from every embedded path"),
        )
        .arg(
            Arg::new("runtime-crate")
                .long("runtime-crate")
                .help("Path to the embedfs crate in generated code [default: ::embedfs]"),
        )
}

// The CLI layer should only parse inputs and forward them to library code.
fn main() -> miette::Result<()> {
    let matches = Command::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            generation_args(Command::new("generate"))
                .about("Generates a Rust module embedding the given paths")
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("File to write the module to; stdout when omitted")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            generation_args(Command::new("tree"))
                .about("Shows the tree that would be embedded, after prefix stripping"),
        )
        .get_matches();

    let is_verbose = matches.get_flag("verbose");

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if is_verbose { "debug" } else { "warn" }),
    )
    .init();

    match matches.subcommand() {
        Some(("generate", args)) => handle_generate(args)?,
        Some(("tree", args)) => handle_tree(args)?,
        _ => unreachable!(),
    }

    Ok(())
}

fn handle_generate(args: &ArgMatches) -> Result<(), EmbedgenError> {
    let mut config = load_config(args)?;

    if let Some(output) = args.get_one::<PathBuf>("output") {
        config.output = Some(output.clone());
    }

    let source = embedgen::generate(&config)?;

    match &config.output {
        Some(path) => {
            embedgen::write_output(path, &source)?;

            println!("{} {}", "create".green(), path.display());
        }
        None => {
            io::stdout().lock().write_all(source.as_bytes()).map_err(|error| {
                embedgen::errors::IoError::new(
                    embedgen::errors::FileOperation::Write,
                    PathBuf::from("<stdout>"),
                    error,
                )
            })?;
        }
    }

    Ok(())
}

fn handle_tree(args: &ArgMatches) -> Result<(), EmbedgenError> {
    let config = load_config(args)?;

    embedgen::preview(&config)
}

/// Reads the config file, if any, and lays the command line over it.
fn load_config(args: &ArgMatches) -> Result<Config, EmbedgenError> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => Config::from_file(path)?,
        None if Path::new(CONFIG_FILE_NAME).is_file() => Config::from_file(CONFIG_FILE_NAME)?,
        None => Config::default(),
    };

    if let Some(paths) = args.get_many::<PathBuf>("paths") {
        config.roots = paths.cloned().collect();
    }

    let options = &mut config.options;

    if let Some(namespace) = args.get_one::<String>("namespace") {
        options.namespace = namespace.clone();
    }
    if let Some(variable) = args.get_one::<String>("variable") {
        options.variable = variable.clone();
    }
    if let Some(prefix) = args.get_one::<String>("strip-prefix") {
        options.strip_prefix = prefix.clone();
    }
    if let Some(runtime) = args.get_one::<String>("runtime-crate") {
        options.runtime_crate = runtime.clone();
    }
    if args.get_flag("compress") {
        options.compress = true;
    }

    log::debug!("effective config: {:?}", config);

    Ok(config)
}
