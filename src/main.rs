use clap::{App, Arg, ArgMatches};
use crust::{Program, Vm, VmConfig};
use std::fmt::Display;
use std::process;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn args() -> Result<ArgMatches, clap::Error> {
    App::new("crust")
        .about("a minimal stack-based bytecode virtual machine")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .takes_value(true)
                .required(true)
                .help("crust source file to run"),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .takes_value(false)
                .required(false)
                .help("logs every executed instruction to stderr"),
        )
        .arg(
            Arg::new("ir")
                .short('i')
                .long("ir")
                .takes_value(false)
                .required(false)
                .help("prints the parsed instructions and jump table instead of running"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .takes_value(false)
                .required(false)
                .help("runs the program without printing its output"),
        )
        .try_get_matches()
}

/// `RUST_LOG` wins over the `--debug` flag
fn init_logging(debug: bool) {
    let default = if debug { "crust=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_with(code: i32, err: impl Display) -> ! {
    eprintln!("{}", err);
    process::exit(code)
}

fn main() {
    let args = match args() {
        Ok(args) => args,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => exit_with(1, err),
    };
    let debug = args.is_present("debug");
    let ir = args.is_present("ir");
    let quiet = args.is_present("quiet");
    init_logging(debug);

    let file_name = match args.value_of("file") {
        Some(file_name) => file_name,
        None => exit_with(1, "program file not specified"),
    };

    let start = Instant::now();
    let program = match Program::from_file(file_name) {
        Ok(program) => program,
        Err(err) => exit_with(1, format!("unable to run program: {}", err)),
    };
    info!(
        lines = program.lines(),
        "loaded {} in {} ns",
        file_name,
        start.elapsed().as_nanos()
    );

    if ir {
        print!("{}", program);
        return;
    }

    let config = VmConfig::new(debug, quiet);
    let mut vm = Vm::new(&program, config);
    let start = Instant::now();
    if let Err(err) = vm.run() {
        exit_with(2, err);
    }
    info!("routine took {} ns", start.elapsed().as_nanos());
}
