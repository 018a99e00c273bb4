mod convert;
mod info;

use anyhow::Result;
use clap::Command;
use env_logger::Env;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const PKG_NAME: &str = "multivec";
    pub const BIN_NAME: &str = "multivec";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .author("Databio")
        .about("Convert bigWig signal tracks into multi-resolution, multi-sample multivec files.")
        .subcommand_required(true)
        .subcommand(convert::cli::create_convert_cli())
        .subcommand(info::cli::create_info_cli())
}

fn init_logging(debug: bool) {
    let default_level = match debug {
        true => "debug",
        false => "info",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    match matches.subcommand() {
        //
        // CONVERT
        //
        Some((convert::cli::CONVERT_CMD, matches)) => {
            init_logging(matches.get_flag("debug"));
            convert::handlers::run_convert(matches)?;
        }

        //
        // INFO
        //
        Some((info::cli::INFO_CMD, matches)) => {
            init_logging(false);
            info::handlers::run_info(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}
