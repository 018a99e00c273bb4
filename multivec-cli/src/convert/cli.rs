use clap::{Arg, ArgAction, Command, arg, value_parser};

pub use multivec_core::consts::CONVERT_CMD;

pub fn create_convert_cli() -> Command {
    Command::new(CONVERT_CMD)
        .author("Databio")
        .about("Convert bigWig files into one multi-resolution multivec file.")
        .arg(
            Arg::new("inputs")
                .num_args(0..)
                .action(ArgAction::Append)
                .help("bigWig files, one sample each, in output row order"),
        )
        .arg(
            arg!(--"input-list" <file>)
                .short('l')
                .help("File listing bigWig paths, one per line; appended after positional inputs"),
        )
        .arg(
            arg!(--output <output>)
                .short('o')
                .help("Output file [default: first input with a .multires.mv5 extension]"),
        )
        .arg(
            arg!(--"tile-size" <size>)
                .value_parser(value_parser!(u32))
                .help("Cells per tile of the output pyramid"),
        )
        .arg(
            arg!(--"starting-resolution" <bases>)
                .value_parser(value_parser!(u32))
                .help("Bases per cell at the finest level"),
        )
        .arg(
            arg!(--chrom <name>)
                .action(ArgAction::Append)
                .help("Only convert this chromosome; may be repeated"),
        )
        .arg(arg!(--config <file>).help("TOML file with conversion parameters"))
        .arg(
            arg!(--"temp-dir" <dir>)
                .help("Directory for the temporary staging data [default: system temp dir]"),
        )
        .arg(
            arg!(--debug)
                .help("Verbose logging and per-stage timings")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--"no-progress")
                .help("Do not show progress bars")
                .action(ArgAction::SetTrue),
        )
}
