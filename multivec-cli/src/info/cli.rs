use clap::{Arg, Command};

pub use multivec_core::consts::INFO_CMD;

pub fn create_info_cli() -> Command {
    Command::new(INFO_CMD)
        .author("Databio")
        .about("Print the attributes and datasets of a multivec file.")
        .arg(
            Arg::new("file")
                .required(true)
                .help("A .multires.mv5 file written by `multivec convert` (chunked store, not HDF5) or a staging store"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::*;

    #[rstest]
    fn test_help_names_the_container() {
        let help = create_info_cli().render_long_help().to_string();
        assert!(help.contains("not HDF5"));
    }
}
