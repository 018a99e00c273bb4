use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;

use multivec_io::StoreReader;

///
/// Write a short report of a store: its attributes as JSON, then one line per
/// dataset with its shape and how many chunks hold data.
///
pub fn write_report<W: Write>(store: &StoreReader, out: &mut W) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(store.attrs())?)?;
    writeln!(out, "dataset\trows\tcolumns\tchunks\tstored")?;
    for dataset in store.datasets() {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            dataset.name,
            dataset.rows,
            store.columns(),
            dataset.chunks.len(),
            dataset.stored_chunks()
        )?;
    }
    Ok(())
}

pub fn run_info(matches: &ArgMatches) -> Result<()> {
    let file = matches
        .get_one::<String>("file")
        .expect("A path to a multivec file is required.");

    let store = StoreReader::open(Path::new(file))
        .with_context(|| format!("Failed to open {}", file))?;

    let stdout = std::io::stdout();
    write_report(&store, &mut stdout.lock())
}
