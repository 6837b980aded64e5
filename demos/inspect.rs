use std::fs::File;
use ustar_inspect::{IoSource, TarArchive};

/// Prints the tree of a USTAR archive and the head of every file.
///
/// `cargo run --example inspect -- archive.tar [dir/]`
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // log: not mandatory
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: inspect <archive.tar> [dir]")?;
    let dir = args.next().unwrap_or_default();

    let mut archive = TarArchive::new(IoSource::new(File::open(path)?)?);
    println!("{} headers", archive.validate()?);

    let (children, total) = archive.list_children(&dir, 16)?;
    println!("{total} entries below {dir:?}:");
    for child in &children {
        let kind = archive.entry_kind(child)?;
        println!("  {child} ({kind:?})");
        if archive.is_file(child)? {
            let mut head = [0; 32];
            match archive.read_file(child, 0, &mut head) {
                Ok(read) => println!(
                    "    {} (+{} bytes)",
                    head[..read.written()].escape_ascii(),
                    read.remaining()
                ),
                Err(e) => println!("    {e}"),
            }
        }
    }
    if total > children.len() {
        println!("  ...");
    }
    Ok(())
}
