use clap::Parser;

/// Pick folders interactively and mirror each into a backup destination with rsync.
///
/// Settings live in ~/.picksync/config.json; diagnostics go to ~/.picksync/logs.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {}
