use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use tx2gene_fetch::fasta_len::compute_fasta_lengths;

#[derive(Parser)]
#[command(name = "fasta-len")]
#[command(about = "Write a tab separated table of FASTA record lengths")]
#[command(version)]
struct Cli {
    input: PathBuf,

    output: PathBuf,

    /// Keep only the first word of each header
    #[arg(long)]
    keep_first_word: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = compute_fasta_lengths(&cli.input, &cli.output, cli.keep_first_word) {
        eprintln!("{:?}", miette::Report::new(err));
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}
