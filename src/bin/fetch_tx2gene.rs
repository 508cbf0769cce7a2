use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tx2gene_fetch::app::App;
use tx2gene_fetch::config::{CliOverrides, ConfigLoader};
use tx2gene_fetch::convert::RscriptConverter;
use tx2gene_fetch::error::FetchError;
use tx2gene_fetch::remote::HttpFetcher;

#[derive(Parser)]
#[command(name = "fetch-tx2gene")]
#[command(about = "Fetch a reference or annotation file and register it as a tx2gene data table entry")]
#[command(version, author)]
struct Cli {
    /// Params JSON; overwritten with the data table record on success
    params: PathBuf,

    #[arg(short = 'd', long)]
    dbkey_description: Option<String>,

    /// Directory holding get_tx2gene_table.R
    #[arg(short = 'b', long)]
    base_dir: Option<PathBuf>,

    #[arg(short = 't', long = "type")]
    file_type: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        if let Some(FetchError::Conversion { stderr, .. }) = report.downcast_ref::<FetchError>() {
            eprintln!("Error in process call");
            eprint!("{stderr}");
        }
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<FetchError>() {
            return ExitCode::from(err.exit_code());
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = CliOverrides {
        dbkey_description: cli.dbkey_description,
        file_type: cli.file_type,
    };
    let params = ConfigLoader::resolve(&cli.params, &overrides)?;

    let fetcher = HttpFetcher::new()?;
    let converter = RscriptConverter::new(cli.base_dir.as_deref());
    let app = App::new(fetcher, converter);
    let record = app.run(&params)?;

    record.write_atomic(&cli.params)?;
    Ok(())
}
