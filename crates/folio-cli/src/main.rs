use clap::Parser;
use folio_cli::cli_args::Cli;

fn main() {
    let cli = Cli::parse();
    match folio_cli::run(cli) {
        Ok(summary) => println!("{summary}"),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    }
}
