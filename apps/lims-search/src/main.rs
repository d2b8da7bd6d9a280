use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = lims_search_cli::Args::parse();

	lims_search_cli::run(args).await
}
