use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = krishi_api::Args::parse();
	krishi_api::run(args).await
}
