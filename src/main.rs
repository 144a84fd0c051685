use clap::{Args, Parser, Subcommand};
use genfill::{
    form::{Attachment, FormController, FormValues},
    Config, DataUri, FlowClient, InfluenceRequest, PromptGenRequest,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "genfill")]
#[command(about = "Generative fill and image generation through hosted models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Color-aware generative fill, submitted through the form controller
    Fill(FillArgs),
    /// Generate an image from a prompt alone
    Generate(GenerateArgs),
    /// Apply a prompt guided by a reference image
    Influence(InfluenceArgs),
    /// Serve the HTTP API
    #[cfg(feature = "server")]
    Serve,
}

#[derive(Args)]
struct FillArgs {
    /// What to generate inside the selection
    #[arg(short, long)]
    prompt: String,
    /// Foreground color to integrate, as a hex code (enables color integration)
    #[arg(long)]
    color: Option<String>,
    /// Reference image to influence the fill
    #[arg(long)]
    reference: Option<PathBuf>,
    /// Send an empty selection instead of the simulated one
    #[arg(long)]
    no_selection: bool,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(short, long)]
    prompt: String,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct InfluenceArgs {
    #[arg(short, long)]
    prompt: String,
    /// Reference image (required)
    #[arg(long)]
    reference: PathBuf,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct OutputArgs {
    /// Write the decoded image here instead of printing the data URI
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    genfill::logger::init()?;
    if !dotenv_loaded {
        log::debug!("No .env file found, using system environment variables");
    }

    let cli = Cli::parse();
    let config = Config::from_env()?;
    genfill::logger::log_startup_info(&config);

    let client = FlowClient::connect(&config).await?;

    match cli.command {
        Commands::Fill(args) => {
            let mut values = FormValues::new(args.prompt).with_selection(!args.no_selection);
            if let Some(color) = args.color {
                values = values.with_color(color);
            }
            if let Some(path) = args.reference {
                values = values.with_reference_image(Attachment::path(path));
            }

            let form = FormController::new(client);
            let submission = form.submit(values).await?;
            log::info!(
                "{} {}",
                submission.notification.title,
                submission.notification.description
            );
            match submission.generated_image {
                Some(image) => emit(&image, args.output.output.as_deref()).await?,
                None => return Err(submission.notification.description.into()),
            }
        }
        Commands::Generate(args) => {
            let response = client
                .generate_image_from_prompt(&PromptGenRequest::new(args.prompt))
                .await?;
            emit(&response.image_data_uri, args.output.output.as_deref()).await?;
        }
        Commands::Influence(args) => {
            let reference = Attachment::path(args.reference).read_data_uri().await?;
            let response = client
                .reference_image_influence(&InfluenceRequest::new(args.prompt, reference))
                .await?;
            emit(&response.updated_image_data_uri, args.output.output.as_deref()).await?;
        }
        #[cfg(feature = "server")]
        Commands::Serve => genfill::server::run(&config, client).await?,
    }

    Ok(())
}

async fn emit(data_uri: &str, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => {
            let bytes = DataUri::parse(data_uri)?.decode()?;
            tokio::fs::write(path, &bytes).await?;
            log::info!("💾 Image saved to: {}", path.display());
        }
        None => println!("{}", data_uri),
    }
    Ok(())
}
