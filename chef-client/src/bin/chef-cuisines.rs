use std::sync::Arc;

use anyhow::{Context, Result};
use chef::{OpenAiModel, PromptService};
use chef_client::{
    cuisines::{filter_cuisines, parse_cuisines},
    ChefApi,
};
use clap::Parser;

/// List the cuisines native to a continent
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// The continent, e.g. "Africa" or "South America"
    continent: String,
    /// Only show cuisines containing this text
    #[arg(short, long)]
    filter: Option<String>,
    /// Print the model's answer as-is instead of one cuisine per line
    #[arg(long)]
    raw: bool,
    /// URL of the server to ask
    #[arg(long, default_value = "http://localhost:3000")]
    server: String,
    /// Call the model directly instead of going through a server
    #[arg(long)]
    local: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let answer = if args.local {
        let model = OpenAiModel::from_env().context("Configuring the model client")?;
        let prompts = PromptService::new(Arc::new(model))?;
        prompts.list_cuisines_for_continent(&args.continent).await?
    } else {
        ChefApi::new(args.server)
            .cuisines_across(&args.continent)
            .await
            .context("Requesting cuisines")?
    };

    if args.raw {
        println!("{}", answer);
        return Ok(());
    }

    let cuisines = parse_cuisines(&answer);
    let shown = filter_cuisines(&cuisines, args.filter.as_deref().unwrap_or_default());
    if shown.is_empty() {
        eprintln!("No cuisines found.");
    }
    for cuisine in shown {
        println!("{}", cuisine);
    }
    Ok(())
}
