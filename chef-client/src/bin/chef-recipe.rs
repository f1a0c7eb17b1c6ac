use std::sync::Arc;

use anyhow::{Context, Result};
use chef::{OpenAiModel, PromptService};
use chef_client::{api::join_ingredients, ChefApi};
use clap::Parser;

/// Ask for a recipe built from the ingredients you have
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Ingredients to cook with. Each may also be a comma separated list
    #[arg(required = true)]
    ingredients: Vec<String>,
    /// The cuisine you prefer, e.g. "Italian"
    #[arg(short, long)]
    cuisine: String,
    /// Dietary restrictions, e.g. "Vegetarian"
    #[arg(short, long, default_value = "")]
    diet: String,
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

    let recipe = if args.local {
        let model = OpenAiModel::from_env().context("Configuring the model client")?;
        let prompts = PromptService::new(Arc::new(model))?;
        prompts
            .create_recipe(&join_ingredients(&args.ingredients), &args.cuisine, &args.diet)
            .await?
    } else {
        ChefApi::new(args.server)
            .create_recipe(&args.ingredients, &args.cuisine, &args.diet)
            .await
            .context("Requesting a recipe")?
    };

    println!("{}", recipe);
    Ok(())
}
