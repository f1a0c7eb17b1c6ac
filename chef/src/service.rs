//! The prompt generation service: render a fixed template, call the model,
//! hand back its text.

use std::sync::Arc;

use crate::errors::{PromptError, TemplateError};
use crate::llm::{ModelClient, ModelResponse};
use crate::template::{ParameterSet, Template};

pub const RECIPE_TEMPLATE: &str = include_str!("../prompts/create-recipe.md");
pub const CUISINES_TEMPLATE: &str = include_str!("../prompts/native-cuisines.md");

/// The prompts this service knows how to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum PromptKind {
    /// Placeholders: `ingredients`, `cuisine`, `dieteryRestrictions`.
    Recipe,
    /// Placeholder: `continent`.
    NativeCuisines,
}

pub struct PromptService {
    model: Arc<dyn ModelClient>,
    recipe: Template,
    native_cuisines: Template,
}

impl PromptService {
    /// Build the service, parsing both templates up front.
    pub fn new(model: Arc<dyn ModelClient>) -> Result<Self, TemplateError> {
        Ok(Self {
            model,
            recipe: Template::new(RECIPE_TEMPLATE)?,
            native_cuisines: Template::new(CUISINES_TEMPLATE)?,
        })
    }

    pub fn template(&self, kind: PromptKind) -> &Template {
        match kind {
            PromptKind::Recipe => &self.recipe,
            PromptKind::NativeCuisines => &self.native_cuisines,
        }
    }

    /// Ask the model for a recipe. Empty arguments are sent as empty text.
    pub async fn create_recipe(
        &self,
        ingredients: &str,
        cuisine: &str,
        dietary_restrictions: &str,
    ) -> Result<String, PromptError> {
        tracing::info!("Creating a new recipe ..");
        let parameters = ParameterSet::new()
            .with("ingredients", ingredients)
            .with("cuisine", cuisine)
            .with("dieteryRestrictions", dietary_restrictions);
        self.generate(PromptKind::Recipe, &parameters).await
    }

    /// Ask the model which cuisines are native to `continent`. The answer is
    /// free text, returned as the model wrote it.
    pub async fn list_cuisines_for_continent(&self, continent: &str) -> Result<String, PromptError> {
        tracing::info!("Listing cuisines of {}", continent);
        let parameters = ParameterSet::new().with("continent", continent);
        self.generate(PromptKind::NativeCuisines, &parameters).await
    }

    /// Render the template for `kind`, send it, and return the first
    /// completion's text untouched. The model is called at most once.
    pub async fn generate(
        &self,
        kind: PromptKind,
        parameters: &ParameterSet,
    ) -> Result<String, PromptError> {
        let prompt = self.template(kind).render(parameters)?;
        tracing::debug!("Prompt: {}", prompt);
        let response = self.model.invoke(&prompt).await.map_err(|err| {
            tracing::warn!(%kind, "Model call failed: {}", err);
            PromptError::from(err)
        })?;
        tracing::debug!(
            %kind,
            model = %response.model,
            total_tokens = response.usage.total_tokens,
            "Model answered"
        );
        first_text(response)
    }
}

fn first_text(response: ModelResponse) -> Result<String, PromptError> {
    let first = response
        .completions
        .into_iter()
        .next()
        .ok_or_else(|| PromptError::Extraction("model returned no completions".into()))?;
    first
        .text
        .ok_or_else(|| PromptError::Extraction("first completion has no text".into()))
}
