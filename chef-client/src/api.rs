use reqwest::{Client, StatusCode};

lazy_static::lazy_static! {
    pub(crate) static ref HTTP_CLIENT: Client = Client::new();
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server answered {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Talks to a running chef-server.
#[derive(Debug, Clone)]
pub struct ChefApi {
    server: String,
}

impl ChefApi {
    pub fn new(server: impl Into<String>) -> Self {
        let server: String = server.into();
        Self {
            server: server.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.server, path.trim_start_matches('/'))
    }

    /// Ask the server for a recipe. Ingredients are sent comma separated.
    pub async fn create_recipe(
        &self,
        ingredients: &[String],
        cuisine: &str,
        dietary_restrictions: &str,
    ) -> Result<String, ApiError> {
        let ingredients = join_ingredients(ingredients);
        self.get_text(
            "recipe-creater",
            &[
                ("ingredients", ingredients.as_str()),
                ("cuisine", cuisine),
                ("dieteryRestrictions", dietary_restrictions),
            ],
        )
        .await
    }

    /// Ask the server which cuisines are native to `continent`.
    pub async fn cuisines_across(&self, continent: &str) -> Result<String, ApiError> {
        self.get_text("cuisinesacross", &[("continent", continent)])
            .await
    }

    async fn get_text(&self, path: &str, query: &[(&str, &str)]) -> Result<String, ApiError> {
        let url = self.endpoint(path);
        tracing::debug!("GET {}", url);
        let response = HTTP_CLIENT.get(&url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status { status, body });
        }
        Ok(body)
    }
}

/// Flatten ingredient arguments into one comma separated list. Each argument
/// may itself hold several comma separated ingredients.
pub fn join_ingredients(ingredients: &[String]) -> String {
    ingredients
        .iter()
        .flat_map(|item| item.split(','))
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}
