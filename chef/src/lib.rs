//! Turn recipe and cuisine questions into prompts and ask a model.
//!
//! - [`template`]: `{name}` templates, parameter sets and rendered prompts
//! - [`llm`]: the [`ModelClient`] trait and an OpenAI-compatible backend
//! - [`service`]: [`PromptService`], which owns the two fixed templates
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chef::{OpenAiModel, PromptService};
//!
//! let model = OpenAiModel::from_env()?;
//! let service = PromptService::new(Arc::new(model))?;
//! let recipe = service.create_recipe("eggs, flour", "Italian", "none").await?;
//! println!("{recipe}");
//! ```

pub mod config;
pub mod errors;
pub mod llm;
pub mod service;
pub mod template;

pub use config::ModelConfig;
pub use errors::{ConfigError, ModelError, PromptError, TemplateError};
pub use llm::{Completion, ModelClient, ModelResponse, OpenAiModel, Usage};
pub use service::{PromptKind, PromptService};
pub use template::{render, ParameterSet, Prompt, Template};

#[cfg(any(test, feature = "stub"))]
pub use llm::StubModel;
