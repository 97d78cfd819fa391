//! Tera templating for output documents and template calculators.
//!
//! Targets carry a Tera template body. Once resolution has produced the final
//! argument dictionary, every target is rendered against it; each argument is a
//! top-level string variable.
//!
//! # Supported Features
//!
//! - Variable substitution: `{{ cluster_name }}`
//! - Conditional logic: `{% if oauth_enabled == "true" %}...{% endif %}`
//! - Loops over JSON-list settings: `{% for ip in master_list | from_json %}...{% endfor %}`
//! - Standard Tera filters (string manipulation, formatting)
//!
//! # Reference checking
//!
//! [`render_target`] checks the names a template references before rendering. A name
//! absent from the dictionary is an [`UnresolvedReference`] error: resolution should
//! have produced it, so this is an internal consistency failure rather than bad input.
//! No partial output is ever produced.
//!
//! ```rust,no_run
//! use dcgen_cli::catalog::Target;
//! use dcgen_cli::core::ArgumentDictionary;
//! use dcgen_cli::templating::render_all;
//!
//! # fn example() -> dcgen_cli::core::GenResult<()> {
//! let mut args = ArgumentDictionary::new();
//! args.insert("cluster_name".to_string(), "prod".to_string());
//!
//! let targets = vec![Target::from_template("cluster.conf", "name={{ cluster_name }}\n")];
//! let documents = render_all(&targets, &args)?;
//! assert_eq!(documents["cluster.conf"], "name=prod\n");
//! # Ok(())
//! # }
//! ```
//!
//! [`UnresolvedReference`]: crate::core::GenError::UnresolvedReference

pub mod error;
pub mod filters;
pub mod renderer;
pub mod utils;

pub use error::{ErrorLocation, TemplateError};
pub use renderer::{render, render_all, render_all_parallel, render_target};
pub use utils::extract_references;
