//! Template rendering for channel payloads.

pub mod render;
pub mod store;

pub use render::{email_html, escape_html, missing_variables, render_string};
pub use store::{RenderedContent, TemplateStore};
