use serde::Serialize;
use std::path::Path;
use tera::{Context, Error as TeraError, Tera};

use crate::models::tool::ToolDescriptor;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

#[derive(Serialize)]
struct SystemContext<'a> {
    tools: &'a [ToolDescriptor],
    cwd: String,
}

/// The built-in system prompt, listing `tools` and the working directory
pub fn system_prompt(tools: &[ToolDescriptor], cwd: &Path) -> Result<String, TeraError> {
    load_prompt(
        SYSTEM_TEMPLATE,
        &SystemContext {
            tools,
            cwd: cwd.display().to_string(),
        },
    )
}
