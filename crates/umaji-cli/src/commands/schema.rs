use serde::Serialize;
use umaji_schema::SchemaRegistry;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SchemaArgs;
use crate::commands::Outcome;
use crate::output::output;

#[derive(Debug, Serialize)]
struct SchemaListResponse {
    schemas: Vec<&'static str>,
}

/// Handle `umaji schema`.
pub fn handle(args: &SchemaArgs, flags: &GlobalFlags) -> anyhow::Result<Outcome> {
    let registry = SchemaRegistry::new();

    let Some(name) = args.type_name.as_deref() else {
        output(
            &SchemaListResponse {
                schemas: registry.list(),
            },
            flags.format,
        )?;
        return Ok(Outcome::Clean);
    };

    let Some(schema) = registry.get(name) else {
        anyhow::bail!(
            "unknown schema '{name}'; available: {}",
            registry.list().join(", ")
        );
    };
    output(schema, flags.format)?;
    Ok(Outcome::Clean)
}
