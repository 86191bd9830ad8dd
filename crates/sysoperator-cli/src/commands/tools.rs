//! Tool catalogue listing.

use crate::AppContext;

pub fn run(ctx: &AppContext, json: bool) -> anyhow::Result<()> {
    let catalog = ctx.dispatcher.catalog();
    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    let width = catalog.iter().map(|tool| tool.name.len()).max().unwrap_or(0);
    for tool in &catalog {
        println!("{:width$}  {}", tool.name, tool.description, width = width);
    }
    Ok(())
}
