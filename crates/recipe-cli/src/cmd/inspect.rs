//! Print the resolved recipe

use anyhow::Result;

use crate::RecipeArgs;

/// Run every resolution hook and print the recipe as pretty JSON.
pub fn inspect(args: &RecipeArgs) -> Result<()> {
    let mut recipe = args.prepare()?;
    args.resolve(&mut recipe)?;
    recipe.resolve_toolchain()?;

    println!("{}", serde_json::to_string_pretty(&recipe.summary())?);
    Ok(())
}
