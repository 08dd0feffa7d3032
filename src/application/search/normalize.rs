use mealie_api_types::RecipeDocument;

/// Flatten a recipe into one lower-cased, space-separated search string.
///
/// Field order: name, description, source URL, notes, tools, tags,
/// categories, ingredients (note, display, original text, food name),
/// instructions. Empty fields contribute nothing.
pub fn normalize(recipe: &RecipeDocument) -> String {
    let ingredients = recipe.recipe_ingredient.iter().flat_map(|ingredient| {
        [
            ingredient.note.as_str(),
            ingredient.display.as_str(),
            ingredient.original_text.as_str(),
            ingredient
                .food
                .as_ref()
                .map_or("", |food| food.name.as_str()),
        ]
    });

    let parts = [
        recipe.name.as_str(),
        recipe.description.as_str(),
        recipe.org_url.as_str(),
    ]
    .into_iter()
    .chain(recipe.notes.iter().map(|note| note.text.as_str()))
    .chain(recipe.tools.iter().map(|tool| tool.name.as_str()))
    .chain(recipe.tags.iter().map(|tag| tag.name.as_str()))
    .chain(recipe.recipe_category.iter().map(|cat| cat.name.as_str()))
    .chain(ingredients)
    .chain(recipe.recipe_instructions.iter().map(|step| step.text.as_str()))
    .filter(|part| !part.is_empty());

    let mut text = String::new();
    for part in parts {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(part);
    }
    text.to_lowercase()
}
