use crate::core::NewItem;
use crate::search::HashEmbedder;

/// Embedding width used by the sample catalog (the default `embedding.dims`).
pub const SAMPLE_DIMS: usize = 512;

/// A small event-rental catalog. Every item except the last carries a hash
/// embedding of its name.
pub fn sample_items() -> Vec<NewItem> {
    let embedder = HashEmbedder::new(SAMPLE_DIMS);
    let rows = [
        ("Gold Chiavari Chair", "Chairs", r#"{"color": "gold", "material": "resin"}"#),
        ("Acrylic Ghost Chair", "Chairs", r#"{"color": "clear"}"#),
        ("Banquet Table", "Tables", r#"{"seats": 10}"#),
        ("Round Cocktail Table", "Tables", r#"{"height": "42in"}"#),
        ("Blue Velvet Sofa", "Lounge", r#"{"color": "blue"}"#),
        ("Crystal Chandelier", "Lighting", "{}"),
    ];

    let mut items: Vec<NewItem> = rows
        .iter()
        .map(|(name, category, extra)| {
            NewItem::named(*name)
                .category(*category)
                .extra(serde_json::from_str(extra).unwrap_or_default())
                .image(format!("{}.jpg", name.to_lowercase().replace(' ', "_")))
                .embedding(embedder.embed(name))
        })
        .collect();
    items.push(NewItem::named("Mystery Crate"));
    items
}

/// Serialize items as JSON Lines, one object per line.
pub fn to_jsonl(items: &[NewItem]) -> serde_json::Result<String> {
    let lines = items
        .iter()
        .map(serde_json::to_string)
        .collect::<serde_json::Result<Vec<_>>>()?;
    Ok(lines.join("\n"))
}
