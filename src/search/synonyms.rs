//! Synonym table for query expansion.
//!
//! Built once from an ordered list of term groups. Each term maps to the
//! union of every group that contains it, so a term shared by two groups
//! pulls in both vocabularies. That merge is per shared term only; it is
//! not a transitive closure over the whole table.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

use tracing::debug;

/// Built-in catalog vocabulary.
pub const CATALOG_GROUPS: &[&[&str]] = &[
    // Holidays & seasonal
    &[
        "christmas", "holiday", "xmas", "festive", "santa", "ornament", "peppermint",
        "stocking", "nutcracker", "reindeer", "sleigh", "gingerbread", "jingle",
    ],
    &["valentine", "valentines", "heart", "romance", "romantic", "cupid"],
    &["halloween", "spooky", "ghost", "pumpkin", "skeleton", "bat", "witch", "skull"],
    &["easter", "bunny", "egg", "pastel"],
    &["winter", "snow", "snowflake", "snowman", "flocked", "frost", "icicle"],
    &["spring", "blossom", "bloom", "garden", "butterfly"],
    &["tropical", "palm", "tiki", "luau", "hawaiian", "island", "paradise"],
    &["patriotic", "flag", "americana", "july"],
    // Furniture
    &[
        "furniture", "sofa", "couch", "chair", "table", "ottoman", "bench", "loveseat",
        "sectional", "stool", "desk", "cabinet", "shelf", "dresser", "barstool", "lounge",
        "settee", "recliner", "rocker", "pouf",
    ],
    &[
        "seating", "chair", "sofa", "couch", "bench", "stool", "ottoman", "loveseat",
        "barstool", "lounge", "settee", "recliner", "rocker", "pouf",
    ],
    &["table", "tables", "desk", "console", "cocktail", "bistro", "coffee"],
    &["sofa", "couch", "loveseat", "sectional", "settee"],
    &["chair", "chairs", "stool", "stools", "barstool"],
    // Lighting
    &[
        "lighting", "light", "lights", "lamp", "chandelier", "sconce", "lantern",
        "candelabra", "pendant", "led", "neon", "stringer", "illuminated", "glow",
        "marquee", "lighted",
    ],
    &["sign", "signs", "led", "neon", "marquee", "lighted"],
    &["candle", "candles", "candelabra", "taper", "votive", "pillar", "tealight"],
    // Linens & fabric
    &[
        "linen", "linens", "tablecloth", "napkin", "runner", "overlay", "sash", "drape",
        "drapes", "curtain", "curtains", "fabric", "textile",
    ],
    &["drape", "drapes", "curtain", "curtains", "panel", "backdrop"],
    &[
        "velvet", "satin", "silk", "lamour", "bengaline", "organza", "taffeta", "sequin",
        "polyester", "chiffon", "tulle", "lace",
    ],
    // Decor & florals
    &["decor", "decoration", "decorations", "decorative", "centerpiece", "accent"],
    &[
        "floral", "florals", "flower", "flowers", "bloom", "blossom", "bouquet",
        "arrangement", "greenery", "foliage", "fern", "eucalyptus", "ivy",
    ],
    &["wreath", "garland", "greenery", "pine", "fir", "evergreen", "vine"],
    &["vase", "vases", "planter", "planters", "pot", "urn", "vessel", "bowl"],
    &["mirror", "mirrors", "reflective", "mirrored"],
    // Structures & backdrops
    &["arch", "arches", "arbor", "pergola", "chuppah", "trellis"],
    &["backdrop", "backdrops", "wall", "panel", "screen", "divider", "partition"],
    &["tent", "canopy", "pavilion", "yurt", "marquee"],
    &[
        "outdoor", "patio", "garden", "tent", "canopy", "umbrella", "yurt", "hedge",
        "planter", "arch", "exterior",
    ],
    // Bar & beverage
    &["bar", "bars", "bartop", "keg", "beverage", "cocktail", "drink"],
    // Dinnerware & tabletop
    &[
        "dinnerware", "plate", "plates", "charger", "chargers", "glass", "glasses",
        "goblet", "goblets", "flatware", "silverware", "cup", "cups", "bowl", "platter",
        "china", "tableware", "place setting",
    ],
    // Colors
    &["red", "crimson", "scarlet", "burgundy", "maroon", "ruby", "cardinal", "wine", "cherry"],
    &["blue", "navy", "cobalt", "royal", "sapphire", "teal", "turquoise", "indigo", "azure"],
    &["green", "emerald", "sage", "olive", "forest", "hunter", "lime", "mint", "jade"],
    &["pink", "blush", "rose", "fuchsia", "magenta", "coral", "salmon"],
    &["purple", "violet", "lavender", "plum", "lilac", "amethyst", "mauve"],
    &["orange", "tangerine", "amber", "copper", "rust", "peach", "terracotta"],
    &["gold", "golden", "brass", "gilded", "champagne"],
    &["silver", "chrome", "metallic", "pewter", "platinum", "nickel"],
    &["white", "ivory", "cream", "pearl", "alabaster", "off-white"],
    &["black", "onyx", "ebony", "noir", "matte"],
    &["brown", "walnut", "mahogany", "espresso", "chocolate", "mocha", "tan", "caramel"],
    &["clear", "transparent", "acrylic", "lucite", "glass", "crystal"],
    // Materials
    &[
        "wood", "wooden", "timber", "oak", "walnut", "mahogany", "birch", "bamboo",
        "reclaimed", "driftwood", "teak", "cedar",
    ],
    &["metal", "iron", "steel", "aluminum", "brass", "copper", "wrought"],
    &["marble", "stone", "granite", "concrete", "slate", "terrazzo"],
    &["rattan", "wicker", "woven", "cane", "bamboo"],
    // Styles
    &["rustic", "farmhouse", "barn", "country", "burlap", "distressed", "reclaimed"],
    &["modern", "contemporary", "sleek", "minimal", "minimalist", "clean"],
    &["vintage", "retro", "antique", "classic", "old"],
    &[
        "glam", "glamorous", "luxe", "luxury", "opulent", "sparkle", "sequin", "crystal",
        "rhinestone",
    ],
    &["bohemian", "boho", "eclectic", "macrame", "woven"],
    &["industrial", "urban", "loft", "pipe", "exposed", "raw"],
    &["elegant", "formal", "sophisticated", "refined", "classic", "timeless"],
    // Event types
    &["wedding", "bridal", "ceremony", "reception", "aisle", "altar", "chapel"],
    &["party", "celebration", "birthday", "fiesta", "gala", "bash"],
    &["corporate", "conference", "meeting", "trade", "expo", "summit"],
    // Trees & plants
    &["tree", "trees", "topiary", "palm", "ficus", "fiddle", "olive"],
];

static CATALOG: LazyLock<SynonymTable> = LazyLock::new(|| SynonymTable::from_groups(CATALOG_GROUPS));

/// The process-wide table built from [`CATALOG_GROUPS`].
#[must_use]
pub fn catalog() -> &'static SynonymTable {
    &CATALOG
}

/// Immutable term -> related-terms lookup.
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    related: HashMap<String, HashSet<String>>,
    /// Term -> indices of the groups containing it, only for terms in 2+ groups.
    overlaps: BTreeMap<String, Vec<usize>>,
    group_count: usize,
}

impl SynonymTable {
    /// Build the table from (possibly overlapping) groups.
    ///
    /// Terms are lowercased and trimmed; empty terms are ignored.
    pub fn from_groups<G, T>(groups: &[G]) -> Self
    where
        G: AsRef<[T]>,
        T: AsRef<str>,
    {
        let mut related: HashMap<String, HashSet<String>> = HashMap::new();
        let mut membership: BTreeMap<String, Vec<usize>> = BTreeMap::new();

        for (idx, group) in groups.iter().enumerate() {
            let members: BTreeSet<String> = group
                .as_ref()
                .iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();

            for term in &members {
                related
                    .entry(term.clone())
                    .or_default()
                    .extend(members.iter().cloned());
                membership.entry(term.clone()).or_default().push(idx);
            }
        }

        let overlaps: BTreeMap<String, Vec<usize>> = membership
            .into_iter()
            .filter(|(_, groups)| groups.len() > 1)
            .collect();

        if !overlaps.is_empty() {
            debug!(
                terms = overlaps.len(),
                "synonym terms shared across groups merge those groups' vocabularies"
            );
        }

        Self {
            related,
            overlaps,
            group_count: groups.len(),
        }
    }

    /// Every term interchangeable with `term`, including `term` itself.
    ///
    /// Unknown terms yield an empty set.
    #[must_use]
    pub fn related_terms(&self, term: &str) -> BTreeSet<&str> {
        self.related
            .get(term)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, term: &str) -> bool {
        self.related.contains_key(term)
    }

    /// Terms that appear in more than one group, with the group indices.
    #[must_use]
    pub const fn overlaps(&self) -> &BTreeMap<String, Vec<usize>> {
        &self.overlaps
    }

    /// Number of distinct terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.related.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.related.is_empty()
    }

    #[must_use]
    pub const fn group_count(&self) -> usize {
        self.group_count
    }
}
