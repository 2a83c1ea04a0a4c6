//! Color → category lookup for hand-painted masks.
//!
//! A [`CategoryTable`] is built once (from the built-in table or a config
//! file) and shared read-only by every conversion worker.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{MaskError, Result};

/// RGB key of a mask color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct MaskColor(pub [u8; 3]);

impl MaskColor {
    pub const BLACK: MaskColor = MaskColor([0, 0, 0]);

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }
}

impl From<image::Rgb<u8>> for MaskColor {
    fn from(pixel: image::Rgb<u8>) -> Self {
        Self(pixel.0)
    }
}

impl fmt::Display for MaskColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "({}, {}, {})", r, g, b)
    }
}

impl FromStr for MaskColor {
    type Err = MaskError;

    fn from_str(s: &str) -> Result<Self> {
        let inner = s.trim().trim_start_matches('(').trim_end_matches(')');
        let channels = inner
            .split(',')
            .map(|part| part.trim().parse::<u8>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| MaskError::InvalidColor(s.to_string()))?;

        match channels.as_slice() {
            [r, g, b] => Ok(Self([*r, *g, *b])),
            _ => Err(MaskError::InvalidColor(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Category {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColorEntry {
    pub color: MaskColor,
    pub category: u32,
}

/// Mapping from category names to ids and from mask colors to ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryTable {
    categories: Vec<Category>,
    colors: Vec<ColorEntry>,
    #[serde(default = "default_background")]
    background: MaskColor,
    /// Categories whose polygons are combined into a single annotation.
    #[serde(default)]
    multipolygon_ids: BTreeSet<u32>,
    #[serde(skip)]
    ignore_background: bool,
}

fn default_background() -> MaskColor {
    MaskColor::BLACK
}

const TIP_COLORS: [[u8; 3]; 8] = [
    [255, 0, 0],
    [255, 255, 0],
    [128, 0, 255],
    [255, 128, 0],
    [0, 0, 255],
    [128, 255, 255],
    [0, 255, 0],
    [128, 128, 128],
];

impl CategoryTable {
    /// Build a table and check its invariants.
    pub fn new(
        categories: Vec<Category>,
        colors: Vec<ColorEntry>,
        background: MaskColor,
        multipolygon_ids: impl IntoIterator<Item = u32>,
    ) -> Result<Self> {
        let table = Self {
            categories,
            colors,
            background,
            multipolygon_ids: multipolygon_ids.into_iter().collect(),
            ignore_background: false,
        };
        table.validate()?;
        Ok(table)
    }

    /// The microscope-tip table: black background plus eight tip colors,
    /// every category annotated as a multi-polygon.
    pub fn tips() -> Self {
        let mut categories = vec![Category { id: 0, name: "background".to_string() }];
        let mut colors = vec![ColorEntry { color: MaskColor::BLACK, category: 0 }];

        for (i, rgb) in TIP_COLORS.iter().enumerate() {
            let id = i as u32 + 1;
            categories.push(Category { id, name: format!("tip{}", id) });
            colors.push(ColorEntry { color: MaskColor(*rgb), category: id });
        }

        Self {
            multipolygon_ids: categories.iter().map(|c| c.id).collect(),
            categories,
            colors,
            background: MaskColor::BLACK,
            ignore_background: false,
        }
    }

    /// Check id uniqueness and that every color points at a known category.
    pub fn validate(&self) -> Result<()> {
        let mut ids = BTreeSet::new();
        for category in &self.categories {
            if !ids.insert(category.id) {
                return Err(MaskError::InvalidCategoryTable(format!(
                    "duplicate category id {}",
                    category.id
                )));
            }
        }

        let mut seen = BTreeSet::new();
        for entry in &self.colors {
            if !seen.insert(entry.color) {
                return Err(MaskError::InvalidCategoryTable(format!(
                    "color {} registered twice",
                    entry.color
                )));
            }
            if !ids.contains(&entry.category) {
                return Err(MaskError::InvalidCategoryTable(format!(
                    "color {} maps to unknown category {}",
                    entry.color, entry.category
                )));
            }
        }

        if let Some(id) = self.multipolygon_ids.iter().find(|id| !ids.contains(id)) {
            return Err(MaskError::InvalidCategoryTable(format!(
                "multipolygon id {} is not a category",
                id
            )));
        }

        Ok(())
    }

    /// Drop the background color, its category and its multipolygon flag.
    pub fn with_ignore_background(mut self, ignore: bool) -> Self {
        if !ignore || self.ignore_background {
            return self;
        }

        let background = self.background;
        let background_ids: BTreeSet<u32> = self
            .colors
            .iter()
            .filter(|entry| entry.color == background)
            .map(|entry| entry.category)
            .collect();

        self.colors.retain(|entry| entry.color != background);
        self.categories.retain(|c| !background_ids.contains(&c.id));
        self.multipolygon_ids.retain(|id| !background_ids.contains(id));
        self.ignore_background = true;
        self
    }

    /// Map every non-background color to one category with id 1.
    pub fn collapse_to_one_class(self) -> Self {
        let background = self.background;
        let background_id = self
            .colors
            .iter()
            .find(|entry| entry.color == background)
            .map(|entry| entry.category);

        let name = self
            .categories
            .iter()
            .find(|c| Some(c.id) != background_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "object".to_string());

        let mut categories = Vec::new();
        if let Some(bg) = background_id.and_then(|id| self.categories.iter().find(|c| c.id == id)) {
            categories.push(Category { id: 0, name: bg.name.clone() });
        }
        categories.push(Category { id: 1, name });

        let colors = self
            .colors
            .iter()
            .map(|entry| ColorEntry {
                color: entry.color,
                category: if entry.color == background { 0 } else { 1 },
            })
            .collect();

        let mut multipolygon_ids = BTreeSet::new();
        if background_id.is_some_and(|id| self.multipolygon_ids.contains(&id)) {
            multipolygon_ids.insert(0);
        }
        if self
            .multipolygon_ids
            .iter()
            .any(|id| Some(*id) != background_id)
        {
            multipolygon_ids.insert(1);
        }

        Self {
            categories,
            colors,
            background,
            multipolygon_ids,
            ignore_background: self.ignore_background,
        }
    }

    /// Look up the category of a mask color.
    pub fn category_of(&self, color: MaskColor) -> Result<u32> {
        self.colors
            .iter()
            .find(|entry| entry.color == color)
            .map(|entry| entry.category)
            .ok_or(MaskError::UnknownColor { color })
    }

    /// Color used when a category is rendered, the last registered one wins.
    pub fn representative_color(&self, id: u32) -> Option<MaskColor> {
        self.colors
            .iter()
            .rev()
            .find(|entry| entry.category == id)
            .map(|entry| entry.color)
    }

    pub fn is_multipolygon(&self, id: u32) -> bool {
        self.multipolygon_ids.contains(&id)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn colors(&self) -> &[ColorEntry] {
        &self.colors
    }

    pub fn background(&self) -> MaskColor {
        self.background
    }

    pub fn ignores_background(&self) -> bool {
        self.ignore_background
    }

    /// Category id → name, sorted by id.
    pub fn names(&self) -> BTreeMap<u32, &str> {
        self.categories
            .iter()
            .map(|c| (c.id, c.name.as_str()))
            .collect()
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::tips()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tips_lookup() {
        let table = CategoryTable::tips();
        assert_eq!(table.category_of(MaskColor::new(255, 0, 0)).unwrap(), 1);
        assert_eq!(table.category_of(MaskColor::new(128, 128, 128)).unwrap(), 8);
        assert_eq!(table.category_of(MaskColor::BLACK).unwrap(), 0);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_unknown_color() {
        let table = CategoryTable::tips();
        let err = table.category_of(MaskColor::new(1, 2, 3)).unwrap_err();
        match err {
            MaskError::UnknownColor { color } => assert_eq!(color, MaskColor::new(1, 2, 3)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ignore_background_removes_entry() {
        let table = CategoryTable::tips().with_ignore_background(true);
        assert!(table.ignores_background());
        assert!(table.category_of(MaskColor::BLACK).is_err());
        assert!(!table.is_multipolygon(0));
        assert!(table.categories().iter().all(|c| c.id != 0));
        assert_eq!(table.categories().len(), 8);
    }

    #[test]
    fn test_one_class_collapse() {
        let table = CategoryTable::tips().collapse_to_one_class();
        assert_eq!(table.categories().len(), 2);
        assert_eq!(table.category_of(MaskColor::new(0, 255, 0)).unwrap(), 1);
        assert_eq!(table.category_of(MaskColor::BLACK).unwrap(), 0);
        assert_eq!(table.names()[&1], "tip1");
        // last registered color for id 1
        assert_eq!(table.representative_color(1), Some(MaskColor::new(128, 128, 128)));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = CategoryTable::new(
            vec![
                Category { id: 1, name: "a".into() },
                Category { id: 1, name: "b".into() },
            ],
            vec![],
            MaskColor::BLACK,
            [],
        );
        assert!(matches!(result, Err(MaskError::InvalidCategoryTable(_))));
    }

    #[test]
    fn test_color_to_missing_category_rejected() {
        let result = CategoryTable::new(
            vec![Category { id: 0, name: "background".into() }],
            vec![ColorEntry { color: MaskColor::new(9, 9, 9), category: 4 }],
            MaskColor::BLACK,
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!("(255, 0, 0)".parse::<MaskColor>().unwrap(), MaskColor::new(255, 0, 0));
        assert_eq!("1,2,3".parse::<MaskColor>().unwrap(), MaskColor::new(1, 2, 3));
        assert!("1,2".parse::<MaskColor>().is_err());
        assert!("(300, 0, 0)".parse::<MaskColor>().is_err());
        assert_eq!(MaskColor::new(1, 2, 3).to_string(), "(1, 2, 3)");
    }

    #[test]
    fn test_table_json_roundtrip_keeps_flags() {
        let table = CategoryTable::tips();
        let json = serde_json::to_string(&table).unwrap();
        let parsed: CategoryTable = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, table);
        assert!(parsed.is_multipolygon(3));
    }
}
