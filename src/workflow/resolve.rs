use super::types::{DisplayItem, Region};

/// Resolve selected region ids into display items.
///
/// Keeps selection order. Ids without a matching region are skipped.
pub fn resolve_display_items(selection: &[String], regions: &[Region]) -> Vec<DisplayItem> {
    selection
        .iter()
        .filter_map(|id| regions.iter().find(|region| &region.id == id))
        .map(DisplayItem::from_region)
        .collect()
}
