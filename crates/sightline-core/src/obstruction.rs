//! Obstruction Model
//!
//! Classifies scene items as partial cover candidates and configured
//! obstructions. Solidity is used everywhere: 0 means no cover, 1 means
//! full cover. Items carrying the inverse `permissiveness` value are
//! flipped on ingestion.

use serde_json::Value;

use crate::types::{Item, ItemKind, Metadata};

/// Solidity metadata key (0 = no cover, 1 = full cover)
pub const METADATA_KEY_SOLIDITY: &str = "com.sightline/solidity";
/// Inverse convention (0 = fully blocks, 1 = fully passes)
pub const METADATA_KEY_PERMISSIVENESS: &str = "com.sightline/permissiveness";
/// Set on indicator items created by the drag tool
pub const METADATA_KEY_IS_CONTROL: &str = "com.sightline/isControl";
/// Set by the smoke & spectre vision-line integration
pub const METADATA_KEY_VISION_LINE: &str = "com.battle-system.smoke/isVisionLine";

/// Result of a ray that crosses nothing
pub const SOLIDITY_NO_COVER: f64 = 0.0;
pub const SOLIDITY_FULL_COVER: f64 = 1.0;
/// Solidity given to freshly configured cover
pub const DEFAULT_COVER_SOLIDITY: f64 = 0.5;

/// An item eligible to carry a solidity value
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub item: &'a Item,
    /// `None` while the item is pending configuration
    pub solidity: Option<f64>,
}

impl<'a> Candidate<'a> {
    pub fn is_configured(&self) -> bool {
        self.solidity.is_some()
    }

    /// Promote to an obstruction if configured
    pub fn into_obstruction(self) -> Option<Obstruction<'a>> {
        self.solidity.map(|solidity| Obstruction {
            item: self.item,
            solidity,
        })
    }
}

/// A candidate with a defined solidity
#[derive(Debug, Clone, Copy)]
pub struct Obstruction<'a> {
    pub item: &'a Item,
    pub solidity: f64,
}

/// Raw solidity metadata state
enum SolidityValue {
    Absent,
    Number(f64),
    Malformed,
}

fn read_solidity(metadata: &Metadata) -> SolidityValue {
    if let Some(value) = metadata.get(METADATA_KEY_SOLIDITY) {
        return match value.as_f64() {
            Some(solidity) => SolidityValue::Number(solidity.clamp(0.0, 1.0)),
            None => SolidityValue::Malformed,
        };
    }
    if let Some(value) = metadata.get(METADATA_KEY_PERMISSIVENESS) {
        return match value.as_f64() {
            Some(permissiveness) => SolidityValue::Number(1.0 - permissiveness.clamp(0.0, 1.0)),
            None => SolidityValue::Malformed,
        };
    }
    SolidityValue::Absent
}

/// True when the flag is absent or explicitly `false`
fn flag_is_unset(metadata: &Metadata, key: &str) -> bool {
    match metadata.get(key) {
        None => true,
        Some(value) => value == &Value::Bool(false),
    }
}

/// Whether the item's geometry can act as cover
fn has_candidate_geometry(item: &Item) -> bool {
    match &item.kind {
        ItemKind::Curve { tension, .. } => *tension == 0.0,
        ItemKind::Line { .. } | ItemKind::Shape { .. } | ItemKind::Path { .. } => true,
        ItemKind::Image { .. } | ItemKind::Label { .. } | ItemKind::Wall { .. } => false,
    }
}

/// Whether the item was created as a tool indicator
pub fn is_control(item: &Item) -> bool {
    item.metadata.get(METADATA_KEY_IS_CONTROL) == Some(&Value::Bool(true))
}

/// Classify an item as a cover candidate
pub fn classify_candidate(item: &Item) -> Option<Candidate<'_>> {
    if !has_candidate_geometry(item)
        || !flag_is_unset(&item.metadata, METADATA_KEY_IS_CONTROL)
        || !flag_is_unset(&item.metadata, METADATA_KEY_VISION_LINE)
    {
        return None;
    }
    let solidity = match read_solidity(&item.metadata) {
        SolidityValue::Absent => None,
        SolidityValue::Number(solidity) => Some(solidity),
        SolidityValue::Malformed => return None,
    };
    Some(Candidate { item, solidity })
}

/// Classify an item as a configured obstruction
pub fn classify_obstruction(item: &Item) -> Option<Obstruction<'_>> {
    classify_candidate(item)?.into_obstruction()
}

/// Whether the item is a permanent wall
pub fn is_wall(item: &Item) -> bool {
    matches!(item.kind, ItemKind::Wall { .. })
}

/// Turn a candidate into cover with the given solidity
pub fn configure_cover(item: &mut Item, solidity: f64) {
    item.metadata.remove(METADATA_KEY_PERMISSIVENESS);
    item.metadata
        .insert(METADATA_KEY_SOLIDITY.to_string(), Value::from(solidity.clamp(0.0, 1.0)));
}

/// Return an obstruction to the pending state
pub fn clear_cover(item: &mut Item) {
    item.metadata.remove(METADATA_KEY_SOLIDITY);
    item.metadata.remove(METADATA_KEY_PERMISSIVENESS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ShapeType;
    use approx::assert_relative_eq;
    use glam::DVec2;

    fn square() -> Item {
        Item::curve(
            vec![
                DVec2::ZERO,
                DVec2::new(10.0, 0.0),
                DVec2::new(10.0, 10.0),
                DVec2::new(0.0, 10.0),
            ],
            true,
        )
    }

    #[test]
    fn test_pending_candidate() {
        let item = square();
        let candidate = classify_candidate(&item).unwrap();
        assert!(!candidate.is_configured());
        assert!(classify_obstruction(&item).is_none());
    }

    #[test]
    fn test_configured_obstruction() {
        let item = Item::shape(ShapeType::Hexagon, 50.0, 50.0)
            .with_metadata(METADATA_KEY_SOLIDITY, Value::from(0.25));
        let obstruction = classify_obstruction(&item).unwrap();
        assert_relative_eq!(obstruction.solidity, 0.25);
    }

    #[test]
    fn test_permissiveness_is_flipped() {
        let item = Item::line(DVec2::ZERO, DVec2::X)
            .with_metadata(METADATA_KEY_PERMISSIVENESS, Value::from(0.2));
        let obstruction = classify_obstruction(&item).unwrap();
        assert_relative_eq!(obstruction.solidity, 0.8);
    }

    #[test]
    fn test_rejections() {
        let mut smooth = square();
        if let ItemKind::Curve { tension, .. } = &mut smooth.kind {
            *tension = 0.5;
        }
        assert!(classify_candidate(&smooth).is_none());

        let control = square().with_metadata(METADATA_KEY_IS_CONTROL, Value::Bool(true));
        assert!(classify_candidate(&control).is_none());

        let not_control = square().with_metadata(METADATA_KEY_IS_CONTROL, Value::Bool(false));
        assert!(classify_candidate(&not_control).is_some());

        let vision = square().with_metadata(METADATA_KEY_VISION_LINE, Value::Bool(true));
        assert!(classify_candidate(&vision).is_none());

        let malformed = square().with_metadata(METADATA_KEY_SOLIDITY, Value::from("half"));
        assert!(classify_candidate(&malformed).is_none());

        assert!(classify_candidate(&Item::label("text")).is_none());
        assert!(classify_candidate(&Item::wall(vec![DVec2::ZERO, DVec2::X])).is_none());
    }

    #[test]
    fn test_configure_and_clear() {
        let mut item = square().with_metadata(METADATA_KEY_PERMISSIVENESS, Value::from(1.0));
        configure_cover(&mut item, 1.5);
        assert_relative_eq!(classify_obstruction(&item).unwrap().solidity, 1.0);

        clear_cover(&mut item);
        assert!(classify_obstruction(&item).is_none());
        assert!(classify_candidate(&item).is_some());
    }
}
