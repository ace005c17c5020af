//! Sight line endpoints

use glam::DVec2;
use serde::{Deserialize, Serialize};
use sightline_core::{CharacterShape, Item, ItemId};

use crate::error::HostResult;
use crate::host::ItemApi;

/// Where a sight line endpoint is
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Pin {
    /// Fixed world position
    Location(DVec2),
    /// Follows a token
    Token {
        id: ItemId,
        /// Token position when last looked up
        cached_position: DVec2,
        offset: DVec2,
    },
}

impl Pin {
    /// Pin `pointer` to `target` if it is a token, else to the location
    pub fn from_pointer(pointer: DVec2, target: Option<&Item>) -> Self {
        match target {
            Some(item) if item.is_token() => Pin::Token {
                id: item.id,
                cached_position: item.position,
                offset: pointer - item.position,
            },
            _ => Pin::Location(pointer),
        }
    }

    /// Pin `point` to the token footprint it falls in
    pub fn on_shape(point: DVec2, shape: &CharacterShape) -> Self {
        Pin::Token {
            id: shape.id,
            cached_position: shape.position,
            offset: point - shape.position,
        }
    }

    /// Resolved world location
    pub fn location(&self) -> DVec2 {
        match self {
            Pin::Location(position) => *position,
            Pin::Token {
                cached_position,
                offset,
                ..
            } => *cached_position + *offset,
        }
    }

    pub fn token_id(&self) -> Option<ItemId> {
        match self {
            Pin::Location(_) => None,
            Pin::Token { id, .. } => Some(*id),
        }
    }

    /// Where a marker icon for this pin goes
    pub fn icon_position(&self) -> Option<DVec2> {
        match self {
            Pin::Location(_) => None,
            Pin::Token {
                cached_position, ..
            } => Some(*cached_position),
        }
    }
}

/// Refresh a token pin's cached position from the store
///
/// A pin whose token was deleted becomes a location pin at its last
/// resolved location.
pub async fn refresh_pin<A: ItemApi>(pin: Pin, items: &A) -> HostResult<Pin> {
    let Pin::Token { id, offset, .. } = pin else {
        return Ok(pin);
    };
    let found = items.get_items(Some(&[id][..])).await?;
    Ok(match found.into_iter().find(|item| item.id == id) {
        Some(item) => Pin::Token {
            id,
            cached_position: item.position,
            offset,
        },
        None => Pin::Location(pin.location()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryItemStore;
    use sightline_core::{ImageContent, ImageGrid};

    fn token_at(position: DVec2) -> Item {
        Item::image(
            ImageContent {
                width: 150.0,
                height: 150.0,
                url: String::new(),
            },
            ImageGrid {
                dpi: 150.0,
                offset: DVec2::splat(75.0),
            },
        )
        .with_position(position)
    }

    #[test]
    fn test_from_pointer() {
        let token = token_at(DVec2::new(100.0, 100.0));
        let pin = Pin::from_pointer(DVec2::new(110.0, 90.0), Some(&token));
        assert_eq!(pin.token_id(), Some(token.id));
        assert_eq!(pin.location(), DVec2::new(110.0, 90.0));
        assert_eq!(pin.icon_position(), Some(DVec2::new(100.0, 100.0)));

        let label = Item::label("not a token");
        let pin = Pin::from_pointer(DVec2::ONE, Some(&label));
        assert_eq!(pin, Pin::Location(DVec2::ONE));
    }

    #[tokio::test]
    async fn test_refresh_follows_token() {
        let store = MemoryItemStore::new();
        let token = token_at(DVec2::ZERO);
        store.add_items(vec![token.clone()]).await.unwrap();

        let pin = Pin::from_pointer(DVec2::new(5.0, 5.0), Some(&token));
        store
            .update_items(&[token.id], |items| items[0].position = DVec2::new(300.0, 0.0))
            .await
            .unwrap();

        let refreshed = refresh_pin(pin, &store).await.unwrap();
        assert_eq!(refreshed.location(), DVec2::new(305.0, 5.0));
    }

    #[tokio::test]
    async fn test_refresh_deleted_token_degrades() {
        let store = MemoryItemStore::new();
        let token = token_at(DVec2::new(10.0, 10.0));
        let pin = Pin::from_pointer(DVec2::new(12.0, 10.0), Some(&token));

        let refreshed = refresh_pin(pin, &store).await.unwrap();
        assert_eq!(refreshed, Pin::Location(DVec2::new(12.0, 10.0)));

        let location = Pin::Location(DVec2::ONE);
        assert_eq!(refresh_pin(location, &store).await.unwrap(), location);
    }
}
