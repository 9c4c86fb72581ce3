/// Fish model
///
/// A fish belongs to zero or one tank. Deleting a tank leaves its fish in
/// place with a null `tank_id`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE fish (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     scientific_name VARCHAR(255) NOT NULL,
///     common_name VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL,
///     image VARCHAR(1024) NOT NULL,
///     fish_type VARCHAR(255) NOT NULL,
///     tank_id UUID REFERENCES tanks(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fish model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Fish {
    /// Unique fish ID, immutable
    pub id: Uuid,

    /// Scientific name, e.g. "Betta splendens"
    pub scientific_name: String,

    /// Common name, e.g. "Siamese fighting fish"
    pub common_name: String,

    /// Free-form description
    pub description: String,

    /// Image reference (URL or asset key)
    pub image: String,

    /// Category
    #[serde(rename = "type")]
    pub fish_type: String,

    /// Tank this fish lives in, if any
    pub tank_id: Option<Uuid>,

    /// When the fish was created
    pub created_at: DateTime<Utc>,

    /// When the fish was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a fish
///
/// The ID is chosen by the caller so that nested upserts can create a fish
/// under the ID they were given.
#[derive(Debug, Clone)]
pub struct NewFish {
    pub id: Uuid,
    pub scientific_name: String,
    pub common_name: String,
    pub description: String,
    pub image: String,
    pub fish_type: String,
    pub tank_id: Option<Uuid>,
}

/// Descriptive fields of a fish, as supplied by a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FishFields {
    pub scientific_name: String,
    pub common_name: String,
    pub description: String,
    pub image: String,
    pub fish_type: String,
}

impl FishFields {
    /// Insert input for a fish with this ID, optionally in a tank
    pub fn into_new(self, id: Uuid, tank_id: Option<Uuid>) -> NewFish {
        NewFish {
            id,
            scientific_name: self.scientific_name,
            common_name: self.common_name,
            description: self.description,
            image: self.image,
            fish_type: self.fish_type,
            tank_id,
        }
    }

    /// Changes replacing every descriptive field; the tank is left alone
    pub fn into_changes(self) -> FishChanges {
        FishChanges {
            scientific_name: Some(self.scientific_name),
            common_name: Some(self.common_name),
            description: Some(self.description),
            image: Some(self.image),
            fish_type: Some(self.fish_type),
            tank_id: None,
        }
    }
}

/// Changes applied to a fish
///
/// Only non-None fields are written. `tank_id` uses `Some(None)` to clear the
/// association.
#[derive(Debug, Clone, Default)]
pub struct FishChanges {
    pub scientific_name: Option<String>,
    pub common_name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub fish_type: Option<String>,
    pub tank_id: Option<Option<Uuid>>,
}

impl FishChanges {
    /// Applies the changes to an in-memory fish
    pub fn apply_to(&self, fish: &mut Fish) {
        if let Some(ref v) = self.scientific_name {
            fish.scientific_name = v.clone();
        }
        if let Some(ref v) = self.common_name {
            fish.common_name = v.clone();
        }
        if let Some(ref v) = self.description {
            fish.description = v.clone();
        }
        if let Some(ref v) = self.image {
            fish.image = v.clone();
        }
        if let Some(ref v) = self.fish_type {
            fish.fish_type = v.clone();
        }
        if let Some(tank_id) = self.tank_id {
            fish.tank_id = tank_id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fish() -> Fish {
        let now = Utc::now();
        Fish {
            id: Uuid::new_v4(),
            scientific_name: "Betta splendens".to_string(),
            common_name: "Betta".to_string(),
            description: "Labyrinth fish".to_string(),
            image: "betta.png".to_string(),
            fish_type: "freshwater".to_string(),
            tank_id: Some(Uuid::new_v4()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_value(fish()).unwrap();
        assert_eq!(json["scientificName"], "Betta splendens");
        assert_eq!(json["type"], "freshwater");
        assert!(json.get("tankId").is_some());
    }

    #[test]
    fn test_changes_can_clear_tank() {
        let mut f = fish();
        FishChanges {
            tank_id: Some(None),
            ..Default::default()
        }
        .apply_to(&mut f);

        assert_eq!(f.tank_id, None);
        assert_eq!(f.common_name, "Betta");
    }

    #[test]
    fn test_fields_replace_description_but_keep_tank() {
        let mut f = fish();
        let tank_id = f.tank_id;
        FishFields {
            scientific_name: "Betta splendens".to_string(),
            common_name: "Betta".to_string(),
            description: "Bubble nest builder".to_string(),
            image: "betta.png".to_string(),
            fish_type: "freshwater".to_string(),
        }
        .into_changes()
        .apply_to(&mut f);

        assert_eq!(f.description, "Bubble nest builder");
        assert_eq!(f.tank_id, tank_id);
    }

    #[test]
    fn test_empty_changes_are_noop() {
        let original = fish();
        let mut f = original.clone();
        FishChanges::default().apply_to(&mut f);
        assert_eq!(f, original);
    }
}
