//! Typed operation inputs
//!
//! Inputs arrive as JSON. Each operation decodes into one of these types
//! (camelCase keys, unknown keys rejected) and then runs its `validator`
//! rules. Both steps happen before any handler or store call.
//!
//! # Example
//!
//! ```json
//! {
//!   "id": "6f1c2a0e-5d1b-4d8e-9f55-1f1f0e3e8a10",
//!   "name": "Living room",
//!   "type": "freshwater",
//!   "fish": [
//!     {
//!       "id": "0b7d8c2e-2f59-4b71-8a62-3c1f6f0d9e44",
//!       "scientificName": "Betta splendens",
//!       "commonName": "Betta",
//!       "description": "Labyrinth fish",
//!       "image": "betta.png"
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::consistency::{FishUpsert, TankUpdate};
use crate::error::CoreResult;
use crate::models::{FishFields, UserRole};

/// Decodes and validates an operation input
///
/// `null` (no input) is read as an empty object, so operations without
/// required fields accept an absent input.
pub fn decode<T>(input: Value) -> CoreResult<T>
where
    T: DeserializeOwned + Validate,
{
    let input = match input {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };

    let decoded: T = serde_json::from_value(input)?;
    decoded.validate()?;
    Ok(decoded)
}

/// Operations that take no input
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NoInput {}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct IdInput {
    pub id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TankIdInput {
    pub tank_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserIdInput {
    pub user_id: Uuid,
}

/// `fish.create`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FishCreateInput {
    #[validate(length(min = 1, max = 255))]
    pub scientific_name: String,

    #[validate(length(min = 1, max = 255))]
    pub common_name: String,

    pub description: String,

    #[validate(length(max = 1024))]
    pub image: String,

    #[serde(rename = "type")]
    #[validate(length(max = 255))]
    pub fish_type: String,
}

impl From<FishCreateInput> for FishFields {
    fn from(input: FishCreateInput) -> Self {
        FishFields {
            scientific_name: input.scientific_name,
            common_name: input.common_name,
            description: input.description,
            image: input.image,
            fish_type: input.fish_type,
        }
    }
}

/// `fish.update`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FishUpdateInput {
    pub id: Uuid,

    #[validate(length(min = 1, max = 255))]
    pub scientific_name: String,

    #[validate(length(min = 1, max = 255))]
    pub common_name: String,

    pub description: String,

    #[validate(length(max = 1024))]
    pub image: String,

    #[serde(rename = "type")]
    #[validate(length(max = 255))]
    pub fish_type: String,
}

impl FishUpdateInput {
    pub fn into_parts(self) -> (Uuid, FishFields) {
        let fields = FishFields {
            scientific_name: self.scientific_name,
            common_name: self.common_name,
            description: self.description,
            image: self.image,
            fish_type: self.fish_type,
        };
        (self.id, fields)
    }
}

/// `tank.create`; the owner is always the caller
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TankCreateInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[serde(rename = "type")]
    #[validate(length(max = 255))]
    pub tank_type: String,
}

/// One entry of `tank.update`'s fish list
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FishUpsertInput {
    pub id: Uuid,

    #[validate(length(min = 1, max = 255))]
    pub scientific_name: String,

    #[validate(length(min = 1, max = 255))]
    pub common_name: String,

    pub description: String,

    #[validate(length(max = 1024))]
    pub image: String,

    #[serde(rename = "type", default)]
    #[validate(length(max = 255))]
    pub fish_type: Option<String>,
}

/// `tank.update`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[validate(schema(function = "unique_fish_ids"))]
pub struct TankUpdateInput {
    pub id: Uuid,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[serde(rename = "type")]
    #[validate(length(max = 255))]
    pub tank_type: String,

    #[serde(default)]
    pub user_id: Option<Uuid>,

    #[validate(nested)]
    pub fish: Vec<FishUpsertInput>,
}

fn unique_fish_ids(input: &TankUpdateInput) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(input.fish.len());

    if input.fish.iter().all(|f| seen.insert(f.id)) {
        return Ok(());
    }

    let mut err = ValidationError::new("duplicate_fish_id");
    err.message = Some("fish ids must be unique".into());
    Err(err)
}

impl From<TankUpdateInput> for TankUpdate {
    fn from(input: TankUpdateInput) -> Self {
        TankUpdate {
            id: input.id,
            name: input.name,
            tank_type: input.tank_type,
            user_id: input.user_id,
            fish: input
                .fish
                .into_iter()
                .map(|f| FishUpsert {
                    id: f.id,
                    scientific_name: f.scientific_name,
                    common_name: f.common_name,
                    description: f.description,
                    image: f.image,
                    fish_type: f.fish_type,
                })
                .collect(),
        }
    }
}

/// `user.update`
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserRoleInput {
    pub id: Uuid,
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use serde_json::json;

    fn upsert(id: Uuid) -> Value {
        json!({
            "id": id,
            "scientificName": "Betta splendens",
            "commonName": "Betta",
            "description": "Labyrinth fish",
            "image": "betta.png"
        })
    }

    #[test]
    fn test_null_reads_as_empty_object() {
        assert!(decode::<NoInput>(Value::Null).is_ok());
        assert!(decode::<NoInput>(json!({})).is_ok());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = decode::<NoInput>(json!({"role": "ADMIN"})).unwrap_err();
        assert_eq!(err.code(), "validation_error");

        let err = decode::<IdInput>(json!({"id": Uuid::new_v4(), "extra": 1})).unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn test_bad_uuid_is_validation_error() {
        let err = decode::<IdInput>(json!({"id": "not-a-uuid"})).unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
    }

    #[test]
    fn test_missing_field_is_validation_error() {
        assert!(decode::<TankIdInput>(Value::Null).is_err());
    }

    #[test]
    fn test_fish_create_wire_names() {
        let input: FishCreateInput = decode(json!({
            "scientificName": "Paracheirodon innesi",
            "commonName": "Neon tetra",
            "description": "Schooling fish",
            "image": "neon.png",
            "type": "freshwater"
        }))
        .unwrap();

        let fields = FishFields::from(input);
        assert_eq!(fields.fish_type, "freshwater");
    }

    #[test]
    fn test_fish_create_rejects_empty_names() {
        let err = decode::<FishCreateInput>(json!({
            "scientificName": "",
            "commonName": "Neon tetra",
            "description": "",
            "image": "",
            "type": ""
        }))
        .unwrap_err();

        match err {
            CoreError::Validation { fields, .. } => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "scientific_name");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_tank_update_decodes_nested_fish() {
        let fish_id = Uuid::new_v4();
        let input: TankUpdateInput = decode(json!({
            "id": Uuid::new_v4(),
            "name": "Living room",
            "type": "freshwater",
            "fish": [upsert(fish_id)]
        }))
        .unwrap();

        let update = TankUpdate::from(input);
        assert_eq!(update.user_id, None);
        assert_eq!(update.fish.len(), 1);
        assert_eq!(update.fish[0].id, fish_id);
        assert_eq!(update.fish[0].fish_type, None);
    }

    #[test]
    fn test_tank_update_rejects_duplicate_fish_ids() {
        let fish_id = Uuid::new_v4();
        let err = decode::<TankUpdateInput>(json!({
            "id": Uuid::new_v4(),
            "name": "Living room",
            "type": "freshwater",
            "fish": [upsert(fish_id), upsert(fish_id)]
        }))
        .unwrap_err();

        match err {
            CoreError::Validation { fields, .. } => {
                assert!(fields.iter().any(|f| f.message == "fish ids must be unique"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_tank_update_reports_nested_field_path() {
        let mut bad = upsert(Uuid::new_v4());
        bad["commonName"] = json!("");

        let err = decode::<TankUpdateInput>(json!({
            "id": Uuid::new_v4(),
            "name": "Living room",
            "type": "freshwater",
            "fish": [bad]
        }))
        .unwrap_err();

        match err {
            CoreError::Validation { fields, .. } => {
                assert_eq!(fields[0].field, "fish[0].common_name");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_role_must_be_known() {
        let id = Uuid::new_v4();
        let input: UserRoleInput = decode(json!({"id": id, "role": "ADMIN"})).unwrap();
        assert_eq!(input.role, UserRole::Admin);

        assert!(decode::<UserRoleInput>(json!({"id": id, "role": "OWNER"})).is_err());
    }
}
