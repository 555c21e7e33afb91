//! Field-level schema: types, relations and flags.

use serde::{Deserialize, Serialize};

/// The declared type of an entity field.
///
/// The set of type strings the server emits is closed; anything outside it
/// deserializes to [`FieldType::Unknown`] so the failure is representable
/// instead of being dropped during deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Uuid,
    Int,
    Text,
    String,
    Float,
    Boolean,
    Date,
    Password,
    Blob,
    JsonObject,
    JsonList,
    Association,
    #[serde(other)]
    Unknown,
}

impl FieldType {
    /// True for every scalar type (uuid/int/text/string/float/boolean/date/
    /// password/blob).
    #[must_use]
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            Self::Uuid
                | Self::Int
                | Self::Text
                | Self::String
                | Self::Float
                | Self::Boolean
                | Self::Date
                | Self::Password
                | Self::Blob
        )
    }

    /// True for json-object and json-list fields.
    #[must_use]
    pub fn is_json(self) -> bool {
        matches!(self, Self::JsonObject | Self::JsonList)
    }
}

/// The relation kind of an association field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
    #[serde(other)]
    Unknown,
}

impl RelationKind {
    #[must_use]
    pub fn is_to_many(self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    #[must_use]
    pub fn is_to_one(self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }
}

/// Behavioral flags attached to a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldFlags {
    pub required: bool,
    pub primary_key: bool,
    pub translatable: bool,
    pub computed: bool,
    pub cascade_delete: bool,
    /// Field lives on the entity's extension container rather than the
    /// entity itself.
    pub extension: bool,
}

/// Schema of a single entity field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Relation kind, only meaningful when `field_type` is `Association`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationKind>,
    /// Associated entity type name for association fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_field: Option<String>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub flags: FieldFlags,
}

impl FieldSchema {
    /// Creates a plain (non-association) field schema of the given type.
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            relation: None,
            entity: None,
            local_field: None,
            reference_field: None,
            read_only: false,
            flags: FieldFlags::default(),
        }
    }

    /// Creates an association field schema pointing at `entity`.
    pub fn association(relation: RelationKind, entity: impl Into<String>) -> Self {
        Self {
            field_type: FieldType::Association,
            relation: Some(relation),
            entity: Some(entity.into()),
            local_field: None,
            reference_field: None,
            read_only: false,
            flags: FieldFlags::default(),
        }
    }

    /// Builder-style flag mutation, used by tests and fixtures.
    #[must_use]
    pub fn with_flags(mut self, flags: FieldFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.flags.primary_key = true;
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.flags.required = true;
        self
    }

    #[must_use]
    pub fn translatable(mut self) -> Self {
        self.flags.translatable = true;
        self
    }

    #[must_use]
    pub fn as_extension(mut self) -> Self {
        self.flags.extension = true;
        self
    }

    pub fn is_scalar(&self) -> bool {
        self.field_type.is_scalar()
    }

    pub fn is_json(&self) -> bool {
        self.field_type.is_json()
    }

    pub fn is_json_object(&self) -> bool {
        self.field_type == FieldType::JsonObject
    }

    pub fn is_json_list(&self) -> bool {
        self.field_type == FieldType::JsonList
    }

    pub fn is_association(&self) -> bool {
        self.field_type == FieldType::Association
    }

    /// True for one-to-many and many-to-many associations. An association
    /// with an unknown relation kind is neither to-many nor to-one; the
    /// registry reports it at registration.
    pub fn is_to_many(&self) -> bool {
        self.is_association() && self.relation.is_some_and(RelationKind::is_to_many)
    }

    /// True for one-to-one and many-to-one associations.
    pub fn is_to_one(&self) -> bool {
        self.is_association() && self.relation.is_some_and(RelationKind::is_to_one)
    }

    /// True for string/text fields carrying the translatable flag.
    pub fn is_translatable(&self) -> bool {
        matches!(self.field_type, FieldType::String | FieldType::Text) && self.flags.translatable
    }

    /// True when the field's type, or an association's relation, did not
    /// classify into the known set.
    pub fn is_unclassified(&self) -> bool {
        self.field_type == FieldType::Unknown
            || (self.is_association()
                && !self.relation.is_some_and(|r| r != RelationKind::Unknown))
    }
}
