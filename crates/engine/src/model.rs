//! Type models and dynamically shaped entities
//!
//! Entities are unbounded name → value maps; their shape is described by
//! a `TypeModel` registered per `TypeRef`. The suggestion path walks
//! entities through their models (never through reflection): scalar text
//! values are tokenized and prefix-checked, aggregation associations are
//! descended into recursively.

use std::collections::HashMap;

use maildex_core::{AttributeId, EntityId, ListId, Result, TypeRef};

// ============================================================================
// Type models
// ============================================================================

/// Kind of a scalar value attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Searchable text
    Text,
    /// Numeric value
    Number,
    /// Epoch-millisecond timestamp
    Date,
    /// Opaque bytes
    Bytes,
}

/// Kind of an association attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// The referenced entities are embedded in the parent
    Aggregation,
    /// The association stores ids of standalone entities
    Element,
}

/// How many referenced entities an association may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly one
    One,
    /// Zero or one
    ZeroOrOne,
    /// Any number
    Any,
}

/// Model of a scalar value attribute.
#[derive(Debug, Clone)]
pub struct ValueModel {
    /// Attribute tag, matching the tag stamped on postings
    pub id: AttributeId,
    /// Value kind
    pub kind: ValueKind,
}

/// Model of an association attribute.
#[derive(Debug, Clone)]
pub struct AssociationModel {
    /// Attribute tag
    pub id: AttributeId,
    /// Association kind
    pub kind: AssociationKind,
    /// Type of the referenced entities
    pub ref_type: TypeRef,
    /// Cardinality of the association
    pub cardinality: Cardinality,
}

/// Shape description of one entity type.
#[derive(Debug, Clone, Default)]
pub struct TypeModel {
    /// Scalar attributes by name
    pub values: HashMap<String, ValueModel>,
    /// Association attributes by name
    pub associations: HashMap<String, AssociationModel>,
}

impl TypeModel {
    /// Empty model; populate with the builder methods.
    pub fn new() -> Self {
        TypeModel::default()
    }

    /// Add a scalar value attribute.
    pub fn with_value(mut self, name: impl Into<String>, id: AttributeId, kind: ValueKind) -> Self {
        self.values.insert(name.into(), ValueModel { id, kind });
        self
    }

    /// Add an association attribute.
    pub fn with_association(
        mut self,
        name: impl Into<String>,
        id: AttributeId,
        kind: AssociationKind,
        ref_type: TypeRef,
        cardinality: Cardinality,
    ) -> Self {
        self.associations.insert(
            name.into(),
            AssociationModel {
                id,
                kind,
                ref_type,
                cardinality,
            },
        );
        self
    }
}

/// Registry resolving type references to their models.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    models: HashMap<TypeRef, TypeModel>,
}

impl TypeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    /// Register (or replace) the model for a type.
    pub fn register(&mut self, type_ref: TypeRef, model: TypeModel) {
        self.models.insert(type_ref, model);
    }

    /// Resolve a type reference.
    pub fn resolve(&self, type_ref: TypeRef) -> Option<&TypeModel> {
        self.models.get(&type_ref)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A value held by an entity attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Text value
    Text(String),
    /// Numeric value
    Number(i64),
    /// Opaque bytes
    Bytes(Vec<u8>),
    /// One embedded entity
    Aggregate(Entity),
    /// A list of embedded entities
    AggregateList(Vec<Entity>),
}

/// A loaded entity: its type plus a name → value map.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// The entity's type
    pub type_ref: TypeRef,
    /// Attribute values by name
    pub fields: HashMap<String, FieldValue>,
}

impl Entity {
    /// Empty entity of a type.
    pub fn new(type_ref: TypeRef) -> Self {
        Entity {
            type_ref,
            fields: HashMap::new(),
        }
    }

    /// Set a field value.
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

// ============================================================================
// EntityLoader
// ============================================================================

/// Loads entities on demand during the suggestion post-filter.
///
/// Implementations report `NotFound` for deleted entities and
/// `NotAuthorized` for entities outside the session's reach; the caller
/// skips those candidates.
pub trait EntityLoader: Send + Sync {
    /// Load one entity by type, container and id.
    fn load(&self, type_ref: TypeRef, list_id: ListId, id: EntityId) -> Result<Entity>;
}
