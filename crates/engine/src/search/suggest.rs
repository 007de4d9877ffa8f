//! Suggestion support: term expansion and the prefix post-filter
//!
//! Two different jobs share this module. For single-term queries the
//! suggestion provider expands the term into completions and the search
//! unions their postings. For multi-term queries the last term is treated
//! as an unfinished word: the other terms run a normal search and each
//! candidate entity is loaded and checked for a token starting with the
//! unfinished prefix.

use std::collections::HashSet;

use maildex_core::{AttributeId, TypeRef};

use super::tokenizer::tokenize;
use crate::model::{AssociationKind, Entity, FieldValue, TypeRegistry, ValueKind};

/// Recursion bound for aggregation descent; type models in the field are
/// shallow and a cycle is caught by the visited set well before this.
const MAX_TRAVERSAL_DEPTH: usize = 8;

/// Completion source for one entity type.
///
/// Backed by the prefix-trie maintainer outside the core; at most one
/// provider is registered per type.
pub trait SuggestionProvider: Send + Sync {
    /// Known completions of a prefix, e.g. `"foo"` → `["food", "foot"]`.
    fn suggestions(&self, prefix: &str) -> Vec<String>;
}

/// Check whether any whitelisted text attribute of the entity contains a
/// token starting with `prefix`, descending through aggregations.
pub fn entity_matches_prefix(
    registry: &TypeRegistry,
    entity: &Entity,
    prefix: &str,
    attribute_ids: Option<&[AttributeId]>,
) -> bool {
    let mut visited = HashSet::new();
    matches_at_depth(
        registry,
        entity,
        prefix,
        attribute_ids,
        &mut visited,
        MAX_TRAVERSAL_DEPTH,
    )
}

fn matches_at_depth(
    registry: &TypeRegistry,
    entity: &Entity,
    prefix: &str,
    attribute_ids: Option<&[AttributeId]>,
    visited: &mut HashSet<TypeRef>,
    depth: usize,
) -> bool {
    if depth == 0 || !visited.insert(entity.type_ref) {
        return false;
    }
    let model = match registry.resolve(entity.type_ref) {
        Some(model) => model,
        None => {
            visited.remove(&entity.type_ref);
            return false;
        }
    };

    let whitelisted =
        |id: AttributeId| attribute_ids.map_or(true, |ids| ids.contains(&id));

    for (name, vm) in &model.values {
        if vm.kind != ValueKind::Text || !whitelisted(vm.id) {
            continue;
        }
        if let Some(FieldValue::Text(text)) = entity.fields.get(name) {
            if tokenize(text).iter().any(|t| t.starts_with(prefix)) {
                visited.remove(&entity.type_ref);
                return true;
            }
        }
    }

    for (name, am) in &model.associations {
        if am.kind != AssociationKind::Aggregation || !whitelisted(am.id) {
            continue;
        }
        // The association itself was whitelisted; inside the aggregate
        // every text attribute counts.
        let hit = match entity.fields.get(name) {
            Some(FieldValue::Aggregate(child)) => {
                matches_at_depth(registry, child, prefix, None, visited, depth - 1)
            }
            Some(FieldValue::AggregateList(children)) => children
                .iter()
                .any(|c| matches_at_depth(registry, c, prefix, None, visited, depth - 1)),
            _ => false,
        };
        if hit {
            visited.remove(&entity.type_ref);
            return true;
        }
    }

    visited.remove(&entity.type_ref);
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cardinality, TypeModel};

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register(
            TypeRef::MAIL,
            TypeModel::new()
                .with_value("subject", AttributeId(1), ValueKind::Text)
                .with_value("body", AttributeId(2), ValueKind::Text)
                .with_association(
                    "sender",
                    AttributeId(5),
                    AssociationKind::Aggregation,
                    TypeRef::CONTACT,
                    Cardinality::One,
                ),
        );
        registry.register(
            TypeRef::CONTACT,
            TypeModel::new().with_value("name", AttributeId(1), ValueKind::Text),
        );
        registry
    }

    fn mail(subject: &str) -> Entity {
        Entity::new(TypeRef::MAIL).with_field("subject", FieldValue::Text(subject.into()))
    }

    #[test]
    fn test_prefix_in_scalar_value() {
        let registry = registry();
        assert!(entity_matches_prefix(&registry, &mail("Betreff today"), "be", None));
        assert!(!entity_matches_prefix(&registry, &mail("nothing here"), "be", None));
    }

    #[test]
    fn test_prefix_requires_token_start() {
        let registry = registry();
        // "be" occurs inside "obey" but no token starts with it
        assert!(!entity_matches_prefix(&registry, &mail("obey"), "be", None));
    }

    #[test]
    fn test_attribute_whitelist_respected() {
        let registry = registry();
        let entity = mail("beta release");
        let only_body = [AttributeId(2)];
        assert!(!entity_matches_prefix(&registry, &entity, "be", Some(&only_body)));
        let only_subject = [AttributeId(1)];
        assert!(entity_matches_prefix(&registry, &entity, "be", Some(&only_subject)));
    }

    #[test]
    fn test_descends_into_aggregation() {
        let registry = registry();
        let sender = Entity::new(TypeRef::CONTACT)
            .with_field("name", FieldValue::Text("Bernard".into()));
        let entity = mail("unrelated").with_field("sender", FieldValue::Aggregate(sender));
        assert!(entity_matches_prefix(&registry, &entity, "be", None));
    }

    #[test]
    fn test_cyclic_model_terminates() {
        let mut registry = TypeRegistry::new();
        // A type aggregating itself
        registry.register(
            TypeRef::MAIL,
            TypeModel::new()
                .with_value("subject", AttributeId(1), ValueKind::Text)
                .with_association(
                    "parent",
                    AttributeId(9),
                    AssociationKind::Aggregation,
                    TypeRef::MAIL,
                    Cardinality::ZeroOrOne,
                ),
        );
        let inner = Entity::new(TypeRef::MAIL)
            .with_field("subject", FieldValue::Text("deep beta".into()));
        let outer = Entity::new(TypeRef::MAIL)
            .with_field("subject", FieldValue::Text("outer".into()))
            .with_field("parent", FieldValue::Aggregate(inner));
        // The visited set stops the descent at the recursive type; the
        // call must terminate and report no match.
        assert!(!entity_matches_prefix(&registry, &outer, "be", None));
        assert!(entity_matches_prefix(&registry, &outer, "ou", None));
    }

    #[test]
    fn test_sibling_aggregates_both_checked() {
        let mut registry = registry();
        registry.register(
            TypeRef::MAIL,
            TypeModel::new().with_association(
                "recipients",
                AttributeId(6),
                AssociationKind::Aggregation,
                TypeRef::CONTACT,
                Cardinality::Any,
            ),
        );
        let a = Entity::new(TypeRef::CONTACT).with_field("name", FieldValue::Text("Ada".into()));
        let b = Entity::new(TypeRef::CONTACT).with_field("name", FieldValue::Text("Bede".into()));
        let entity = Entity::new(TypeRef::MAIL)
            .with_field("recipients", FieldValue::AggregateList(vec![a, b]));
        // The match sits in the second sibling; the visited set must not
        // block it after the first sibling was examined.
        assert!(entity_matches_prefix(&registry, &entity, "be", None));
    }
}
