//! Merge engine for walker output.
//!
//! Groups are keyed by purpose and records by name inside their group, so
//! the same specification name under two purposes stays two records.

use crate::error::CompileError;
use crate::model::{
    DocumentMetadata, Facet, SpecificationGroup, SpecificationMetadata, SpecificationRecord,
};
use indexmap::IndexMap;

/// One unit of walker output: the requirements a single row contributes to
/// a single purpose group.
#[derive(Debug, Clone)]
pub struct SpecificationTuple<'a> {
    pub purpose: &'a str,
    pub name: &'a str,
    pub applicability: &'a [Facet],
    pub requirements: Vec<Facet>,
    pub metadata: &'a SpecificationMetadata,
    pub document: &'a DocumentMetadata,
    /// Where the tuple came from, for error messages.
    pub origin: String,
}

#[derive(Debug, Default)]
struct GroupState {
    document: DocumentMetadata,
    records: IndexMap<String, SpecificationRecord>,
}

#[derive(Debug, Default)]
pub struct SpecificationAccumulator {
    groups: IndexMap<String, GroupState>,
}

impl SpecificationAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, tuple: SpecificationTuple<'_>) -> Result<(), CompileError> {
        match self.groups.get(tuple.purpose) {
            Some(group) => {
                if let Some((field, first, found)) = group.document.first_difference(tuple.document)
                {
                    return Err(CompileError::InconsistentGroupMetadata {
                        purpose: tuple.purpose.to_string(),
                        field,
                        first,
                        found,
                        column: tuple.origin,
                    });
                }
            }
            None => tracing::debug!(purpose = tuple.purpose, "opening specification group"),
        }

        let group = self
            .groups
            .entry(tuple.purpose.to_string())
            .or_insert_with(|| GroupState {
                document: tuple.document.clone(),
                records: IndexMap::new(),
            });

        match group.records.get_mut(tuple.name) {
            Some(record) => {
                record.requirements.extend(tuple.requirements);
            }
            None => {
                let metadata = tuple.metadata;
                let record = SpecificationRecord {
                    purpose: tuple.purpose.to_string(),
                    name: tuple.name.to_string(),
                    applicability: tuple.applicability.to_vec(),
                    requirements: tuple.requirements,
                    cardinality_policy: metadata.cardinality.policy(),
                    description: metadata.description.clone(),
                    instructions: metadata.instructions.clone(),
                    identifier: metadata.identifier.clone(),
                    ifc_versions: metadata.ifc_versions.clone(),
                };
                group.records.insert(tuple.name.to_string(), record);
            }
        }
        Ok(())
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn record_count(&self) -> usize {
        self.groups.values().map(|group| group.records.len()).sum()
    }

    /// Hands out the groups in first-seen order.
    pub fn finish(self) -> Vec<SpecificationGroup> {
        self.groups
            .into_iter()
            .map(|(purpose, group)| SpecificationGroup {
                purpose,
                document: group.document,
                specifications: group.records.into_values().collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::InferredValue;
    use crate::model::{Cardinality, MaxOccurs};
    use assert_matches::assert_matches;

    fn entity(name: &str) -> Facet {
        Facet::entity(InferredValue::Literal(name.into()), None)
    }

    fn property(name: &str) -> Facet {
        Facet::property(
            InferredValue::Literal("Pset_Test".into()),
            InferredValue::Literal(name.into()),
            None,
            None,
        )
    }

    fn tuple<'a>(
        purpose: &'a str,
        name: &'a str,
        applicability: &'a [Facet],
        requirements: Vec<Facet>,
        metadata: &'a SpecificationMetadata,
        document: &'a DocumentMetadata,
    ) -> SpecificationTuple<'a> {
        SpecificationTuple {
            purpose,
            name,
            applicability,
            requirements,
            metadata,
            document,
            origin: "L".into(),
        }
    }

    #[test]
    fn merges_requirements_in_arrival_order_without_dedup() {
        let applicability = [entity("IFCWALL")];
        let metadata = SpecificationMetadata::default();
        let document = DocumentMetadata::default();
        let mut acc = SpecificationAccumulator::new();
        for name in ["A", "B", "A"] {
            acc.accept(tuple(
                "Fire",
                "Walls",
                &applicability,
                vec![property(name)],
                &metadata,
                &document,
            ))
            .unwrap();
        }
        let groups = acc.finish();
        assert_eq!(groups.len(), 1);
        let record = &groups[0].specifications[0];
        assert_eq!(record.requirements, vec![property("A"), property("B"), property("A")]);
        assert_eq!(record.applicability, applicability);
    }

    #[test]
    fn first_applicability_and_metadata_win() {
        let first = [entity("IFCWALL")];
        let second = [entity("IFCSLAB")];
        let optional = SpecificationMetadata {
            cardinality: Cardinality::Optional,
            description: Some("first".into()),
            ..Default::default()
        };
        let prohibited = SpecificationMetadata {
            cardinality: Cardinality::Prohibited,
            description: Some("second".into()),
            ..Default::default()
        };
        let document = DocumentMetadata::default();
        let mut acc = SpecificationAccumulator::new();
        acc.accept(tuple("Fire", "Walls", &first, vec![property("A")], &optional, &document))
            .unwrap();
        acc.accept(tuple("Fire", "Walls", &second, vec![property("B")], &prohibited, &document))
            .unwrap();
        let groups = acc.finish();
        let record = &groups[0].specifications[0];
        assert_eq!(record.applicability, first);
        assert_eq!(record.description.as_deref(), Some("first"));
        assert_eq!(record.cardinality_policy.min_occurs, 0);
        assert_eq!(record.cardinality_policy.max_occurs, MaxOccurs::Unbounded);
    }

    #[test]
    fn names_are_scoped_per_purpose() {
        let applicability = [entity("IFCWALL")];
        let metadata = SpecificationMetadata::default();
        let document = DocumentMetadata::default();
        let mut acc = SpecificationAccumulator::new();
        acc.accept(tuple(
            "Fire",
            "Walls",
            &applicability,
            vec![property("A")],
            &metadata,
            &document,
        ))
        .unwrap();
        acc.accept(tuple(
            "Acoustics",
            "Walls",
            &applicability,
            vec![property("B")],
            &metadata,
            &document,
        ))
        .unwrap();
        assert_eq!(acc.group_count(), 2);
        assert_eq!(acc.record_count(), 2);
        let groups = acc.finish();
        assert_eq!(groups[0].purpose, "Fire");
        assert_eq!(groups[1].purpose, "Acoustics");
        assert_eq!(groups[1].specifications[0].requirements, vec![property("B")]);
    }

    #[test]
    fn diverging_document_metadata_is_fatal() {
        let applicability = [entity("IFCWALL")];
        let metadata = SpecificationMetadata::default();
        let v1 = DocumentMetadata {
            version: Some("1".into()),
            ..Default::default()
        };
        let v2 = DocumentMetadata {
            version: Some("2".into()),
            ..Default::default()
        };
        let mut acc = SpecificationAccumulator::new();
        acc.accept(tuple("Fire", "Walls", &applicability, vec![property("A")], &metadata, &v1))
            .unwrap();
        let err = acc
            .accept(tuple("Fire", "Slabs", &applicability, vec![property("A")], &metadata, &v2))
            .unwrap_err();
        assert_matches!(
            err,
            CompileError::InconsistentGroupMetadata { field: "version", .. }
        );
    }
}
