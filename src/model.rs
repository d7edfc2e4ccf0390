use crate::infer::InferredValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// IFC schema identifiers a specification may target.
pub const IFC_VERSIONS: &[&str] = &["IFC2X3", "IFC4", "IFC4X3_ADD2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    Required,
    Optional,
    Prohibited,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::Required => "required",
            Cardinality::Optional => "optional",
            Cardinality::Prohibited => "prohibited",
        }
    }

    /// Occurrence bounds for an applicability with this cardinality.
    pub fn policy(&self) -> CardinalityPolicy {
        match self {
            Cardinality::Required => CardinalityPolicy {
                min_occurs: 1,
                max_occurs: MaxOccurs::Unbounded,
            },
            Cardinality::Optional => CardinalityPolicy {
                min_occurs: 0,
                max_occurs: MaxOccurs::Unbounded,
            },
            Cardinality::Prohibited => CardinalityPolicy {
                min_occurs: 0,
                max_occurs: MaxOccurs::Bounded(0),
            },
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cardinality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "required" => Ok(Cardinality::Required),
            "optional" => Ok(Cardinality::Optional),
            "prohibited" => Ok(Cardinality::Prohibited),
            other => Err(format!("unknown cardinality '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

impl fmt::Display for MaxOccurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxOccurs::Bounded(n) => write!(f, "{n}"),
            MaxOccurs::Unbounded => f.write_str("unbounded"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardinalityPolicy {
    pub min_occurs: u32,
    pub max_occurs: MaxOccurs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFacet {
    pub name: InferredValue,
    pub predefined_type: Option<InferredValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFacet {
    pub property_set: InferredValue,
    pub base_name: InferredValue,
    pub data_type: Option<String>,
    pub value: Option<InferredValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationFacet {
    pub system: InferredValue,
    pub value: Option<InferredValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFacet {
    pub name: InferredValue,
    pub value: Option<InferredValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialFacet {
    pub value: InferredValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetKind {
    Entity(EntityFacet),
    Property(PropertyFacet),
    Classification(ClassificationFacet),
    Attribute(AttributeFacet),
    Material(MaterialFacet),
}

impl FacetKind {
    pub fn label(&self) -> &'static str {
        match self {
            FacetKind::Entity(_) => "entity",
            FacetKind::Property(_) => "property",
            FacetKind::Classification(_) => "classification",
            FacetKind::Attribute(_) => "attribute",
            FacetKind::Material(_) => "material",
        }
    }

    fn values(&self) -> Vec<&InferredValue> {
        match self {
            FacetKind::Entity(f) => std::iter::once(&f.name)
                .chain(f.predefined_type.as_ref())
                .collect(),
            FacetKind::Property(f) => [&f.property_set, &f.base_name]
                .into_iter()
                .chain(f.value.as_ref())
                .collect(),
            FacetKind::Classification(f) => {
                std::iter::once(&f.system).chain(f.value.as_ref()).collect()
            }
            FacetKind::Attribute(f) => std::iter::once(&f.name).chain(f.value.as_ref()).collect(),
            FacetKind::Material(f) => vec![&f.value],
        }
    }
}

/// One typed assertion, usable as an applicability filter or a requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facet {
    pub kind: FacetKind,
    pub cardinality: Cardinality,
    pub instructions: Option<String>,
    pub uri: Option<String>,
}

impl Facet {
    pub fn new(kind: FacetKind) -> Self {
        Self {
            kind,
            cardinality: Cardinality::Required,
            instructions: None,
            uri: None,
        }
    }

    pub fn entity(name: InferredValue, predefined_type: Option<InferredValue>) -> Self {
        Self::new(FacetKind::Entity(EntityFacet {
            name,
            predefined_type,
        }))
    }

    pub fn property(
        property_set: InferredValue,
        base_name: InferredValue,
        data_type: Option<String>,
        value: Option<InferredValue>,
    ) -> Self {
        Self::new(FacetKind::Property(PropertyFacet {
            property_set,
            base_name,
            data_type,
            value,
        }))
    }

    pub fn with_uri(mut self, uri: Option<String>) -> Self {
        self.uri = uri;
        self
    }

    /// True when every value is settled: nothing empty where a value is
    /// mandatory and no placeholder left over.
    pub fn is_resolved(&self) -> bool {
        let values = self.kind.values();
        let mandatory = match &self.kind {
            FacetKind::Entity(f) => vec![&f.name],
            FacetKind::Property(f) => vec![&f.property_set, &f.base_name],
            FacetKind::Classification(f) => vec![&f.system],
            FacetKind::Attribute(f) => vec![&f.name],
            FacetKind::Material(f) => vec![&f.value],
        };
        values.iter().all(|v| !v.is_placeholder()) && mandatory.iter().all(|v| !v.is_empty())
    }
}

/// Descriptive data fixed when a specification is first created.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecificationMetadata {
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub identifier: Option<String>,
    pub ifc_versions: Vec<String>,
    pub cardinality: Cardinality,
}

/// Document-level data shared by every specification of one purpose group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub version: Option<String>,
    pub copyright: Option<String>,
    pub description: Option<String>,
    pub milestone: Option<String>,
}

impl DocumentMetadata {
    /// First field that differs from `other`, with both values.
    pub fn first_difference(
        &self,
        other: &DocumentMetadata,
    ) -> Option<(&'static str, Option<String>, Option<String>)> {
        let fields = [
            ("title", &self.title, &other.title),
            ("author", &self.author, &other.author),
            ("date", &self.date, &other.date),
            ("version", &self.version, &other.version),
            ("copyright", &self.copyright, &other.copyright),
            ("description", &self.description, &other.description),
            ("milestone", &self.milestone, &other.milestone),
        ];
        fields
            .into_iter()
            .find(|(_, ours, theirs)| ours != theirs)
            .map(|(name, ours, theirs)| (name, ours.clone(), theirs.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecificationRecord {
    pub purpose: String,
    pub name: String,
    pub applicability: Vec<Facet>,
    pub requirements: Vec<Facet>,
    pub cardinality_policy: CardinalityPolicy,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub identifier: Option<String>,
    pub ifc_versions: Vec<String>,
}

impl SpecificationRecord {
    pub fn identity(&self) -> (&str, &str) {
        (&self.purpose, &self.name)
    }

    /// Instructions to emit on the specification. Applicability facets cannot
    /// carry their own, so theirs stand in when none is configured here.
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref().or_else(|| {
            self.applicability
                .iter()
                .find_map(|facet| facet.instructions.as_deref())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecificationGroup {
    pub purpose: String,
    pub document: DocumentMetadata,
    pub specifications: Vec<SpecificationRecord>,
}

impl SpecificationGroup {
    pub fn specification(&self, name: &str) -> Option<&SpecificationRecord> {
        self.specifications.iter().find(|spec| spec.name == name)
    }

    /// Title to emit: the header title, else the purpose label.
    pub fn title(&self) -> &str {
        self.document.title.as_deref().unwrap_or(&self.purpose)
    }
}
