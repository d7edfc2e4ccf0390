//! Assembly of typed facets from the cells a schema points at.
//!
//! Both sides of a specification use the same field set; the applicability
//! side is read once per column, the requirement side once per assigned row.

use crate::error::SchemaError;
use crate::grid::{GridReader, RawCellValue};
use crate::infer::{InferredValue, infer};
use crate::model::{
    AttributeFacet, Cardinality, ClassificationFacet, Facet, FacetKind, MaterialFacet,
};
use crate::schema::{Context, CoordinateSchema, FacetField, Side};
use strum::IntoEnumIterator;

/// How a requirement row is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementMode<'a> {
    /// The row is ticked with the assignment marker: every field is static.
    Full,
    /// The row carries its own value, to be put where the placeholder marker is.
    Placeholder(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementOutcome {
    Facets(Vec<Facet>),
    AmbiguousPlaceholder { markers: usize },
    /// The marked field belongs to a facet that was not built, so the
    /// assignment text went nowhere.
    UnusedPlaceholder { field: FacetField },
}

pub struct FacetBuilder<'a, G: ?Sized> {
    schema: &'a CoordinateSchema,
    grid: &'a G,
}

impl<'a, G: GridReader + ?Sized> FacetBuilder<'a, G> {
    pub fn new(schema: &'a CoordinateSchema, grid: &'a G) -> Self {
        Self { schema, grid }
    }

    pub fn applicability(&self, column: u32) -> Result<Vec<Facet>, SchemaError> {
        let reader = FieldReader {
            schema: self.schema,
            grid: self.grid,
            side: Side::Applicability,
            context: Context::Column(column),
            substitution: None,
        };
        let mut facets = reader.facets()?;
        for facet in &mut facets {
            facet.cardinality = Cardinality::Required;
        }
        Ok(facets)
    }

    pub fn requirements(
        &self,
        column: u32,
        row: u32,
        mode: RequirementMode<'_>,
    ) -> Result<RequirementOutcome, SchemaError> {
        let context = Context::Cell { column, row };
        let (substitution, marked) = match mode {
            RequirementMode::Full => (None, None),
            RequirementMode::Placeholder(text) => match self.marked_fields(context)?.as_slice() {
                [field] => (Some(text), Some(*field)),
                fields => {
                    return Ok(RequirementOutcome::AmbiguousPlaceholder {
                        markers: fields.len(),
                    });
                }
            },
        };

        let reader = FieldReader {
            schema: self.schema,
            grid: self.grid,
            side: Side::Requirements,
            context,
            substitution,
        };
        let mut facets = reader.facets()?;
        if let Some(field) = marked
            && !facets.iter().any(|facet| field_belongs_to(field, facet))
        {
            return Ok(RequirementOutcome::UnusedPlaceholder { field });
        }
        let cardinality = reader.cardinality()?;
        for facet in &mut facets {
            facet.cardinality = cardinality;
        }
        Ok(RequirementOutcome::Facets(facets))
    }

    /// Configured requirement fields whose cell in this row holds the
    /// placeholder marker.
    fn marked_fields(&self, context: Context) -> Result<Vec<FacetField>, SchemaError> {
        let mut marked = Vec::new();
        for field in FacetField::iter() {
            let role = Side::Requirements.role(field);
            if let Some(cell) = self.schema.lookup(role, context)?
                && is_marker(&self.grid.value_at(cell), self.schema.placeholder_marker())
            {
                marked.push(field);
            }
        }
        Ok(marked)
    }
}

/// Whether a value read from `field` ends up in `facet`. Row-wide fields
/// land on whatever facet the row produced.
fn field_belongs_to(field: FacetField, facet: &Facet) -> bool {
    use FacetField as F;
    match (field, &facet.kind) {
        (F::Cardinality | F::Instructions, _) => true,
        (F::Entity | F::PredefinedType, FacetKind::Entity(_)) => true,
        (
            F::PropertySet | F::PropertyName | F::PropertyDataType | F::PropertyValue
            | F::PropertyUri,
            FacetKind::Property(_),
        ) => true,
        (
            F::ClassificationSystem | F::ClassificationValue | F::ClassificationUri,
            FacetKind::Classification(_),
        ) => true,
        (F::AttributeName | F::AttributeValue, FacetKind::Attribute(_)) => true,
        (F::Material | F::MaterialUri, FacetKind::Material(_)) => true,
        _ => false,
    }
}

fn is_marker(raw: &RawCellValue, marker: &str) -> bool {
    raw.text()
        .is_some_and(|text| text.eq_ignore_ascii_case(marker))
}

struct FieldReader<'a, G: ?Sized> {
    schema: &'a CoordinateSchema,
    grid: &'a G,
    side: Side,
    context: Context,
    substitution: Option<&'a str>,
}

impl<G: GridReader + ?Sized> FieldReader<'_, G> {
    fn configured(&self, field: FacetField) -> bool {
        self.schema.is_configured(self.side.role(field))
    }

    /// Raw cell contents, with the placeholder already swapped for the
    /// assignment text (or dropped when there is nothing to swap in).
    fn raw(&self, field: FacetField) -> Result<RawCellValue, SchemaError> {
        let Some(cell) = self.schema.lookup(self.side.role(field), self.context)? else {
            return Ok(RawCellValue::Empty);
        };
        let raw = self.grid.value_at(cell);
        if is_marker(&raw, self.schema.placeholder_marker()) {
            return Ok(self
                .substitution
                .map(RawCellValue::from)
                .unwrap_or_default());
        }
        Ok(raw)
    }

    fn value(&self, field: FacetField) -> Result<InferredValue, SchemaError> {
        self.raw(field).map(|raw| infer(&raw))
    }

    fn text(&self, field: FacetField) -> Result<Option<String>, SchemaError> {
        self.raw(field).map(|raw| raw.text())
    }

    fn cardinality(&self) -> Result<Cardinality, SchemaError> {
        let Some(text) = self.text(FacetField::Cardinality)? else {
            return Ok(Cardinality::default());
        };
        Ok(text.parse().unwrap_or_else(|reason| {
            tracing::warn!(
                %reason,
                context = ?self.context,
                "falling back to required cardinality"
            );
            Cardinality::default()
        }))
    }

    fn facets(&self) -> Result<Vec<Facet>, SchemaError> {
        let mut facets: Vec<Facet> = [
            self.entity()?,
            self.property()?,
            self.classification()?,
            self.attribute()?,
            self.material()?,
        ]
        .into_iter()
        .flatten()
        .collect();

        if let Some(instructions) = self.text(FacetField::Instructions)?
            && let Some(first) = facets.first_mut()
        {
            first.instructions = Some(instructions);
        }
        Ok(facets)
    }

    fn entity(&self) -> Result<Option<Facet>, SchemaError> {
        let name = self.value(FacetField::Entity)?;
        if name.is_empty() {
            return Ok(None);
        }

        if !self.configured(FacetField::PredefinedType)
            && let Some((entity, predefined)) = name.as_literal().and_then(split_dotted)
        {
            return Ok(Some(Facet::entity(
                InferredValue::Literal(entity.to_uppercase()),
                Some(InferredValue::Literal(predefined.to_uppercase())),
            )));
        }

        let predefined_type = self.value(FacetField::PredefinedType)?.non_empty();
        Ok(Some(Facet::entity(name, predefined_type)))
    }

    fn property(&self) -> Result<Option<Facet>, SchemaError> {
        let base_name = self.value(FacetField::PropertyName)?;
        if base_name.is_empty() {
            return Ok(None);
        }

        let (property_set, base_name) = if self.configured(FacetField::PropertySet) {
            (self.value(FacetField::PropertySet)?, base_name)
        } else if let Some((pset, name)) = base_name.as_literal().and_then(split_dotted) {
            (
                InferredValue::Literal(pset.to_string()),
                InferredValue::Literal(name.to_string()),
            )
        } else {
            return Err(SchemaError::MissingRole(
                self.side.role(FacetField::PropertySet),
            ));
        };

        if property_set.is_empty() {
            tracing::debug!(context = ?self.context, "property without property set ignored");
            return Ok(None);
        }

        let data_type = self
            .text(FacetField::PropertyDataType)?
            .map(|text| text.to_uppercase());
        let value = self.value(FacetField::PropertyValue)?.non_empty();
        let uri = self.text(FacetField::PropertyUri)?;
        Ok(Some(
            Facet::property(property_set, base_name, data_type, value).with_uri(uri),
        ))
    }

    fn classification(&self) -> Result<Option<Facet>, SchemaError> {
        let system = self.value(FacetField::ClassificationSystem)?;
        if system.is_empty() {
            return Ok(None);
        }
        let value = self.value(FacetField::ClassificationValue)?.non_empty();
        let uri = self.text(FacetField::ClassificationUri)?;
        Ok(Some(
            Facet::new(FacetKind::Classification(ClassificationFacet { system, value }))
                .with_uri(uri),
        ))
    }

    fn attribute(&self) -> Result<Option<Facet>, SchemaError> {
        let name = self.value(FacetField::AttributeName)?;
        if name.is_empty() {
            return Ok(None);
        }
        let value = self.value(FacetField::AttributeValue)?.non_empty();
        Ok(Some(Facet::new(FacetKind::Attribute(AttributeFacet {
            name,
            value,
        }))))
    }

    fn material(&self) -> Result<Option<Facet>, SchemaError> {
        let value = self.value(FacetField::Material)?;
        if value.is_empty() {
            return Ok(None);
        }
        let uri = self.text(FacetField::MaterialUri)?;
        Ok(Some(
            Facet::new(FacetKind::Material(MaterialFacet { value })).with_uri(uri),
        ))
    }
}

/// Splits `LEFT.RIGHT` on the first dot; both halves must be non-blank.
fn split_dotted(text: &str) -> Option<(&str, &str)> {
    let (left, right) = text.split_once('.')?;
    let (left, right) = (left.trim(), right.trim());
    (!left.is_empty() && !right.is_empty()).then_some((left, right))
}
