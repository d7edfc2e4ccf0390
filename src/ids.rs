//! IDS 1.0 document emission.
//!
//! One document per purpose group. Element and attribute order follows the
//! published `ids.xsd`, so output can be fed straight to an IDS checker.

use crate::infer::InferredValue;
use crate::model::{Facet, FacetKind, SpecificationGroup, SpecificationRecord};
use crate::utils::{group_output_path, path_to_forward_slashes};
use anyhow::{Context, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const IDS_NAMESPACE: &str = "http://standards.buildingsmart.org/IDS";
pub const IDS_SCHEMA_LOCATION: &str =
    "http://standards.buildingsmart.org/IDS http://standards.buildingsmart.org/IDS/1.0/ids.xsd";
const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Serialises one purpose group as an IDS document.
pub fn to_xml(group: &SpecificationGroup) -> Result<String> {
    let mut out = IdsWriter::new();
    out.document(group)
        .with_context(|| format!("failed to serialise IDS for purpose '{}'", group.purpose))?;
    String::from_utf8(out.into_inner()).context("IDS output is not valid UTF-8")
}

pub fn write_group(group: &SpecificationGroup, path: &Path) -> Result<()> {
    let xml = to_xml(group)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, xml).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Writes every group next to `base`, returning the paths in group order.
/// Output names are checked for collisions before the first file is written.
pub fn write_groups(groups: &[SpecificationGroup], base: &Path) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::with_capacity(groups.len());
    let mut targets = Vec::with_capacity(groups.len());
    for group in groups {
        let path = group_output_path(base, &group.purpose);
        if !seen.insert(path.clone()) {
            anyhow::bail!(
                "purpose '{}' maps to {} which another group already uses",
                group.purpose,
                path.display()
            );
        }
        targets.push((group, path));
    }

    let mut written = Vec::with_capacity(targets.len());
    for (group, path) in targets {
        write_group(group, &path)?;
        tracing::info!(
            purpose = %group.purpose,
            specifications = group.specifications.len(),
            path = %path_to_forward_slashes(&path),
            "IDS written"
        );
        written.push(path);
    }
    Ok(written)
}

struct IdsWriter {
    writer: Writer<Vec<u8>>,
}

impl IdsWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn into_inner(self) -> Vec<u8> {
        self.writer.into_inner()
    }

    fn document(&mut self, group: &SpecificationGroup) -> Result<()> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        let root = BytesStart::new("ids:ids").with_attributes([
            ("xmlns:ids", IDS_NAMESPACE),
            ("xmlns:xs", XS_NAMESPACE),
            ("xmlns:xsi", XSI_NAMESPACE),
            ("xsi:schemaLocation", IDS_SCHEMA_LOCATION),
        ]);
        self.writer.write_event(Event::Start(root))?;

        self.info(group)?;
        self.open("ids:specifications")?;
        for spec in &group.specifications {
            self.specification(spec)?;
        }
        self.close("ids:specifications")?;

        self.close("ids:ids")
    }

    fn info(&mut self, group: &SpecificationGroup) -> Result<()> {
        let doc = &group.document;
        self.open("ids:info")?;
        self.text_element("ids:title", group.title())?;
        let fields = [
            ("ids:copyright", &doc.copyright),
            ("ids:version", &doc.version),
            ("ids:description", &doc.description),
            ("ids:author", &doc.author),
            ("ids:date", &doc.date),
        ];
        for (tag, value) in fields {
            if let Some(value) = value {
                self.text_element(tag, value)?;
            }
        }
        self.text_element("ids:purpose", &group.purpose)?;
        if let Some(milestone) = &doc.milestone {
            self.text_element("ids:milestone", milestone)?;
        }
        self.close("ids:info")
    }

    fn specification(&mut self, spec: &SpecificationRecord) -> Result<()> {
        let versions = spec.ifc_versions.join(" ");
        let mut start = BytesStart::new("ids:specification");
        start.push_attribute(("name", spec.name.as_str()));
        start.push_attribute(("ifcVersion", versions.as_str()));
        push_optional(&mut start, "identifier", &spec.identifier);
        push_optional(&mut start, "description", &spec.description);
        if let Some(instructions) = spec.instructions() {
            start.push_attribute(("instructions", instructions));
        }
        self.writer.write_event(Event::Start(start))?;

        let policy = spec.cardinality_policy;
        let min = policy.min_occurs.to_string();
        let max = policy.max_occurs.to_string();
        let applicability = BytesStart::new("ids:applicability")
            .with_attributes([("minOccurs", min.as_str()), ("maxOccurs", max.as_str())]);
        self.writer.write_event(Event::Start(applicability))?;
        for facet in &spec.applicability {
            self.facet(facet, false)?;
        }
        self.close("ids:applicability")?;

        if !spec.requirements.is_empty() {
            self.open("ids:requirements")?;
            for facet in &spec.requirements {
                self.facet(facet, true)?;
            }
            self.close("ids:requirements")?;
        }

        self.close("ids:specification")
    }

    /// Applicability facets carry neither cardinality nor instructions, and a
    /// requirement entity takes instructions but no cardinality.
    fn facet(&mut self, facet: &Facet, requirement: bool) -> Result<()> {
        let tag = format!("ids:{}", facet.kind.label());
        let mut start = BytesStart::new(tag.as_str());
        if let FacetKind::Property(property) = &facet.kind {
            push_optional(&mut start, "dataType", &property.data_type);
        }
        let is_entity = matches!(facet.kind, FacetKind::Entity(_));
        let has_uri = !is_entity && !matches!(facet.kind, FacetKind::Attribute(_));
        if requirement && !is_entity {
            start.push_attribute(("cardinality", facet.cardinality.as_str()));
        }
        if has_uri {
            push_optional(&mut start, "uri", &facet.uri);
        }
        if requirement {
            push_optional(&mut start, "instructions", &facet.instructions);
        }
        self.writer.write_event(Event::Start(start))?;

        match &facet.kind {
            FacetKind::Entity(entity) => {
                self.value("ids:name", Some(&entity.name))?;
                self.value("ids:predefinedType", entity.predefined_type.as_ref())?;
            }
            FacetKind::Property(property) => {
                self.value("ids:propertySet", Some(&property.property_set))?;
                self.value("ids:baseName", Some(&property.base_name))?;
                self.value("ids:value", property.value.as_ref())?;
            }
            FacetKind::Classification(classification) => {
                self.value("ids:value", classification.value.as_ref())?;
                self.value("ids:system", Some(&classification.system))?;
            }
            FacetKind::Attribute(attribute) => {
                self.value("ids:name", Some(&attribute.name))?;
                self.value("ids:value", attribute.value.as_ref())?;
            }
            FacetKind::Material(material) => {
                self.value("ids:value", Some(&material.value))?;
            }
        }

        self.close(&tag)
    }

    fn value(&mut self, tag: &str, value: Option<&InferredValue>) -> Result<()> {
        let Some(value) = value else {
            return Ok(());
        };
        match value {
            InferredValue::Empty | InferredValue::Placeholder => return Ok(()),
            InferredValue::Literal(text) => {
                self.open(tag)?;
                self.text_element("ids:simpleValue", text)?;
                self.close(tag)?;
            }
            InferredValue::Enumeration(options) => {
                self.open(tag)?;
                self.restriction(options.iter().map(|o| ("xs:enumeration", o.as_str())))?;
                self.close(tag)?;
            }
            InferredValue::Pattern(pattern) => {
                self.open(tag)?;
                self.restriction(std::iter::once(("xs:pattern", pattern.as_str())))?;
                self.close(tag)?;
            }
        }
        Ok(())
    }

    fn restriction<'v>(
        &mut self,
        items: impl Iterator<Item = (&'static str, &'v str)>,
    ) -> Result<()> {
        let start = BytesStart::new("xs:restriction").with_attributes([("base", "xs:string")]);
        self.writer.write_event(Event::Start(start))?;
        for (tag, value) in items {
            let item = BytesStart::new(tag).with_attributes([("value", value)]);
            self.writer.write_event(Event::Empty(item))?;
        }
        self.close("xs:restriction")
    }

    fn open(&mut self, tag: &str) -> Result<()> {
        self.writer.write_event(Event::Start(BytesStart::new(tag)))?;
        Ok(())
    }

    fn close(&mut self, tag: &str) -> Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    fn text_element(&mut self, tag: &str, text: &str) -> Result<()> {
        self.open(tag)?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.close(tag)
    }
}

fn push_optional(start: &mut BytesStart<'_>, name: &str, value: &Option<String>) {
    if let Some(value) = value {
        start.push_attribute((name, value.as_str()));
    }
}
