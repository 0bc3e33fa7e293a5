//! # XSD Reader
//!
//! Builds constraint trees from the subset of XML Schema the editor understands.
//!
//! ## Supported
//!
//! ```text
//! global:     element  complexType  simpleType  group  attributeGroup  attribute
//! particles:  sequence  all (as sequence)  choice  group ref  element (name | ref)
//! content:    simpleContent extension/restriction, complexContent extension/restriction
//! attributes: use  default  fixed  type | inline simpleType, attributeGroup refs
//! facets:     every facet of TypeRestriction
//! ```
//!
//! Named simple types are resolved to their built-in base, with the facets of
//! every derivation step merged. Group references are inlined. `any` and
//! `anyAttribute` are skipped, as are occurrence bounds on compositors.

use crate::builder::ConstraintTreeBuilder;
use crate::constraint::{AttributeUse, ConstraintId, MaxOccurs, Occurs, TypeRestriction};
use crate::error::{SchemaError, SchemaResult};
use crate::tree::{ConstraintTree, TreeBuilder};
use crate::types::BuiltinType;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};
use xsdedit_dom::{parse, NodeId, XmlDocument};

/// Strip a namespace prefix
fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// A parsed schema document with its global declarations indexed by name
#[derive(Debug, Clone)]
pub struct XsdSchema {
    doc: XmlDocument,
    elements: HashMap<String, NodeId>,
    attributes: HashMap<String, NodeId>,
    complex_types: HashMap<String, NodeId>,
    simple_types: HashMap<String, NodeId>,
    groups: HashMap<String, NodeId>,
    attribute_groups: HashMap<String, NodeId>,
}

impl XsdSchema {
    pub fn parse(source: &str) -> SchemaResult<Self> {
        let doc = parse(source)?;
        let root = doc.root_element().ok_or(SchemaError::NotASchema(String::new()))?;
        if local_name(doc.name(root)) != "schema" {
            return Err(SchemaError::NotASchema(doc.name(root).to_string()));
        }

        let mut schema = Self {
            elements: HashMap::new(),
            attributes: HashMap::new(),
            complex_types: HashMap::new(),
            simple_types: HashMap::new(),
            groups: HashMap::new(),
            attribute_groups: HashMap::new(),
            doc,
        };

        let globals: Vec<NodeId> = schema.doc.element_children(root).collect();
        for decl in globals {
            let Some(name) = schema.attr(decl, "name") else {
                continue;
            };
            let index = match local_name(schema.doc.name(decl)) {
                "element" => &mut schema.elements,
                "attribute" => &mut schema.attributes,
                "complexType" => &mut schema.complex_types,
                "simpleType" => &mut schema.simple_types,
                "group" => &mut schema.groups,
                "attributeGroup" => &mut schema.attribute_groups,
                other => {
                    debug!(declaration = other, "ignoring global declaration");
                    continue;
                }
            };
            index.insert(name, decl);
        }

        debug!(
            elements = schema.elements.len(),
            types = schema.complex_types.len() + schema.simple_types.len(),
            "schema indexed"
        );
        Ok(schema)
    }

    /// Names of all global elements, any of which may serve as a document root
    pub fn root_element_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.elements.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.doc.attribute(node, name).map(|attr| self.doc.node_value(attr))
    }

    fn children_named<'a>(&'a self, node: NodeId, name: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.doc
            .element_children(node)
            .filter(move |child| local_name(self.doc.name(*child)) == name)
    }

    fn child_named(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.children_named(node, name).next()
    }

    fn annotation(&self, node: NodeId) -> Option<String> {
        let annotation = self.child_named(node, "annotation")?;
        let text: Vec<String> = self
            .doc
            .element_children(annotation)
            .filter(|c| matches!(local_name(self.doc.name(*c)), "appinfo" | "documentation"))
            .map(|c| self.doc.node_value(c).trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        (!text.is_empty()).then(|| text.join("\n"))
    }
}

impl ConstraintTreeBuilder for XsdSchema {
    #[instrument(skip(self))]
    fn build_constraint_tree(&self, root_element_name: &str) -> SchemaResult<ConstraintTree> {
        let decl = *self
            .elements
            .get(root_element_name)
            .ok_or_else(|| SchemaError::UnknownElement(root_element_name.to_string()))?;

        let mut build = Build {
            schema: self,
            tree: TreeBuilder::new(root_element_name),
            active: vec![format!("element:{root_element_name}")],
        };
        let root = build.tree.root();
        build.fill_element(root, decl)?;

        let tree = build.tree.finish();
        info!(root = root_element_name, nodes = tree.len(), "constraint tree built");
        Ok(tree)
    }
}

/// State of one tree construction
struct Build<'a> {
    schema: &'a XsdSchema,
    tree: TreeBuilder,
    /// Named types, groups and element refs currently being expanded
    active: Vec<String>,
}

impl Build<'_> {
    /// Run `f` with `key` marked as being expanded, failing on re-entry
    fn guarded<T>(
        &mut self,
        key: String,
        f: impl FnOnce(&mut Self) -> SchemaResult<T>,
    ) -> SchemaResult<T> {
        if self.active.contains(&key) {
            return Err(SchemaError::RecursiveType(key));
        }
        self.active.push(key);
        let result = f(self);
        self.active.pop();
        result
    }

    fn fill_element(&mut self, id: ConstraintId, decl: NodeId) -> SchemaResult<()> {
        let schema = self.schema;
        if let Some(text) = schema.annotation(decl) {
            self.tree.set_annotation(id, text);
        }
        if let Some(value) = schema.attr(decl, "default") {
            self.tree.set_default(id, value);
        }
        if let Some(value) = schema.attr(decl, "fixed") {
            self.tree.set_fixed(id, value);
        }

        if let Some(type_ref) = schema.attr(decl, "type") {
            let type_name = local_name(&type_ref).to_string();
            if let Some(ct) = schema.complex_types.get(&type_name).copied() {
                if let Some(node) = self.tree.node_mut(id) {
                    node.type_name = Some(type_name.clone());
                }
                return self.guarded(format!("type:{type_name}"), |b| b.fill_complex(id, ct));
            }
            let (base, restriction) = self.resolve_simple_named(&type_name)?;
            self.apply_simple(id, base, restriction);
            return Ok(());
        }

        if let Some(ct) = schema.child_named(decl, "complexType") {
            return self.fill_complex(id, ct);
        }
        if let Some(st) = schema.child_named(decl, "simpleType") {
            let (base, restriction) = self.resolve_simple_node(st)?;
            self.apply_simple(id, base, restriction);
            return Ok(());
        }

        // No type at all means anyType
        self.tree.set_type(id, BuiltinType::AnyType.as_str());
        Ok(())
    }

    fn apply_simple(&mut self, id: ConstraintId, base: BuiltinType, restriction: Option<TypeRestriction>) {
        self.tree.set_type(id, base.as_str());
        if let Some(restriction) = restriction {
            self.tree.set_restriction(id, restriction);
        }
    }

    fn fill_complex(&mut self, id: ConstraintId, ct: NodeId) -> SchemaResult<()> {
        let schema = self.schema;
        for child in schema.doc.element_children(ct).collect::<Vec<_>>() {
            match local_name(schema.doc.name(child)) {
                "sequence" | "all" | "choice" | "group" => self.fill_particle(id, child)?,
                "attribute" => self.add_attribute(id, child)?,
                "attributeGroup" => self.add_attribute_group(id, child)?,
                "simpleContent" => self.fill_simple_content(id, child)?,
                "complexContent" => self.fill_complex_content(id, child)?,
                "anyAttribute" => warn!(element = %id, "anyAttribute is not supported, skipping"),
                "annotation" => {}
                other => debug!(construct = other, "ignoring complex type content"),
            }
        }
        Ok(())
    }

    fn fill_simple_content(&mut self, id: ConstraintId, content: NodeId) -> SchemaResult<()> {
        let schema = self.schema;
        let Some(derivation) = schema
            .doc
            .element_children(content)
            .find(|c| matches!(local_name(schema.doc.name(*c)), "extension" | "restriction"))
        else {
            self.tree.set_type(id, BuiltinType::AnySimpleType.as_str());
            return Ok(());
        };

        let base_name = schema
            .attr(derivation, "base")
            .ok_or(SchemaError::MissingAttribute("base"))?;
        let (base, mut restriction) = self.resolve_simple_named(local_name(&base_name))?;
        if local_name(schema.doc.name(derivation)) == "restriction" {
            let derived = self.collect_facets(base, derivation);
            restriction = Some(merge(restriction, derived));
        }
        self.apply_simple(id, base, restriction);

        for child in schema.doc.element_children(derivation).collect::<Vec<_>>() {
            match local_name(schema.doc.name(child)) {
                "attribute" => self.add_attribute(id, child)?,
                "attributeGroup" => self.add_attribute_group(id, child)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn fill_complex_content(&mut self, id: ConstraintId, content: NodeId) -> SchemaResult<()> {
        let schema = self.schema;
        for derivation in schema.doc.element_children(content).collect::<Vec<_>>() {
            match local_name(schema.doc.name(derivation)) {
                "extension" => {
                    let base_name = schema
                        .attr(derivation, "base")
                        .ok_or(SchemaError::MissingAttribute("base"))?;
                    let base_name = local_name(&base_name).to_string();
                    if base_name != BuiltinType::AnyType.as_str() {
                        let base = *schema
                            .complex_types
                            .get(&base_name)
                            .ok_or_else(|| SchemaError::UnknownType(base_name.clone()))?;
                        self.guarded(format!("type:{base_name}"), |b| b.fill_complex(id, base))?;
                    }
                    self.fill_complex(id, derivation)?;
                }
                // A restriction restates the whole content model
                "restriction" => self.fill_complex(id, derivation)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn fill_particle(&mut self, parent: ConstraintId, particle: NodeId) -> SchemaResult<()> {
        let schema = self.schema;
        let compositor = match local_name(schema.doc.name(particle)) {
            "sequence" | "all" => self.tree.sequence(parent),
            "choice" => self.tree.choice(parent),
            "group" => {
                let group_ref = schema
                    .attr(particle, "ref")
                    .ok_or(SchemaError::MissingAttribute("ref"))?;
                let group_name = local_name(&group_ref).to_string();
                let group = *schema
                    .groups
                    .get(&group_name)
                    .ok_or_else(|| SchemaError::UnknownGroup(group_name.clone()))?;
                return self.guarded(format!("group:{group_name}"), |b| {
                    let model = b.schema.doc.element_children(group).find(|c| {
                        matches!(local_name(b.schema.doc.name(*c)), "sequence" | "all" | "choice")
                    });
                    match model {
                        Some(model) => b.fill_particle(parent, model),
                        None => Ok(()),
                    }
                });
            }
            other => {
                debug!(construct = other, "not a particle");
                return Ok(());
            }
        };

        for child in schema.doc.element_children(particle).collect::<Vec<_>>() {
            match local_name(schema.doc.name(child)) {
                "element" => self.add_element(compositor, child)?,
                "sequence" | "all" | "choice" | "group" => self.fill_particle(compositor, child)?,
                "any" => warn!("wildcard particle is not supported, skipping"),
                _ => {}
            }
        }
        Ok(())
    }

    fn add_element(&mut self, parent: ConstraintId, decl: NodeId) -> SchemaResult<()> {
        let schema = self.schema;
        let occurs = occurs_of(schema, decl)?;

        if let Some(element_ref) = schema.attr(decl, "ref") {
            let name = local_name(&element_ref).to_string();
            let global = *schema
                .elements
                .get(&name)
                .ok_or_else(|| SchemaError::UnknownElement(name.clone()))?;
            let id = self.tree.element(parent, name.clone(), occurs);
            if let Some(text) = schema.annotation(decl) {
                self.tree.set_annotation(id, text);
            }
            return self.guarded(format!("element:{name}"), |b| b.fill_element(id, global));
        }

        let name = schema.attr(decl, "name").ok_or(SchemaError::MissingAttribute("name"))?;
        let id = self.tree.element(parent, name, occurs);
        self.fill_element(id, decl)
    }

    fn add_attribute(&mut self, element: ConstraintId, decl: NodeId) -> SchemaResult<()> {
        let schema = self.schema;
        let attribute_use = match schema.attr(decl, "use").as_deref() {
            Some("required") => AttributeUse::Required,
            Some("prohibited") => return Ok(()),
            _ => AttributeUse::Optional,
        };

        let (name, decl) = match schema.attr(decl, "ref") {
            Some(attribute_ref) => {
                let name = local_name(&attribute_ref).to_string();
                let global = *schema
                    .attributes
                    .get(&name)
                    .ok_or_else(|| SchemaError::UnknownType(name.clone()))?;
                (name, global)
            }
            None => (
                schema.attr(decl, "name").ok_or(SchemaError::MissingAttribute("name"))?,
                decl,
            ),
        };

        let id = self.tree.attribute(element, name, attribute_use);
        if let Some(value) = schema.attr(decl, "default") {
            self.tree.set_default(id, value);
        }
        if let Some(value) = schema.attr(decl, "fixed") {
            self.tree.set_fixed(id, value);
        }
        if let Some(text) = schema.annotation(decl) {
            self.tree.set_annotation(id, text);
        }

        let (base, restriction) = match (schema.attr(decl, "type"), schema.child_named(decl, "simpleType")) {
            (Some(type_ref), _) => self.resolve_simple_named(local_name(&type_ref))?,
            (None, Some(st)) => self.resolve_simple_node(st)?,
            (None, None) => (BuiltinType::AnySimpleType, None),
        };
        self.apply_simple(id, base, restriction);
        Ok(())
    }

    fn add_attribute_group(&mut self, element: ConstraintId, reference: NodeId) -> SchemaResult<()> {
        let schema = self.schema;
        let group_ref = schema
            .attr(reference, "ref")
            .ok_or(SchemaError::MissingAttribute("ref"))?;
        let name = local_name(&group_ref).to_string();
        let group = *schema
            .attribute_groups
            .get(&name)
            .ok_or_else(|| SchemaError::UnknownGroup(name.clone()))?;

        self.guarded(format!("attributeGroup:{name}"), |b| {
            for child in b.schema.doc.element_children(group).collect::<Vec<_>>() {
                match local_name(b.schema.doc.name(child)) {
                    "attribute" => b.add_attribute(element, child)?,
                    "attributeGroup" => b.add_attribute_group(element, child)?,
                    _ => {}
                }
            }
            Ok(())
        })
    }

    fn resolve_simple_named(&mut self, name: &str) -> SchemaResult<(BuiltinType, Option<TypeRestriction>)> {
        if let Some(builtin) = BuiltinType::parse(name) {
            return Ok((builtin, None));
        }
        let st = *self
            .schema
            .simple_types
            .get(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))?;
        self.guarded(format!("type:{name}"), |b| b.resolve_simple_node(st))
    }

    fn resolve_simple_node(&mut self, st: NodeId) -> SchemaResult<(BuiltinType, Option<TypeRestriction>)> {
        let schema = self.schema;
        if let Some(restriction) = schema.child_named(st, "restriction") {
            let (base, inherited) = match (
                schema.attr(restriction, "base"),
                schema.child_named(restriction, "simpleType"),
            ) {
                (Some(base), _) => self.resolve_simple_named(local_name(&base))?,
                (None, Some(inner)) => self.resolve_simple_node(inner)?,
                (None, None) => return Err(SchemaError::MissingAttribute("base")),
            };
            let derived = self.collect_facets(base, restriction);
            return Ok((base, Some(merge(inherited, derived))));
        }
        if schema.child_named(st, "list").is_some() {
            debug!("list type treated as string");
            return Ok((BuiltinType::String, None));
        }
        debug!("union type treated as anySimpleType");
        Ok((BuiltinType::AnySimpleType, None))
    }

    fn collect_facets(&self, base: BuiltinType, restriction: NodeId) -> TypeRestriction {
        let schema = self.schema;
        let mut facets = TypeRestriction::new(base.as_str());
        for facet in schema.doc.element_children(restriction) {
            let facet_name = local_name(schema.doc.name(facet));
            if matches!(facet_name, "annotation" | "simpleType" | "attribute" | "attributeGroup") {
                continue;
            }
            let value = schema.attr(facet, "value").unwrap_or_default();
            if !facets.set_facet(facet_name, value) {
                debug!(facet = facet_name, "ignoring unsupported facet");
            }
        }
        facets
    }
}

fn merge(inherited: Option<TypeRestriction>, derived: TypeRestriction) -> TypeRestriction {
    match inherited {
        Some(mut base) => {
            base.merge_from(&derived);
            base
        }
        None => derived,
    }
}

fn occurs_of(schema: &XsdSchema, decl: NodeId) -> SchemaResult<Occurs> {
    let min = match schema.attr(decl, "minOccurs") {
        Some(raw) => raw.trim().parse().map_err(|_| SchemaError::InvalidOccurs(raw))?,
        None => 1,
    };
    let max = match schema.attr(decl, "maxOccurs") {
        Some(raw) if raw.trim() == "unbounded" => MaxOccurs::Unbounded,
        Some(raw) => MaxOccurs::Bounded(raw.trim().parse().map_err(|_| SchemaError::InvalidOccurs(raw))?),
        None => MaxOccurs::Bounded(1),
    };
    Ok(Occurs::new(min, max))
}
