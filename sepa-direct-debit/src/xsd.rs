//! Compiled subset of XML Schema 1.0 for structural conformance checks
//!
//! Supports what the ISO 20022 pain schemas are built from:
//!
//! - global `xs:element` declarations
//! - named and anonymous `xs:complexType` with `xs:sequence` / `xs:choice`
//!   content, `minOccurs` / `maxOccurs` and `xs:attribute`
//! - `xs:simpleContent` extensions (amount with currency attribute)
//! - `xs:simpleType` restrictions with the facets `length`, `minLength`,
//!   `maxLength`, `pattern`, `enumeration`, `minInclusive`, `maxInclusive`,
//!   `minExclusive`, `maxExclusive`, `totalDigits`, `fractionDigits`
//!
//! Anything else (`xs:import`, `xs:group`, `xs:any`, `complexContent`, lists,
//! unions) is rejected when the schema is compiled.
//!
//! Content models are matched greedily; ISO 20022 schemas satisfy the Unique
//! Particle Attribution rule, so no backtracking is needed.

use crate::error::SchemaViolation;
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const MAX_DERIVATION_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
enum TypeRef {
    /// Type from the XML Schema namespace, by local name
    Builtin(String),
    /// Type declared in this schema (anonymous types get a synthetic name)
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Occurs {
    min: u32,
    /// `None` = unbounded
    max: Option<u32>,
}

#[derive(Debug)]
struct Particle {
    kind: ParticleKind,
    occurs: Occurs,
}

#[derive(Debug)]
enum ParticleKind {
    Element { name: String, type_ref: TypeRef },
    ElementRef(String),
    Sequence(Vec<Particle>),
    Choice(Vec<Particle>),
}

#[derive(Debug)]
struct AttributeDecl {
    name: String,
    type_ref: TypeRef,
    required: bool,
}

#[derive(Debug)]
enum ComplexType {
    Elements {
        content: Option<Particle>,
        attributes: Vec<AttributeDecl>,
    },
    SimpleContent {
        base: TypeRef,
        attributes: Vec<AttributeDecl>,
    },
}

#[derive(Debug, Default)]
struct Facets {
    length: Option<usize>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    patterns: Vec<Regex>,
    enumeration: Vec<String>,
    min_inclusive: Option<Decimal>,
    max_inclusive: Option<Decimal>,
    min_exclusive: Option<Decimal>,
    max_exclusive: Option<Decimal>,
    total_digits: Option<u32>,
    fraction_digits: Option<u32>,
}

#[derive(Debug)]
struct SimpleType {
    base: TypeRef,
    facets: Facets,
}

/// A compiled XSD
#[derive(Debug, Default)]
pub struct Schema {
    target_namespace: Option<String>,
    elements: HashMap<String, TypeRef>,
    complex_types: HashMap<String, ComplexType>,
    simple_types: HashMap<String, SimpleType>,
    anonymous: usize,
}

impl Schema {
    /// Compile schema text
    pub fn parse(xsd: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(xsd)
            .map_err(|e| Error::Schema(format!("XSD is not well-formed: {}", e)))?;

        let root = doc.root_element();
        if root.tag_name().namespace() != Some(XSD_NS) || root.tag_name().name() != "schema" {
            return Err(Error::Schema("root element is not xs:schema".to_string()));
        }

        let mut schema = Schema {
            target_namespace: root.attribute("targetNamespace").map(str::to_string),
            ..Default::default()
        };

        for node in xsd_children(root) {
            match node.tag_name().name() {
                "element" => {
                    let (name, type_ref) = schema.parse_element_decl(node)?;
                    schema.elements.insert(name, type_ref);
                }
                "complexType" => {
                    let name = required_attr(node, "name")?.to_string();
                    let complex = schema.parse_complex_type(node)?;
                    schema.complex_types.insert(name, complex);
                }
                "simpleType" => {
                    let name = required_attr(node, "name")?.to_string();
                    let simple = schema.parse_simple_type(node)?;
                    schema.simple_types.insert(name, simple);
                }
                "annotation" => {}
                other => {
                    return Err(Error::Schema(format!("unsupported top-level xs:{}", other)));
                }
            }
        }

        if schema.elements.is_empty() {
            return Err(Error::Schema("schema declares no global element".to_string()));
        }

        Ok(schema)
    }

    /// Target namespace of the schema
    pub fn target_namespace(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    fn anonymous_name(&mut self, element: &str) -> String {
        self.anonymous += 1;
        format!("{}#{}", element, self.anonymous)
    }

    fn parse_element_decl(&mut self, node: roxmltree::Node<'_, '_>) -> Result<(String, TypeRef)> {
        let name = required_attr(node, "name")?.to_string();

        let type_ref = match node.attribute("type") {
            Some(qname) => resolve_qname(node, qname),
            None => {
                let inline = xsd_children(node)
                    .find(|n| matches!(n.tag_name().name(), "complexType" | "simpleType"));
                match inline {
                    Some(inline) if inline.tag_name().name() == "complexType" => {
                        let complex = self.parse_complex_type(inline)?;
                        let key = self.anonymous_name(&name);
                        self.complex_types.insert(key.clone(), complex);
                        TypeRef::Named(key)
                    }
                    Some(inline) => {
                        let simple = self.parse_simple_type(inline)?;
                        let key = self.anonymous_name(&name);
                        self.simple_types.insert(key.clone(), simple);
                        TypeRef::Named(key)
                    }
                    None => TypeRef::Builtin("anyType".to_string()),
                }
            }
        };

        Ok((name, type_ref))
    }

    fn parse_particle(&mut self, node: roxmltree::Node<'_, '_>) -> Result<Particle> {
        let occurs = parse_occurs(node)?;
        let kind = match node.tag_name().name() {
            "element" => match node.attribute("ref") {
                Some(reference) => ParticleKind::ElementRef(local_name(reference).to_string()),
                None => {
                    let (name, type_ref) = self.parse_element_decl(node)?;
                    ParticleKind::Element { name, type_ref }
                }
            },
            "sequence" => ParticleKind::Sequence(self.parse_group(node)?),
            "choice" => ParticleKind::Choice(self.parse_group(node)?),
            other => return Err(Error::Schema(format!("unsupported particle xs:{}", other))),
        };
        Ok(Particle { kind, occurs })
    }

    fn parse_group(&mut self, node: roxmltree::Node<'_, '_>) -> Result<Vec<Particle>> {
        xsd_children(node)
            .filter(|n| n.tag_name().name() != "annotation")
            .map(|n| self.parse_particle(n))
            .collect()
    }

    fn parse_complex_type(&mut self, node: roxmltree::Node<'_, '_>) -> Result<ComplexType> {
        let mut content = None;
        let mut attributes = Vec::new();

        for child in xsd_children(node) {
            match child.tag_name().name() {
                "sequence" | "choice" => content = Some(self.parse_particle(child)?),
                "attribute" => attributes.push(parse_attribute(child)?),
                "simpleContent" => return parse_simple_content(child),
                "annotation" => {}
                other => {
                    return Err(Error::Schema(format!(
                        "unsupported complex type content xs:{}",
                        other
                    )))
                }
            }
        }

        Ok(ComplexType::Elements {
            content,
            attributes,
        })
    }

    fn parse_simple_type(&mut self, node: roxmltree::Node<'_, '_>) -> Result<SimpleType> {
        let restriction = xsd_children(node)
            .find(|n| n.tag_name().name() == "restriction")
            .ok_or_else(|| {
                Error::Schema("only xs:restriction simple types are supported".to_string())
            })?;
        let base = resolve_qname(restriction, required_attr(restriction, "base")?);

        let mut facets = Facets::default();
        for facet in xsd_children(restriction) {
            let name = facet.tag_name().name();
            if name == "annotation" {
                continue;
            }
            let value = required_attr(facet, "value")?;
            match name {
                "length" => facets.length = Some(parse_facet(name, value)?),
                "minLength" => facets.min_length = Some(parse_facet(name, value)?),
                "maxLength" => facets.max_length = Some(parse_facet(name, value)?),
                "pattern" => facets.patterns.push(compile_pattern(value)?),
                "enumeration" => facets.enumeration.push(value.to_string()),
                "minInclusive" => facets.min_inclusive = Some(parse_facet(name, value)?),
                "maxInclusive" => facets.max_inclusive = Some(parse_facet(name, value)?),
                "minExclusive" => facets.min_exclusive = Some(parse_facet(name, value)?),
                "maxExclusive" => facets.max_exclusive = Some(parse_facet(name, value)?),
                "totalDigits" => facets.total_digits = Some(parse_facet(name, value)?),
                "fractionDigits" => facets.fraction_digits = Some(parse_facet(name, value)?),
                "whiteSpace" => {}
                other => return Err(Error::Schema(format!("unsupported facet xs:{}", other))),
            }
        }

        Ok(SimpleType { base, facets })
    }

    /// Check a document, collecting every violation found
    pub fn validate(&self, xml: &str) -> Vec<SchemaViolation> {
        let mut violations = Vec::new();

        let doc = match roxmltree::Document::parse(xml) {
            Ok(doc) => doc,
            Err(e) => {
                violations.push(violation("/", format!("document is not well-formed XML: {}", e)));
                return violations;
            }
        };

        let root = doc.root_element();
        let name = root.tag_name().name();
        let path = name.to_string();

        if root.tag_name().namespace() != self.target_namespace.as_deref() {
            violations.push(violation(
                &path,
                format!(
                    "namespace {} does not match schema target namespace {}",
                    root.tag_name().namespace().unwrap_or("(none)"),
                    self.target_namespace.as_deref().unwrap_or("(none)")
                ),
            ));
        }

        match self.elements.get(name) {
            Some(type_ref) => self.validate_element(root, type_ref, &path, &mut violations),
            None => violations.push(violation(
                &path,
                format!("<{}> is not a global element of the schema", name),
            )),
        }

        violations
    }

    fn validate_element(
        &self,
        node: roxmltree::Node<'_, '_>,
        type_ref: &TypeRef,
        path: &str,
        out: &mut Vec<SchemaViolation>,
    ) {
        let complex = match type_ref {
            TypeRef::Builtin(name) if name == "anyType" => return,
            TypeRef::Builtin(_) => None,
            TypeRef::Named(name) => self.complex_types.get(name),
        };

        match complex {
            Some(ComplexType::Elements {
                content,
                attributes,
            }) => {
                self.check_attributes(node, attributes, path, out);
                let has_text = node
                    .children()
                    .any(|n| n.is_text() && n.text().map_or(false, |t| !t.trim().is_empty()));
                if has_text {
                    out.push(violation(path, "text is not allowed in element-only content"));
                }
                self.check_children(node, content.as_ref(), path, out);
            }
            Some(ComplexType::SimpleContent { base, attributes }) => {
                self.check_attributes(node, attributes, path, out);
                self.check_leaf(node, base, path, out);
            }
            None => {
                self.check_attributes(node, &[], path, out);
                self.check_leaf(node, type_ref, path, out);
            }
        }
    }

    fn check_attributes(
        &self,
        node: roxmltree::Node<'_, '_>,
        decls: &[AttributeDecl],
        path: &str,
        out: &mut Vec<SchemaViolation>,
    ) {
        for decl in decls.iter().filter(|d| d.required) {
            if node.attribute(decl.name.as_str()).is_none() {
                out.push(violation(
                    path,
                    format!("missing required attribute {}", decl.name),
                ));
            }
        }

        for attr in node.attributes() {
            if attr.namespace() == Some(XSI_NS) {
                continue;
            }
            let attr_path = format!("{}/@{}", path, attr.name());
            let decl = decls
                .iter()
                .find(|d| attr.namespace().is_none() && d.name == attr.name());
            match decl {
                Some(decl) => {
                    if let Err(reason) = self.check_value(&decl.type_ref, attr.value(), 0) {
                        out.push(violation(
                            &attr_path,
                            format!("invalid value {:?}: {}", attr.value(), reason),
                        ));
                    }
                }
                None => out.push(violation(&attr_path, "attribute is not allowed")),
            }
        }
    }

    fn check_leaf(
        &self,
        node: roxmltree::Node<'_, '_>,
        type_ref: &TypeRef,
        path: &str,
        out: &mut Vec<SchemaViolation>,
    ) {
        if let Some(child) = node.children().find(|n| n.is_element()) {
            out.push(violation(
                path,
                format!("unexpected child element <{}>", child.tag_name().name()),
            ));
            return;
        }

        let value: String = node
            .children()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect();
        if let Err(reason) = self.check_value(type_ref, &value, 0) {
            out.push(violation(path, format!("invalid value {:?}: {}", value, reason)));
        }
    }

    fn check_children(
        &self,
        node: roxmltree::Node<'_, '_>,
        content: Option<&Particle>,
        path: &str,
        out: &mut Vec<SchemaViolation>,
    ) {
        let children: Vec<_> = node.children().filter(|n| n.is_element()).collect();
        let names: Vec<&str> = children.iter().map(|n| n.tag_name().name()).collect();

        let Some(content) = content else {
            if let Some(first) = names.first() {
                out.push(violation(path, format!("unexpected element <{}>", first)));
            }
            return;
        };

        let mut assigned = Vec::new();
        match self.match_particle(content, &names, 0, &mut assigned) {
            Some(end) => {
                for (child, type_ref) in children.iter().zip(assigned) {
                    let child_path = format!("{}/{}", path, child.tag_name().name());
                    self.validate_element(*child, type_ref, &child_path, out);
                }
                if end < names.len() {
                    out.push(violation(
                        path,
                        format!(
                            "unexpected element <{}> at position {}, expected {}",
                            names[end],
                            end + 1,
                            describe(content)
                        ),
                    ));
                }
            }
            None => out.push(violation(
                path,
                format!(
                    "content [{}] does not match {}",
                    names.join(", "),
                    describe(content)
                ),
            )),
        }
    }

    /// Match `particle` (with its occurrence bounds) against `names[pos..]`.
    ///
    /// Pushes the declared type of every consumed element onto `assigned` and
    /// returns the position after the match; on failure `assigned` is restored.
    fn match_particle<'s>(
        &'s self,
        particle: &'s Particle,
        names: &[&str],
        pos: usize,
        assigned: &mut Vec<&'s TypeRef>,
    ) -> Option<usize> {
        let start = assigned.len();
        let mut cur = pos;
        let mut count = 0u32;

        while particle.occurs.max.map_or(true, |max| count < max) {
            let mark = assigned.len();
            match self.match_once(&particle.kind, names, cur, assigned) {
                Some(next) if next > cur => {
                    cur = next;
                    count += 1;
                }
                Some(_) => {
                    // an empty match can be repeated up to the minimum
                    count = (count + 1).max(particle.occurs.min);
                    break;
                }
                None => {
                    assigned.truncate(mark);
                    break;
                }
            }
        }

        if count >= particle.occurs.min {
            Some(cur)
        } else {
            assigned.truncate(start);
            None
        }
    }

    fn match_once<'s>(
        &'s self,
        kind: &'s ParticleKind,
        names: &[&str],
        pos: usize,
        assigned: &mut Vec<&'s TypeRef>,
    ) -> Option<usize> {
        match kind {
            ParticleKind::Element { name, type_ref } => {
                if names.get(pos) == Some(&name.as_str()) {
                    assigned.push(type_ref);
                    Some(pos + 1)
                } else {
                    None
                }
            }
            ParticleKind::ElementRef(name) => {
                let type_ref = self.elements.get(name)?;
                if names.get(pos) == Some(&name.as_str()) {
                    assigned.push(type_ref);
                    Some(pos + 1)
                } else {
                    None
                }
            }
            ParticleKind::Sequence(items) => {
                let start = assigned.len();
                let mut cur = pos;
                for item in items {
                    match self.match_particle(item, names, cur, assigned) {
                        Some(next) => cur = next,
                        None => {
                            assigned.truncate(start);
                            return None;
                        }
                    }
                }
                Some(cur)
            }
            ParticleKind::Choice(items) => {
                let mut best: Option<(usize, Vec<&'s TypeRef>)> = None;
                for item in items {
                    let mut candidate = Vec::new();
                    if let Some(next) = self.match_particle(item, names, pos, &mut candidate) {
                        if best.as_ref().map_or(true, |(longest, _)| next > *longest) {
                            best = Some((next, candidate));
                        }
                    }
                }
                let (next, matched) = best?;
                assigned.extend(matched);
                Some(next)
            }
        }
    }

    fn check_value(
        &self,
        type_ref: &TypeRef,
        value: &str,
        depth: usize,
    ) -> std::result::Result<(), String> {
        if depth > MAX_DERIVATION_DEPTH {
            return Err("type derivation is too deep".to_string());
        }

        match type_ref {
            TypeRef::Builtin(name) => check_builtin(name, value),
            TypeRef::Named(name) => {
                let simple = self.simple_types.get(name).ok_or_else(|| {
                    if self.complex_types.contains_key(name) {
                        format!("complex type '{}' cannot hold a simple value", name)
                    } else {
                        format!("type '{}' is not defined in the schema", name)
                    }
                })?;
                self.check_value(&simple.base, value, depth + 1)?;
                simple.facets.check(value)
            }
        }
    }
}

impl Facets {
    fn check(&self, value: &str) -> std::result::Result<(), String> {
        let len = value.chars().count();
        if let Some(length) = self.length {
            if len != length {
                return Err(format!("length must be {}, got {}", length, len));
            }
        }
        if let Some(min) = self.min_length {
            if len < min {
                return Err(format!("must have at least {} characters, got {}", min, len));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return Err(format!("must have at most {} characters, got {}", max, len));
            }
        }
        if !self.patterns.is_empty() && !self.patterns.iter().any(|p| p.is_match(value)) {
            return Err(format!("does not match pattern {}", self.patterns[0].as_str()));
        }
        if !self.enumeration.is_empty() && !self.enumeration.iter().any(|e| e == value) {
            return Err(format!("must be one of {}", self.enumeration.join(", ")));
        }

        let numeric = self.min_inclusive.is_some()
            || self.max_inclusive.is_some()
            || self.min_exclusive.is_some()
            || self.max_exclusive.is_some()
            || self.total_digits.is_some()
            || self.fraction_digits.is_some();
        if !numeric {
            return Ok(());
        }

        let number = Decimal::from_str(value.trim()).map_err(|_| "not a decimal number".to_string())?;
        if let Some(min) = self.min_inclusive {
            if number < min {
                return Err(format!("must be at least {}", min));
            }
        }
        if let Some(max) = self.max_inclusive {
            if number > max {
                return Err(format!("must be at most {}", max));
            }
        }
        if let Some(min) = self.min_exclusive {
            if number <= min {
                return Err(format!("must be greater than {}", min));
            }
        }
        if let Some(max) = self.max_exclusive {
            if number >= max {
                return Err(format!("must be less than {}", max));
            }
        }

        let normalized = number.normalize();
        if let Some(total) = self.total_digits {
            let digits = normalized.mantissa().unsigned_abs().to_string().len() as u32;
            if digits > total {
                return Err(format!("must have at most {} digits, got {}", total, digits));
            }
        }
        if let Some(fraction) = self.fraction_digits {
            if normalized.scale() > fraction {
                return Err(format!(
                    "must have at most {} fraction digits, got {}",
                    fraction,
                    normalized.scale()
                ));
            }
        }

        Ok(())
    }
}

fn check_builtin(name: &str, value: &str) -> std::result::Result<(), String> {
    let collapsed = value.trim();
    let valid = match name {
        "decimal" => Decimal::from_str(collapsed).is_ok(),
        "integer" | "long" | "int" | "short" | "byte" => collapsed.parse::<i128>().is_ok(),
        "nonNegativeInteger" | "unsignedLong" | "unsignedInt" | "unsignedShort" | "unsignedByte" => {
            collapsed.parse::<u128>().is_ok()
        }
        "positiveInteger" => collapsed.parse::<u128>().map_or(false, |n| n > 0),
        "boolean" => matches!(collapsed, "true" | "false" | "1" | "0"),
        "date" => parse_date(collapsed),
        "dateTime" => parse_date_time(collapsed),
        // string-like and remaining built-ins are not checked further
        _ => true,
    };

    if valid {
        Ok(())
    } else {
        Err(format!("not a valid xs:{}", name))
    }
}

/// `YYYY-MM-DD` with an optional `Z` or `±hh:mm` zone
fn parse_date(value: &str) -> bool {
    let (date, zone) = if value.len() > 10 && value.is_char_boundary(10) {
        value.split_at(10)
    } else {
        (value, "")
    };
    let zone_ok = match zone.chars().next() {
        None => true,
        Some('Z') => zone.len() == 1,
        Some('+') | Some('-') => NaiveTime::parse_from_str(&zone[1..], "%H:%M").is_ok(),
        Some(_) => false,
    };
    zone_ok && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

fn parse_date_time(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
}

/// Content model in DTD-like notation, e.g. `(MsgId, CreDtTm, CtrlSum?)`
fn describe(particle: &Particle) -> String {
    let body = match &particle.kind {
        ParticleKind::Element { name, .. } | ParticleKind::ElementRef(name) => name.clone(),
        ParticleKind::Sequence(items) => format!(
            "({})",
            items.iter().map(describe).collect::<Vec<_>>().join(", ")
        ),
        ParticleKind::Choice(items) => format!(
            "({})",
            items.iter().map(describe).collect::<Vec<_>>().join(" | ")
        ),
    };

    match (particle.occurs.min, particle.occurs.max) {
        (1, Some(1)) => body,
        (0, Some(1)) => format!("{}?", body),
        (0, None) => format!("{}*", body),
        (1, None) => format!("{}+", body),
        (min, Some(max)) => format!("{}{{{},{}}}", body, min, max),
        (min, None) => format!("{}{{{},}}", body, min),
    }
}

fn violation(path: &str, message: impl Into<String>) -> SchemaViolation {
    SchemaViolation {
        path: path.to_string(),
        message: message.into(),
    }
}

fn xsd_children<'a, 'input: 'a>(
    node: roxmltree::Node<'a, 'input>,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> + 'a {
    node.children()
        .filter(|n| n.is_element() && n.tag_name().namespace() == Some(XSD_NS))
}

fn required_attr<'a>(node: roxmltree::Node<'a, '_>, name: &str) -> Result<&'a str> {
    node.attribute(name).ok_or_else(|| {
        Error::Schema(format!(
            "xs:{} is missing the '{}' attribute",
            node.tag_name().name(),
            name
        ))
    })
}

fn local_name(qname: &str) -> &str {
    qname.rsplit(':').next().unwrap_or(qname)
}

/// Resolve a QName attribute value against the namespaces in scope
fn resolve_qname(node: roxmltree::Node<'_, '_>, qname: &str) -> TypeRef {
    let (prefix, local) = match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    };
    if node.lookup_namespace_uri(prefix) == Some(XSD_NS) {
        TypeRef::Builtin(local.to_string())
    } else {
        TypeRef::Named(local.to_string())
    }
}

fn parse_occurs(node: roxmltree::Node<'_, '_>) -> Result<Occurs> {
    let min = match node.attribute("minOccurs") {
        Some(value) => parse_facet("minOccurs", value)?,
        None => 1,
    };
    let max = match node.attribute("maxOccurs") {
        Some("unbounded") => None,
        Some(value) => Some(parse_facet("maxOccurs", value)?),
        None => Some(1),
    };
    Ok(Occurs { min, max })
}

fn parse_facet<T: FromStr>(facet: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Schema(format!("invalid {} value '{}'", facet, value)))
}

fn parse_attribute(node: roxmltree::Node<'_, '_>) -> Result<AttributeDecl> {
    Ok(AttributeDecl {
        name: required_attr(node, "name")?.to_string(),
        type_ref: node
            .attribute("type")
            .map(|qname| resolve_qname(node, qname))
            .unwrap_or_else(|| TypeRef::Builtin("anySimpleType".to_string())),
        required: node.attribute("use") == Some("required"),
    })
}

fn parse_simple_content(node: roxmltree::Node<'_, '_>) -> Result<ComplexType> {
    let derivation = xsd_children(node)
        .find(|n| matches!(n.tag_name().name(), "extension" | "restriction"))
        .ok_or_else(|| Error::Schema("xs:simpleContent needs an xs:extension".to_string()))?;
    let base = resolve_qname(derivation, required_attr(derivation, "base")?);
    let attributes = xsd_children(derivation)
        .filter(|n| n.tag_name().name() == "attribute")
        .map(parse_attribute)
        .collect::<Result<Vec<_>>>()?;
    Ok(ComplexType::SimpleContent { base, attributes })
}

/// XSD patterns are implicitly anchored
fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|e| Error::Schema(format!("unsupported pattern '{}': {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns="urn:test:orders" xmlns:xs="http://www.w3.org/2001/XMLSchema"
           targetNamespace="urn:test:orders" elementFormDefault="qualified">
  <xs:element name="Order" type="Order"/>
  <xs:complexType name="Order">
    <xs:sequence>
      <xs:element name="Id" type="Code5"/>
      <xs:element name="Note" type="xs:string" minOccurs="0"/>
      <xs:choice>
        <xs:element name="Iban" type="Iban"/>
        <xs:element name="Other" type="xs:string"/>
      </xs:choice>
      <xs:element name="Line" maxOccurs="unbounded">
        <xs:complexType>
          <xs:sequence>
            <xs:element name="Amt" type="Amount"/>
            <xs:element name="Kind" type="Kind"/>
            <xs:element name="Due" type="xs:date"/>
            <xs:element name="Express" type="xs:boolean" minOccurs="0"/>
          </xs:sequence>
        </xs:complexType>
      </xs:element>
    </xs:sequence>
  </xs:complexType>
  <xs:complexType name="Amount">
    <xs:simpleContent>
      <xs:extension base="Money">
        <xs:attribute name="Ccy" type="Currency" use="required"/>
      </xs:extension>
    </xs:simpleContent>
  </xs:complexType>
  <xs:simpleType name="Money">
    <xs:restriction base="xs:decimal">
      <xs:minInclusive value="0.01"/>
      <xs:totalDigits value="6"/>
      <xs:fractionDigits value="2"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:simpleType name="Currency">
    <xs:restriction base="xs:string">
      <xs:pattern value="[A-Z]{3}"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:simpleType name="Code5">
    <xs:restriction base="xs:string">
      <xs:minLength value="1"/>
      <xs:maxLength value="5"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:simpleType name="Iban">
    <xs:restriction base="xs:string">
      <xs:pattern value="[A-Z]{2}[0-9]{2}[A-Z0-9]{1,30}"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:simpleType name="Kind">
    <xs:restriction base="xs:string">
      <xs:enumeration value="A"/>
      <xs:enumeration value="B"/>
    </xs:restriction>
  </xs:simpleType>
</xs:schema>"#;

    fn doc(body: &str) -> String {
        format!(
            r#"<?xml version="1.0"?><Order xmlns="urn:test:orders">{}</Order>"#,
            body
        )
    }

    const LINE: &str = r#"<Line><Amt Ccy="EUR">12.50</Amt><Kind>A</Kind><Due>2025-10-01</Due></Line>"#;

    fn schema() -> Schema {
        Schema::parse(XSD).unwrap()
    }

    #[test]
    fn test_valid_document() {
        let xml = doc(&format!(
            "<Id>O-1</Id>\n  <Note>hi</Note>\n  <Iban>DE89370400440532013000</Iban>{}{}",
            LINE, LINE
        ));
        let violations = schema().validate(&xml);
        assert!(violations.is_empty(), "{:?}", violations);
        assert_eq!(schema().target_namespace(), Some("urn:test:orders"));
    }

    #[test]
    fn test_missing_required_element() {
        let xml = doc(&format!("<Iban>DE89370400440532013000</Iban>{}", LINE));
        let violations = schema().validate(&xml);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "Order");
        assert!(violations[0].message.contains("Id"));
    }

    #[test]
    fn test_unexpected_trailing_element() {
        let xml = doc(&format!("<Id>O-1</Id><Other>x</Other>{}<Id>O-2</Id>", LINE));
        let violations = schema().validate(&xml);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("unexpected element <Id>"));
    }

    #[test]
    fn test_facets() {
        let xml = doc(
            r#"<Id>TOOLONG</Id><Iban>de89</Iban><Line><Amt Ccy="eur">0.001</Amt><Kind>C</Kind><Due>2025-13-01</Due><Express>yes</Express></Line>"#,
        );
        let paths: Vec<_> = schema()
            .validate(&xml)
            .into_iter()
            .map(|v| v.path)
            .collect();
        assert_eq!(
            paths,
            vec![
                "Order/Id",
                "Order/Iban",
                "Order/Line/Amt/@Ccy",
                "Order/Line/Amt",
                "Order/Line/Kind",
                "Order/Line/Due",
                "Order/Line/Express",
            ]
        );
    }

    #[test]
    fn test_attributes() {
        let xml = doc(r#"<Id>O-1</Id><Other>x</Other><Line><Amt>1.00</Amt><Kind>B</Kind><Due>2025-10-01</Due></Line>"#);
        let violations = schema().validate(&xml);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("missing required attribute Ccy"));

        let xml = doc(&format!(r#"<Id Foo="1">O-1</Id><Other>x</Other>{}"#, LINE));
        let violations = schema().validate(&xml);
        assert_eq!(violations[0].path, "Order/Id/@Foo");
    }

    #[test]
    fn test_wrong_namespace_and_root() {
        let xml = r#"<Order xmlns="urn:test:other"><Id>1</Id><Other>x</Other></Order>"#;
        let violations = schema().validate(xml);
        assert!(violations[0].message.contains("does not match schema target namespace"));

        let violations = schema().validate(r#"<Invoice xmlns="urn:test:orders"/>"#);
        assert!(violations[0].message.contains("not a global element"));

        let violations = schema().validate("<Order");
        assert!(violations[0].message.contains("not well-formed"));
    }

    #[test]
    fn test_unsupported_constructs() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:import namespace="urn:other"/>
</xs:schema>"#;
        assert!(matches!(Schema::parse(xsd), Err(Error::Schema(_))));
        assert!(matches!(Schema::parse("<schema/>"), Err(Error::Schema(_))));
    }

    #[test]
    fn test_describe() {
        let schema = schema();
        let Some(ComplexType::Elements { content: Some(content), .. }) = schema.complex_types.get("Order") else {
            panic!("Order should have element content");
        };
        assert_eq!(describe(content), "(Id, Note?, (Iban | Other), Line+)");
    }

    #[test]
    fn test_builtin_values() {
        assert!(check_builtin("date", "2025-10-01").is_ok());
        assert!(check_builtin("date", "2025-10-01Z").is_ok());
        assert!(check_builtin("date", "2025-10-01+02:00").is_ok());
        assert!(check_builtin("date", "01.10.2025").is_err());
        assert!(check_builtin("dateTime", "2025-09-30T12:00:00Z").is_ok());
        assert!(check_builtin("dateTime", "2025-09-30T12:00:00").is_ok());
        assert!(check_builtin("dateTime", "2025-09-30").is_err());
        assert!(check_builtin("decimal", "12.34").is_ok());
        assert!(check_builtin("decimal", "12,34").is_err());
        assert!(check_builtin("positiveInteger", "0").is_err());
        assert!(check_builtin("string", "anything").is_ok());
    }
}
