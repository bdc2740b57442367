//! JSON catalog of record types.
//!
//! ```json
//! {
//!   "types": [
//!     {
//!       "name": "Address",
//!       "fields": [
//!         { "name": "id", "type": "int", "markers": [{ "kind": "exclude", "scope": "input" }] },
//!         { "name": "street", "type": "str" }
//!       ]
//!     },
//!     {
//!       "name": "Person",
//!       "doc": "A person.",
//!       "fields": [
//!         { "name": "addresses", "type": "list<Address>", "default_factory": "list" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Types are built in order; a field may only reference types declared
//! before it.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Deserializer};
use tracing::debug;
use variants_model::{DefaultFactory, FieldDescriptor, Marker, RecordType, TypeExpr, Value};

/// Raw catalog file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSpec {
    pub types: Vec<TypeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeSpec {
    pub name: String,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub config: BTreeMap<String, Value>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    /// `Some(Value::Null)` for an explicit `null`, `None` when absent.
    #[serde(default, deserialize_with = "present")]
    pub default: Option<Value>,
    #[serde(default)]
    pub default_factory: Option<String>,
    #[serde(default)]
    pub markers: Vec<Marker>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Built record types, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    types: Vec<RecordType>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read catalog {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("load catalog {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let spec: CatalogSpec = serde_json::from_str(text).context("parse catalog JSON")?;
        Self::from_spec(&spec)
    }

    pub fn from_spec(spec: &CatalogSpec) -> Result<Self> {
        let declared: HashSet<&str> = spec.types.iter().map(|ty| ty.name.as_str()).collect();
        if declared.len() != spec.types.len() {
            bail!("catalog declares a type name more than once");
        }
        let mut catalog = Catalog::default();
        for ty in &spec.types {
            let record = catalog
                .build_type(ty, &declared)
                .with_context(|| format!("type {}", ty.name))?;
            debug!(name = %record.name(), fields = record.fields().len(), "catalog type built");
            catalog.types.push(record);
        }
        Ok(catalog)
    }

    fn build_type(&self, spec: &TypeSpec, declared: &HashSet<&str>) -> Result<RecordType> {
        let base = spec
            .base
            .as_deref()
            .map(|name| {
                self.get(name)
                    .cloned()
                    .ok_or_else(|| anyhow!("base type {name} is not declared before {}", spec.name))
            })
            .transpose()?;
        let fields = spec
            .fields
            .iter()
            .map(|field| {
                self.build_field(field, declared)
                    .with_context(|| format!("field {}", field.name))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RecordType::builder(&spec.name)
            .fields(fields)
            .config_map(spec.config.clone())
            .doc(spec.doc.clone())
            .base(base)
            .build()?)
    }

    fn build_field(&self, spec: &FieldSpec, declared: &HashSet<&str>) -> Result<FieldDescriptor> {
        let ty = TypeParser::new(&spec.ty, |name: &str| self.resolve(name, declared)).parse()?;
        let mut field = FieldDescriptor::new(&spec.name, ty);
        match (&spec.default, &spec.default_factory) {
            (Some(_), Some(_)) => bail!("default and default_factory are mutually exclusive"),
            (Some(value), None) => field = field.with_default(value.clone()),
            (None, Some(name)) => field = field.with_default_factory(default_factory(name)?),
            (None, None) => {}
        }
        for marker in &spec.markers {
            field = field.with_marker(marker.clone());
        }
        Ok(field)
    }

    fn resolve(&self, name: &str, declared: &HashSet<&str>) -> Result<Option<RecordType>> {
        match self.get(name) {
            Some(record) => Ok(Some(record.clone())),
            None if declared.contains(name) => {
                bail!("type {name} is referenced before it is declared")
            }
            None => Ok(None),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RecordType> {
        self.types.iter().find(|ty| ty.name() == name)
    }

    pub fn types(&self) -> &[RecordType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Named default factories available to catalogs.
pub fn default_factory(name: &str) -> Result<DefaultFactory> {
    match name {
        "list" => Ok(DefaultFactory::new("list", || Value::Array(Vec::new()))),
        "map" => Ok(DefaultFactory::new("map", || Value::Object(serde_json::Map::new()))),
        "str" => Ok(DefaultFactory::new("str", || Value::String(String::new()))),
        other => bail!("unknown default factory {other:?}; expected list, map or str"),
    }
}

/// Recursive-descent parser for type syntax:
///
/// ```text
/// type    := postfix ('|' postfix)*
/// postfix := primary '?'*
/// primary := 'list' '<' type '>'
///          | 'map' '<' type ',' type '>'
///          | 'literal' '(' json ')'
///          | '(' type ')'
///          | ident
/// ```
///
/// Identifiers naming a record type become record references; everything
/// else is a scalar.
pub struct TypeParser<'a, R> {
    source: &'a str,
    pos: usize,
    resolve: R,
}

impl<'a, R> TypeParser<'a, R>
where
    R: Fn(&str) -> Result<Option<RecordType>>,
{
    pub fn new(source: &'a str, resolve: R) -> Self {
        Self {
            source,
            pos: 0,
            resolve,
        }
    }

    pub fn parse(mut self) -> Result<TypeExpr> {
        let ty = self.union()?;
        self.skip_ws();
        if self.pos != self.source.len() {
            bail!(
                "unexpected {:?} at offset {} in type {:?}",
                &self.source[self.pos..],
                self.pos,
                self.source
            );
        }
        Ok(ty)
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, token: char) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: char) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            bail!(
                "expected {token:?} at offset {} in type {:?}",
                self.pos,
                self.source
            )
        }
    }

    fn ident(&mut self) -> Result<&'a str> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if len == 0 {
            bail!(
                "expected a type name at offset {} in type {:?}",
                self.pos,
                self.source
            );
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn union(&mut self) -> Result<TypeExpr> {
        let mut members = vec![self.postfix()?];
        while self.eat('|') {
            members.push(self.postfix()?);
        }
        Ok(if members.len() == 1 {
            members.remove(0)
        } else {
            TypeExpr::Union(members)
        })
    }

    fn postfix(&mut self) -> Result<TypeExpr> {
        let mut ty = self.primary()?;
        while self.eat('?') {
            ty = ty.optional();
        }
        Ok(ty)
    }

    fn primary(&mut self) -> Result<TypeExpr> {
        if self.eat('(') {
            let ty = self.union()?;
            self.expect(')')?;
            return Ok(ty);
        }
        let name = self.ident()?;
        match name {
            "list" if self.eat('<') => {
                let inner = self.union()?;
                self.expect('>')?;
                Ok(TypeExpr::list(inner))
            }
            "map" if self.eat('<') => {
                let key = self.union()?;
                self.expect(',')?;
                let value = self.union()?;
                self.expect('>')?;
                Ok(TypeExpr::map(key, value))
            }
            "literal" if self.eat('(') => self.literal(),
            _ => Ok(match (self.resolve)(name)? {
                Some(record) => TypeExpr::Record(record),
                None => TypeExpr::scalar(name),
            }),
        }
    }

    fn literal(&mut self) -> Result<TypeExpr> {
        self.skip_ws();
        let rest = self.rest();
        let len = if rest.starts_with('"') {
            string_len(rest)
        } else {
            rest.find(')')
        }
        .ok_or_else(|| anyhow!("unterminated literal in type {:?}", self.source))?;
        let value: Value = serde_json::from_str(rest[..len].trim())
            .with_context(|| format!("literal value in type {:?}", self.source))?;
        self.pos += len;
        self.expect(')')?;
        Ok(TypeExpr::Literal(value))
    }
}

/// Byte length of the JSON string literal at the start of `text`, quotes
/// included.
fn string_len(text: &str) -> Option<usize> {
    let mut escaped = false;
    for (idx, c) in text.char_indices().skip(1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(idx + 1),
            _ => {}
        }
    }
    None
}
