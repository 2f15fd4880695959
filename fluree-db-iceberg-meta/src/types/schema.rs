//! Iceberg schema with lazily built field indexes.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::{ListType, MapType, NestedField, PrimitiveType, StructType, Type};
use crate::error::{IcebergError, Result};

/// A table (or virtual table) schema.
///
/// Lookup indexes are computed on first use and cached. Full names join
/// parent names with `.` and include `element`/`key`/`value` for nested
/// collection members; short names omit `element`/`value` when that member is
/// a struct (so `partition_summaries.contains_null` resolves as well as
/// `partition_summaries.element.contains_null`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "SchemaRepr", into = "SchemaRepr")]
pub struct Schema {
    schema_id: i32,
    identifier_field_ids: Vec<i32>,
    struct_type: StructType,
    index: OnceLock<SchemaIndex>,
}

#[derive(Debug, Clone, Default)]
struct SchemaIndex {
    id_to_field: HashMap<i32, NestedField>,
    id_to_name: HashMap<i32, String>,
    name_to_id: HashMap<String, i32>,
    lower_name_to_id: HashMap<String, i32>,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.schema_id == other.schema_id
            && self.identifier_field_ids == other.identifier_field_ids
            && self.struct_type == other.struct_type
    }
}

impl Eq for Schema {}

impl Schema {
    /// Schema with ID 0 and no identifier fields.
    pub fn new(fields: Vec<NestedField>) -> Self {
        Self::with_schema_id(0, fields)
    }

    pub fn with_schema_id(schema_id: i32, fields: Vec<NestedField>) -> Self {
        Self {
            schema_id,
            identifier_field_ids: Vec::new(),
            struct_type: StructType::new(fields),
            index: OnceLock::new(),
        }
    }

    pub fn with_identifier_field_ids(mut self, ids: Vec<i32>) -> Self {
        self.identifier_field_ids = ids;
        self
    }

    pub fn schema_id(&self) -> i32 {
        self.schema_id
    }

    pub fn identifier_field_ids(&self) -> &[i32] {
        &self.identifier_field_ids
    }

    pub fn as_struct(&self) -> &StructType {
        &self.struct_type
    }

    /// Top-level columns.
    pub fn columns(&self) -> &[NestedField] {
        self.struct_type.fields()
    }

    /// Field IDs of the top-level columns, in order.
    pub fn column_ids(&self) -> Vec<i32> {
        self.columns().iter().map(|f| f.id).collect()
    }

    fn index(&self) -> &SchemaIndex {
        self.index.get_or_init(|| SchemaIndex::build(&self.struct_type))
    }

    /// Find a field at any depth by ID.
    pub fn field_by_id(&self, id: i32) -> Option<&NestedField> {
        self.index().id_to_field.get(&id)
    }

    /// Find a field at any depth by full or short name.
    pub fn find_field(&self, name: &str, case_sensitive: bool) -> Option<&NestedField> {
        let index = self.index();
        let id = if case_sensitive {
            index.name_to_id.get(name)
        } else {
            index.lower_name_to_id.get(&name.to_lowercase())
        }?;
        index.id_to_field.get(id)
    }

    /// Find the type of a field by name.
    pub fn find_type(&self, name: &str, case_sensitive: bool) -> Option<&Type> {
        self.find_field(name, case_sensitive).map(|f| &f.field_type)
    }

    /// Full dotted name of a field ID.
    pub fn find_column_name(&self, id: i32) -> Option<&str> {
        self.index().id_to_name.get(&id).map(|s| s.as_str())
    }

    /// Index of every field ID to its field (including list elements and map entries).
    pub fn index_by_id(&self) -> &HashMap<i32, NestedField> {
        &self.index().id_to_field
    }

    /// Index of full and short names to field IDs.
    pub fn index_by_name(&self) -> &HashMap<String, i32> {
        &self.index().name_to_id
    }

    /// Highest field ID in use at any depth.
    pub fn highest_field_id(&self) -> i32 {
        self.index().id_to_field.keys().copied().max().unwrap_or(0)
    }

    /// Prune the schema to the named columns.
    ///
    /// Selecting a nested field keeps its parents (with only the selected
    /// children); selecting a struct, list or map keeps it whole.
    pub fn select<S: AsRef<str>>(&self, names: &[S], case_sensitive: bool) -> Result<Schema> {
        let ids = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.find_field(name, case_sensitive)
                    .map(|f| f.id)
                    .ok_or_else(|| {
                        IcebergError::schema(format!("Cannot find field '{}' in schema", name))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        self.select_ids(&ids)
    }

    /// Prune the schema to the given field IDs, keeping schema order.
    pub fn select_ids(&self, ids: &[i32]) -> Result<Schema> {
        for id in ids {
            if self.field_by_id(*id).is_none() {
                return Err(IcebergError::schema(format!(
                    "Field ID {} not found in schema",
                    id
                )));
            }
        }

        let selected: HashSet<i32> = ids.iter().copied().collect();
        let pruned = prune_struct(&self.struct_type, &selected).unwrap_or_default();
        let identifier_field_ids = self
            .identifier_field_ids
            .iter()
            .copied()
            .filter(|id| selected.contains(id))
            .collect();

        Ok(Schema {
            schema_id: self.schema_id,
            identifier_field_ids,
            struct_type: pruned,
            index: OnceLock::new(),
        })
    }

    /// Reorder/omit top-level columns by field ID, in the order given.
    pub fn project_columns(&self, ids: &[i32]) -> Result<Schema> {
        let fields = ids
            .iter()
            .map(|id| {
                self.struct_type.field(*id).cloned().ok_or_else(|| {
                    IcebergError::schema(format!("Column ID {} not found in schema", id))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Schema::with_schema_id(self.schema_id, fields))
    }

    /// Serialize to Iceberg schema JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| IcebergError::schema(format!("Failed to serialize schema: {}", e)))
    }

    /// Parse Iceberg schema JSON.
    pub fn from_json(json: &str) -> Result<Schema> {
        serde_json::from_str(json)
            .map_err(|e| IcebergError::schema(format!("Failed to parse schema: {}", e)))
    }

    /// Primitive type of a field, if it is primitive.
    pub fn primitive_type(&self, id: i32) -> Option<PrimitiveType> {
        self.field_by_id(id)
            .and_then(|f| f.field_type.as_primitive().copied())
    }
}

fn prune_struct(st: &StructType, selected: &HashSet<i32>) -> Option<StructType> {
    let fields: Vec<NestedField> = st
        .fields()
        .iter()
        .filter_map(|field| {
            if selected.contains(&field.id) {
                return Some(field.clone());
            }
            prune_type(&field.field_type, selected).map(|field_type| NestedField {
                field_type,
                ..field.clone()
            })
        })
        .collect();

    if fields.is_empty() {
        None
    } else {
        Some(StructType::new(fields))
    }
}

fn prune_type(ty: &Type, selected: &HashSet<i32>) -> Option<Type> {
    match ty {
        Type::Primitive(_) => None,
        Type::Struct(st) => prune_struct(st, selected).map(Type::Struct),
        Type::List(list) => {
            if selected.contains(&list.element_id) {
                return Some(ty.clone());
            }
            prune_type(&list.element_type, selected).map(|element| {
                Type::List(ListType {
                    element_id: list.element_id,
                    element_required: list.element_required,
                    element_type: Box::new(element),
                })
            })
        }
        Type::Map(map) => {
            if selected.contains(&map.key_id) || selected.contains(&map.value_id) {
                return Some(ty.clone());
            }
            prune_type(&map.value_type, selected).map(|value| {
                Type::Map(MapType {
                    value_type: Box::new(value),
                    ..map.clone()
                })
            })
        }
    }
}

impl SchemaIndex {
    fn build(root: &StructType) -> Self {
        let mut index = Self::default();
        index.visit_struct(root, &[], &[]);
        index.lower_name_to_id = index
            .name_to_id
            .iter()
            .map(|(name, id)| (name.to_lowercase(), *id))
            .collect();
        index
    }

    fn visit_struct(&mut self, st: &StructType, full: &[&str], short: &[&str]) {
        for field in st.fields() {
            self.add(field, full, short);
            let full_child = child_path(full, &field.name);
            let short_child = child_path(short, &field.name);
            self.visit_type(&field.field_type, &full_child, &short_child);
        }
    }

    fn visit_type(&mut self, ty: &Type, full: &[&str], short: &[&str]) {
        match ty {
            Type::Primitive(_) => {}
            Type::Struct(st) => self.visit_struct(st, full, short),
            Type::List(list) => {
                let element = list.element_field();
                self.add(&element, full, short);
                let full_child = child_path(full, "element");
                let short_child = if list.element_type.as_struct().is_some() {
                    short.to_vec()
                } else {
                    child_path(short, "element")
                };
                self.visit_type(&list.element_type, &full_child, &short_child);
            }
            Type::Map(map) => {
                self.add(&map.key_field(), full, short);
                self.add(&map.value_field(), full, short);
                self.visit_type(&map.key_type, &child_path(full, "key"), &child_path(short, "key"));
                let short_value = if map.value_type.as_struct().is_some() {
                    short.to_vec()
                } else {
                    child_path(short, "value")
                };
                self.visit_type(&map.value_type, &child_path(full, "value"), &short_value);
            }
        }
    }

    fn add(&mut self, field: &NestedField, full: &[&str], short: &[&str]) {
        let full_name = join(full, &field.name);
        let short_name = join(short, &field.name);

        self.id_to_field.entry(field.id).or_insert_with(|| field.clone());
        self.id_to_name.entry(field.id).or_insert_with(|| full_name.clone());
        // full names take precedence over short names
        self.name_to_id.insert(full_name, field.id);
        self.name_to_id.entry(short_name).or_insert(field.id);
    }
}

fn child_path<'a>(parent: &[&'a str], name: &'a str) -> Vec<&'a str> {
    let mut path = parent.to_vec();
    path.push(name);
    path
}

fn join(parent: &[&str], name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent.join("."), name)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SchemaRepr {
    #[serde(rename = "type", default = "struct_tag")]
    kind: String,
    #[serde(default)]
    schema_id: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    identifier_field_ids: Vec<i32>,
    fields: Vec<NestedField>,
}

fn struct_tag() -> String {
    "struct".to_string()
}

impl From<SchemaRepr> for Schema {
    fn from(repr: SchemaRepr) -> Self {
        Schema::with_schema_id(repr.schema_id, repr.fields)
            .with_identifier_field_ids(repr.identifier_field_ids)
    }
}

impl From<Schema> for SchemaRepr {
    fn from(schema: Schema) -> Self {
        SchemaRepr {
            kind: struct_tag(),
            schema_id: schema.schema_id,
            identifier_field_ids: schema.identifier_field_ids,
            fields: schema.struct_type.fields().to_vec(),
        }
    }
}
