//! Field-ID based projection of rows between two struct shapes.

use std::collections::HashSet;

use super::{Row, Value};
use crate::error::{IcebergError, Result};
use crate::types::{StructType, Type};

/// Narrows rows laid out by a full struct type to a projected struct type.
///
/// Fields are matched by ID, never by position, so the projected type may
/// omit and reorder fields at any depth (nested structs and struct list
/// elements included). The projection is computed once and applied per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructProjection {
    slots: Vec<Slot>,
    source_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    /// Copy the source value at this position as-is.
    Copy(usize),
    /// Project the struct at this position.
    Struct(usize, StructProjection),
    /// Project every struct element of the list at this position.
    ListElements(usize, StructProjection),
}

impl StructProjection {
    /// Build a projection from `full` to `projected`.
    pub fn create(full: &StructType, projected: &StructType) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut slots = Vec::with_capacity(projected.len());

        for field in projected.fields() {
            if !seen.insert(field.id) {
                return Err(IcebergError::schema(format!(
                    "Duplicate field ID {} in projection",
                    field.id
                )));
            }

            let pos = full.position(field.id).ok_or_else(|| {
                IcebergError::schema(format!(
                    "Cannot find field {} (id {}) in source schema",
                    field.name, field.id
                ))
            })?;
            let source = &full.fields()[pos];

            let slot = if source.field_type == field.field_type {
                Slot::Copy(pos)
            } else {
                match (&source.field_type, &field.field_type) {
                    (Type::Struct(from), Type::Struct(to)) => {
                        Slot::Struct(pos, StructProjection::create(from, to)?)
                    }
                    (Type::List(from), Type::List(to)) if from.element_id == to.element_id => {
                        match (from.element_type.as_ref(), to.element_type.as_ref()) {
                            (Type::Struct(from), Type::Struct(to)) => {
                                Slot::ListElements(pos, StructProjection::create(from, to)?)
                            }
                            _ => {
                                return Err(IcebergError::schema(format!(
                                    "Cannot project list {} with element type {} as {}",
                                    field.name, from.element_type, to.element_type
                                )))
                            }
                        }
                    }
                    (from, to) => {
                        return Err(IcebergError::schema(format!(
                            "Cannot project field {} of type {} as {}",
                            field.name, from, to
                        )))
                    }
                }
            };
            slots.push(slot);
        }

        Ok(Self {
            slots,
            source_len: full.len(),
        })
    }

    /// True if rows pass through unchanged.
    pub fn is_identity(&self) -> bool {
        self.slots.len() == self.source_len
            && self
                .slots
                .iter()
                .enumerate()
                .all(|(i, slot)| matches!(slot, Slot::Copy(pos) if *pos == i))
    }

    /// Number of fields in projected rows.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Project a row laid out by the source type.
    ///
    /// Positions missing from a short row project as null.
    pub fn project(&self, row: Row) -> Row {
        if self.is_identity() {
            return row;
        }

        let mut values: Vec<Option<Value>> = row.into_values().into_iter().map(Some).collect();
        let mut take = |pos: usize| {
            values
                .get_mut(pos)
                .and_then(Option::take)
                .unwrap_or(Value::Null)
        };

        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Copy(pos) => take(*pos),
                Slot::Struct(pos, inner) => match take(*pos) {
                    Value::Struct(row) => Value::Struct(inner.project(row)),
                    other => other,
                },
                Slot::ListElements(pos, inner) => match take(*pos) {
                    Value::List(items) => Value::List(
                        items
                            .into_iter()
                            .map(|item| match item {
                                Value::Struct(row) => Value::Struct(inner.project(row)),
                                other => other,
                            })
                            .collect(),
                    ),
                    other => other,
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ListType, NestedField, PrimitiveType};

    fn full_type() -> StructType {
        StructType::new(vec![
            NestedField::required(1, "a", PrimitiveType::Int),
            NestedField::required(2, "b", PrimitiveType::String),
            NestedField::optional(
                3,
                "c",
                ListType::of_required(
                    4,
                    StructType::new(vec![
                        NestedField::required(5, "x", PrimitiveType::Boolean),
                        NestedField::optional(6, "y", PrimitiveType::String),
                    ]),
                ),
            ),
        ])
    }

    fn full_row() -> Row {
        Row::new(vec![
            Value::Int(1),
            Value::from("two"),
            Value::List(vec![
                Value::Struct(Row::new(vec![Value::Boolean(true), Value::from("lo")])),
                Value::Struct(Row::new(vec![Value::Boolean(false), Value::Null])),
            ]),
        ])
    }

    #[test]
    fn test_identity_projection() {
        let full = full_type();
        let projection = StructProjection::create(&full, &full).unwrap();
        assert!(projection.is_identity());
        assert_eq!(projection.project(full_row()), full_row());
    }

    #[test]
    fn test_reorder_and_omit() {
        let full = full_type();
        let projected = StructType::new(vec![
            NestedField::required(2, "b", PrimitiveType::String),
            NestedField::required(1, "a", PrimitiveType::Int),
        ]);

        let projection = StructProjection::create(&full, &projected).unwrap();
        assert!(!projection.is_identity());
        assert_eq!(projection.len(), 2);

        let row = projection.project(full_row());
        assert_eq!(row, Row::new(vec![Value::from("two"), Value::Int(1)]));
    }

    #[test]
    fn test_project_list_elements() {
        let full = full_type();
        let projected = StructType::new(vec![NestedField::optional(
            3,
            "c",
            ListType::of_required(
                4,
                StructType::new(vec![NestedField::optional(6, "y", PrimitiveType::String)]),
            ),
        )]);

        let projection = StructProjection::create(&full, &projected).unwrap();
        let row = projection.project(full_row());
        assert_eq!(
            row,
            Row::new(vec![Value::List(vec![
                Value::Struct(Row::new(vec![Value::from("lo")])),
                Value::Struct(Row::new(vec![Value::Null])),
            ])])
        );
    }

    #[test]
    fn test_invalid_projections() {
        let full = full_type();

        let unknown = StructType::new(vec![NestedField::required(42, "z", PrimitiveType::Int)]);
        assert!(StructProjection::create(&full, &unknown).is_err());

        let wrong_type = StructType::new(vec![NestedField::required(1, "a", PrimitiveType::Long)]);
        assert!(StructProjection::create(&full, &wrong_type).is_err());

        let duplicate = StructType::new(vec![
            NestedField::required(1, "a", PrimitiveType::Int),
            NestedField::required(1, "a", PrimitiveType::Int),
        ]);
        assert!(StructProjection::create(&full, &duplicate).is_err());
    }

    #[test]
    fn test_short_row_projects_nulls() {
        let full = full_type();
        let projected = StructType::new(vec![NestedField::optional(3, "c", full.fields()[2].field_type.clone())]);
        let projection = StructProjection::create(&full, &projected).unwrap();
        let row = projection.project(Row::new(vec![Value::Int(1)]));
        assert_eq!(row, Row::new(vec![Value::Null]));
    }
}
