use std::sync::Arc;

use indexmap::IndexMap;

use crate::errors::{GridError, GridResult};

/// Per-cell values of an auxiliary field on the local partition.
#[derive(Clone, Debug, PartialEq)]
pub enum AuxValues
{
    Real(Vec<f64>),
    Integer(Vec<i32>),
}

impl AuxValues
{
    pub fn len(&self) -> usize
    {
        match self
        {
            AuxValues::Real(v) => v.len(),
            AuxValues::Integer(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }
}

///
/// Named, read-only per-cell dataset attached to a grid (cell area, land
/// mask, length scale). Built once while the grid is assembled.
///
#[derive(Clone, Debug, PartialEq)]
pub struct AuxField
{
    name: String,
    values: AuxValues,
}

impl AuxField
{
    pub fn real(name: impl Into<String>, values: Vec<f64>) -> Self
    {
        Self { name: name.into(), values: AuxValues::Real(values) }
    }

    pub fn integer(name: impl Into<String>, values: Vec<i32>) -> Self
    {
        Self { name: name.into(), values: AuxValues::Integer(values) }
    }

    pub fn name(&self) -> &str
    {
        &self.name
    }

    pub fn values(&self) -> &AuxValues
    {
        &self.values
    }

    pub fn len(&self) -> usize
    {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.values.is_empty()
    }

    pub fn as_real(&self) -> Option<&[f64]>
    {
        match &self.values
        {
            AuxValues::Real(v) => Some(v),
            AuxValues::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<&[i32]>
    {
        match &self.values
        {
            AuxValues::Integer(v) => Some(v),
            AuxValues::Real(_) => None,
        }
    }
}

///
/// Ordered collection of auxiliary fields. Fields are reference counted so
/// copies of a grid share them instead of recomputing or re-reading.
///
#[derive(Clone, Debug, Default)]
pub struct AuxFieldSet
{
    fields: IndexMap<String, Arc<AuxField>>,
}

impl AuxFieldSet
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn insert(&mut self, field: AuxField) -> GridResult<()>
    {
        if self.fields.contains_key(field.name())
        {
            return Err(GridError::DuplicateField(field.name().to_string()));
        }
        self.fields.insert(field.name().to_string(), Arc::new(field));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<AuxField>>
    {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool
    {
        self.fields.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str>
    {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize
    {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.fields.is_empty()
    }
}

#[test]
fn duplicate_names_are_rejected()
{
    let mut set = AuxFieldSet::new();
    set.insert(AuxField::real("area", vec![1.0, 2.0])).unwrap();
    set.insert(AuxField::integer("gmask", vec![1, 0])).unwrap();
    assert!(matches!(set.insert(AuxField::real("area", vec![])), Err(GridError::DuplicateField(_))));
    assert_eq!(set.names().collect::<Vec<_>>(), vec!["area", "gmask"]);
    assert_eq!(set.get("gmask").unwrap().as_integer(), Some(&[1, 0][..]));
    assert!(set.get("area").unwrap().as_integer().is_none());
}
