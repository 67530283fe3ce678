//! Type-erased handles to relation fields.
//!
//! A [`Slot`] borrows one relation field of one record and knows how to
//! decode related rows into it. Records hand slots out from
//! [`Entity::relation`](crate::traits::Entity::relation).

use std::any::Any;
use std::fmt;

use super::spec::Schema;
use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::row::Row;
use crate::traits::{Entity, Model};

/// A related record decoded from a row, with its foreign key value.
pub(crate) struct Decoded {
    pub(crate) key: FilterValue,
    pub(crate) record: Box<dyn Any + Send>,
}

trait RelationSlot<'a>: Send {
    fn related(&self) -> &'static Schema;
    fn is_many(&self) -> bool;
    fn reset(&mut self);
    fn into_entities(self: Box<Self>) -> Vec<&'a mut dyn Entity>;
    fn decode(&self, row: &Row, foreign_key: &str) -> QueryResult<Decoded>;
    fn fill(&mut self, record: &(dyn Any + Send)) -> QueryResult<()>;
}

fn decode_as<T: Model>(row: &Row, foreign_key: &str) -> QueryResult<Decoded> {
    let record = T::from_row(row)?;
    let key = record.field(foreign_key).ok_or_else(|| {
        QueryError::schema_mismatch(
            T::SCHEMA.model,
            foreign_key,
            "foreign key not readable from record",
        )
    })?;
    Ok(Decoded {
        key,
        record: Box::new(record),
    })
}

fn downcast<T: Model>(record: &(dyn Any + Send)) -> QueryResult<T> {
    record.downcast_ref::<T>().cloned().ok_or_else(|| {
        QueryError::internal(format!(
            "decoded record is not a {}",
            T::SCHEMA.model
        ))
    })
}

struct One<'a, T>(&'a mut T);
struct Optional<'a, T>(&'a mut Option<T>);
struct Boxed<'a, T>(&'a mut Option<Box<T>>);
struct Many<'a, T>(&'a mut Vec<T>);

impl<'a, T: Model> RelationSlot<'a> for One<'a, T> {
    fn related(&self) -> &'static Schema {
        T::SCHEMA
    }

    fn is_many(&self) -> bool {
        false
    }

    fn reset(&mut self) {}

    fn into_entities(self: Box<Self>) -> Vec<&'a mut dyn Entity> {
        let One(target) = *self;
        vec![target as &mut dyn Entity]
    }

    fn decode(&self, row: &Row, foreign_key: &str) -> QueryResult<Decoded> {
        decode_as::<T>(row, foreign_key)
    }

    fn fill(&mut self, record: &(dyn Any + Send)) -> QueryResult<()> {
        *self.0 = downcast::<T>(record)?;
        Ok(())
    }
}

impl<'a, T: Model> RelationSlot<'a> for Optional<'a, T> {
    fn related(&self) -> &'static Schema {
        T::SCHEMA
    }

    fn is_many(&self) -> bool {
        false
    }

    fn reset(&mut self) {}

    fn into_entities(self: Box<Self>) -> Vec<&'a mut dyn Entity> {
        let Optional(target) = *self;
        target
            .as_mut()
            .into_iter()
            .map(|r| r as &mut dyn Entity)
            .collect()
    }

    fn decode(&self, row: &Row, foreign_key: &str) -> QueryResult<Decoded> {
        decode_as::<T>(row, foreign_key)
    }

    fn fill(&mut self, record: &(dyn Any + Send)) -> QueryResult<()> {
        *self.0 = Some(downcast::<T>(record)?);
        Ok(())
    }
}

impl<'a, T: Model> RelationSlot<'a> for Boxed<'a, T> {
    fn related(&self) -> &'static Schema {
        T::SCHEMA
    }

    fn is_many(&self) -> bool {
        false
    }

    fn reset(&mut self) {}

    fn into_entities(self: Box<Self>) -> Vec<&'a mut dyn Entity> {
        let Boxed(target) = *self;
        target
            .as_deref_mut()
            .into_iter()
            .map(|r| r as &mut dyn Entity)
            .collect()
    }

    fn decode(&self, row: &Row, foreign_key: &str) -> QueryResult<Decoded> {
        decode_as::<T>(row, foreign_key)
    }

    fn fill(&mut self, record: &(dyn Any + Send)) -> QueryResult<()> {
        *self.0 = Some(Box::new(downcast::<T>(record)?));
        Ok(())
    }
}

impl<'a, T: Model> RelationSlot<'a> for Many<'a, T> {
    fn related(&self) -> &'static Schema {
        T::SCHEMA
    }

    fn is_many(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        self.0.clear();
    }

    fn into_entities(self: Box<Self>) -> Vec<&'a mut dyn Entity> {
        let Many(target) = *self;
        target.iter_mut().map(|r| r as &mut dyn Entity).collect()
    }

    fn decode(&self, row: &Row, foreign_key: &str) -> QueryResult<Decoded> {
        decode_as::<T>(row, foreign_key)
    }

    fn fill(&mut self, record: &(dyn Any + Send)) -> QueryResult<()> {
        self.0.push(downcast::<T>(record)?);
        Ok(())
    }
}

/// Mutable handle to one relation field of one record.
pub struct Slot<'a> {
    inner: Box<dyn RelationSlot<'a> + 'a>,
}

impl<'a> Slot<'a> {
    /// A required single record.
    pub fn one<T: Model>(target: &'a mut T) -> Self {
        Self {
            inner: Box::new(One(target)),
        }
    }

    /// An optional single record.
    pub fn optional<T: Model>(target: &'a mut Option<T>) -> Self {
        Self {
            inner: Box::new(Optional(target)),
        }
    }

    /// An optional boxed record, for self-referencing types.
    pub fn boxed<T: Model>(target: &'a mut Option<Box<T>>) -> Self {
        Self {
            inner: Box::new(Boxed(target)),
        }
    }

    /// A sequence of records.
    pub fn many<T: Model>(target: &'a mut Vec<T>) -> Self {
        Self {
            inner: Box::new(Many(target)),
        }
    }

    /// Schema of the related record type.
    pub fn related(&self) -> &'static Schema {
        self.inner.related()
    }

    /// Whether the slot holds a sequence.
    pub fn is_many(&self) -> bool {
        self.inner.is_many()
    }

    /// Empty a sequence slot; singular slots are left alone.
    pub(crate) fn reset(&mut self) {
        self.inner.reset();
    }

    /// The records currently held, skipping empty optionals.
    pub(crate) fn into_entities(self) -> Vec<&'a mut dyn Entity> {
        self.inner.into_entities()
    }

    pub(crate) fn decode(&self, row: &Row, foreign_key: &str) -> QueryResult<Decoded> {
        self.inner.decode(row, foreign_key)
    }

    /// Append to a sequence, or assign a singular slot.
    pub(crate) fn fill(&mut self, record: &(dyn Any + Send)) -> QueryResult<()> {
        self.inner.fill(record)
    }
}

impl fmt::Debug for Slot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("related", &self.related().model)
            .field("many", &self.is_many())
            .finish()
    }
}
