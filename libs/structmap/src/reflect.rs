use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::Result;
use crate::converter::Scalar;
use crate::error::{MapperError, Mismatch};
use crate::flatten::Flattener;
use crate::reconstruct::Reconstructor;
use crate::record::{Record, Reflect};
use crate::value::{Identity, Mapping, Value};

macro_rules! reflect_scalar {
    ($($t:ty),*) => {
        $(
            impl Reflect for $t {
                fn as_any(&self) -> &dyn Any {
                    self
                }

                fn flatten_value(&self, _cx: &mut Flattener<'_>) -> Result<Value> {
                    Ok(Scalar::to_value(self))
                }

                fn assign(
                    &mut self,
                    source: &Value,
                    _cx: &mut Reconstructor<'_>,
                ) -> std::result::Result<(), Mismatch> {
                    match <$t as Scalar>::convert(source) {
                        Some(v) => {
                            *self = v;
                            Ok(())
                        }
                        None => Err(Mismatch::new(self.type_name(), source)),
                    }
                }

                fn assign_raw(&mut self, source: &Value) -> bool {
                    match <$t as Scalar>::cast(source) {
                        Some(v) => {
                            *self = v;
                            true
                        }
                        None => false,
                    }
                }
            }
        )*
    };
}

reflect_scalar!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, char, String);

/// Dynamic values take anything, including nested mappings by handle.
impl Reflect for Value {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_nil(&self) -> bool {
        self.is_null()
    }

    fn is_nullable(&self) -> bool {
        true
    }

    fn flatten_value(&self, _cx: &mut Flattener<'_>) -> Result<Value> {
        Ok(self.clone())
    }

    fn assign(&mut self, source: &Value, _cx: &mut Reconstructor<'_>) -> std::result::Result<(), Mismatch> {
        *self = source.clone();
        Ok(())
    }

    fn assign_raw(&mut self, source: &Value) -> bool {
        *self = source.clone();
        true
    }
}

impl<T: Reflect + Default> Reflect for Option<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_nil(&self) -> bool {
        self.is_none()
    }

    fn is_nullable(&self) -> bool {
        true
    }

    fn flatten_value(&self, cx: &mut Flattener<'_>) -> Result<Value> {
        match self {
            Some(inner) => inner.flatten_value(cx),
            None => Ok(Value::Null),
        }
    }

    fn assign(&mut self, source: &Value, cx: &mut Reconstructor<'_>) -> std::result::Result<(), Mismatch> {
        if source.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        if inner.as_record().is_some_and(|record| cx.reenters(record, source)) {
            tracing::debug!(target_type = %inner.type_name(), "cycle into optional record, left empty");
            return Ok(());
        }
        inner.assign(source, cx)?;
        *self = Some(inner);
        Ok(())
    }

    fn assign_raw(&mut self, source: &Value) -> bool {
        if source.is_null() {
            *self = None;
            return true;
        }
        let mut inner = T::default();
        if !inner.assign_raw(source) {
            return false;
        }
        *self = Some(inner);
        true
    }
}

/// Owned indirection: transparent, including for embedding.
impl<T: Reflect + Default> Reflect for Box<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_nil(&self) -> bool {
        (**self).is_nil()
    }

    fn is_nullable(&self) -> bool {
        (**self).is_nullable()
    }

    fn as_record(&self) -> Option<&dyn Record> {
        (**self).as_record()
    }

    fn as_record_mut(&mut self) -> Option<&mut dyn Record> {
        (**self).as_record_mut()
    }

    fn flatten_value(&self, cx: &mut Flattener<'_>) -> Result<Value> {
        (**self).flatten_value(cx)
    }

    fn assign(&mut self, source: &Value, cx: &mut Reconstructor<'_>) -> std::result::Result<(), Mismatch> {
        (**self).assign(source, cx)
    }

    fn assign_raw(&mut self, source: &Value) -> bool {
        (**self).assign_raw(source)
    }
}

/// Shared pointer: the only kind with an identity, so the only kind that
/// can close a cycle or be shared between fields.
impl<T: Reflect + Default> Reflect for Rc<RefCell<T>> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn flatten_value(&self, cx: &mut Flattener<'_>) -> Result<Value> {
        let pointee = self.try_borrow().map_err(|_| {
            MapperError::InvalidSource(format!("{} is mutably borrowed", self.type_name()))
        })?;
        cx.flatten_shared(Identity::of(self), &*pointee)
    }

    fn assign(&mut self, source: &Value, cx: &mut Reconstructor<'_>) -> std::result::Result<(), Mismatch> {
        *self = cx.construct_shared::<T>(source)?;
        Ok(())
    }

    fn assign_raw(&mut self, source: &Value) -> bool {
        let mut inner = T::default();
        if !inner.assign_raw(source) {
            return false;
        }
        *self = Rc::new(RefCell::new(inner));
        true
    }
}

impl<T: Reflect + Default> Reflect for Vec<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn flatten_value(&self, cx: &mut Flattener<'_>) -> Result<Value> {
        self.iter()
            .map(|item| item.flatten_value(cx))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    fn assign(&mut self, source: &Value, cx: &mut Reconstructor<'_>) -> std::result::Result<(), Mismatch> {
        let Value::Array(items) = source else {
            return Err(Mismatch::new(self.type_name(), source));
        };
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let mut elem = T::default();
            cx.element(i, &mut elem, item);
            out.push(elem);
        }
        *self = out;
        Ok(())
    }
}

impl<T: Reflect + Default, const N: usize> Reflect for [T; N] {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn flatten_value(&self, cx: &mut Flattener<'_>) -> Result<Value> {
        self.iter()
            .map(|item| item.flatten_value(cx))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    fn assign(&mut self, source: &Value, cx: &mut Reconstructor<'_>) -> std::result::Result<(), Mismatch> {
        let items = match source {
            Value::Array(items) if items.len() == N => items,
            _ => return Err(Mismatch::new(self.type_name(), source)),
        };
        let mut out: [T; N] = std::array::from_fn(|_| T::default());
        for (i, (elem, item)) in out.iter_mut().zip(items).enumerate() {
            cx.element(i, elem, item);
        }
        *self = out;
        Ok(())
    }
}

macro_rules! reflect_string_map {
    ($($map:ident),*) => {
        $(
            impl<T: Reflect + Default> Reflect for $map<String, T> {
                fn as_any(&self) -> &dyn Any {
                    self
                }

                fn flatten_value(&self, cx: &mut Flattener<'_>) -> Result<Value> {
                    let mapping = Mapping::new();
                    for (key, item) in self {
                        mapping.insert(key.clone(), item.flatten_value(cx)?);
                    }
                    Ok(Value::Map(mapping))
                }

                fn assign(
                    &mut self,
                    source: &Value,
                    cx: &mut Reconstructor<'_>,
                ) -> std::result::Result<(), Mismatch> {
                    let Some(mapping) = source.as_mapping() else {
                        return Err(Mismatch::new(self.type_name(), source));
                    };
                    let mut out = $map::new();
                    for (key, item) in mapping.entries() {
                        let mut elem = T::default();
                        if cx.entry(&key, &mut elem, &item) {
                            out.insert(key, elem);
                        }
                    }
                    *self = out;
                    Ok(())
                }
            }
        )*
    };
}

reflect_string_map!(HashMap, BTreeMap);

/// A mapping handle as a field: taken by handle, never copied.
impl Reflect for Mapping {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn flatten_value(&self, _cx: &mut Flattener<'_>) -> Result<Value> {
        Ok(Value::Map(self.clone()))
    }

    fn assign(&mut self, source: &Value, _cx: &mut Reconstructor<'_>) -> std::result::Result<(), Mismatch> {
        match source.as_mapping() {
            Some(mapping) => {
                *self = mapping;
                Ok(())
            }
            None => Err(Mismatch::new(self.type_name(), source)),
        }
    }
}
