// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Property access for application objects.
//!
//! A bean type lists its properties once through [`ProtoBean::describe`]. Each property is a
//! pair of optional getter/setter closures plus a [`DeclaredType`]. The resolved table is cached
//! per type by [`BeanDescriptorManager`], and every later lookup for the same type returns the
//! same `Arc`.

#[cfg(test)]
#[path = "./bean_test.rs"]
mod tests;

use crate::declared::DeclaredType;
use crate::error::{Error, Result};
use crate::value::Value;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

type Getter = Arc<dyn Fn(&dyn Any) -> Result<Value> + Send + Sync>;
type Setter = Arc<dyn Fn(&mut dyn Any, Value) -> Result<()> + Send + Sync>;

//
// ProtoBean
//

/// An application type the codec can read from and write into.
pub trait ProtoBean: Any + Default + Clone + PartialEq + fmt::Debug + Send + Sync {
  fn describe(properties: &mut PropertiesBuilder<Self>);
}

//
// DynBean
//

/// Object safe view of a [`ProtoBean`], so that beans can live inside a [`Value`].
pub trait DynBean: Any + fmt::Debug + Send + Sync {
  fn bean_type(&self) -> BeanType;
  fn as_any(&self) -> &dyn Any;
  fn as_any_mut(&mut self) -> &mut dyn Any;
  fn into_any(self: Box<Self>) -> Box<dyn Any>;
  fn clone_bean(&self) -> Box<dyn DynBean>;
  fn eq_bean(&self, other: &dyn DynBean) -> bool;
}

impl<T: ProtoBean> DynBean for T {
  fn bean_type(&self) -> BeanType {
    BeanType::of::<T>()
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn as_any_mut(&mut self) -> &mut dyn Any {
    self
  }

  fn into_any(self: Box<Self>) -> Box<dyn Any> {
    self
  }

  fn clone_bean(&self) -> Box<dyn DynBean> {
    Box::new(self.clone())
  }

  fn eq_bean(&self, other: &dyn DynBean) -> bool {
    other.as_any().downcast_ref::<T>() == Some(self)
  }
}

impl Clone for Box<dyn DynBean> {
  fn clone(&self) -> Self {
    self.clone_bean()
  }
}

impl PartialEq for dyn DynBean {
  fn eq(&self, other: &Self) -> bool {
    self.eq_bean(other)
  }
}

//
// BeanType
//

/// Identity of a bean type plus the hooks needed to describe and instantiate it.
#[derive(Clone, Copy)]
pub struct BeanType {
  id: TypeId,
  name: &'static str,
  describe: fn() -> BeanDescriptor,
}

impl BeanType {
  #[must_use]
  pub fn of<T: ProtoBean>() -> Self {
    Self {
      id: TypeId::of::<T>(),
      name: std::any::type_name::<T>(),
      describe: BeanDescriptor::describe::<T>,
    }
  }

  #[must_use]
  pub const fn id(&self) -> TypeId {
    self.id
  }

  #[must_use]
  pub const fn name(&self) -> &'static str {
    self.name
  }
}

impl PartialEq for BeanType {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for BeanType {}

impl fmt::Debug for BeanType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name)
  }
}

//
// PropertyDescriptor
//

pub struct PropertyDescriptor {
  bean: &'static str,
  name: String,
  declared: DeclaredType,
  getter: Option<Getter>,
  setter: Option<Setter>,
}

impl PropertyDescriptor {
  #[must_use]
  pub fn name(&self) -> &str {
    &self.name
  }

  #[must_use]
  pub const fn declared(&self) -> &DeclaredType {
    &self.declared
  }

  #[must_use]
  pub const fn is_readable(&self) -> bool {
    self.getter.is_some()
  }

  #[must_use]
  pub const fn is_writable(&self) -> bool {
    self.setter.is_some()
  }

  pub fn get(&self, bean: &dyn Any) -> Result<Value> {
    let getter = self.getter.as_ref().ok_or_else(|| Error::PropertyNotReadable {
      bean: self.bean,
      property: self.name.clone(),
    })?;
    getter(bean)
  }

  pub fn set(&self, bean: &mut dyn Any, value: Value) -> Result<()> {
    let setter = self.setter.as_ref().ok_or_else(|| Error::PropertyNotWritable {
      bean: self.bean,
      property: self.name.clone(),
    })?;
    setter(bean, value)
  }
}

impl fmt::Debug for PropertyDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PropertyDescriptor")
      .field("name", &self.name)
      .field("declared", &self.declared)
      .field("readable", &self.is_readable())
      .field("writable", &self.is_writable())
      .finish()
  }
}

//
// PropertiesBuilder
//

#[derive(Clone, Copy, PartialEq, Eq)]
enum Access {
  Accessor,
  Field,
}

struct PropertyEntry {
  name: String,
  declared: DeclaredType,
  access: Access,
  getter: Option<Getter>,
  setter: Option<Setter>,
}

/// Collects the properties of one bean type.
///
/// Accessor registrations ([`Self::getter`], [`Self::setter`]) win over direct field access
/// ([`Self::field`], [`Self::bind`]) registered under the same name, regardless of the order in
/// which they were added.
pub struct PropertiesBuilder<T> {
  entries: Vec<PropertyEntry>,
  _bean: PhantomData<fn() -> T>,
}

impl<T: ProtoBean> PropertiesBuilder<T> {
  fn new() -> Self {
    Self {
      entries: Vec::new(),
      _bean: PhantomData,
    }
  }

  fn bean_name() -> &'static str {
    std::any::type_name::<T>()
  }

  fn wrap_getter(get: impl Fn(&T) -> Value + Send + Sync + 'static) -> Getter {
    Arc::new(move |bean: &dyn Any| {
      bean
        .downcast_ref::<T>()
        .map(&get)
        .ok_or_else(|| Error::ValueType {
          expected: Self::bean_name(),
          actual: "another bean type".to_string(),
        })
    })
  }

  fn wrap_setter(set: impl Fn(&mut T, Value) -> Result<()> + Send + Sync + 'static) -> Setter {
    Arc::new(move |bean: &mut dyn Any, value| {
      let bean = bean
        .downcast_mut::<T>()
        .ok_or_else(|| Error::ValueType {
          expected: Self::bean_name(),
          actual: "another bean type".to_string(),
        })?;
      set(bean, value)
    })
  }

  fn push(
    &mut self,
    name: &str,
    declared: DeclaredType,
    access: Access,
    getter: Option<Getter>,
    setter: Option<Setter>,
  ) -> &mut Self {
    self.entries.push(PropertyEntry {
      name: name.to_string(),
      declared,
      access,
      getter,
      setter,
    });
    self
  }

  /// Direct read/write access to a field.
  pub fn field(
    &mut self,
    name: &str,
    declared: DeclaredType,
    get: impl Fn(&T) -> Value + Send + Sync + 'static,
    set: impl Fn(&mut T, Value) -> Result<()> + Send + Sync + 'static,
  ) -> &mut Self {
    self.push(
      name,
      declared,
      Access::Field,
      Some(Self::wrap_getter(get)),
      Some(Self::wrap_setter(set)),
    )
  }

  /// Direct field access for a field whose Rust type converts to and from [`Value`].
  pub fn bind<V>(
    &mut self,
    name: &str,
    declared: DeclaredType,
    get: impl Fn(&T) -> &V + Send + Sync + 'static,
    get_mut: impl Fn(&mut T) -> &mut V + Send + Sync + 'static,
  ) -> &mut Self
  where
    V: Clone + Into<Value> + crate::value::FromValue + 'static,
  {
    self.field(
      name,
      declared,
      move |bean| get(bean).clone().into(),
      move |bean, value| {
        *get_mut(bean) = V::from_value(value)?;
        Ok(())
      },
    )
  }

  /// A read accessor. Without a matching setter the property is read only and is skipped on
  /// decode.
  pub fn getter(
    &mut self,
    name: &str,
    declared: DeclaredType,
    get: impl Fn(&T) -> Value + Send + Sync + 'static,
  ) -> &mut Self {
    self.push(
      name,
      declared,
      Access::Accessor,
      Some(Self::wrap_getter(get)),
      None,
    )
  }

  /// A write accessor. Without a matching getter the property is write only and counts as
  /// absent on encode.
  pub fn setter(
    &mut self,
    name: &str,
    declared: DeclaredType,
    set: impl Fn(&mut T, Value) -> Result<()> + Send + Sync + 'static,
  ) -> &mut Self {
    self.push(
      name,
      declared,
      Access::Accessor,
      None,
      Some(Self::wrap_setter(set)),
    )
  }

  fn resolve(self) -> Vec<PropertyDescriptor> {
    let mut order: Vec<String> = Vec::new();
    let mut by_name: HashMap<String, Vec<PropertyEntry>> = HashMap::new();
    for entry in self.entries {
      if !by_name.contains_key(&entry.name) {
        order.push(entry.name.clone());
      }
      by_name.entry(entry.name.clone()).or_default().push(entry);
    }

    order
      .into_iter()
      .filter_map(|name| {
        let entries = by_name.remove(&name)?;
        let pick = |access: Access, getter: bool| {
          entries.iter().find(|e| {
            e.access == access
              && if getter {
                e.getter.is_some()
              } else {
                e.setter.is_some()
              }
          })
        };
        let read = pick(Access::Accessor, true).or_else(|| pick(Access::Field, true));
        let write = pick(Access::Accessor, false).or_else(|| pick(Access::Field, false));
        let declared = read.or(write)?.declared.clone();
        Some(PropertyDescriptor {
          bean: Self::bean_name(),
          name,
          declared,
          getter: read.and_then(|e| e.getter.clone()),
          setter: write.and_then(|e| e.setter.clone()),
        })
      })
      .collect()
  }
}

//
// BeanDescriptor
//

/// The resolved property table of one bean type.
pub struct BeanDescriptor {
  bean_type: BeanType,
  properties: Vec<Arc<PropertyDescriptor>>,
  by_name: HashMap<String, usize>,
  factory: fn() -> Box<dyn DynBean>,
}

fn new_bean<T: ProtoBean>() -> Box<dyn DynBean> {
  Box::new(T::default())
}

impl BeanDescriptor {
  fn describe<T: ProtoBean>() -> Self {
    let mut builder = PropertiesBuilder::<T>::new();
    T::describe(&mut builder);
    let properties: Vec<_> = builder.resolve().into_iter().map(Arc::new).collect();
    let by_name = properties
      .iter()
      .enumerate()
      .map(|(i, p)| (p.name.clone(), i))
      .collect();
    Self {
      bean_type: BeanType::of::<T>(),
      properties,
      by_name,
      factory: new_bean::<T>,
    }
  }

  #[must_use]
  pub const fn bean_type(&self) -> BeanType {
    self.bean_type
  }

  #[must_use]
  pub fn properties(&self) -> &[Arc<PropertyDescriptor>] {
    &self.properties
  }

  #[must_use]
  pub fn property(&self, name: &str) -> Option<&Arc<PropertyDescriptor>> {
    self.by_name.get(name).map(|i| &self.properties[*i])
  }

  /// A default constructed instance to decode into.
  #[must_use]
  pub fn instantiate(&self) -> Box<dyn DynBean> {
    (self.factory)()
  }
}

impl fmt::Debug for BeanDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BeanDescriptor")
      .field("bean_type", &self.bean_type)
      .field("properties", &self.properties)
      .finish_non_exhaustive()
  }
}

//
// BeanDescriptorManager
//

/// Cache of resolved bean descriptors keyed by type identity.
#[derive(Debug, Default)]
pub struct BeanDescriptorManager {
  descriptors: DashMap<TypeId, Arc<BeanDescriptor>>,
}

impl BeanDescriptorManager {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns the cached descriptor, building it on first use. Two threads racing on the same
  /// type may both build, but only the first insert is kept, so callers always observe one
  /// `Arc` per type.
  pub fn get_or_create(&self, bean_type: BeanType) -> Arc<BeanDescriptor> {
    if let Some(descriptor) = self.descriptors.get(&bean_type.id) {
      return descriptor.clone();
    }

    let built = Arc::new((bean_type.describe)());
    log::debug!(
      "resolved {} properties for bean {}",
      built.properties.len(),
      bean_type.name
    );
    self
      .descriptors
      .entry(bean_type.id)
      .or_insert(built)
      .clone()
  }
}
