//! Derived-type directory.
//!
//! Record types are immutable, so everything the pipeline hangs off a type
//! (its variant registry, direct aliases, attributes, the back-reference from
//! a variant to its root) lives here, keyed by type identity.
//!
//! # Lifetime
//!
//! An entry holds its own type only weakly, so it lives as long as the type
//! does. Registries hold their variants strongly and back-references are
//! weak: dropping the last handle to an origin lets its entry, and then the
//! entries of variants nobody else holds, be pruned. Pruning runs whenever a
//! new entry is created, or on demand through [`VariantDirectory::prune`].
//!
//! # Locking
//!
//! The outer map is an `RwLock` that is only held long enough to find or
//! insert a per-type entry. Each entry has its own `Mutex`, so connecting
//! variants of different origins never contends, and two variants of the
//! same origin are serialized on that origin's entry. No code path holds two
//! entry locks at once.

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

use tracing::trace;
use variants_model::{RecordType, TypeKey, Value, WeakRecordType};

use crate::error::{Result, VariantError};

/// Something attached to a type under a name.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Value(Value),
    Type(RecordType),
}

impl Attribute {
    pub fn as_type(&self) -> Option<&RecordType> {
        match self {
            Attribute::Type(ty) => Some(ty),
            Attribute::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Attribute::Value(value) => Some(value),
            Attribute::Type(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct TypeEntry {
    /// `None` until the first connect creates the registry.
    variants: Option<BTreeMap<String, RecordType>>,
    attributes: BTreeMap<String, Attribute>,
    root: Option<WeakRecordType>,
}

#[derive(Debug)]
struct Slot {
    owner: WeakRecordType,
    entry: Mutex<TypeEntry>,
}

/// Which effects a single connect applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectPlan {
    /// Create the origin's registry if it does not exist yet.
    pub create_registry: bool,
    /// Store the variant in the registry under its name.
    pub register: bool,
    /// Also expose the variant as an attribute of the origin under this name.
    pub alias: Option<String>,
    /// Record the origin as the variant's root.
    pub back_reference: bool,
}

/// Name-keyed registries of derived types, plus per-type attributes.
#[derive(Debug, Default)]
pub struct VariantDirectory {
    entries: RwLock<HashMap<TypeKey, Arc<Slot>>>,
}

static GLOBAL: OnceLock<Arc<VariantDirectory>> = OnceLock::new();

/// Drop slots whose type is gone. Removing an origin can release its
/// variants, so repeat until nothing changes.
fn prune_dead(entries: &mut HashMap<TypeKey, Arc<Slot>>) -> usize {
    let before = entries.len();
    loop {
        let len = entries.len();
        entries.retain(|_, slot| slot.owner.is_alive());
        if entries.len() == len {
            break;
        }
    }
    before - entries.len()
}

impl VariantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide directory used by contexts bound without an explicit one.
    ///
    /// Entries are pruned as their types are dropped, like any other
    /// directory; the directory itself lives for the whole process.
    pub fn global() -> Arc<VariantDirectory> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(VariantDirectory::new())))
    }

    fn existing(&self, ty: &RecordType) -> Option<Arc<Slot>> {
        self.entries.read().get(&ty.key()).cloned()
    }

    fn entry(&self, ty: &RecordType) -> Arc<Slot> {
        if let Some(slot) = self.existing(ty) {
            return slot;
        }
        let mut entries = self.entries.write();
        if !entries.contains_key(&ty.key()) {
            let pruned = prune_dead(&mut entries);
            if pruned > 0 {
                trace!(pruned, "dropped entries of released types");
            }
        }
        let slot = entries.entry(ty.key()).or_insert_with(|| {
            Arc::new(Slot {
                owner: ty.downgrade(),
                entry: Mutex::new(TypeEntry::default()),
            })
        });
        Arc::clone(slot)
    }

    pub fn connect(
        &self,
        origin: &RecordType,
        name: &str,
        variant: &RecordType,
        plan: &ConnectPlan,
    ) -> Result<Option<RecordType>> {
        let origin_slot = self.entry(origin);
        let previous = {
            let mut entry = origin_slot.entry.lock();
            if entry.variants.is_none() && plan.register && !plan.create_registry {
                return Err(VariantError::MissingRegistry {
                    origin: origin.name().to_string(),
                });
            }
            if plan.create_registry {
                entry.variants.get_or_insert_with(BTreeMap::new);
            }
            let previous = match (plan.register, entry.variants.as_mut()) {
                (true, Some(variants)) => variants.insert(name.to_string(), variant.clone()),
                _ => None,
            };
            if let Some(alias) = &plan.alias {
                entry
                    .attributes
                    .insert(alias.clone(), Attribute::Type(variant.clone()));
            }
            previous
        };

        if plan.back_reference {
            self.entry(variant).entry.lock().root = Some(origin.downgrade());
        }
        Ok(previous)
    }

    pub fn has_registry(&self, origin: &RecordType) -> bool {
        self.existing(origin)
            .is_some_and(|slot| slot.entry.lock().variants.is_some())
    }

    /// Snapshot of the origin's registry, or `None` if it was never created.
    pub fn variants(&self, origin: &RecordType) -> Option<BTreeMap<String, RecordType>> {
        self.existing(origin)
            .and_then(|slot| slot.entry.lock().variants.clone())
    }

    pub fn variant(&self, origin: &RecordType, name: &str) -> Option<RecordType> {
        let slot = self.existing(origin)?;
        let entry = slot.entry.lock();
        entry.variants.as_ref()?.get(name).cloned()
    }

    /// The origin a variant was derived from, if connected with a
    /// back-reference and the origin is still alive.
    pub fn root_of(&self, variant: &RecordType) -> Option<RecordType> {
        let slot = self.existing(variant)?;
        let entry = slot.entry.lock();
        entry.root.as_ref()?.upgrade()
    }

    pub fn attribute(&self, ty: &RecordType, name: &str) -> Option<Attribute> {
        self.existing(ty)
            .and_then(|slot| slot.entry.lock().attributes.get(name).cloned())
    }

    pub fn attributes(&self, ty: &RecordType) -> BTreeMap<String, Attribute> {
        self.existing(ty)
            .map(|slot| slot.entry.lock().attributes.clone())
            .unwrap_or_default()
    }

    /// Set an attribute, returning the one it replaced.
    pub fn set_attribute(
        &self,
        ty: &RecordType,
        name: impl Into<String>,
        attribute: Attribute,
    ) -> Option<Attribute> {
        self.entry(ty)
            .entry
            .lock()
            .attributes
            .insert(name.into(), attribute)
    }

    /// Drop everything recorded for `ty`.
    pub fn forget(&self, ty: &RecordType) -> bool {
        self.entries.write().remove(&ty.key()).is_some()
    }

    /// Drop entries whose type no longer exists; returns how many went.
    pub fn prune(&self) -> usize {
        prune_dead(&mut self.entries.write())
    }

    /// Number of types with an entry.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::thread;
    use variants_model::{FieldDescriptor, TypeExpr};

    fn record(name: &str) -> RecordType {
        RecordType::builder(name)
            .field(FieldDescriptor::new("id", TypeExpr::scalar("int")))
            .build()
            .unwrap()
    }

    fn full_plan(alias: &str) -> ConnectPlan {
        ConnectPlan {
            create_registry: true,
            register: true,
            alias: Some(alias.to_string()),
            back_reference: true,
        }
    }

    #[test]
    fn registry_is_created_lazily() {
        let directory = VariantDirectory::new();
        let user = record("User");
        assert!(!directory.has_registry(&user));
        assert!(directory.variants(&user).is_none());

        let input = record("UserInput");
        directory
            .connect(&user, "Input", &input, &full_plan("_Input"))
            .unwrap();

        assert!(directory.has_registry(&user));
        assert_eq!(directory.variant(&user, "Input"), Some(input.clone()));
        assert_eq!(
            directory.attribute(&user, "_Input"),
            Some(Attribute::Type(input.clone()))
        );
        assert_eq!(directory.root_of(&input), Some(user));
    }

    #[test]
    fn register_without_registry_fails_untouched() {
        let directory = VariantDirectory::new();
        let user = record("User");
        let plan = ConnectPlan {
            create_registry: false,
            ..full_plan("_Input")
        };
        let err = directory
            .connect(&user, "Input", &record("UserInput"), &plan)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateContract);
        assert!(directory.attributes(&user).is_empty());
    }

    #[test]
    fn reconnect_returns_previous() {
        let directory = VariantDirectory::new();
        let user = record("User");
        let first = record("UserInput");
        let second = record("UserInput");
        let plan = full_plan("_Input");
        assert!(directory.connect(&user, "Input", &first, &plan).unwrap().is_none());
        let previous = directory.connect(&user, "Input", &second, &plan).unwrap();
        assert_eq!(previous, Some(first));
        assert_eq!(directory.variant(&user, "Input"), Some(second));
    }

    #[test]
    fn concurrent_connects_keep_every_variant() {
        let directory = Arc::new(VariantDirectory::new());
        let user = record("User");
        let handles: Vec<_> = (0..16)
            .map(|idx| {
                let directory = Arc::clone(&directory);
                let user = user.clone();
                thread::spawn(move || {
                    let variant = record(&format!("UserV{idx}"));
                    directory
                        .connect(&user, &format!("V{idx}"), &variant, &full_plan(&format!("_V{idx}")))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(directory.variants(&user).unwrap().len(), 16);
        assert_eq!(directory.attributes(&user).len(), 16);
    }

    #[test]
    fn entries_live_as_long_as_their_type() {
        let directory = VariantDirectory::new();
        let user = record("User");
        directory
            .connect(&user, "Input", &record("UserInput"), &full_plan("_Input"))
            .unwrap();
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.prune(), 0);
        assert!(directory.variant(&user, "Input").is_some());

        drop(user);
        assert_eq!(directory.prune(), 2);
        assert!(directory.is_empty());
    }

    #[test]
    fn new_entries_prune_released_types() {
        let directory = VariantDirectory::new();
        directory.set_attribute(&record("Scratch"), "note", Attribute::Value(Value::from("x")));
        assert_eq!(directory.len(), 1);

        let kept = record("Kept");
        directory.set_attribute(&kept, "note", Attribute::Value(Value::from("y")));
        assert_eq!(directory.len(), 1);
        assert!(directory.attribute(&kept, "note").is_some());
    }

    #[test]
    fn root_reference_does_not_keep_origin_alive() {
        let directory = VariantDirectory::new();
        let user = record("User");
        let input = record("UserInput");
        directory.connect(&user, "Input", &input, &full_plan("_Input")).unwrap();
        let weak = user.downgrade();
        drop(user);
        assert!(!weak.is_alive());
        assert!(directory.root_of(&input).is_none());
    }

    #[test]
    fn forget_drops_entry() {
        let directory = VariantDirectory::new();
        let user = record("User");
        directory.set_attribute(&user, "note", Attribute::Value(Value::from("x")));
        assert_eq!(directory.len(), 1);
        assert!(directory.forget(&user));
        assert!(directory.is_empty());
        assert!(directory.attribute(&user, "note").is_none());
    }
}
