//! Seal and freeze (SetIntegrityLevel / TestIntegrityLevel)

use crate::descriptor::PropertyDescriptor;
use crate::error::VmResult;
use crate::object::ObjectRef;

/// Integrity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityLevel {
    /// No own property is configurable, object is not extensible
    Sealed,
    /// Sealed, and no own data property is writable
    Frozen,
}

impl ObjectRef {
    /// SetIntegrityLevel. Attributes are rewritten without validation, then
    /// the object is made non-extensible. The prototype link is not locked.
    pub fn set_integrity_level(&self, level: IntegrityLevel) -> VmResult<()> {
        for key in self.get_ids(true)? {
            let Some(current) = self.get_own_property(&key)? else {
                continue;
            };
            let mut desc = PropertyDescriptor {
                configurable: Some(false),
                ..Default::default()
            };
            if level == IntegrityLevel::Frozen && current.is_data() {
                desc.writable = Some(false);
            }
            self.define_own_property_with(&key, &desc, false)?;
        }
        self.prevent_extensions();
        tracing::debug!(
            target: "marten::object",
            class = self.class_name(),
            ?level,
            "integrity level set"
        );
        Ok(())
    }

    /// TestIntegrityLevel
    pub fn test_integrity_level(&self, level: IntegrityLevel) -> VmResult<bool> {
        if self.is_extensible() {
            return Ok(false);
        }
        for key in self.get_ids(true)? {
            let Some(desc) = self.get_own_property(&key)? else {
                continue;
            };
            if desc.configurable == Some(true) {
                return Ok(false);
            }
            if level == IntegrityLevel::Frozen && desc.is_data() && desc.writable == Some(true) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Seal
    pub fn seal(&self) -> VmResult<()> {
        self.set_integrity_level(IntegrityLevel::Sealed)
    }

    /// Freeze
    pub fn freeze(&self) -> VmResult<()> {
        self.set_integrity_level(IntegrityLevel::Frozen)
    }

    /// IsSealed
    pub fn is_sealed(&self) -> VmResult<bool> {
        self.test_integrity_level(IntegrityLevel::Sealed)
    }

    /// IsFrozen
    pub fn is_frozen(&self) -> VmResult<bool> {
        self.test_integrity_level(IntegrityLevel::Frozen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::OrdinaryObject;
    use crate::property::{Attributes, PropertyKey};
    use crate::value::Value;

    #[test]
    fn test_seal_keeps_values_writable() {
        let obj = OrdinaryObject::create(None);
        obj.put(&PropertyKey::name("a"), Value::Number(1.0)).unwrap();
        obj.seal().unwrap();
        assert!(obj.is_sealed().unwrap());
        assert!(!obj.is_frozen().unwrap());
        assert!(obj.put(&PropertyKey::name("a"), Value::Number(2.0)).unwrap());
        assert!(!obj.delete(&PropertyKey::name("a")).unwrap());
        assert!(!obj.put(&PropertyKey::name("b"), Value::Null).unwrap());
    }

    #[test]
    fn test_empty_non_extensible_is_frozen() {
        let obj = OrdinaryObject::create(None);
        assert!(!obj.is_frozen().unwrap());
        obj.prevent_extensions();
        assert!(obj.is_frozen().unwrap());
    }

    #[test]
    fn test_freeze_leaves_accessors_alone() {
        let obj = OrdinaryObject::create(None);
        obj.define_accessor("acc", None, None, Attributes::EMPTY)
            .unwrap();
        obj.freeze().unwrap();
        let desc = obj
            .get_own_property(&PropertyKey::name("acc"))
            .unwrap()
            .unwrap();
        assert!(desc.is_accessor());
        assert_eq!(desc.configurable, Some(false));
        assert!(obj.is_frozen().unwrap());
    }
}
