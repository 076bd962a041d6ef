//! Capability bitmaps.
//!
//! A [`Permission`] is a 64-bit bitmap scoped to a capability domain (its
//! `name`). Which capability each bit stands for is registered per domain in a
//! [`PermissionRegistry`]; the registry is an explicit handle, shared by `Arc`
//! between whoever registers capabilities at startup and whoever serializes
//! permission values.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PERMISSION_BITS: u32 = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("not authorized: {0}")]
    NotAuthorized(String),
    #[error("bit {bit} out of range for capability `{name}` (max {max})", max = PERMISSION_BITS - 1)]
    BitOutOfRange { bit: u32, name: String },
}

// ============================================================================
// Registry
// ============================================================================

/// Bit position → capability name, for one domain.
#[derive(Debug, Default)]
pub struct PermissionsBitmap {
    bitmap: RwLock<BTreeMap<u32, String>>,
}

impl PermissionsBitmap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bit: u32) -> Option<String> {
        self.bitmap.read().get(&bit).cloned()
    }

    pub fn len(&self) -> usize {
        self.bitmap.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bitmap.read().is_empty()
    }

    pub fn register(&self, bit: u32, name: impl Into<String>) -> Result<(), PermissionError> {
        let name = name.into();
        if bit >= PERMISSION_BITS {
            return Err(PermissionError::BitOutOfRange { bit, name });
        }
        self.bitmap.write().insert(bit, name);
        Ok(())
    }
}

/// Domain name → bitmap.
#[derive(Debug, Default)]
pub struct PermissionRegistry {
    domains: RwLock<HashMap<String, Arc<PermissionsBitmap>>>,
}

impl PermissionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` at `bit` for `domain`, creating the domain on first use.
    pub fn register(
        &self,
        domain: &str,
        bit: u32,
        name: impl Into<String>,
    ) -> Result<(), PermissionError> {
        let bitmap = {
            let mut domains = self.domains.write();
            domains
                .entry(domain.to_string())
                .or_insert_with(|| Arc::new(PermissionsBitmap::new()))
                .clone()
        };
        bitmap.register(bit, name)
    }

    pub fn get(&self, domain: &str) -> Option<Arc<PermissionsBitmap>> {
        self.domains.read().get(domain).cloned()
    }
}

// ============================================================================
// Permission values
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// Capability domain the bits are interpreted in.
    pub name: String,
    pub perm: u64,
}

impl Permission {
    pub fn new(name: impl Into<String>, perm: u64) -> Self {
        Self {
            name: name.into(),
            perm,
        }
    }

    /// Rebuild from the signed column representation used by storage layers.
    pub fn from_raw(name: impl Into<String>, raw: i64) -> Self {
        Self::new(name, raw as u64)
    }

    pub fn raw(&self) -> i64 {
        self.perm as i64
    }

    pub fn set(&mut self, bit: u32) {
        if let Some(mask) = mask(bit) {
            self.perm |= mask;
        }
    }

    pub fn clear(&mut self, bit: u32) {
        if let Some(mask) = mask(bit) {
            self.perm &= !mask;
        }
    }

    pub fn test(&self, bit: u32) -> bool {
        mask(bit).is_some_and(|m| self.perm & m != 0)
    }

    /// Set bit positions, ascending.
    pub fn high_bits(&self) -> Vec<u32> {
        (0..PERMISSION_BITS).filter(|&i| self.test(i)).collect()
    }

    /// Names of the set bits registered for this domain, in bit order.
    pub fn permissions(&self, registry: &PermissionRegistry) -> Vec<String> {
        let Some(bitmap) = registry.get(&self.name) else {
            return Vec::new();
        };
        self.high_bits()
            .into_iter()
            .filter_map(|bit| bitmap.get(bit))
            .collect()
    }

    pub fn has_permissions(
        &self,
        registry: &PermissionRegistry,
        names: &[&str],
    ) -> BTreeMap<String, bool> {
        let held = self.permissions(registry);
        names
            .iter()
            .map(|name| (name.to_string(), held.iter().any(|h| h == name)))
            .collect()
    }

    /// Like [`Permission::has_permissions`], with a `NotAuthorized` error per missing name.
    pub fn check_permissions(
        &self,
        registry: &PermissionRegistry,
        names: &[&str],
    ) -> BTreeMap<String, Option<PermissionError>> {
        self.has_permissions(registry, names)
            .into_iter()
            .map(|(name, has)| {
                let err = (!has).then(|| PermissionError::NotAuthorized(name.clone()));
                (name, err)
            })
            .collect()
    }

    /// Serialized form: the capability-name list, never the raw bitmap.
    pub fn to_json(&self, registry: &PermissionRegistry) -> serde_json::Value {
        serde_json::Value::from(self.permissions(registry))
    }
}

fn mask(bit: u32) -> Option<u64> {
    1u64.checked_shl(bit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registry() -> PermissionRegistry {
        let reg = PermissionRegistry::new();
        reg.register("user", 0, "admin").unwrap();
        reg.register("user", 1, "edit").unwrap();
        reg.register("user", 2, "billing").unwrap();
        reg
    }

    #[test]
    fn set_clear_test_cover_both_ends() {
        let mut p = Permission::new("user", 0);
        p.set(0);
        assert_eq!(p.perm, 0x1);
        p.set(63);
        assert_eq!(p.perm, 0x8000_0000_0000_0001);
        p.clear(63);
        assert_eq!(p.perm, 0x1);

        let p = Permission::new("user", 0xf);
        assert!(p.test(3));
        assert!(!Permission::new("user", 0).test(4));
        assert!(!Permission::new("user", 0xfe).test(0));
    }

    #[test]
    fn out_of_range_bits_are_ignored() {
        let mut p = Permission::new("user", 0);
        p.set(64);
        p.clear(99);
        assert_eq!(p.perm, 0);
        assert!(!p.test(64));
    }

    #[test]
    fn high_bits_and_names() {
        let reg = registry();
        let p = Permission::new("user", 0x3);
        assert_eq!(p.high_bits(), vec![0, 1]);
        assert_eq!(p.permissions(&reg), vec!["admin", "edit"]);
        assert_eq!(p.to_json(&reg), serde_json::json!(["admin", "edit"]));
    }

    #[test]
    fn unknown_domain_has_no_permissions() {
        let reg = registry();
        assert!(Permission::new("team", 0x3).permissions(&reg).is_empty());
    }

    #[test]
    fn check_permissions_reports_missing_names() {
        let reg = registry();
        let p = Permission::new("user", 0x1);
        let checked = p.check_permissions(&reg, &["admin", "billing"]);
        assert_eq!(checked["admin"], None);
        assert_eq!(
            checked["billing"],
            Some(PermissionError::NotAuthorized("billing".to_string()))
        );
    }

    #[test]
    fn register_rejects_bits_past_the_bitmap() {
        let reg = PermissionRegistry::new();
        assert!(matches!(
            reg.register("user", 64, "nope"),
            Err(PermissionError::BitOutOfRange { bit: 64, .. })
        ));
    }

    #[test]
    fn raw_roundtrip_keeps_high_bit() {
        let p = Permission::new("user", 0x8000_0000_0000_0000);
        assert_eq!(Permission::from_raw("user", p.raw()), p);
    }

    proptest! {
        #[test]
        fn high_bits_match_popcount(perm in any::<u64>()) {
            let p = Permission::new("user", perm);
            let bits = p.high_bits();
            prop_assert_eq!(bits.len() as u32, perm.count_ones());
            let mut rebuilt = Permission::new("user", 0);
            for b in bits {
                rebuilt.set(b);
            }
            prop_assert_eq!(rebuilt.perm, perm);
        }
    }
}
