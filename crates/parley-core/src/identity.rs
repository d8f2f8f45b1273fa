//! Supplier identity reconciliation.
//!
//! The backend describes suppliers in three places that share no reliable join
//! key: the product catalog, the supplier registry and the agent list of a
//! negotiation status. [`IdentityReconciler`] turns a bare supplier id into a
//! [`SupplierIdentity`] by consulting, in order:
//!
//! 1. the product catalog (rows whose `supplier_id` equals the id),
//! 2. the supplier registry (by id, then by name),
//! 3. a synthesized placeholder (`"Supplier {id}"`, electronics).
//!
//! The catalog comes first because it is the more reliably populated source.
//! Resolution never fails.

use std::collections::HashMap;

use tracing::debug;

use crate::fields::{canonical_id, rules, RawRecord};
use crate::supplier::SupplierIdentity;

/// Which source produced an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    Catalog,
    Registry,
    Placeholder,
}

/// Lookup tables built from one snapshot of the catalog and the registry.
#[derive(Debug, Clone, Default)]
pub struct IdentityReconciler {
    catalog: HashMap<String, SupplierIdentity>,
    registry_by_id: HashMap<String, SupplierIdentity>,
    registry_by_name: HashMap<String, SupplierIdentity>,
}

impl IdentityReconciler {
    /// Build the lookup tables. Either slice may be empty when its source was
    /// unavailable; first match wins inside each source.
    pub fn new(products: &[RawRecord], suppliers: &[RawRecord]) -> Self {
        let mut catalog = HashMap::new();
        for row in products {
            if let Some(id) = row.get_id(&rules::PRODUCT_SUPPLIER_ID) {
                catalog
                    .entry(id.clone())
                    .or_insert_with(|| SupplierIdentity::from_catalog_row(&id, row));
            }
        }

        let mut registry_by_id = HashMap::new();
        let mut registry_by_name = HashMap::new();
        for row in suppliers {
            let Some(identity) = SupplierIdentity::from_registry_row(row) else {
                continue;
            };
            // Some responses only carry a name where an id is expected.
            if let Some(name) = row.get_id(&rules::SUPPLIER_NAME) {
                registry_by_name.entry(name).or_insert_with(|| identity.clone());
            }
            registry_by_id.entry(identity.id.clone()).or_insert(identity);
        }

        debug!(
            catalog = catalog.len(),
            registry = registry_by_id.len(),
            "Built supplier identity tables"
        );

        Self {
            catalog,
            registry_by_id,
            registry_by_name,
        }
    }

    /// A reconciler with no sources; every id resolves to a placeholder.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve one supplier id.
    pub fn resolve(&self, supplier_id: &str) -> SupplierIdentity {
        self.resolve_with_source(supplier_id).0
    }

    /// Resolve one supplier id and report which source answered.
    pub fn resolve_with_source(&self, supplier_id: &str) -> (SupplierIdentity, IdentitySource) {
        let Some(id) = canonical_id(supplier_id) else {
            return (SupplierIdentity::placeholder(""), IdentitySource::Placeholder);
        };

        if let Some(identity) = self.catalog.get(&id) {
            return (identity.clone(), IdentitySource::Catalog);
        }

        // An exact id beats another supplier's name.
        if let Some(identity) = self.registry_by_id.get(&id) {
            return (identity.clone(), IdentitySource::Registry);
        }

        if let Some(identity) = self.registry_by_name.get(&id) {
            let mut identity = identity.clone();
            // A name-keyed hit still reports the id the caller asked about.
            identity.id = id;
            return (identity, IdentitySource::Registry);
        }

        (SupplierIdentity::placeholder(&id), IdentitySource::Placeholder)
    }

    /// Resolve a list of ids, keeping order.
    pub fn resolve_all<S: AsRef<str>>(&self, supplier_ids: &[S]) -> Vec<SupplierIdentity> {
        supplier_ids.iter().map(|id| self.resolve(id.as_ref())).collect()
    }

    /// Number of suppliers known to the catalog.
    pub fn catalog_len(&self) -> usize {
        self.catalog.len()
    }

    /// Number of suppliers known to the registry.
    pub fn registry_len(&self) -> usize {
        self.registry_by_id.len()
    }
}
