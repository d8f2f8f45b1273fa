//! Supplier identities and catalog rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fields::{lenient_opt_string, lenient_string, rules, RawRecord};
use crate::types::ProductCategory;

/// Display name used when even the identifier is unusable.
pub const UNKNOWN_SUPPLIER_NAME: &str = "Unknown Supplier";

/// A display-ready supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierIdentity {
    /// Canonical key, always trimmed.
    pub id: String,

    /// Best-effort resolved name, never empty.
    pub display_name: String,

    /// Category used for grouping.
    pub category: ProductCategory,

    /// Rating, 0.0 when unknown.
    pub rating: f64,

    /// Typical response time, empty when unknown.
    pub response_time: String,

    /// Price range label, empty when unknown.
    pub price_range: String,

    /// Location, empty when unknown.
    pub location: String,
}

impl SupplierIdentity {
    /// Identity with only a name and category known.
    pub fn named(id: impl Into<String>, display_name: impl Into<String>, category: ProductCategory) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            category,
            rating: 0.0,
            response_time: String::new(),
            price_range: String::new(),
            location: String::new(),
        }
    }

    /// Synthesized identity for ids no source knows about.
    pub fn placeholder(id: &str) -> Self {
        let id = id.trim();
        if id.is_empty() {
            Self::named("", UNKNOWN_SUPPLIER_NAME, ProductCategory::default())
        } else {
            Self::named(id, fallback_name(id), ProductCategory::default())
        }
    }

    /// Build from a product-catalog row that references this supplier.
    pub fn from_catalog_row(id: &str, row: &RawRecord) -> Self {
        Self::named(
            id,
            row.get(&rules::SUPPLIER_NAME)
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| fallback_name(id)),
            ProductCategory::parse_or_default(row.get(&rules::CATEGORY).as_deref()),
        )
    }

    /// Build from a supplier-registry row. `None` if the row carries no id.
    pub fn from_registry_row(row: &RawRecord) -> Option<Self> {
        let id = row.get_id(&rules::SUPPLIER_ID)?;
        let display_name = row
            .get(&rules::SUPPLIER_NAME)
            .map(|n| n.trim().to_string())
            .unwrap_or_else(|| id.clone());

        Some(Self {
            category: ProductCategory::parse_or_default(row.get(&rules::CATEGORY).as_deref()),
            rating: row.get_f64(&rules::RATING).unwrap_or(0.0),
            response_time: row.get(&rules::RESPONSE_TIME).unwrap_or_default(),
            price_range: row.get(&rules::PRICE_RANGE).unwrap_or_default(),
            location: row.get(&rules::LOCATION).unwrap_or_default(),
            id,
            display_name,
        })
    }
}

/// `"Supplier {id}"`.
pub fn fallback_name(id: &str) -> String {
    format!("Supplier {}", id)
}

/// Suppliers bucketed by category, keeping input order inside each bucket.
pub fn group_by_category(
    suppliers: &[SupplierIdentity],
) -> BTreeMap<ProductCategory, Vec<&SupplierIdentity>> {
    let mut groups: BTreeMap<ProductCategory, Vec<&SupplierIdentity>> = BTreeMap::new();
    for supplier in suppliers {
        groups.entry(supplier.category).or_default().push(supplier);
    }
    groups
}

/// The category most suppliers belong to.
///
/// Ties go to the category seen first; no suppliers means `Computers`.
pub fn dominant_category(suppliers: &[SupplierIdentity]) -> ProductCategory {
    let mut counts: Vec<(ProductCategory, usize)> = Vec::new();
    for supplier in suppliers {
        match counts.iter_mut().find(|(category, _)| *category == supplier.category) {
            Some((_, n)) => *n += 1,
            None => counts.push((supplier.category, 1)),
        }
    }

    let mut best: Option<(ProductCategory, usize)> = None;
    for (category, n) in counts {
        if best.map_or(true, |(_, top)| n > top) {
            best = Some((category, n));
        }
    }
    best.map_or(ProductCategory::Computers, |(category, _)| category)
}

/// One hit from `/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, deserialize_with = "lenient_string")]
    pub product_id: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub product_name: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub supplier_id: String,

    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub supplier_name: Option<String>,

    #[serde(default)]
    pub similarity_score: Option<f64>,
}

impl Product {
    /// Supplier name for display, falling back to `"Supplier {id}"`.
    pub fn supplier_display_name(&self) -> String {
        self.supplier_name
            .clone()
            .unwrap_or_else(|| fallback_name(&self.supplier_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_placeholder() {
        let identity = SupplierIdentity::placeholder(" 99 ");
        assert_eq!(identity.id, "99");
        assert_eq!(identity.display_name, "Supplier 99");
        assert_eq!(identity.category, ProductCategory::Electronics);
        assert_eq!(identity.rating, 0.0);

        let blank = SupplierIdentity::placeholder("  ");
        assert_eq!(blank.display_name, UNKNOWN_SUPPLIER_NAME);
    }

    #[test]
    fn test_registry_row_mapping() {
        let row = RawRecord::from_value(json!({
            "id": 5,
            "name": "MetalWorks Inc",
            "category": "metal",
            "rating": 4.9,
            "responseTime": "1h",
            "price_range": "$$$",
            "location": "Pennsylvania, USA",
        }))
        .unwrap();

        let identity = SupplierIdentity::from_registry_row(&row).unwrap();
        assert_eq!(identity.id, "5");
        assert_eq!(identity.display_name, "MetalWorks Inc");
        assert_eq!(identity.category, ProductCategory::Metal);
        assert_eq!(identity.response_time, "1h");
        assert_eq!(identity.price_range, "$$$");
    }

    fn supplier(id: &str, category: ProductCategory) -> SupplierIdentity {
        SupplierIdentity {
            category,
            ..SupplierIdentity::placeholder(id)
        }
    }

    #[test]
    fn test_group_by_category() {
        let suppliers = vec![
            supplier("1", ProductCategory::Metal),
            supplier("2", ProductCategory::Computers),
            supplier("3", ProductCategory::Metal),
        ];

        let groups = group_by_category(&suppliers);
        let categories: Vec<_> = groups.keys().copied().collect();
        assert_eq!(categories, vec![ProductCategory::Computers, ProductCategory::Metal]);

        let metal: Vec<_> = groups[&ProductCategory::Metal].iter().map(|s| s.id.as_str()).collect();
        assert_eq!(metal, vec!["1", "3"]);
        assert!(group_by_category(&[]).is_empty());
    }

    #[test]
    fn test_dominant_category() {
        assert_eq!(dominant_category(&[]), ProductCategory::Computers);

        let suppliers = vec![
            supplier("1", ProductCategory::Hoodies),
            supplier("2", ProductCategory::Metal),
            supplier("3", ProductCategory::Metal),
        ];
        assert_eq!(dominant_category(&suppliers), ProductCategory::Metal);

        // Tie: first seen wins.
        let tied = vec![
            supplier("1", ProductCategory::OfficeSupplies),
            supplier("2", ProductCategory::Computers),
        ];
        assert_eq!(dominant_category(&tied), ProductCategory::OfficeSupplies);
    }

    #[test]
    fn test_product_decoding_is_lenient() {
        let product: Product = serde_json::from_value(json!({
            "product_id": 12,
            "product_name": "Steel rod",
            "supplier_id": 3,
            "similarity_score": 0.82,
        }))
        .unwrap();

        assert_eq!(product.product_id, "12");
        assert_eq!(product.supplier_id, "3");
        assert_eq!(product.supplier_name, None);
        assert_eq!(product.supplier_display_name(), "Supplier 3");
    }
}
