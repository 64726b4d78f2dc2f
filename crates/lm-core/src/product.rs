//! Product identifiers and the tracked-product set.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::ValidationError;

/// Products tracked when no explicit list is configured.
pub const DEFAULT_PRODUCTS: [&str; 6] = [
    "MATLAB",
    "SIMULINK",
    "Image_Toolbox",
    "Optimization_Toolbox",
    "Signal_Toolbox",
    "Statistics_Toolbox",
];

/// A validated license feature name, as printed by the license manager.
///
/// Names are compared exactly; the report grammar is case-insensitive only in
/// its keywords, never in the product name itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductName(String);

impl ProductName {
    /// Creates a new product name after validation.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "product name",
            });
        }
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProductName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProductName> for String {
    fn from(name: ProductName) -> Self {
        name.0
    }
}

impl fmt::Display for ProductName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ProductName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The closed set of products whose records are kept.
///
/// Order is preserved so that reports and exports list products the way they
/// were configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedProducts {
    products: Vec<ProductName>,
}

impl TrackedProducts {
    /// Builds a tracked set from raw names, dropping duplicates.
    pub fn from_names<I, S>(names: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut products: Vec<ProductName> = Vec::new();
        for name in names {
            let product = ProductName::new(name)?;
            if !products.contains(&product) {
                products.push(product);
            }
        }
        Ok(Self { products })
    }

    pub fn contains(&self, product: &ProductName) -> bool {
        self.products.contains(product)
    }

    /// Looks up a tracked product by name.
    pub fn get(&self, name: &str) -> Option<&ProductName> {
        self.products.iter().find(|p| p.as_str() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductName> {
        self.products.iter()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Default for TrackedProducts {
    fn default() -> Self {
        Self {
            products: DEFAULT_PRODUCTS
                .iter()
                .map(|name| ProductName((*name).to_string()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_name_rejects_blank() {
        assert_eq!(
            ProductName::new("  "),
            Err(ValidationError::Empty {
                field: "product name"
            })
        );
    }

    #[test]
    fn tracked_products_default_order() {
        let tracked = TrackedProducts::default();
        let names: Vec<&str> = tracked.iter().map(ProductName::as_str).collect();
        assert_eq!(names, DEFAULT_PRODUCTS);
    }

    #[test]
    fn tracked_products_dedupes_and_preserves_order() {
        let tracked = TrackedProducts::from_names(["SIMULINK", "MATLAB", "SIMULINK"]).unwrap();
        let names: Vec<&str> = tracked.iter().map(ProductName::as_str).collect();
        assert_eq!(names, vec!["SIMULINK", "MATLAB"]);
        assert!(tracked.contains(&ProductName::new("MATLAB").unwrap()));
        assert!(!tracked.contains(&ProductName::new("matlab").unwrap()));
    }

    #[test]
    fn tracked_products_lookup_by_name() {
        let tracked = TrackedProducts::default();
        assert!(tracked.get("Signal_Toolbox").is_some());
        assert!(tracked.get("Curve_Fitting_Toolbox").is_none());
    }
}
