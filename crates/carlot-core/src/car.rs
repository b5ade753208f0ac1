//! The normalized car record served by the storefront.
//!
//! Cars are read-only projections of Shopify products. The only field the
//! storefront may change locally is [`Car::status`], through the status
//! override store.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price as delivered by the Storefront API (`MoneyV2`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarImage {
    pub url: String,
    pub alt_text: Option<String>,
}

/// Canonical spec fields extracted from vendor metafields. Every field is
/// optional; absent metafields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarSpecs {
    pub year: Option<String>,
    pub mileage: Option<String>,
    pub transmission: Option<String>,
    pub drivetrain: Option<String>,
    pub fuel_type: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub installment: Option<String>,
    pub category: Option<String>,
    pub body_type: Option<String>,
}

impl CarSpecs {
    /// Returns `true` when no spec field is populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarStatus {
    #[default]
    Available,
    Reserved,
    Sold,
}

impl CarStatus {
    /// Derives the status a product carries before any override is applied.
    ///
    /// Products Shopify reports as unavailable are sold. Tags mark cars that
    /// are still listed but held (`reserved` / `จองแล้ว`) or already sold
    /// (`sold` / `ขายแล้ว`).
    #[must_use]
    pub fn from_listing(available_for_sale: bool, tags: &[String]) -> Self {
        let has_tag = |needles: &[&str]| {
            tags.iter()
                .any(|t| needles.iter().any(|n| t.trim().eq_ignore_ascii_case(n)))
        };

        if !available_for_sale || has_tag(&["sold", "ขายแล้ว"]) {
            CarStatus::Sold
        } else if has_tag(&["reserved", "จองแล้ว"]) {
            CarStatus::Reserved
        } else {
            CarStatus::Available
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CarStatus::Available => "available",
            CarStatus::Reserved => "reserved",
            CarStatus::Sold => "sold",
        }
    }
}

impl std::fmt::Display for CarStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CarStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(CarStatus::Available),
            "reserved" => Ok(CarStatus::Reserved),
            "sold" => Ok(CarStatus::Sold),
            other => Err(format!(
                "invalid car status \"{other}\": expected available, reserved, or sold"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    /// Shopify global ID, e.g. `gid://shopify/Product/123`.
    pub id: String,
    pub handle: String,
    pub title: String,
    pub description: String,
    pub vendor: Option<String>,
    pub tags: Vec<String>,
    pub price: Option<Money>,
    pub images: Vec<CarImage>,
    pub specs: CarSpecs,
    pub status: CarStatus,
}
