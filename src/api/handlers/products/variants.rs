//! Conversion between the edit form's size variants and stored price lists.

use super::types::{PriceItem, Variant};

/// Split form variants into `(farmer_price, agrovet_price)`.
pub(crate) fn split_variants(variants: &[Variant]) -> (Vec<PriceItem>, Vec<PriceItem>) {
    variants
        .iter()
        .map(|variant| {
            (
                PriceItem {
                    size: variant.size.clone(),
                    amount: variant.farmer,
                },
                PriceItem {
                    size: variant.size.clone(),
                    amount: variant.agrovet,
                },
            )
        })
        .unzip()
}

/// Merge stored price lists back into variants.
///
/// Sizes keep the order they were first seen in (farmer list first); a size
/// missing from one list gets amount 0 there.
pub(crate) fn merge_prices(farmer: &[PriceItem], agrovet: &[PriceItem]) -> Vec<Variant> {
    let mut variants: Vec<Variant> = Vec::new();

    for price in farmer {
        match variants.iter_mut().find(|variant| variant.size == price.size) {
            Some(variant) => {
                variant.farmer = price.amount;
                variant.agrovet = 0;
            }
            None => variants.push(Variant {
                size: price.size.clone(),
                farmer: price.amount,
                agrovet: 0,
            }),
        }
    }

    for price in agrovet {
        match variants.iter_mut().find(|variant| variant.size == price.size) {
            Some(variant) => variant.agrovet = price.amount,
            None => variants.push(Variant {
                size: price.size.clone(),
                farmer: 0,
                agrovet: price.amount,
            }),
        }
    }

    variants
}
