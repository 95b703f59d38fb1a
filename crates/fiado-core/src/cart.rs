//! # Cart Module
//!
//! The point-of-sale cart with per-item discounting.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                       │
//! │                                                                         │
//! │  Operator Action           Cart Change                                  │
//! │  ───────────────           ───────────                                  │
//! │  Scan product ───────────► items.push(item) (or merge quantity)        │
//! │  Change quantity ────────► items[i].quantity = n                       │
//! │  Apply line discount ────► items[i].discount_cents = d                 │
//! │  Remove line ────────────► items.remove(i)                             │
//! │  Clear ──────────────────► items.clear()                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Price Freezing
//! Product data (sku, name, price) is snapshotted into the cart line when
//! added. If the product is edited afterwards, the cart keeps the price the
//! customer was shown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::Product;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// An item in the point-of-sale cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Product ID (UUID)
    pub product_id: String,

    /// SKU at time of adding (frozen)
    pub sku: String,

    /// Product name at time of adding (frozen)
    pub name: String,

    /// Price in centavos at time of adding (frozen)
    pub unit_price_cents: i64,

    /// Quantity in cart
    pub quantity: i64,

    /// Discount applied to this line, in centavos.
    /// Bounded by the gross line total.
    pub discount_cents: i64,

    /// When this item was added to cart
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Creates a new cart item from a product and quantity.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartItem {
            product_id: product.id.clone(),
            sku: product.sku.clone(),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            discount_cents: 0,
            added_at: Utc::now(),
        }
    }

    /// Gross line total before discount (unit price × quantity).
    pub fn gross_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }

    /// Line total after discount.
    pub fn line_total_cents(&self) -> i64 {
        self.gross_cents() - self.discount_cents
    }
}

/// The point-of-sale cart.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding same product merges quantity)
/// - Quantity must be > 0 (setting quantity to 0 removes the item)
/// - Per-line discount never exceeds the gross line total
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Items in the cart
    pub items: Vec<CartItem>,

    /// When the cart was created/last cleared
    pub created_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds a product to the cart or increases quantity if already present.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let new_qty = item.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            item.quantity = new_qty;
            return Ok(());
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }
        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        self.items.push(CartItem::from_product(product, quantity));
        Ok(())
    }

    /// Updates the quantity of an item in the cart.
    ///
    /// Setting quantity to 0 removes the item. If the line carried a
    /// discount larger than the new gross total, the discount is clamped.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(product_id);
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        item.quantity = quantity;
        item.discount_cents = item.discount_cents.min(item.gross_cents());
        Ok(())
    }

    /// Applies a fixed discount (in centavos) to one line.
    pub fn apply_line_discount(&mut self, product_id: &str, discount_cents: i64) -> CoreResult<()> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        if discount_cents < 0 || discount_cents > item.gross_cents() {
            return Err(CoreError::DiscountExceedsLineTotal {
                discount_cents,
                line_total_cents: item.gross_cents(),
            });
        }

        item.discount_cents = discount_cents;
        Ok(())
    }

    /// Removes an item from the cart by product ID.
    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let initial_len = self.items.len();
        self.items.retain(|i| i.product_id != product_id);

        if self.items.len() == initial_len {
            Err(CoreError::ProductNotFound(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Clears all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
        self.created_at = Utc::now();
    }

    /// Returns the number of unique items in the cart.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the total quantity of all items.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Calculates the subtotal (before discounts).
    pub fn subtotal_cents(&self) -> i64 {
        self.items.iter().map(|i| i.gross_cents()).sum()
    }

    /// Sum of all per-line discounts.
    pub fn discount_cents(&self) -> i64 {
        self.items.iter().map(|i| i.discount_cents).sum()
    }

    /// Calculates the grand total (subtotal − discounts).
    pub fn total_cents(&self) -> i64 {
        self.subtotal_cents() - self.discount_cents()
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Cart totals summary for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            subtotal_cents: cart.subtotal_cents(),
            discount_cents: cart.discount_cents(),
            total_cents: cart.total_cents(),
        }
    }
}
