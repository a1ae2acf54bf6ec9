use rust_decimal::Decimal;

/// Largest quantity accepted on one cart line.
pub const MAX_LINE_QUANTITY: i32 = 10_000;

/// Largest amount the `NUMERIC(10,2)` money columns can hold.
#[must_use]
pub fn max_amount() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

/// Reject an amount that would overflow a stored money column.
///
/// # Errors
///
/// Returns a user-facing message naming `what` when `amount` is too large.
pub fn check_amount(what: &str, amount: Decimal) -> Result<(), String> {
    if amount > max_amount() {
        return Err(format!("{what} exceeds the maximum of {}", max_amount()));
    }
    Ok(())
}

/// Price and quantity of one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl CartLine {
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub total: Decimal,
    pub item_count: i64,
}

/// Recompute cart totals from its lines.
///
/// There is no shipping or tax model, so `total == subtotal`.
#[must_use]
pub fn compute_totals(lines: &[CartLine]) -> CartTotals {
    let subtotal: Decimal = lines.iter().map(CartLine::subtotal).sum();
    let item_count = lines.iter().map(|l| i64::from(l.quantity)).sum();
    CartTotals {
        subtotal,
        total: subtotal,
        item_count,
    }
}
