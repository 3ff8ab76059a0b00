use rust_decimal::prelude::*;

/// Safely convert SOL (f64) to Lamports (u64) using Decimal to avoid precision loss
pub fn sol_to_lamports(sol: f64) -> u64 {
    // 1 SOL = 1,000,000,000 Lamports
    let sol_decimal = Decimal::from_f64_retain(sol).unwrap_or(Decimal::ZERO);
    let multiplier = Decimal::new(1_000_000_000, 0);

    (sol_decimal * multiplier).round().to_u64().unwrap_or(0)
}
