/// Solana token mint addresses
pub mod mints {
    /// Wrapped SOL (native SOL wrapped as SPL token), the quote side of new pools
    pub const SOL: &str = "So11111111111111111111111111111111111111112";
}

/// Program IDs
pub mod programs {
    /// Raydium Liquidity Pool V4 (AMM)
    pub const RAYDIUM_AMM_V4: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
}

/// Log markers emitted by pool-creation instructions
pub mod markers {
    /// Raydium AMM v4 pool initialization
    pub const RAYDIUM_INITIALIZE2: &str = "initialize2";
}

/// Base/quote asset new pools are paired against
pub const BASE_MINT: &str = mints::SOL;
