/// Round-lot size of the reference market.
pub const DEFAULT_LOT_SIZE: u64 = 100;

/// Floor a share count to a whole number of lots.
pub fn round_down_to_lot(shares: u64, lot_size: u64) -> u64 {
    if lot_size == 0 {
        return shares;
    }
    shares / lot_size * lot_size
}
