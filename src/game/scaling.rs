//! Level scaling for unit stats and upgrade costs

/// Growth per level
const GROWTH: f64 = 1.1;

/// Stat value at `level`: ten percent compound growth, rounded up
pub fn scale(base: i32, level: i32) -> i32 {
    (f64::from(base) * GROWTH.powi(level)).ceil() as i32
}

/// Experience needed to raise a unit from `current_level`, rounded down
pub fn upgrade_cost(base_exp: i32, current_level: i32) -> i32 {
    (f64::from(base_exp) * GROWTH.powi(current_level)).floor() as i32
}
