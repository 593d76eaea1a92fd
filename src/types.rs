/// A list of prices, where the last index is the most recent
pub type Data = Vec<f64>;
