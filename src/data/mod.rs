pub mod historical;

pub use historical::load_prices;
