pub mod fred;
pub mod yahoo;

pub use fred::FredSource;
pub use yahoo::YahooSource;
