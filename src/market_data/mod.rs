/// Market data primitives shared by every indicator engine
pub mod loader;
pub mod structs;

pub use loader::{load_bars_csv, normalize_bars, parse_bars_csv};
pub use structs::{bars_to_points, is_strictly_ascending, Bar, Point, PriceSource, TimestampSec};
