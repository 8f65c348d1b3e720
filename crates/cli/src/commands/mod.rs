//! Command implementations.

mod info;
mod map;
mod simulate;
mod track;
mod validate;

pub use info::run_info;
pub use map::run_map;
pub use simulate::run_simulate;
pub use track::run_track;
pub use validate::run_validate;
