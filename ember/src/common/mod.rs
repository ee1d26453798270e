mod constants;
mod database_state;
mod row;
mod sort_order;
mod value;

pub use constants::*;
pub use database_state::*;
pub use row::*;
pub use sort_order::*;
pub use value::*;
