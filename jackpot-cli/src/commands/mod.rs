pub mod deposit;
pub mod round;
pub mod serve;

pub use deposit::record_deposit;
pub use round::{list_rounds, show_round, verify_round};
pub use serve::serve;
