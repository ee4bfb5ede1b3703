pub mod balance;
pub mod health;
pub mod status;
pub mod withdrawals;

pub use balance::*;
pub use health::*;
pub use status::*;
pub use withdrawals::*;
