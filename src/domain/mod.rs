pub mod balance;
pub mod contribution;
pub mod money;
pub mod pension_plan;
pub mod taxation;
pub mod user;
pub mod withdrawal;
pub mod withdrawal_service;

pub use balance::*;
pub use contribution::*;
pub use money::*;
pub use pension_plan::*;
pub use taxation::*;
pub use user::*;
pub use withdrawal::*;
pub use withdrawal_service::*;
