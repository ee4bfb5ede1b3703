pub mod consumers;
pub mod events;

pub use consumers::{
    ConfirmedWithdrawalConsumer, RejectedWithdrawalConsumer, RequestedWithdrawalConsumer,
};
pub use events::{Topic, WithdrawalEvent};
