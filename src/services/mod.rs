//! Use cases wiring the domain to the storage, cache and broker ports

pub mod balance_query;
pub mod metrics;
mod plan_lookup;
pub mod status;
pub mod withdrawal_confirmation;
pub mod withdrawal_request;

pub use balance_query::{balance_cache_key, BalanceQuery};
pub use metrics::Metrics;
pub use status::{CheckStatusUseCase, StatusEntry};
pub use withdrawal_confirmation::WithdrawalConfirmation;
pub use withdrawal_request::{WithdrawalRequestUseCase, WithdrawalResponse};
