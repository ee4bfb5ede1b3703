//! Constructor wiring of repositories, cache, broker, use cases and consumers

use axum::Router;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::adapters::{
    BalanceCache, EventPublisher, InProcessBroker, MemoryBalanceCache, MemoryStore,
    PensionPlanRepository, UserRepository, WithdrawalRepository,
};
use crate::api::{create_router, AppState};
use crate::config::AppConfig;
use crate::error::Result;
use crate::messaging::{
    ConfirmedWithdrawalConsumer, RejectedWithdrawalConsumer, RequestedWithdrawalConsumer, Topic,
};
use crate::services::{
    BalanceQuery, CheckStatusUseCase, Metrics, WithdrawalConfirmation, WithdrawalRequestUseCase,
};

/// Storage and cache backends the application runs on
#[derive(Clone)]
pub struct Ports {
    pub users: Arc<dyn UserRepository>,
    pub plans: Arc<dyn PensionPlanRepository>,
    pub withdrawals: Arc<dyn WithdrawalRepository>,
    pub cache: Arc<dyn BalanceCache>,
}

impl Ports {
    /// One store serving all three repositories
    pub fn from_store<S>(store: Arc<S>, cache: Arc<dyn BalanceCache>) -> Self
    where
        S: UserRepository + PensionPlanRepository + WithdrawalRepository + 'static,
    {
        Self {
            users: store.clone(),
            plans: store.clone(),
            withdrawals: store,
            cache,
        }
    }

    /// In-process backends; plans are loaded with the configured yield rate
    pub fn memory(store: MemoryStore, cache: MemoryBalanceCache, config: &AppConfig) -> Self {
        Self::from_store(
            Arc::new(store.with_yield_rate(config.plan.yield_rate)),
            Arc::new(cache),
        )
    }
}

pub struct Application {
    pub state: AppState,
    pub broker: InProcessBroker,
    confirmation: Arc<WithdrawalConfirmation>,
}

impl Application {
    pub fn new(ports: Ports, config: &AppConfig) -> Self {
        let broker = InProcessBroker::new(config.broker.clone());
        let publisher: Arc<dyn EventPublisher> = Arc::new(broker.clone());
        let metrics = Arc::new(Metrics::new());

        let balances = Arc::new(BalanceQuery::new(
            ports.users.clone(),
            ports.plans.clone(),
            ports.cache.clone(),
            config.cache.balance_ttl(),
        ));
        let requests = Arc::new(
            WithdrawalRequestUseCase::new(
                ports.users.clone(),
                ports.plans.clone(),
                ports.withdrawals.clone(),
                publisher.clone(),
            )
            .with_metrics(metrics.clone()),
        );
        let status = Arc::new(CheckStatusUseCase::new(ports.withdrawals.clone()));
        let confirmation = Arc::new(
            WithdrawalConfirmation::new(ports.users, ports.plans, ports.withdrawals, publisher)
                .with_metrics(metrics.clone()),
        );

        Self {
            state: AppState::new(balances, requests, status, metrics),
            broker,
            confirmation,
        }
    }

    /// Subscribe one consumer per topic
    pub async fn start_consumers(&self) -> Result<Vec<JoinHandle<()>>> {
        let publisher: Arc<dyn EventPublisher> = Arc::new(self.broker.clone());
        let handles = vec![
            self.broker
                .subscribe(
                    Topic::RequestedWithdrawal,
                    Arc::new(RequestedWithdrawalConsumer::new(
                        self.confirmation.clone(),
                        publisher,
                    )),
                )
                .await?,
            self.broker
                .subscribe(
                    Topic::ConfirmedWithdrawal,
                    Arc::new(ConfirmedWithdrawalConsumer::new(self.state.balances.clone())),
                )
                .await?,
            self.broker
                .subscribe(
                    Topic::RejectedWithdrawal,
                    Arc::new(RejectedWithdrawalConsumer),
                )
                .await?,
        ];
        info!("Started {} withdrawal consumers", handles.len());
        Ok(handles)
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }
}
