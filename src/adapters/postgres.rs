use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::traits::{PensionPlanRepository, UserRepository, WithdrawalRepository};
use crate::domain::{Contribution, Money, PensionPlan, PlanType, User, Withdrawal, WithdrawalStatus};
use crate::error::{PensionError, Result};

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    yield_rate: Option<Decimal>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self::from_pool(pool))
    }

    /// Create a PostgreSQL store from an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            yield_rate: None,
        }
    }

    /// Yield rate stamped on every loaded plan
    pub fn with_yield_rate(mut self, yield_rate: Decimal) -> Self {
        self.yield_rate = Some(yield_rate);
        self
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    // ==================== Loading ====================

    async fn load_contributions(&self, plan_id: Uuid) -> Result<Vec<Contribution>> {
        let rows = sqlx::query(
            r#"
            SELECT id, value, start_date, availability_date
            FROM contributions
            WHERE pension_plan_id = $1
            ORDER BY start_date, id
            "#,
        )
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Contribution::new(
                    row.get("id"),
                    Money::from_minor_units(row.get("value"))?,
                    row.get("start_date"),
                    row.get("availability_date"),
                ))
            })
            .collect()
    }

    async fn load_withdrawals(&self, plan_id: Uuid) -> Result<Vec<Withdrawal>> {
        let rows = sqlx::query(
            r#"
            SELECT id, pension_plan_id, transaction_id, requested_value, redeemable_value,
                   request_date, confirmation_date, status, rejection_reason
            FROM withdrawals
            WHERE pension_plan_id = $1
            ORDER BY seq
            "#,
        )
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_withdrawal).collect()
    }

    // ==================== Seeding ====================

    /// Insert demo users, plans, contributions and withdrawals.
    ///
    /// Each table is only seeded while it is empty, so re-running is safe.
    #[instrument(skip(self))]
    pub async fn seed_demo_data(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if count(&mut tx, "users").await? == 0 {
            for (key, name, email) in SEED_USERS {
                sqlx::query("INSERT INTO users (id, user_key, name, email) VALUES ($1, $2, $3, $4)")
                    .bind(Uuid::new_v4())
                    .bind(key)
                    .bind(name)
                    .bind(email)
                    .execute(&mut *tx)
                    .await?;
            }
            info!("Seeded {} users", SEED_USERS.len());
        } else {
            info!("Users already exist, skipping");
        }

        if count(&mut tx, "pension_plans").await? == 0 {
            for (user_key, plan_type, contract_number, start_date) in SEED_PLANS {
                let user_id = user_id_by_key(&mut tx, user_key).await?;
                sqlx::query(
                    r#"
                    INSERT INTO pension_plans (id, user_id, type, contract_number, start_date)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(user_id)
                .bind(plan_type.as_str())
                .bind(contract_number)
                .bind(parse_date(start_date)?)
                .execute(&mut *tx)
                .await?;
            }
            info!("Seeded {} pension plans", SEED_PLANS.len());
        } else {
            info!("Pension plans already exist, skipping");
        }

        if count(&mut tx, "contributions").await? == 0 {
            for (contract_number, value, start_date, availability_date) in SEED_CONTRIBUTIONS {
                let plan_id = plan_id_by_contract(&mut tx, contract_number).await?;
                sqlx::query(
                    r#"
                    INSERT INTO contributions (id, pension_plan_id, value, start_date, availability_date)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(plan_id)
                .bind(value)
                .bind(parse_date(start_date)?)
                .bind(parse_date(availability_date)?)
                .execute(&mut *tx)
                .await?;
            }
            info!("Seeded {} contributions", SEED_CONTRIBUTIONS.len());
        } else {
            info!("Contributions already exist, skipping");
        }

        if count(&mut tx, "withdrawals").await? == 0 {
            for seed in SEED_WITHDRAWALS {
                let plan_id = plan_id_by_contract(&mut tx, seed.contract_number).await?;
                let (pending, terminal) = seed.transaction(plan_id)?;
                insert_withdrawal(&mut *tx, &pending).await?;
                insert_withdrawal(&mut *tx, &terminal).await?;
            }
            info!("Seeded {} withdrawal transactions", SEED_WITHDRAWALS.len());
        } else {
            info!("Withdrawals already exist, skipping");
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PostgresStore {
    #[instrument(skip(self))]
    async fn find_by_key(&self, key: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, user_key, name, email FROM users WHERE user_key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| User {
            id: r.get("id"),
            key: r.get("user_key"),
            name: r.get("name"),
            email: r.get("email"),
        }))
    }
}

#[async_trait]
impl PensionPlanRepository for PostgresStore {
    #[instrument(skip(self))]
    async fn find_by_user_and_contract(
        &self,
        user_id: Uuid,
        contract_number: &str,
    ) -> Result<Option<PensionPlan>> {
        let row = sqlx::query(
            r#"
            SELECT id, type, contract_number, start_date
            FROM pension_plans
            WHERE user_id = $1 AND contract_number = $2
            "#,
        )
        .bind(user_id)
        .bind(contract_number)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: Uuid = row.get("id");
        let plan_type: PlanType = row.get::<String, _>("type").parse()?;
        let contributions = self.load_contributions(id).await?;
        let withdrawals = self.load_withdrawals(id).await?;
        debug!(
            "Loaded plan {} with {} contributions and {} withdrawal records",
            id,
            contributions.len(),
            withdrawals.len()
        );

        let plan = PensionPlan::new(
            id,
            plan_type,
            row.get::<String, _>("contract_number"),
            row.get("start_date"),
            contributions,
            withdrawals,
        );
        Ok(Some(match self.yield_rate {
            Some(rate) => plan.with_yield_rate(rate),
            None => plan,
        }))
    }
}

#[async_trait]
impl WithdrawalRepository for PostgresStore {
    #[instrument(skip(self, withdrawal), fields(id = %withdrawal.id, status = %withdrawal.status))]
    async fn append(&self, withdrawal: &Withdrawal) -> Result<()> {
        insert_withdrawal(&self.pool, withdrawal).await
    }

    #[instrument(skip(self))]
    async fn find_by_transaction_id(&self, transaction_id: Uuid) -> Result<Vec<Withdrawal>> {
        let rows = sqlx::query(
            r#"
            SELECT id, pension_plan_id, transaction_id, requested_value, redeemable_value,
                   request_date, confirmation_date, status, rejection_reason
            FROM withdrawals
            WHERE transaction_id = $1
            ORDER BY seq
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_withdrawal).collect()
    }
}

async fn insert_withdrawal<'e, E>(executor: E, withdrawal: &Withdrawal) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO withdrawals (
            id, pension_plan_id, transaction_id, requested_value, redeemable_value,
            request_date, confirmation_date, status, rejection_reason
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(withdrawal.id)
    .bind(withdrawal.pension_plan_id)
    .bind(withdrawal.transaction_id)
    .bind(withdrawal.requested_value.amount())
    .bind(withdrawal.redeemable_value.amount())
    .bind(withdrawal.request_date)
    .bind(withdrawal.confirmation_date)
    .bind(withdrawal.status.as_str())
    .bind(&withdrawal.rejection_reason)
    .execute(executor)
    .await?;

    Ok(())
}

fn row_to_withdrawal(row: &PgRow) -> Result<Withdrawal> {
    Ok(Withdrawal {
        id: row.get("id"),
        transaction_id: row.get("transaction_id"),
        pension_plan_id: row.get("pension_plan_id"),
        requested_value: Money::from_minor_units(row.get("requested_value"))?,
        redeemable_value: Money::from_minor_units(row.get("redeemable_value"))?,
        request_date: row.get("request_date"),
        status: row.get::<String, _>("status").parse()?,
        rejection_reason: row.get("rejection_reason"),
        confirmation_date: row.get("confirmation_date"),
    })
}

async fn count(tx: &mut Transaction<'_, Postgres>, table: &str) -> Result<i64> {
    let row = sqlx::query(&format!("SELECT COUNT(*) AS count FROM {}", table))
        .fetch_one(&mut **tx)
        .await?;
    Ok(row.get("count"))
}

async fn user_id_by_key(tx: &mut Transaction<'_, Postgres>, key: &str) -> Result<Uuid> {
    let row = sqlx::query("SELECT id FROM users WHERE user_key = $1")
        .bind(key)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| PensionError::Internal(format!("seed user {} missing", key)))?;
    Ok(row.get("id"))
}

async fn plan_id_by_contract(
    tx: &mut Transaction<'_, Postgres>,
    contract_number: &str,
) -> Result<Uuid> {
    let row = sqlx::query("SELECT id FROM pension_plans WHERE contract_number = $1 LIMIT 1")
        .bind(contract_number)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| {
            PensionError::Internal(format!("seed plan {} missing", contract_number))
        })?;
    Ok(row.get("id"))
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| PensionError::Internal(format!("bad seed date {}: {}", raw, e)))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(parse_date(raw)?.and_time(chrono::NaiveTime::MIN).and_utc())
}

// ==================== Demo data ====================

const SEED_USERS: [(&str, &str, &str); 3] = [
    ("02070893103", "Lucas Costa", "lucas@teste.com"),
    ("73591246085", "Marina Silva", "marina@teste.com"),
    ("48971235019", "André Rocha", "andre@teste.com"),
];

const SEED_PLANS: [(&str, PlanType, &str, &str); 4] = [
    ("02070893103", PlanType::Pgbl, "12345", "2024-01-01"),
    ("02070893103", PlanType::Vgbl, "67890", "2023-06-01"),
    ("73591246085", PlanType::Pgbl, "55555", "2023-03-10"),
    ("48971235019", PlanType::Vgbl, "99999", "2022-09-15"),
];

/// (contract number, value in minor units, start date, availability date)
const SEED_CONTRIBUTIONS: [(&str, i64, &str, &str); 9] = [
    ("12345", 500000, "2024-01-10", "2024-03-10"),
    ("12345", 300000, "2024-06-05", "2025-01-01"),
    ("12345", 700000, "2025-01-20", "2025-09-01"),
    ("67890", 200000, "2023-07-01", "2023-08-01"),
    ("67890", 150000, "2023-09-10", "2024-01-10"),
    ("55555", 800000, "2023-03-15", "2024-03-15"),
    ("55555", 500000, "2024-05-01", "2025-05-01"),
    ("55555", 30000, "2024-05-01", "2025-12-01"),
    ("99999", 400000, "2022-09-20", "2022-11-20"),
];

struct SeedWithdrawal {
    contract_number: &'static str,
    requested: i64,
    redeemable: i64,
    request_date: &'static str,
    settled_date: &'static str,
    outcome: WithdrawalStatus,
    rejection_reason: Option<&'static str>,
}

impl SeedWithdrawal {
    /// PENDING record and its terminal version; only confirmations carry a date
    fn transaction(&self, plan_id: Uuid) -> Result<(Withdrawal, Withdrawal)> {
        let pending = Withdrawal::pending(
            plan_id,
            Money::from_minor_units(self.requested)?,
            Money::from_minor_units(self.redeemable)?,
            parse_timestamp(self.request_date)?,
        );
        let terminal = match self.outcome {
            WithdrawalStatus::Confirmed => pending.confirm(parse_timestamp(self.settled_date)?)?,
            _ => pending.compensating_rejection(self.rejection_reason.unwrap_or_default()),
        };
        Ok((pending, terminal))
    }
}

const SEED_WITHDRAWALS: [SeedWithdrawal; 4] = [
    SeedWithdrawal {
        contract_number: "12345",
        requested: 200000,
        redeemable: 180000,
        request_date: "2025-09-10",
        settled_date: "2025-09-15",
        outcome: WithdrawalStatus::Confirmed,
        rejection_reason: None,
    },
    SeedWithdrawal {
        contract_number: "12345",
        requested: 300000,
        redeemable: 270000,
        request_date: "2025-10-10",
        settled_date: "2025-10-12",
        outcome: WithdrawalStatus::Rejected,
        rejection_reason: Some("Value unavailable for withdrawal"),
    },
    SeedWithdrawal {
        contract_number: "55555",
        requested: 100000,
        redeemable: 95000,
        request_date: "2024-12-01",
        settled_date: "2024-12-05",
        outcome: WithdrawalStatus::Confirmed,
        rejection_reason: None,
    },
    SeedWithdrawal {
        contract_number: "99999",
        requested: 150000,
        redeemable: 150000,
        request_date: "2023-01-15",
        settled_date: "2023-01-20",
        outcome: WithdrawalStatus::Confirmed,
        rejection_reason: None,
    },
];
