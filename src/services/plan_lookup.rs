use tracing::debug;

use crate::adapters::{PensionPlanRepository, UserRepository};
use crate::domain::{PensionPlan, User};
use crate::error::{NotFound, Result};

/// Resolve a user by key, then one of their plans by contract number
pub(crate) async fn resolve_plan(
    users: &dyn UserRepository,
    plans: &dyn PensionPlanRepository,
    user_key: &str,
    contract_number: &str,
) -> Result<(User, PensionPlan)> {
    let user = users
        .find_by_key(user_key)
        .await?
        .ok_or(NotFound::User)?;

    let plan = plans
        .find_by_user_and_contract(user.id, contract_number)
        .await?
        .ok_or(NotFound::PensionPlan)?;

    debug!(user_id = %user.id, plan_id = %plan.id, "resolved pension plan");
    Ok((user, plan))
}
