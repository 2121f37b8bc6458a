//! Plan period store - atomic replace-all of a plan's periods.
//!
//! A replace runs in one transaction: lock the plan, validate, resolve the
//! template references, swap the period set, read back the projection, commit.
//! Any failure before the commit drops the transaction, so the previous period
//! set stays visible untouched.

use crate::{
    core::{
        plan::{PlanSettings, PlanSettingsUpdate, delete_periods, lock_plan, update_settings},
        projection::{PlanProjection, load_plan_projection},
        resolver::{ReferenceSet, resolve_references},
        validator::{PeriodDescriptor, ValidatedPeriod, validate_batch},
    },
    entities::{PeriodTemplate, period, period_template},
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// Progress of one replace-all call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceStage {
    /// Checking months, ranges, duplicates and settings
    Validating,
    /// Confirming referenced templates exist
    Resolving,
    /// Swapping the period set
    Committing,
    /// Committed
    Done,
}

impl fmt::Display for ReplaceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::Resolving => "resolving",
            Self::Committing => "committing",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Replace-all request: the new periods plus optional settings changes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplacePeriodsRequest {
    /// Settings fields to overwrite; absent fields are kept
    #[serde(flatten)]
    pub settings: PlanSettingsUpdate,
    /// Full desired period set
    #[serde(default)]
    pub periods: Vec<PeriodDescriptor>,
}

impl From<Vec<PeriodDescriptor>> for ReplacePeriodsRequest {
    fn from(periods: Vec<PeriodDescriptor>) -> Self {
        Self {
            settings: PlanSettingsUpdate::default(),
            periods,
        }
    }
}

/// Replaces every period of a plan with `periods`.
pub async fn replace_periods(
    db: &DatabaseConnection,
    plan_id: i64,
    periods: &[PeriodDescriptor],
) -> Result<PlanProjection> {
    replace_plan_periods(db, plan_id, ReplacePeriodsRequest::from(periods.to_vec())).await
}

/// Replaces every period of a plan and applies the settings in `request`.
#[instrument(skip(db, request), fields(periods = request.periods.len()))]
pub async fn replace_plan_periods(
    db: &DatabaseConnection,
    plan_id: i64,
    request: ReplacePeriodsRequest,
) -> Result<PlanProjection> {
    let txn = db.begin().await?;

    // Serializes concurrent replaces of the same plan for the rest of the transaction.
    let plan = lock_plan(&txn, plan_id).await?;

    let mut stage = ReplaceStage::Validating;
    let validated = match validate_request(&plan, request) {
        Ok(validated) => validated,
        Err(e) => return Err(rejected(plan_id, stage, e)),
    };
    let (periods, settings) = validated;

    stage = ReplaceStage::Resolving;
    let references = ReferenceSet::collect(&periods);
    if let Err(e) = resolve_references(&txn, &references).await {
        return Err(rejected(plan_id, stage, e));
    }

    stage = ReplaceStage::Committing;
    debug!("Plan {} entering {} stage", plan_id, stage);
    let removed = delete_periods(&txn, plan_id).await?;
    let now = chrono::Utc::now();
    for validated in &periods {
        insert_period(&txn, plan_id, validated, now).await?;
    }
    if let Some(settings) = settings {
        update_settings(&txn, plan, &settings).await?;
    }

    let projection = load_plan_projection(&txn, plan_id).await?;
    txn.commit().await?;

    stage = ReplaceStage::Done;
    info!(
        "Replaced {} period(s) of plan {} with {} ({})",
        removed,
        plan_id,
        periods.len(),
        stage
    );
    Ok(projection)
}

type ValidatedRequest = (Vec<ValidatedPeriod>, Option<PlanSettings>);

fn validate_request(
    plan: &crate::entities::plan::Model,
    request: ReplacePeriodsRequest,
) -> Result<ValidatedRequest> {
    if request.periods.is_empty() {
        return Err(Error::EmptyBatch);
    }
    let periods = validate_batch(&request.periods)?;

    let settings = if request.settings.is_empty() {
        None
    } else {
        let merged = request.settings.merge_into(PlanSettings::from_model(plan));
        Some(merged.validated()?)
    };
    Ok((periods, settings))
}

fn rejected(plan_id: i64, stage: ReplaceStage, error: Error) -> Error {
    warn!(
        "Rejected period replace for plan {} while {}: {}",
        plan_id, stage, error
    );
    error
}

async fn insert_period<C>(
    txn: &C,
    plan_id: i64,
    validated: &ValidatedPeriod,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let period = period::ActiveModel {
        plan_id: Set(plan_id),
        start_month: Set(validated.start_month.first_day()),
        end_month: Set(validated.end_month.first_day()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    let links: Vec<period_template::ActiveModel> = validated
        .references
        .iter()
        .flat_map(|(category, ids)| {
            ids.iter().map(move |id| period_template::ActiveModel {
                period_id: Set(period.id),
                template_id: Set(*id),
                category: Set(category),
            })
        })
        .collect();
    if !links.is_empty() {
        PeriodTemplate::insert_many(links)
            .exec_without_returning(txn)
            .await?;
    }
    Ok(())
}
