use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, DatabaseConnection, EntityTrait, QueryOrder, TransactionTrait};

use crate::checksum::HashToken;
use crate::entity::feature_release::{self, Entity as FeatureReleaseRow};
use crate::entity::snapshot_state::{self, Entity as SnapshotState, SINGLETON_ID};
use crate::model::{FeatureRelease, Snapshot};

use super::{DataStore, Result, StoreError, StoredChecksum};

/// Store backed by a SeaORM connection.
///
/// Each feature release is one JSON row in `feature_releases`; the token of
/// the committed snapshot is the single row of `snapshot_state`.
#[derive(Debug)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn to_row(feature: &FeatureRelease) -> Result<feature_release::ActiveModel> {
    Ok(feature_release::ActiveModel {
        version: Set(i64::from(feature.version)),
        payload: Set(serde_json::to_string(feature)?),
    })
}

fn from_row(row: feature_release::Model) -> Result<FeatureRelease> {
    let feature: FeatureRelease = serde_json::from_str(&row.payload)?;
    if i64::from(feature.version) != row.version {
        return Err(StoreError::Corrupt(format!(
            "row {} holds feature release {}",
            row.version, feature.version
        )));
    }
    Ok(feature)
}

#[async_trait]
impl DataStore for SeaOrmStore {
    #[tracing::instrument(skip_all)]
    async fn load_snapshot(&self) -> Result<Option<Snapshot>> {
        if SnapshotState::find_by_id(SINGLETON_ID)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Ok(None);
        }

        let rows = FeatureReleaseRow::find()
            .order_by_asc(feature_release::Column::Version)
            .all(&self.db)
            .await?;
        let features = rows.into_iter().map(from_row).collect::<Result<Vec<_>>>()?;
        tracing::debug!(versions = features.len(), "Loaded snapshot");

        Ok(Some(Snapshot::from_feature_releases(features)))
    }

    #[tracing::instrument(skip_all, fields(checksum = %token.checksum))]
    async fn commit(&self, snapshot: &Snapshot, token: &HashToken) -> Result<()> {
        let rows = snapshot
            .feature_releases
            .values()
            .map(to_row)
            .collect::<Result<Vec<_>>>()?;

        let state = snapshot_state::ActiveModel {
            id: Set(SINGLETON_ID),
            checksum: Set(token.checksum.clone()),
            structural_hash: Set(token.structural_hash),
            updated_at: Set(Utc::now().fixed_offset()),
        };

        let txn = self.db.begin().await?;
        FeatureReleaseRow::delete_many().exec(&txn).await?;
        if !rows.is_empty() {
            FeatureReleaseRow::insert_many(rows).exec(&txn).await?;
        }
        SnapshotState::insert(state)
            .on_conflict(
                OnConflict::column(snapshot_state::Column::Id)
                    .update_columns([
                        snapshot_state::Column::Checksum,
                        snapshot_state::Column::StructuralHash,
                        snapshot_state::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&txn)
            .await?;
        txn.commit().await?;

        Ok(())
    }

    async fn current_checksum(&self) -> Result<Option<StoredChecksum>> {
        let state = SnapshotState::find_by_id(SINGLETON_ID).one(&self.db).await?;
        Ok(state.map(|row| StoredChecksum {
            token: HashToken {
                checksum: row.checksum,
                structural_hash: row.structural_hash,
            },
            updated_at: row.updated_at.with_timezone(&Utc),
        }))
    }
}
