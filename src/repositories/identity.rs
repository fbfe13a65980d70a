use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    db_persistence::DbError,
    models::identity::{AccountId, Identity, LinkCode, MergePlan, WalletAddress},
    repositories::DbResult,
};

#[derive(Clone, Debug)]
pub struct IdentityRepository {
    pool: PgPool,
}

impl IdentityRepository {
    pub fn new(pool: &PgPool) -> Self {
        Self { pool: pool.clone() }
    }

    pub async fn find_by_account(&self, account_id: AccountId) -> DbResult<Option<Identity>> {
        let identity = sqlx::query_as::<_, Identity>("SELECT * FROM identities WHERE account_id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(identity)
    }

    pub async fn find_by_wallet(&self, wallet: &WalletAddress) -> DbResult<Option<Identity>> {
        let identity = sqlx::query_as::<_, Identity>("SELECT * FROM identities WHERE wallet = $1")
            .bind(wallet)
            .fetch_optional(&self.pool)
            .await?;

        Ok(identity)
    }

    /// Create-if-absent. Returns the stored identity either way.
    pub async fn ensure(&self, account_id: AccountId) -> DbResult<Identity> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            INSERT INTO identities (account_id)
            VALUES ($1)
            ON CONFLICT (account_id)
            DO UPDATE SET account_id = EXCLUDED.account_id
            RETURNING *
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(identity)
    }

    /// Clears the wallet of an existing identity, reporting whether anything was attached.
    pub async fn clear_wallet(&self, account_id: AccountId) -> DbResult<(LinkCode, Identity)> {
        let mut tx = self.pool.begin().await?;

        let identity = sqlx::query_as::<_, Identity>("SELECT * FROM identities WHERE account_id = $1 FOR UPDATE")
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::IdentityNotFound(account_id))?;

        if identity.wallet.is_none() {
            tx.commit().await?;
            return Ok((LinkCode::AlreadyDisconnected, identity));
        }

        let updated = sqlx::query_as::<_, Identity>(
            r#"
            UPDATE identities
            SET wallet = NULL, updated_at = NOW()
            WHERE account_id = $1
            RETURNING *
            "#,
        )
        .bind(account_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((LinkCode::Disconnected, updated))
    }

    /// Binds `wallet` to `account_id` in one transaction. Both lookups lock their rows; a
    /// concurrent writer that slips in between surfaces as `DbError::Conflict`.
    pub async fn link_wallet(&self, account_id: AccountId, wallet: &WalletAddress) -> DbResult<(LinkCode, Identity)> {
        let mut tx = self.pool.begin().await?;

        let result = Self::apply_link(&mut tx, account_id, wallet).await?;
        tx.commit().await.map_err(conflict_or_database)?;

        Ok(result)
    }

    async fn apply_link(
        tx: &mut Transaction<'_, Postgres>,
        account_id: AccountId,
        wallet: &WalletAddress,
    ) -> DbResult<(LinkCode, Identity)> {
        let by_wallet = sqlx::query_as::<_, Identity>("SELECT * FROM identities WHERE wallet = $1 FOR UPDATE")
            .bind(wallet)
            .fetch_optional(&mut **tx)
            .await
            .map_err(conflict_or_database)?;

        let by_account = sqlx::query_as::<_, Identity>("SELECT * FROM identities WHERE account_id = $1 FOR UPDATE")
            .bind(account_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(conflict_or_database)?;

        let plan = MergePlan::plan(by_wallet.as_ref(), by_account.as_ref());
        tracing::debug!(account_id = %account_id, wallet = %wallet, plan = ?plan, "Linking wallet");

        let identity = match &plan {
            MergePlan::Create => sqlx::query_as::<_, Identity>(
                r#"
                INSERT INTO identities (account_id, wallet)
                VALUES ($1, $2)
                RETURNING *
                "#,
            )
            .bind(account_id)
            .bind(wallet)
            .fetch_one(&mut **tx)
            .await
            .map_err(conflict_or_database)?,
            MergePlan::Repoint { from } => sqlx::query_as::<_, Identity>(
                r#"
                UPDATE identities
                SET account_id = $1, updated_at = NOW()
                WHERE account_id = $2
                RETURNING *
                "#,
            )
            .bind(account_id)
            .bind(from)
            .fetch_one(&mut **tx)
            .await
            .map_err(conflict_or_database)?,
            MergePlan::Attach { .. } => Self::attach(tx, account_id, wallet).await?,
            MergePlan::Move { from, .. } => {
                sqlx::query("UPDATE identities SET wallet = NULL, updated_at = NOW() WHERE account_id = $1")
                    .bind(from)
                    .execute(&mut **tx)
                    .await
                    .map_err(conflict_or_database)?;

                Self::attach(tx, account_id, wallet).await?
            }
            MergePlan::Unchanged => by_account.ok_or(DbError::IdentityNotFound(account_id))?,
        };

        Ok((plan.code(), identity))
    }

    async fn attach(
        tx: &mut Transaction<'_, Postgres>,
        account_id: AccountId,
        wallet: &WalletAddress,
    ) -> DbResult<Identity> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            UPDATE identities
            SET wallet = $2, updated_at = NOW()
            WHERE account_id = $1
            RETURNING *
            "#,
        )
        .bind(account_id)
        .bind(wallet)
        .fetch_one(&mut **tx)
        .await
        .map_err(conflict_or_database)?;

        Ok(identity)
    }
}

fn conflict_or_database(err: sqlx::Error) -> DbError {
    let is_conflict = match &err {
        sqlx::Error::Database(db_err) => {
            // unique violation, serialization failure, deadlock
            db_err.is_unique_violation() || matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => false,
    };

    if is_conflict {
        DbError::Conflict(err.to_string())
    } else {
        DbError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db_persistence::DbPersistence;

    async fn setup_test_repository() -> IdentityRepository {
        let config = Config::load_test_env().expect("Failed to load configuration for tests");
        let db = DbPersistence::new(config.get_database_url(), config.data.max_connections)
            .await
            .expect("Failed to create pool.");

        db.identities
    }

    fn unique_account() -> AccountId {
        AccountId(rand::random::<u32>() as i64 + 1_000_000)
    }

    fn unique_wallet() -> WalletAddress {
        WalletAddress(format!("0:{}", hex::encode(rand::random::<[u8; 32]>())))
    }

    #[tokio::test]
    async fn test_ensure_is_create_if_absent() {
        let repo = setup_test_repository().await;
        let account = unique_account();

        let first = repo.ensure(account).await.unwrap();
        let second = repo.ensure(account).await.unwrap();

        assert_eq!(first.account_id, account);
        assert_eq!(first.wallet, None);
        assert_eq!(first.created_at, second.created_at);
    }

    #[tokio::test]
    async fn test_link_twice_reports_already_connected() {
        let repo = setup_test_repository().await;
        let account = unique_account();
        let wallet = unique_wallet();

        let (code, identity) = repo.link_wallet(account, &wallet).await.unwrap();
        assert_eq!(code, LinkCode::Connected);
        assert_eq!(identity.wallet, Some(wallet.clone()));

        let (code, _) = repo.link_wallet(account, &wallet).await.unwrap();
        assert_eq!(code, LinkCode::AlreadyConnected);
    }

    #[tokio::test]
    async fn test_linking_another_wallet_updates() {
        let repo = setup_test_repository().await;
        let account = unique_account();

        repo.link_wallet(account, &unique_wallet()).await.unwrap();
        let second = unique_wallet();
        let (code, identity) = repo.link_wallet(account, &second).await.unwrap();

        assert_eq!(code, LinkCode::WalletUpdated);
        assert_eq!(identity.wallet, Some(second));
    }

    #[tokio::test]
    async fn test_wallet_moves_to_new_account_and_old_disconnect_is_noop() {
        let repo = setup_test_repository().await;
        let (a, b) = (unique_account(), unique_account());
        let wallet = unique_wallet();

        repo.link_wallet(a, &wallet).await.unwrap();
        repo.ensure(b).await.unwrap();

        let (code, identity) = repo.link_wallet(b, &wallet).await.unwrap();
        assert_eq!(code, LinkCode::Connected);
        assert_eq!(identity.account_id, b);

        let (code, _) = repo.clear_wallet(a).await.unwrap();
        assert_eq!(code, LinkCode::AlreadyDisconnected);

        let holder = repo.find_by_wallet(&wallet).await.unwrap().unwrap();
        assert_eq!(holder.account_id, b);
    }

    #[tokio::test]
    async fn test_wallet_repoints_when_new_account_has_no_identity() {
        let repo = setup_test_repository().await;
        let (a, b) = (unique_account(), unique_account());
        let wallet = unique_wallet();

        repo.link_wallet(a, &wallet).await.unwrap();
        let (code, identity) = repo.link_wallet(b, &wallet).await.unwrap();

        assert_eq!(code, LinkCode::Connected);
        assert_eq!(identity.account_id, b);
        assert!(repo.find_by_account(a).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_wallet_semantics() {
        let repo = setup_test_repository().await;
        let account = unique_account();

        let err = repo.clear_wallet(account).await.unwrap_err();
        assert!(matches!(err, DbError::IdentityNotFound(id) if id == account));

        repo.ensure(account).await.unwrap();
        let (code, _) = repo.clear_wallet(account).await.unwrap();
        assert_eq!(code, LinkCode::AlreadyDisconnected);

        repo.link_wallet(account, &unique_wallet()).await.unwrap();
        let (code, identity) = repo.clear_wallet(account).await.unwrap();
        assert_eq!(code, LinkCode::Disconnected);
        assert_eq!(identity.wallet, None);
    }
}
