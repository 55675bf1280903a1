use domain::{PresenceStatus, UserId};

use super::{present, ServiceDependencies};
use crate::{
    error::{ApplicationError, ApplicationResult},
    paths,
    records::{decode, encode},
    store::ChildQuery,
    subscription::Subscription,
};

/// 在线状态：每个用户一条记录，原地覆盖
pub struct PresenceService {
    deps: ServiceDependencies,
}

impl PresenceService {
    pub fn new(deps: ServiceDependencies) -> Self {
        Self { deps }
    }

    /// 只能更新自己的状态，`lastSeen` 取当前时间
    pub async fn update_user_status(&self, user_id: &UserId, is_online: bool) -> ApplicationResult<()> {
        let caller = self.deps.caller()?;
        if caller.id != *user_id {
            return Err(ApplicationError::Unauthorized);
        }
        user_id.check()?;
        let status = PresenceStatus::new(is_online, self.deps.clock.now());
        self.deps
            .store
            .set(&paths::status(user_id), encode(&status)?)
            .await?;
        tracing::debug!(user_id = %user_id, is_online, "更新在线状态");
        Ok(())
    }

    pub async fn get_user_status(&self, user_id: &UserId) -> ApplicationResult<Option<PresenceStatus>> {
        user_id.check()?;
        let path = paths::status(user_id);
        match present(self.deps.store.get(&path).await?) {
            Some(value) => decode(&path, value).map(Some),
            None => Ok(None),
        }
    }

    /// 原样转发每次状态推送，不做去重；记录不存在或无效时不回调
    pub async fn on_user_status<F>(&self, user_id: &UserId, callback: F) -> ApplicationResult<Subscription>
    where
        F: FnMut(PresenceStatus) + Send + 'static,
    {
        user_id.check()?;
        let path = paths::status(user_id);
        let stream = self.deps.store.subscribe(&path, ChildQuery::all()).await?;
        Ok(Subscription::spawn(
            "presence",
            path,
            stream,
            |snapshot| {
                let value = present(snapshot.value)?;
                match serde_json::from_value::<PresenceStatus>(value) {
                    Ok(status) => Some(status),
                    Err(err) => {
                        tracing::debug!(path = %snapshot.path, error = %err, "跳过无效的在线状态");
                        None
                    }
                }
            },
            callback,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::services::test_support::{deps, signed_in};
    use crate::store::MockRealtimeStore;
    use serde_json::json;

    #[tokio::test]
    async fn updating_another_users_status_is_unauthorized() {
        let service = PresenceService::new(deps(MockRealtimeStore::new(), signed_in("u1")));
        let result = service.update_user_status(&UserId::from("u2"), true).await;
        assert!(matches!(result, Err(ApplicationError::Unauthorized)));
    }

    #[tokio::test]
    async fn status_is_written_with_last_seen() {
        let mut store = MockRealtimeStore::new();
        store
            .expect_set()
            .withf(|path, value| {
                path.to_string() == "users/u1/status"
                    && value == &json!({ "isOnline": false, "lastSeen": 1_700_000_000_000_i64 })
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let service = PresenceService::new(deps(store, signed_in("u1")));
        service
            .update_user_status(&UserId::from("u1"), false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn blank_user_id_is_rejected_before_io() {
        let service = PresenceService::new(deps(MockRealtimeStore::new(), signed_in("u1")));
        let result = service.get_user_status(&UserId::from("")).await;
        assert!(matches!(result, Err(ApplicationError::Domain(_))));
    }

    #[tokio::test]
    async fn read_failure_is_a_network_failure() {
        let mut store = MockRealtimeStore::new();
        store.expect_get().returning(|_| Err(StoreError::Timeout));
        let service = PresenceService::new(deps(store, signed_in("u1")));
        let result = service.get_user_status(&UserId::from("u2")).await;
        assert!(matches!(result, Err(ApplicationError::NetworkFailure(_))));
    }
}
