//! 好友图谱
//!
//! 好友边成对存放在双方名下，接受请求时与请求状态在同一次批量写入中生效。
//! 请求去重是“先查后写”，两端同时发起时仍可能产生两条待处理请求。

use std::sync::Arc;

use domain::{
    sort_friends, DomainError, Friend, FriendRequest, FriendRequestStatus, ProfileCard, RequestId,
    User, UserId,
};
use serde_json::Value;

use super::{present, DirectoryService, ServiceDependencies};
use crate::{
    error::{ApplicationError, ApplicationResult},
    paths,
    records::{decode, decode_friend, encode},
    store::{ChildQuery, DataSnapshot},
    subscription::Subscription,
};

pub struct FriendService {
    deps: ServiceDependencies,
    directory: Arc<DirectoryService>,
    default_display_name: String,
}

impl FriendService {
    pub fn new(
        deps: ServiceDependencies,
        directory: Arc<DirectoryService>,
        default_display_name: impl Into<String>,
    ) -> Self {
        Self {
            deps,
            directory,
            default_display_name: default_display_name.into(),
        }
    }

    pub async fn search_users(&self, term: &str) -> ApplicationResult<Vec<User>> {
        self.directory.search_users(term).await
    }

    /// 发送好友请求，返回新请求的 ID
    pub async fn send_friend_request(&self, to_user_id: &UserId) -> ApplicationResult<RequestId> {
        let caller = self.deps.caller()?;
        to_user_id.check()?;
        if caller.id == *to_user_id {
            return Err(DomainError::SelfFriendship.into());
        }

        if self.check_if_friends(&caller.id, to_user_id).await?
            || self.check_if_friends(to_user_id, &caller.id).await?
        {
            return Err(ApplicationError::AlreadyFriends);
        }
        if self
            .find_pending_request(&caller.id, to_user_id)
            .await?
            .is_some()
        {
            return Err(ApplicationError::DuplicateRequest);
        }

        let now = self.deps.clock.now();
        let fallback = caller.card(&self.default_display_name);
        let sender = if caller
            .display_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
        {
            fallback
        } else {
            self.directory.profile_card(&caller.id, fallback).await?
        };

        let id = RequestId::from(self.deps.sequencer.next_key(now));
        let request = FriendRequest::new(id.clone(), &sender, to_user_id.clone(), now)?;
        self.deps
            .store
            .set(&paths::friend_request(&id), encode(&request)?)
            .await?;

        tracing::info!(
            request_id = %id,
            from = %caller.id,
            to = %to_user_id,
            "发送好友请求"
        );
        Ok(id)
    }

    /// 接受请求：请求状态和两条好友边一次性写入
    pub async fn accept_friend_request(&self, request_id: &RequestId) -> ApplicationResult<()> {
        let caller = self.deps.caller()?;
        let mut request = self.load_request(request_id).await?;
        request.resolve(&caller.id, FriendRequestStatus::Accepted)?;

        let sender_snapshot = ProfileCard {
            id: request.from_user_id.clone(),
            name: request.from_user_name.clone(),
            avatar: request.from_user_avatar.clone(),
        };
        let sender = self
            .directory
            .profile_card(&request.from_user_id, sender_snapshot)
            .await?;
        let recipient = self
            .directory
            .profile_card(&caller.id, caller.card(&self.default_display_name))
            .await?;

        let link = Friend::link(&recipient, &sender, self.deps.clock.now())?;
        let mut writes = vec![(
            paths::friend_request(request_id).child("status"),
            Value::String(request.status.as_str().to_owned()),
        )];
        for (owner, friend) in link.into_edges() {
            writes.push((paths::friend_edge(&owner, &friend.id), encode(&friend)?));
        }
        self.deps.store.write_batch(writes).await?;

        tracing::info!(
            request_id = %request_id,
            from = %request.from_user_id,
            to = %caller.id,
            "接受好友请求"
        );
        Ok(())
    }

    pub async fn reject_friend_request(&self, request_id: &RequestId) -> ApplicationResult<()> {
        let caller = self.deps.caller()?;
        let mut request = self.load_request(request_id).await?;
        request.resolve(&caller.id, FriendRequestStatus::Rejected)?;

        self.deps
            .store
            .set(
                &paths::friend_request(request_id).child("status"),
                Value::String(request.status.as_str().to_owned()),
            )
            .await?;
        tracing::info!(request_id = %request_id, to = %caller.id, "拒绝好友请求");
        Ok(())
    }

    pub async fn get_friends(&self, user_id: &UserId) -> ApplicationResult<Vec<Friend>> {
        user_id.check()?;
        let path = paths::friends(user_id);
        let value = self.deps.store.get(&path).await?;
        Ok(collect_friends(user_id, DataSnapshot::new(path, value)))
    }

    /// 订阅好友列表，每次变化都推送完整、已排序的列表
    pub async fn on_friends<F>(&self, user_id: &UserId, callback: F) -> ApplicationResult<Subscription>
    where
        F: FnMut(Vec<Friend>) + Send + 'static,
    {
        user_id.check()?;
        let path = paths::friends(user_id);
        let stream = self.deps.store.subscribe(&path, ChildQuery::all()).await?;
        let owner = user_id.clone();
        Ok(Subscription::spawn(
            "friends",
            path,
            stream,
            move |snapshot| Some(collect_friends(&owner, snapshot)),
            callback,
        ))
    }

    /// 删除双方名下的好友边，不存在时什么也不做
    pub async fn remove_friend(&self, friend_id: &UserId) -> ApplicationResult<()> {
        let caller = self.deps.caller()?;
        friend_id.check()?;
        self.deps
            .store
            .write_batch(vec![
                (paths::friend_edge(&caller.id, friend_id), Value::Null),
                (paths::friend_edge(friend_id, &caller.id), Value::Null),
            ])
            .await?;
        tracing::info!(user_id = %caller.id, friend_id = %friend_id, "删除好友");
        Ok(())
    }

    /// `owner` 名下是否有指向 `other` 的好友边
    pub async fn check_if_friends(&self, owner: &UserId, other: &UserId) -> ApplicationResult<bool> {
        owner.check()?;
        other.check()?;
        if owner == other {
            return Ok(false);
        }
        let edge = self.deps.store.get(&paths::friend_edge(owner, other)).await?;
        Ok(present(edge).is_some())
    }

    /// 发给 `user_id` 的待处理请求，最新的在前
    pub async fn get_friend_requests(&self, user_id: &UserId) -> ApplicationResult<Vec<FriendRequest>> {
        let path = paths::friend_requests();
        let value = self.deps.store.get(&path).await?;
        Ok(incoming_requests(user_id, DataSnapshot::new(path, value)))
    }

    pub async fn on_friend_requests<F>(
        &self,
        user_id: &UserId,
        callback: F,
    ) -> ApplicationResult<Subscription>
    where
        F: FnMut(Vec<FriendRequest>) + Send + 'static,
    {
        let path = paths::friend_requests();
        let stream = self.deps.store.subscribe(&path, ChildQuery::all()).await?;
        let recipient = user_id.clone();
        Ok(Subscription::spawn(
            "friend_requests",
            path,
            stream,
            move |snapshot| Some(incoming_requests(&recipient, snapshot)),
            callback,
        ))
    }

    /// `from` 发给 `to` 的待处理请求
    pub async fn find_pending_request(
        &self,
        from: &UserId,
        to: &UserId,
    ) -> ApplicationResult<Option<FriendRequest>> {
        let path = paths::friend_requests();
        let value = self.deps.store.get(&path).await?;
        Ok(decode_requests(DataSnapshot::new(path, value))
            .into_iter()
            .find(|request| request.is_pending_between(from, to)))
    }

    async fn load_request(&self, request_id: &RequestId) -> ApplicationResult<FriendRequest> {
        request_id.check()?;
        let path = paths::friend_request(request_id);
        let value = present(self.deps.store.get(&path).await?)
            .ok_or(ApplicationError::RequestNotFound)?;
        decode(&path, value)
    }
}

/// 好友边列表：跳过自环和损坏的记录并排序
fn collect_friends(owner: &UserId, snapshot: DataSnapshot) -> Vec<Friend> {
    let mut friends: Vec<Friend> = snapshot
        .into_children()
        .into_iter()
        .filter_map(|(key, value)| {
            if key == owner.as_str() {
                tracing::warn!(user_id = %owner, "忽略指向自己的好友边");
                return None;
            }
            if value.is_null() {
                return None;
            }
            match decode_friend(&key, value) {
                Ok(friend) => Some(friend),
                Err(err) => {
                    tracing::debug!(user_id = %owner, friend_id = %key, error = %err, "跳过无效的好友记录");
                    None
                }
            }
        })
        .collect();
    sort_friends(&mut friends);
    friends
}

fn decode_requests(snapshot: DataSnapshot) -> Vec<FriendRequest> {
    snapshot
        .into_children()
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .filter_map(|(key, value)| match serde_json::from_value::<FriendRequest>(value) {
            Ok(request) => Some(request),
            Err(err) => {
                tracing::debug!(request_id = %key, error = %err, "跳过无效的好友请求");
                None
            }
        })
        .collect()
}

fn incoming_requests(recipient: &UserId, snapshot: DataSnapshot) -> Vec<FriendRequest> {
    let mut requests: Vec<FriendRequest> = decode_requests(snapshot)
        .into_iter()
        .filter(|request| request.is_pending() && &request.to_user_id == recipient)
        .collect();
    requests.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
    requests
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::services::test_support::{deps, signed_in, signed_out};
    use crate::store::{MockRealtimeStore, StorePath};
    use serde_json::json;

    fn service(store: MockRealtimeStore, identity: crate::identity::MockIdentityProvider) -> FriendService {
        let deps = deps(store, identity);
        let directory = Arc::new(DirectoryService::new(deps.clone(), "User"));
        FriendService::new(deps, directory, "User")
    }

    #[tokio::test]
    async fn unauthenticated_send_performs_no_io() {
        let service = service(MockRealtimeStore::new(), signed_out());
        let result = service.send_friend_request(&UserId::from("u2")).await;
        assert!(matches!(result, Err(ApplicationError::Unauthenticated)));
    }

    #[tokio::test]
    async fn self_request_is_rejected_before_io() {
        let service = service(MockRealtimeStore::new(), signed_in("u1"));
        let result = service.send_friend_request(&UserId::from("u1")).await;
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::SelfFriendship))
        ));
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_network_failure() {
        let mut store = MockRealtimeStore::new();
        store
            .expect_get()
            .returning(|_| Err(StoreError::unavailable("offline")));
        let service = service(store, signed_in("u1"));
        let err = service
            .send_friend_request(&UserId::from("u2"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, ApplicationError::NetworkFailure(_)));
    }

    #[tokio::test]
    async fn accept_by_sender_is_unauthorized_and_writes_nothing() {
        let mut store = MockRealtimeStore::new();
        store
            .expect_get()
            .withf(|path: &StorePath| path.to_string() == "friendRequests/r1")
            .returning(|_| {
                Ok(Some(json!({
                    "id": "r1",
                    "fromUserId": "u1",
                    "toUserId": "u2",
                    "status": "pending",
                    "timestamp": 1,
                    "fromUserName": "Ann"
                })))
            });
        let service = service(store, signed_in("u1"));
        let result = service.accept_friend_request(&RequestId::from("r1")).await;
        assert!(matches!(result, Err(ApplicationError::Unauthorized)));
    }

    #[tokio::test]
    async fn missing_request_is_not_found() {
        let mut store = MockRealtimeStore::new();
        store.expect_get().returning(|_| Ok(None));
        let service = service(store, signed_in("u2"));
        let result = service.reject_friend_request(&RequestId::from("nope")).await;
        assert!(matches!(result, Err(ApplicationError::RequestNotFound)));
    }

    #[tokio::test]
    async fn blank_or_nested_friend_ids_are_rejected_before_io() {
        let service = service(MockRealtimeStore::new(), signed_in("u1"));
        for bad in ["", " ", "u2/name", "u1/friends"] {
            let id = UserId::from(bad);
            assert!(matches!(
                service.remove_friend(&id).await,
                Err(ApplicationError::Domain(DomainError::InvalidArgument { .. }))
            ));
            assert!(matches!(
                service.check_if_friends(&UserId::from("u1"), &id).await,
                Err(ApplicationError::Domain(DomainError::InvalidArgument { .. }))
            ));
            assert!(service.send_friend_request(&id).await.is_err());
            assert!(service.get_friends(&id).await.is_err());
        }
        assert!(service
            .accept_friend_request(&RequestId::from(""))
            .await
            .is_err());
    }

    #[test]
    fn friend_list_skips_self_edge_and_sorts() {
        let owner = UserId::from("u1");
        let snapshot = DataSnapshot::new(
            paths::friends(&owner),
            Some(json!({
                "u1": { "name": "Me", "addedAt": 1 },
                "u3": { "name": "carol", "addedAt": 2 },
                "u2": { "name": "Bob", "addedAt": 3 },
                "u4": 12
            })),
        );
        let names: Vec<_> = collect_friends(&owner, snapshot)
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, ["Bob", "carol"]);
    }

    #[test]
    fn incoming_requests_are_pending_and_newest_first() {
        let snapshot = DataSnapshot::new(
            paths::friend_requests(),
            Some(json!({
                "r1": { "id": "r1", "fromUserId": "a", "toUserId": "me", "status": "pending", "timestamp": 10, "fromUserName": "A" },
                "r2": { "id": "r2", "fromUserId": "b", "toUserId": "me", "status": "pending", "timestamp": 20, "fromUserName": "B" },
                "r3": { "id": "r3", "fromUserId": "c", "toUserId": "me", "status": "accepted", "timestamp": 30, "fromUserName": "C" },
                "r4": { "id": "r4", "fromUserId": "d", "toUserId": "else", "status": "pending", "timestamp": 40, "fromUserName": "D" }
            })),
        );
        let ids: Vec<_> = incoming_requests(&UserId::from("me"), snapshot)
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(ids, ["r2", "r1"]);
    }
}
