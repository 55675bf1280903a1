use domain::{ProfileCard, ProfileUpdate, User, UserId};
use serde_json::{json, Map, Value};

use super::{present, ServiceDependencies};
use crate::{
    error::{ApplicationError, ApplicationResult},
    paths,
    records::decode_user,
};

/// 用户目录：资料读取、搜索和登录后的资料补全
pub struct DirectoryService {
    deps: ServiceDependencies,
    default_display_name: String,
}

impl DirectoryService {
    pub fn new(deps: ServiceDependencies, default_display_name: impl Into<String>) -> Self {
        Self {
            deps,
            default_display_name: default_display_name.into(),
        }
    }

    pub async fn get_user(&self, user_id: &UserId) -> ApplicationResult<Option<User>> {
        user_id.check()?;
        let path = paths::user(user_id);
        match present(self.deps.store.get(&path).await?) {
            Some(value) => decode_user(user_id.as_str(), value)
                .map(Some)
                .map_err(|err| ApplicationError::invalid_record(&path, err)),
            None => Ok(None),
        }
    }

    /// 按名称或邮箱做不区分大小写的子串匹配，结果不包含当前调用者
    pub async fn search_users(&self, term: &str) -> ApplicationResult<Vec<User>> {
        let snapshot = self.deps.store.get(&paths::users()).await?;
        let caller = self.deps.identity.current_user().map(|c| c.id);
        let term = term.trim();

        let mut users: Vec<User> = match snapshot {
            Some(Value::Object(children)) => children
                .into_iter()
                .filter(|(key, _)| caller.as_ref().is_none_or(|id| id.as_str() != key))
                .filter_map(|(key, value)| match decode_user(&key, value) {
                    Ok(user) => Some(user),
                    Err(err) => {
                        tracing::debug!(user_id = %key, error = %err, "跳过无效的用户记录");
                        None
                    }
                })
                .filter(|user| user.matches(term))
                .collect(),
            _ => Vec::new(),
        };
        users.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(users)
    }

    /// 登录后调用：目录里没有记录时创建，有记录时只补全缺失的字段
    pub async fn ensure_profile(&self) -> ApplicationResult<User> {
        let caller = self.deps.caller()?;
        let path = paths::user(&caller.id);
        let now = self.deps.clock.now().timestamp_millis();
        let card = caller.card(&self.default_display_name);
        let email = caller.email.clone().unwrap_or_default();

        match present(self.deps.store.get(&path).await?) {
            None => {
                let mut record = json!({
                    "id": caller.id,
                    "name": card.name,
                    "email": email,
                    "createdAt": now,
                });
                if let (Some(avatar), Value::Object(map)) = (card.avatar.clone(), &mut record) {
                    map.insert("avatar".to_owned(), Value::String(avatar));
                }
                self.deps.store.set(&path, record).await?;
                tracing::info!(user_id = %caller.id, "创建用户资料");
            }
            Some(existing) => {
                let missing = |field: &str| {
                    existing
                        .get(field)
                        .and_then(Value::as_str)
                        .is_none_or(|v| v.trim().is_empty())
                };
                let mut fields = Map::new();
                if missing("name") {
                    fields.insert("name".to_owned(), Value::String(card.name.clone()));
                }
                if missing("email") && !email.is_empty() {
                    fields.insert("email".to_owned(), Value::String(email.clone()));
                }
                if let Some(avatar) = card.avatar.clone().filter(|_| missing("avatar")) {
                    fields.insert("avatar".to_owned(), Value::String(avatar));
                }
                if !fields.is_empty() {
                    fields.insert("updatedAt".to_owned(), json!(now));
                    self.deps.store.update(&path, fields).await?;
                    tracing::info!(user_id = %caller.id, "补全用户资料");
                }
            }
        }

        self.get_user(&caller.id)
            .await?
            .ok_or_else(|| ApplicationError::invalid_record(&path, "profile missing after write"))
    }

    /// 只写入提供了的字段，并刷新 `updatedAt`
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApplicationResult<()> {
        let caller = self.deps.caller()?;
        let mut fields: Map<String, Value> = update
            .provided_fields()
            .into_iter()
            .map(|(field, value)| (field.to_owned(), Value::String(value)))
            .collect();
        if fields.is_empty() {
            return Ok(());
        }
        fields.insert(
            "updatedAt".to_owned(),
            json!(self.deps.clock.now().timestamp_millis()),
        );
        self.deps
            .store
            .update(&paths::user(&caller.id), fields)
            .await?;
        tracing::info!(user_id = %caller.id, "更新用户资料");
        Ok(())
    }

    /// 目录中的显示信息；没有记录或名称为空时使用 `fallback`
    pub(crate) async fn profile_card(
        &self,
        user_id: &UserId,
        fallback: ProfileCard,
    ) -> ApplicationResult<ProfileCard> {
        let user = match self.get_user(user_id).await {
            Ok(user) => user,
            Err(ApplicationError::InvalidRecord { path, reason }) => {
                tracing::warn!(user_id = %user_id, path = %path, reason = %reason, "用户记录无效，使用快照信息");
                None
            }
            Err(err) => return Err(err),
        };
        Ok(match user {
            Some(user) if !user.name.trim().is_empty() => ProfileCard {
                id: user_id.clone(),
                name: user.name,
                avatar: user.avatar.or(fallback.avatar),
            },
            _ => ProfileCard {
                id: user_id.clone(),
                ..fallback
            },
        })
    }
}
