use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// 目录中的用户资料。对本引擎而言只读，仅允许安全的部分更新。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl User {
    /// 名称或邮箱包含搜索词（不区分大小写）。
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term) || self.email.to_lowercase().contains(&term)
    }
}

/// 资料的部分更新，只有非空字段会被写入。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

impl ProfileUpdate {
    /// 过滤掉空白值后的字段列表，字段名为线上格式。
    pub fn provided_fields(&self) -> Vec<(&'static str, String)> {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("avatar", &self.avatar),
            ("bio", &self.bio),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (field, v.to_owned()))
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, email: &str) -> User {
        User {
            id: UserId::from("u9"),
            name: name.to_owned(),
            email: email.to_owned(),
            avatar: None,
            bio: None,
        }
    }

    #[test]
    fn matches_name_or_email_case_insensitively() {
        let u = user("Luna Cat", "luna@pets.io");
        assert!(u.matches("luna"));
        assert!(u.matches("PETS"));
        assert!(!u.matches("rex"));
    }

    #[test]
    fn provided_fields_skip_blank_values() {
        let update = ProfileUpdate {
            name: Some("  Rex ".into()),
            email: Some("   ".into()),
            avatar: None,
            bio: Some("good dog".into()),
        };
        assert_eq!(
            update.provided_fields(),
            vec![("name", "Rex".to_owned()), ("bio", "good dog".to_owned())]
        );
    }
}
