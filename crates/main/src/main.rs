//! 主程序入口
//!
//! 在内存存储上跑一遍完整流程：两个客户端互加好友、建立聊天室、
//! 收发消息并更新在线状态，订阅到的推送通过日志输出。

use std::{env, path::PathBuf, time::Duration};

use application::CallerIdentity;
use config::AppConfig;
use domain::{GeoPoint, MessageDraft, UserId};
use infrastructure::{retry_async, InMemoryEngine, RetryConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 配置文件路径：第一个命令行参数，或 PETSYNC_CONFIG
    let config_path = env::args()
        .nth(1)
        .or_else(|| env::var("PETSYNC_CONFIG").ok())
        .map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    // 初始化日志，RUST_LOG 优先
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let ann = InMemoryEngine::from_config(&config)?;
    ann.sign_in(
        CallerIdentity::new("u1")
            .with_display_name("Ann")
            .with_email("ann@pets.example"),
    );
    let bob = ann.client();
    bob.sign_in(
        CallerIdentity::new("u2")
            .with_display_name("Bob")
            .with_email("bob@pets.example"),
    );
    let (u1, u2) = (UserId::from("u1"), UserId::from("u2"));

    ann.engine().directory().ensure_profile().await?;
    bob.engine().directory().ensure_profile().await?;

    let _friends = ann
        .engine()
        .friends()
        .on_friends(&u1, |friends| {
            let names: Vec<_> = friends.iter().map(|f| f.name.as_str()).collect();
            tracing::info!(?names, "好友列表更新");
        })
        .await?;
    let _requests = bob
        .engine()
        .friends()
        .on_friend_requests(&u2, |requests| {
            tracing::info!(pending = requests.len(), "待处理好友请求");
        })
        .await?;

    let found = ann.engine().friends().search_users("bob").await?;
    tracing::info!(found = found.len(), "搜索用户");

    let request_id = ann.engine().friends().send_friend_request(&u2).await?;
    bob.engine()
        .friends()
        .accept_friend_request(&request_id)
        .await?;

    let room = bob
        .engine()
        .chat_rooms()
        .get_or_create_chat_room(&[u2.clone(), u1.clone()])
        .await?;

    let _messages = bob
        .engine()
        .messages()
        .on_messages(&room, |messages| {
            if let Some(last) = messages.last() {
                tracing::info!(count = messages.len(), from = %last.sender_name, text = %last.text, "收到消息");
            }
        })
        .await?;
    let _status = bob
        .engine()
        .presence()
        .on_user_status(&u1, |status| {
            tracing::info!(online = status.is_online, "Ann 的在线状态");
        })
        .await?;

    let retry = RetryConfig::default();
    ann.engine().presence().update_user_status(&u1, true).await?;
    for draft in [
        MessageDraft::text("hi"),
        MessageDraft::location(
            GeoPoint {
                latitude: 52.52,
                longitude: 13.405,
                address: Some("Dog park".to_owned()),
            },
            "meet here?",
        ),
    ] {
        retry_async(&retry, || {
            ann.engine().messages().send_message(&room, draft.clone())
        })
        .await?;
    }
    bob.engine()
        .messages()
        .send_message(&room, MessageDraft::text("on my way"))
        .await?;

    let unread = bob.engine().messages().get_unread_count(&room, &u2).await?;
    tracing::info!(unread, "Bob 的未读数");
    bob.engine().messages().mark_messages_as_read(&room, &u2).await?;

    ann.engine().presence().update_user_status(&u1, false).await?;

    // 等订阅把最后的推送打印出来
    tokio::time::sleep(Duration::from_millis(100)).await;

    let rooms = ann.engine().chat_rooms().get_user_chat_rooms(&u1).await?;
    for room in rooms {
        tracing::info!(
            room_id = %room.id,
            last = room.last_message.as_ref().map(|m| m.text.as_str()),
            "聊天室"
        );
    }
    Ok(())
}
