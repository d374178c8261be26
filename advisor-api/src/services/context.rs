//! Prompt context assembly
//!
//! Stateless transforms from (profile, prior messages, candidate songs)
//! to the text blocks of the advisor prompt. The template text, the
//! directive set, and the block ordering are the binding prompt
//! contract: persona, policy directives, profile block, history block,
//! candidate list, then the raw query. The advisor answers in
//! Traditional Chinese, matching its player base.

use advisor_common::config::{CHAT_MESSAGE_MAX_LENGTH, USER_NAME_MAX_LENGTH};
use advisor_common::sanitize::sanitize;
use advisor_common::types::{ChatMessage, Profile};

/// Render the player profile block, or an empty string without a
/// profile. Each field is independently sanitized and length-bounded.
pub fn build_profile_context(profile: Option<&Profile>) -> String {
    let Some(profile) = profile else {
        return String::new();
    };

    let name = sanitize(&profile.name, USER_NAME_MAX_LENGTH);
    let level = sanitize(&profile.level, USER_NAME_MAX_LENGTH);
    let star_pref = sanitize(&profile.star_pref, USER_NAME_MAX_LENGTH);
    let style = sanitize(&profile.style, USER_NAME_MAX_LENGTH);

    format!(
        "【玩家實力與偏好設定】\n\
         玩家名稱: {name}\n\
         最高段位: {level}\n\
         偏好星級: {star_pref}\n\
         打法偏好: {style}\n"
    )
}

/// Render prior messages with role-derived labels, in original order,
/// or an empty string when there is no history.
pub fn build_history_context(history: &[ChatMessage]) -> String {
    if history.is_empty() {
        return String::new();
    }

    let mut text = String::from("【之前的對話紀錄】\n");
    for message in history {
        let label = if message.role == "user" { "玩家: " } else { "顧問: " };
        let content = sanitize(&message.content, CHAT_MESSAGE_MAX_LENGTH);
        text.push_str(label);
        text.push_str(&content);
        text.push('\n');
    }
    text.push('\n');
    text
}

/// Assemble the final prompt sent to the model.
pub fn build_prompt(
    message: &str,
    profile_context: &str,
    history_context: &str,
    songs_context: &str,
) -> String {
    format!(
        "你是一個專業、有耐心的「太鼓之達人」遊玩顧問。\n\
         請根據玩家的需求，從以下的【候選歌曲資料庫】中挑選出最適合的歌曲來推薦。\n\
         {profile_context}\n\
         {history_context}\n\
         - 如果玩家只是閒聊，請普通地回應他。\n\
         - 如果推薦的要求帶有難度要求，輸出時請直接輸出該難度的資訊，不要輸出其他難度的資訊。\n\
         - 若【玩家實力與偏好設定】有資料，請在推薦歌曲時，務必將這些偏好納入考量，挑選符合他實力與打法的歌曲。\n\
         - 請記得參考【之前的對話紀錄】(如果有)，接續之前的脈絡進行回覆。\n\
         - 推薦的歌曲以3首為上限。\n\
         - 如果是要求推薦，請將推薦出來的歌曲以漂亮地排版，包含曲名(使用橙色標記)、歌曲類別、難度&星級()、BPM。不要使用任何表情符號。\n\
         - 務必只能推薦存在於資料庫中的歌曲，如果資料庫中沒有完全匹配的，可以推薦最相近的歌曲，並委婉說明。\n\
         - 務必使用繁體中文回應。\n\
         \n\
         【候選歌曲資料庫】：\n\
         {songs_context}\n\
         \n\
         【玩家需求】：\n\
         {message}\n"
    )
}
