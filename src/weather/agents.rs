use crate::agent::HttpAgent;
use crate::config::Config;
use crate::error::AgentError;

use super::steps::{CITY_TRANSLATOR_AGENT, WEATHER_AGENT};

const CITY_TRANSLATOR_INSTRUCTIONS: &str = "\
あなたの役割は入力された地名を「英語のASCII表記」に変換して一語で返すことです。
ルール:
- 返答は地名のみ。句読点や説明を付けない。
- アクセント・ダイアクリティカルマークは除去する（São Paulo → Sao Paulo）。
- すでに英語の場合はそのまま返す。
- 不明な場合は入力をそのまま返す。";

const WEATHER_INSTRUCTIONS: &str = "\
あなたは天気情報と天気に基づくアクティビティ提案を行う日本語のアシスタントです。

応答時のルール:
- 場所が未指定なら必ず尋ねる
- 非英語表記の地名は日本語に統一して扱う
- 「東京都港区」のような複数要素は主要部分（例: 「東京」）を使う
- 湿度・風・降水確率など重要な指標を含める
- 簡潔だが情報量は確保する
- アクティビティ提案を求められたら天気に基づき提案する
- ユーザーの求めるフォーマットがあればそれに従う";

pub fn city_translator(config: &Config) -> Result<HttpAgent, AgentError> {
    Ok(HttpAgent::new(
        CITY_TRANSLATOR_AGENT,
        &config.agent_base_url,
        config.agent_api_key.clone().unwrap_or_default(),
        &config.agent_model,
    )?
    .with_instructions(CITY_TRANSLATOR_INSTRUCTIONS))
}

pub fn weather_assistant(config: &Config) -> Result<HttpAgent, AgentError> {
    Ok(HttpAgent::new(
        WEATHER_AGENT,
        &config.agent_base_url,
        config.agent_api_key.clone().unwrap_or_default(),
        &config.agent_model,
    )?
    .with_instructions(WEATHER_INSTRUCTIONS))
}
