//! X/Twitter intent URLs opened when a task starts.

use crate::task::{Task, TaskDetails, TaskType};
use url::{ParseError, Url};

pub const X_BASE_URL: &str = "https://x.com";

fn intent(kind: &str, params: &[(&str, &str)]) -> Result<Url, ParseError> {
    let endpoint = format!("{X_BASE_URL}/intent/{kind}");
    if params.is_empty() {
        Url::parse(&endpoint)
    } else {
        Url::parse_with_params(&endpoint, params)
    }
}

fn home() -> Result<Url, ParseError> {
    Url::parse(X_BASE_URL)
}

fn strip<'a>(value: &'a Option<String>, prefix: char) -> Option<&'a str> {
    value
        .as_deref()
        .map(|v| v.trim().trim_start_matches(prefix))
        .filter(|v| !v.is_empty())
}

/// Task text followed by `$CASHTAG #hashtag @mention website`, skipping absent parts.
pub fn compose_text(details: &TaskDetails) -> String {
    let mut parts: Vec<String> = vec![];
    if let Some(text) = details.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        parts.push(text.to_string());
    }
    if let Some(cashtag) = strip(&details.cashtag, '$') {
        parts.push(format!("${cashtag}"));
    }
    if let Some(hashtag) = strip(&details.hashtag, '#') {
        parts.push(format!("#{hashtag}"));
    }
    if let Some(mention) = strip(&details.mention, '@') {
        parts.push(format!("@{mention}"));
    }
    if let Some(website) = details.website.as_deref().map(str::trim).filter(|w| !w.is_empty()) {
        parts.push(website.to_string());
    }
    parts.join(" ")
}

fn tweet_intent(text: &str) -> Result<Url, ParseError> {
    if text.is_empty() {
        intent("tweet", &[])
    } else {
        intent("tweet", &[("text", text)])
    }
}

/// URL for starting `task`. `text` overrides the composed text of content tasks.
///
/// Fallbacks: follow without a handle opens the home page; retweet, reply and quote
/// without a tweet id open a plain tweet composer.
pub fn intent_url(task: &Task, text: Option<&str>) -> Result<Url, ParseError> {
    let details = &task.details;
    let composed;
    let text = match text {
        Some(text) => text,
        None => {
            composed = compose_text(details);
            &composed
        }
    };
    let tweet_id = strip(&details.tweet_id, ' ');
    let handle = strip(&details.target_handle, '@');

    match task.task_type {
        TaskType::Follow => match handle {
            Some(handle) => intent("follow", &[("screen_name", handle)]),
            None => home(),
        },
        TaskType::Tweet => tweet_intent(text),
        TaskType::Retweet => match tweet_id {
            Some(id) => intent("retweet", &[("tweet_id", id)]),
            None => tweet_intent(text),
        },
        TaskType::Reply => match tweet_id {
            Some(id) if text.is_empty() => intent("tweet", &[("in_reply_to", id)]),
            Some(id) => intent("tweet", &[("in_reply_to", id), ("text", text)]),
            None => tweet_intent(text),
        },
        TaskType::QuoteTweet => match tweet_id {
            Some(id) => {
                let status = format!("{X_BASE_URL}/{}/status/{id}", handle.unwrap_or("i"));
                if text.is_empty() {
                    intent("tweet", &[("url", status.as_str())])
                } else {
                    intent("tweet", &[("text", text), ("url", status.as_str())])
                }
            }
            None => tweet_intent(text),
        },
    }
}
