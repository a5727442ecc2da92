//! Twitter API v2 Recent Search Client
//!
//! Fetches recent mentions of a token address (retweets excluded) together
//! with the authors' account age and follower counts. Requires a bearer
//! token; without one the client reports itself as unconfigured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::{build_http_client, check_status, SocialSource, SourceKind};
use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::SOCIAL_MAX_RESULTS;

/// A single mention
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetrics {
    #[serde(default)]
    pub followers_count: u64,
}

/// Author of a mention
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TwitterUser {
    pub id: String,
    /// RFC 3339 account creation time
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub public_metrics: Option<UserMetrics>,
}

impl TwitterUser {
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn followers(&self) -> u64 {
        self.public_metrics.as_ref().map_or(0, |m| m.followers_count)
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchIncludes {
    #[serde(default)]
    users: Vec<TwitterUser>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: Option<SearchIncludes>,
}

/// Mentions plus their authors keyed by user id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MentionBatch {
    pub tweets: Vec<Tweet>,
    pub users: HashMap<String, TwitterUser>,
}

impl MentionBatch {
    fn from_response(resp: SearchResponse) -> Self {
        let users = resp
            .includes
            .unwrap_or_default()
            .users
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();
        Self {
            tweets: resp.data,
            users,
        }
    }

    pub fn author(&self, tweet: &Tweet) -> Option<&TwitterUser> {
        tweet.author_id.as_ref().and_then(|id| self.users.get(id))
    }
}

/// Twitter recent-search client
pub struct TwitterClient {
    client: reqwest::Client,
    search_url: String,
    /// Never logged
    bearer_token: Option<String>,
}

impl TwitterClient {
    pub fn new(
        search_url: impl Into<String>,
        bearer_token: Option<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            search_url: search_url.into(),
            bearer_token: bearer_token.filter(|t| !t.trim().is_empty()),
        })
    }
}

#[async_trait]
impl SocialSource for TwitterClient {
    fn is_configured(&self) -> bool {
        self.bearer_token.is_some()
    }

    async fn recent_mentions(&self, token: &str) -> AppResult<MentionBatch> {
        let bearer = self
            .bearer_token
            .as_deref()
            .ok_or_else(|| AppError::not_configured("TWITTER_BEARER_TOKEN not set"))?;

        let query = format!("{} -is:retweet", token);
        let max_results = SOCIAL_MAX_RESULTS.to_string();
        let response = self
            .client
            .get(&self.search_url)
            .bearer_auth(bearer)
            .query(&[
                ("query", query.as_str()),
                ("max_results", max_results.as_str()),
                ("tweet.fields", "author_id,created_at,public_metrics"),
                ("user.fields", "created_at,public_metrics"),
                ("expansions", "author_id"),
            ])
            .send()
            .await?;
        check_status(SourceKind::Social, response.status())?;

        let data: SearchResponse = response.json().await.map_err(|e| {
            AppError::invalid_response(format!("Failed to parse Twitter response: {}", e))
        })?;
        Ok(MentionBatch::from_response(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_response() {
        let body = r#"{
            "data": [
                {"id": "1", "text": "LFG this gem", "author_id": "u1"},
                {"id": "2", "text": "just a mention", "author_id": "u9"}
            ],
            "includes": {"users": [
                {"id": "u1", "created_at": "2024-05-01T10:00:00.000Z",
                 "public_metrics": {"followers_count": 12, "following_count": 400}}
            ]},
            "meta": {"result_count": 2}
        }"#;
        let resp: SearchResponse = serde_json::from_str(body).unwrap();
        let batch = MentionBatch::from_response(resp);

        assert_eq!(batch.tweets.len(), 2);
        let author = batch.author(&batch.tweets[0]).unwrap();
        assert_eq!(author.followers(), 12);
        assert_eq!(author.created().unwrap().timestamp(), 1_714_557_600);
        assert!(batch.author(&batch.tweets[1]).is_none());
    }

    #[test]
    fn test_parse_empty_search() {
        let resp: SearchResponse =
            serde_json::from_str(r#"{"meta": {"result_count": 0}}"#).unwrap();
        let batch = MentionBatch::from_response(resp);
        assert!(batch.tweets.is_empty());
        assert!(batch.users.is_empty());
    }

    #[test]
    fn test_unconfigured_client() {
        let client =
            TwitterClient::new("http://localhost", Some("  ".into()), Duration::from_secs(1))
                .unwrap();
        assert!(!client.is_configured());
    }
}
