//! Conversation memory: remembered preferences and tracked topics.
//!
//! All four tools read and write the calling session's [`SessionState`]
//! through its [`ToolContext`].
//!
//! [`SessionState`]: parley_conversation::SessionState

use async_trait::async_trait;
use parley_conversation::{
    NoArgs, ParameterKind, ParameterSpec, Tool, ToolContext, ToolFailure,
};
use serde::Deserialize;

/// Returned when no topic has been tracked yet.
pub const NO_TOPICS: &str = "We haven't discussed any specific topics yet";

/// Stores a user preference for later recall.
pub struct RememberPreference;

/// Arguments for [`RememberPreference`].
#[derive(Debug, Deserialize)]
pub struct RememberPreferenceArgs {
    /// Preference name; matched case-insensitively.
    pub key: String,
    /// Value to remember.
    pub value: String,
}

#[async_trait]
impl Tool for RememberPreference {
    type Args = RememberPreferenceArgs;

    fn name(&self) -> &'static str {
        "remember_preference"
    }

    fn description(&self) -> &'static str {
        "Saves a user preference or fact for future reference"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required(
                "key",
                ParameterKind::String,
                "The key or name of the preference",
            ),
            ParameterSpec::required(
                "value",
                ParameterKind::String,
                "The value or details to remember",
            ),
        ]
    }

    async fn call(
        &self,
        ctx: &ToolContext,
        args: RememberPreferenceArgs,
    ) -> Result<String, ToolFailure> {
        ctx.with_state(|state| state.remember(&args.key, args.value.clone()));
        Ok(format!(
            "I'll remember that your {} is {}",
            args.key, args.value
        ))
    }
}

/// Recalls a previously stored preference.
pub struct RecallPreference;

/// Arguments for [`RecallPreference`].
#[derive(Debug, Deserialize)]
pub struct RecallPreferenceArgs {
    /// Preference name; matched case-insensitively.
    pub key: String,
}

#[async_trait]
impl Tool for RecallPreference {
    type Args = RecallPreferenceArgs;

    fn name(&self) -> &'static str {
        "recall_preference"
    }

    fn description(&self) -> &'static str {
        "Retrieves a previously saved user preference"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required(
            "key",
            ParameterKind::String,
            "The preference key to recall",
        )]
    }

    async fn call(
        &self,
        ctx: &ToolContext,
        args: RecallPreferenceArgs,
    ) -> Result<String, ToolFailure> {
        let value = ctx.with_state(|state| state.recall(&args.key).map(str::to_owned));
        Ok(match value {
            Some(value) => format!("Your {} is {value}", args.key),
            None => format!("I don't have any information about {}", args.key),
        })
    }
}

/// Records a topic under discussion.
pub struct TrackTopic;

/// Arguments for [`TrackTopic`].
#[derive(Debug, Deserialize)]
pub struct TrackTopicArgs {
    /// The topic.
    pub topic: String,
}

#[async_trait]
impl Tool for TrackTopic {
    type Args = TrackTopicArgs;

    fn name(&self) -> &'static str {
        "track_topic"
    }

    fn description(&self) -> &'static str {
        "Tracks topics discussed in the conversation"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required(
            "topic",
            ParameterKind::String,
            "The topic being discussed",
        )]
    }

    async fn call(&self, ctx: &ToolContext, args: TrackTopicArgs) -> Result<String, ToolFailure> {
        ctx.with_state(|state| state.track_topic(&args.topic));
        Ok(format!("Noted that we're discussing {}", args.topic))
    }
}

/// Lists every tracked topic.
pub struct ListDiscussedTopics;

#[async_trait]
impl Tool for ListDiscussedTopics {
    type Args = NoArgs;

    fn name(&self) -> &'static str {
        "list_discussed_topics"
    }

    fn description(&self) -> &'static str {
        "Lists all topics discussed so far"
    }

    async fn call(&self, ctx: &ToolContext, _args: NoArgs) -> Result<String, ToolFailure> {
        let topics = ctx.with_state(|state| state.topics().join(", "));
        if topics.is_empty() {
            return Ok(NO_TOPICS.to_string());
        }
        Ok(format!("We've discussed: {topics}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn remember(ctx: &ToolContext, key: &str, value: &str) -> String {
        RememberPreference
            .call(
                ctx,
                RememberPreferenceArgs {
                    key: key.to_string(),
                    value: value.to_string(),
                },
            )
            .await
            .unwrap()
    }

    async fn recall(ctx: &ToolContext, key: &str) -> String {
        RecallPreference
            .call(ctx, RecallPreferenceArgs { key: key.to_string() })
            .await
            .unwrap()
    }

    async fn track(ctx: &ToolContext, topic: &str) -> String {
        TrackTopic
            .call(ctx, TrackTopicArgs { topic: topic.to_string() })
            .await
            .unwrap()
    }

    async fn topics(ctx: &ToolContext) -> String {
        ListDiscussedTopics.call(ctx, NoArgs {}).await.unwrap()
    }

    #[tokio::test]
    async fn recall_is_case_insensitive() {
        let ctx = ToolContext::default();

        assert_eq!(
            remember(&ctx, "Color", "blue").await,
            "I'll remember that your Color is blue"
        );
        assert_eq!(recall(&ctx, "color").await, "Your color is blue");
    }

    #[tokio::test]
    async fn recall_unknown_key() {
        let ctx = ToolContext::default();
        assert_eq!(
            recall(&ctx, "shoe size").await,
            "I don't have any information about shoe size"
        );
    }

    #[tokio::test]
    async fn tracking_twice_lists_once() {
        let ctx = ToolContext::default();

        assert_eq!(track(&ctx, "space").await, "Noted that we're discussing space");
        track(&ctx, "space").await;

        assert_eq!(topics(&ctx).await, "We've discussed: space");
    }

    #[tokio::test]
    async fn tracking_n_times_matches_tracking_once() {
        let once = ToolContext::default();
        let many = ToolContext::default();
        track(&once, "rust").await;
        for _ in 0..5 {
            track(&many, "rust").await;
        }

        assert_eq!(once.snapshot().topics(), many.snapshot().topics());
    }

    #[tokio::test]
    async fn topics_keep_first_seen_order() {
        let ctx = ToolContext::default();
        for topic in ["space", "rust", "space", "coffee"] {
            track(&ctx, topic).await;
        }

        assert_eq!(topics(&ctx).await, "We've discussed: space, rust, coffee");
    }

    #[tokio::test]
    async fn no_topics_yet() {
        assert_eq!(topics(&ToolContext::default()).await, NO_TOPICS);
    }
}
