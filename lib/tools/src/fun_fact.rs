//! Random computing trivia.

use async_trait::async_trait;
use parley_conversation::{ParameterKind, ParameterSpec, Tool, ToolContext, ToolFailure};
use rand::seq::SliceRandom;
use serde::Deserialize;

/// The facts [`GenerateFunFact`] picks from.
pub const FUN_FACTS: [&str; 4] = [
    "The first computer bug was an actual moth found in a Harvard Mark II computer in 1947",
    "Python is named after Monty Python, not the snake",
    "The first 1GB hard drive weighed over 500 pounds and cost $40,000",
    "Git was created in just 10 days by Linus Torvalds",
];

/// Picks one fun fact uniformly at random.
pub struct GenerateFunFact;

/// Arguments for [`GenerateFunFact`].
#[derive(Debug, Default, Deserialize)]
pub struct GenerateFunFactArgs {
    /// Accepted for the model's benefit; selection ignores it.
    pub topic: Option<String>,
}

#[async_trait]
impl Tool for GenerateFunFact {
    type Args = GenerateFunFactArgs;

    fn name(&self) -> &'static str {
        "generate_fun_fact"
    }

    fn description(&self) -> &'static str {
        "Generates a fun fact or interesting information"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::optional(
            "topic",
            ParameterKind::String,
            "Optional topic for the fun fact",
        )]
    }

    async fn call(
        &self,
        _ctx: &ToolContext,
        _args: GenerateFunFactArgs,
    ) -> Result<String, ToolFailure> {
        let fact = FUN_FACTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(FUN_FACTS[0]);
        Ok(fact.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn returns_a_known_fact_regardless_of_topic() {
        let ctx = ToolContext::default();
        for topic in [None, Some("cooking".to_string())] {
            let fact = GenerateFunFact
                .call(&ctx, GenerateFunFactArgs { topic })
                .await
                .unwrap();
            assert!(FUN_FACTS.contains(&fact.as_str()));
        }
    }

    #[tokio::test]
    async fn eventually_returns_every_fact() {
        let ctx = ToolContext::default();
        let mut seen = HashSet::new();
        for _ in 0..500 {
            seen.insert(
                GenerateFunFact
                    .call(&ctx, GenerateFunFactArgs::default())
                    .await
                    .unwrap(),
            );
        }
        assert_eq!(seen.len(), FUN_FACTS.len());
    }
}
