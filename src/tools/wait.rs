//! Short pause between UI actions.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;

/// How long `wait_0_1_seconds` actually sleeps.
pub const WAIT_DURATION: Duration = Duration::from_millis(10);

/// Lets a preceding click or navigation settle before the next step.
pub struct WaitBriefly;

#[async_trait]
impl Tool for WaitBriefly {
    fn name(&self) -> &str {
        "wait_0_1_seconds"
    }

    fn description(&self) -> &str {
        "Call this tool when you need to wait 0.1 second."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<String> {
        tokio::time::sleep(WAIT_DURATION).await;
        Ok("done".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn sleeps_at_least_the_wait_duration() {
        let start = Instant::now();
        let output = WaitBriefly.execute(json!({})).await.unwrap();
        assert!(start.elapsed() >= WAIT_DURATION);
        assert_eq!(output, "done");
    }

    #[tokio::test]
    async fn ignores_arguments() {
        assert!(WaitBriefly.execute(json!({"seconds": 5})).await.is_ok());
        assert!(WaitBriefly.execute(Value::Null).await.is_ok());
    }
}
