use async_trait::async_trait;
use authflow_core::{
    context_keys, CoreError, ExecutionState, GraphNode, Prompts, StepCategory, StepContract,
    StepExecutor, StepExecutorBase,
};

/// Display step collecting a fixed set of fields.
///
/// Labels default per field and can be overridden per node through
/// `custom_config` entries named `<field>_label`.
#[derive(Debug)]
pub struct PromptStep {
    contract: StepContract,
    labels: Vec<(String, String)>,
}

impl PromptStep {
    /// Create a prompt step from `(field, default label)` pairs
    pub fn new(name: &str, fields: &[(&str, &str)]) -> Self {
        let names: Vec<&str> = fields.iter().map(|(field, _)| *field).collect();
        Self {
            contract: StepContract::new(name, StepCategory::Display)
                .with_outputs(&names)
                .with_conditions(&["submitted"]),
            labels: fields
                .iter()
                .map(|(field, label)| (field.to_string(), label.to_string()))
                .collect(),
        }
    }

    /// `askUsername`
    pub fn ask_username() -> Self {
        Self::new("askUsername", &[(context_keys::USERNAME, "Username")])
    }

    /// `askPassword`
    pub fn ask_password() -> Self {
        Self::new("askPassword", &[(context_keys::PASSWORD, "Password")])
    }

    /// `askUsernamePassword`
    pub fn ask_username_password() -> Self {
        Self::new(
            "askUsernamePassword",
            &[
                (context_keys::USERNAME, "Username"),
                (context_keys::PASSWORD, "Password"),
            ],
        )
    }
}

impl StepExecutorBase for PromptStep {
    fn contract(&self) -> &StepContract {
        &self.contract
    }
}

#[async_trait]
impl StepExecutor for PromptStep {
    async fn prompts(
        &self,
        _state: &mut ExecutionState,
        node: &GraphNode,
    ) -> Result<Prompts, CoreError> {
        Ok(self
            .labels
            .iter()
            .map(|(field, default)| {
                let label = node
                    .config(&format!("{}_label", field))
                    .unwrap_or(default)
                    .to_string();
                (field.clone(), label)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::state;

    #[tokio::test]
    async fn test_default_labels() {
        let step = PromptStep::ask_username_password();
        let node = GraphNode::new("credentials", "askUsernamePassword");

        let prompts = step.prompts(&mut state(), &node).await.unwrap();

        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts["username"], "Username");
        assert_eq!(prompts["password"], "Password");
        assert!(step.contract().declares_output("password"));
    }

    #[tokio::test]
    async fn test_label_override() {
        let step = PromptStep::ask_username();
        let node = GraphNode::new("email", "askUsername").with_config("username_label", "Email address");

        let prompts = step.prompts(&mut state(), &node).await.unwrap();

        assert_eq!(prompts["username"], "Email address");
    }
}
