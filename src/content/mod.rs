//! Title and body of the approval issue.

pub mod template;

pub use template::{env_context, render_template, TemplateValue, TemplateVars};

use crate::config::RunnerContext;
use crate::policy::Policy;

/// Renders the issue content for one run.
pub struct ContentBuilder<'a> {
    context: &'a RunnerContext,
    policy: &'a Policy,
}

impl<'a> ContentBuilder<'a> {
    pub fn new(context: &'a RunnerContext, policy: &'a Policy) -> Self {
        Self { context, policy }
    }

    /// The custom title template if one is set, else the default title.
    pub fn title<F>(&self, custom: &str, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        if custom.trim().is_empty() {
            format!(
                "Approval Request: {}/{}/{}",
                self.context.workflow, self.context.job, self.context.action
            )
        } else {
            render_template(custom, &self.variables(), lookup)
        }
    }

    /// The custom body template if one is set, else the default body.
    pub fn body<F>(&self, custom: &str, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        let template = if custom.trim().is_empty() {
            self.default_body()
        } else {
            custom.to_string()
        };
        render_template(&template, &self.variables(), lookup)
    }

    pub fn variables(&self) -> TemplateVars {
        let ctx = self.context;
        let mut vars = TemplateVars::new();
        vars.insert("timeout-seconds".to_string(), self.timeout_seconds().into());
        vars.insert("workflow-name".to_string(), ctx.workflow.clone().into());
        vars.insert("job-id".to_string(), ctx.job.clone().into());
        vars.insert("action-id".to_string(), ctx.action.clone().into());
        vars.insert("actor".to_string(), ctx.actor.clone().into());
        vars.insert(
            "approval-keywords".to_string(),
            self.policy.approval_keywords.clone().into(),
        );
        vars.insert(
            "rejection-keywords".to_string(),
            self.policy.rejection_keywords.clone().into(),
        );
        vars.insert("run-url".to_string(), ctx.run_url().into());
        vars
    }

    fn timeout_seconds(&self) -> String {
        self.policy.timeout.as_secs_f64().to_string()
    }

    fn default_body(&self) -> String {
        let ctx = self.context;
        let approve = self.policy.approval_keywords.join(", ");
        let reject = self.policy.rejection_keywords.join(", ");
        let reject_msg = if reject.is_empty() {
            "simply close the issue!".to_string()
        } else {
            format!("comment with `{}` or simply close the issue!", reject)
        };

        format!(
            "**Manual approval required:** [`{}`/`{}`/`{}`]({})\n\
             ✅ To approve, comment with `{}`\n\
             ❌ To reject, {}\n\
             \n\
             This request will timeout in {} seconds.",
            ctx.workflow,
            ctx.job,
            ctx.action,
            ctx.run_url(),
            approve,
            reject_msg,
            self.timeout_seconds()
        )
    }
}
