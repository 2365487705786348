use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::orchestration::approval::{
    ApprovalDecision, ApprovalPresenter, ApprovalPrompt, ApprovalRequest,
};

use super::lock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    Decide(ApprovalDecision),
    /// Leave the prompt unanswered
    Ignore,
}

/// Answers prompts from a script, one reply per prompt in order.
/// Prompts beyond the script are ignored.
#[derive(Debug, Default)]
pub struct ScriptedPresenter {
    script: Mutex<VecDeque<ScriptedReply>>,
    presented: Mutex<Vec<ApprovalRequest>>,
    reprompts: Mutex<Vec<String>>,
}

impl ScriptedPresenter {
    pub fn new(script: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn approving(auth_code: Option<&str>) -> ScriptedReply {
        ScriptedReply::Decide(ApprovalDecision::Approved {
            auth_code: auth_code.map(String::from),
        })
    }

    pub fn push(&self, reply: ScriptedReply) {
        lock(&self.script).push_back(reply);
    }

    pub fn presented(&self) -> Vec<ApprovalRequest> {
        lock(&self.presented).clone()
    }

    pub fn reprompt_reasons(&self) -> Vec<String> {
        lock(&self.reprompts).clone()
    }
}

#[async_trait]
impl ApprovalPresenter for ScriptedPresenter {
    async fn present(&self, prompt: ApprovalPrompt) {
        lock(&self.presented).push(prompt.request.clone());
        if let Some(reason) = &prompt.reprompt_reason {
            lock(&self.reprompts).push(reason.clone());
        }

        let reply = lock(&self.script).pop_front();
        if let Some(ScriptedReply::Decide(decision)) = reply {
            // The gate may already have given up; nothing to do then
            let _ = prompt.responder.respond(decision);
        }
    }
}
