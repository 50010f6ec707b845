//! Consensus topic operations.

use ledgerkit_core::operation::{TopicCreate, TopicDelete, TopicMessageSubmit, TopicUpdate};
use ledgerkit_core::{AccountId, KeyInput, KeyValue, OperationBody, TopicId};
use serde::Deserialize;

use super::{staged_with_notes, BuildContext, BuildError};
use crate::stage::Staged;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTopicParams {
    pub topic_memo: Option<String>,
    pub admin_key: Option<KeyInput>,
    /// Restricts submissions to the operator key.
    #[serde(default)]
    pub is_submit_key: bool,
    /// Explicit submit key; takes precedence over `is_submit_key`.
    pub submit_key: Option<KeyInput>,
    pub auto_renew_account_id: Option<AccountId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTopicMessageParams {
    pub topic_id: TopicId,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTopicParams {
    pub topic_id: TopicId,
    pub admin_key: Option<KeyInput>,
    pub submit_key: Option<KeyInput>,
    pub topic_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTopicParams {
    pub topic_id: TopicId,
}

/// # Errors
///
/// Fails when an explicitly given admin or submit key cannot be parsed.
pub fn create_topic(ctx: &BuildContext, params: &CreateTopicParams) -> Result<Staged, BuildError> {
    let mut notes = Vec::new();
    let admin_key = params.admin_key.as_ref().map(|k| ctx.key(k)).transpose()?;
    if admin_key.is_none() {
        notes.push(
            "No admin key was given, so the topic is immutable and cannot be updated or deleted."
                .to_string(),
        );
    }
    let submit_key = match &params.submit_key {
        Some(key) => Some(ctx.key(key)?),
        None if params.is_submit_key => Some(KeyValue::OperatorKey),
        None => None,
    };
    let body = OperationBody::TopicCreate(TopicCreate {
        admin_key,
        submit_key,
        topic_memo: params.topic_memo.clone(),
        auto_renew_account_id: params.auto_renew_account_id,
    });
    Ok(staged_with_notes(body, notes))
}

/// # Errors
///
/// Fails on an empty message.
pub fn submit_topic_message(
    _ctx: &BuildContext,
    params: &SubmitTopicMessageParams,
) -> Result<Staged, BuildError> {
    if params.message.is_empty() {
        return Err(BuildError::invalid("message", "must not be empty"));
    }
    Ok(Staged::new(OperationBody::TopicMessageSubmit(TopicMessageSubmit {
        topic_id: params.topic_id,
        message: params.message.as_bytes().to_vec(),
    })))
}

/// # Errors
///
/// Fails when the update changes nothing or a given key cannot be parsed.
pub fn update_topic(ctx: &BuildContext, params: &UpdateTopicParams) -> Result<Staged, BuildError> {
    if params.admin_key.is_none() && params.submit_key.is_none() && params.topic_memo.is_none() {
        return Err(BuildError::invalid("topicId", "nothing to update"));
    }
    Ok(Staged::new(OperationBody::TopicUpdate(TopicUpdate {
        topic_id: params.topic_id,
        admin_key: params.admin_key.as_ref().map(|k| ctx.key(k)).transpose()?,
        submit_key: params.submit_key.as_ref().map(|k| ctx.key(k)).transpose()?,
        topic_memo: params.topic_memo.clone(),
    })))
}

domain_builder!(
    /// Stages consensus topic operations.
    TopicBuilder
);

impl TopicBuilder {
    /// # Errors
    ///
    /// See [`create_topic`].
    pub fn create_topic(&mut self, params: &CreateTopicParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| create_topic(ctx, params))
    }

    /// # Errors
    ///
    /// See [`submit_topic_message`].
    pub fn submit_topic_message(
        &mut self,
        params: &SubmitTopicMessageParams,
    ) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| submit_topic_message(ctx, params))
    }

    /// # Errors
    ///
    /// See [`update_topic`].
    pub fn update_topic(&mut self, params: &UpdateTopicParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| update_topic(ctx, params))
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the other stage methods.
    pub fn delete_topic(&mut self, params: &DeleteTopicParams) -> Result<&mut Self, BuildError> {
        self.restage(|_| {
            Ok(Staged::new(OperationBody::TopicDelete(TopicDelete {
                topic_id: params.topic_id,
            })))
        })
    }
}

/// A classified topic tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicAction {
    CreateTopic(CreateTopicParams),
    SubmitTopicMessage(SubmitTopicMessageParams),
    UpdateTopic(UpdateTopicParams),
    DeleteTopic(DeleteTopicParams),
}

impl TopicAction {
    pub const TOOLS: &'static [&'static str] = &[
        "create_topic",
        "submit_topic_message",
        "update_topic",
        "delete_topic",
    ];

    /// Parses `params` for `tool`; `None` when the tool is not a topic tool.
    #[must_use]
    pub fn parse(tool: &str, params: serde_json::Value) -> Option<Result<Self, serde_json::Error>> {
        use serde_json::from_value;
        let action = match tool {
            "create_topic" => from_value(params).map(Self::CreateTopic),
            "submit_topic_message" => from_value(params).map(Self::SubmitTopicMessage),
            "update_topic" => from_value(params).map(Self::UpdateTopic),
            "delete_topic" => from_value(params).map(Self::DeleteTopic),
            _ => return None,
        };
        Some(action)
    }

    /// Stages this action on `builder`.
    ///
    /// # Errors
    ///
    /// Propagates the stage function's `BuildError`.
    pub fn stage_into(&self, builder: &mut TopicBuilder) -> Result<(), BuildError> {
        let staged = match self {
            Self::CreateTopic(p) => builder.create_topic(p),
            Self::SubmitTopicMessage(p) => builder.submit_topic_message(p),
            Self::UpdateTopic(p) => builder.update_topic(p),
            Self::DeleteTopic(p) => builder.delete_topic(p),
        };
        staged.map(|_| ())
    }
}
