//! File service operations. Payloads above the configured chunk size need a
//! create followed by appends and are refused in returned-bytes mode.

use ledgerkit_core::operation::{FileAppend, FileCreate, FileDelete, FileUpdate};
use ledgerkit_core::{FileId, KeyInput, KeyValue, OperationBody};
use serde::Deserialize;

use super::{staged_with_notes, BuildContext, BuildError};
use crate::stage::Staged;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileParams {
    #[serde(default)]
    pub contents: String,
    /// Keys that must all sign changes to the file.
    pub keys: Option<Vec<KeyInput>>,
    pub file_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendFileParams {
    pub file_id: FileId,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFileParams {
    pub file_id: FileId,
    /// Replaces the whole contents when given.
    pub contents: Option<String>,
    pub keys: Option<Vec<KeyInput>>,
    pub file_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileParams {
    pub file_id: FileId,
}

fn keys(ctx: &BuildContext, inputs: &[KeyInput]) -> Result<Vec<KeyValue>, BuildError> {
    inputs.iter().map(|k| ctx.key(k)).collect()
}

/// # Errors
///
/// Fails when a given key cannot be parsed.
pub fn create_file(ctx: &BuildContext, params: &CreateFileParams) -> Result<Staged, BuildError> {
    let mut notes = Vec::new();
    let keys = match &params.keys {
        Some(inputs) if !inputs.is_empty() => keys(ctx, inputs)?,
        _ => {
            notes.push("No file key was given, so the operator key controls the file.".to_string());
            vec![KeyValue::OperatorKey]
        }
    };
    let body = OperationBody::FileCreate(FileCreate {
        keys,
        contents: params.contents.as_bytes().to_vec(),
        file_memo: params.file_memo.clone(),
    });
    Ok(staged_with_notes(body, notes))
}

/// # Errors
///
/// Fails on empty contents.
pub fn append_file(_ctx: &BuildContext, params: &AppendFileParams) -> Result<Staged, BuildError> {
    if params.contents.is_empty() {
        return Err(BuildError::invalid("contents", "must not be empty"));
    }
    Ok(Staged::new(OperationBody::FileAppend(FileAppend {
        file_id: params.file_id,
        contents: params.contents.as_bytes().to_vec(),
    })))
}

/// # Errors
///
/// Fails when the update changes nothing, the key list is empty, or a key
/// cannot be parsed.
pub fn update_file(ctx: &BuildContext, params: &UpdateFileParams) -> Result<Staged, BuildError> {
    if params.contents.is_none() && params.keys.is_none() && params.file_memo.is_none() {
        return Err(BuildError::invalid("fileId", "nothing to update"));
    }
    let keys = match &params.keys {
        Some(inputs) if inputs.is_empty() => {
            return Err(BuildError::invalid("keys", "a file needs at least one key"));
        }
        Some(inputs) => Some(keys(ctx, inputs)?),
        None => None,
    };
    Ok(Staged::new(OperationBody::FileUpdate(FileUpdate {
        file_id: params.file_id,
        keys,
        contents: params.contents.as_ref().map(|c| c.as_bytes().to_vec()),
        file_memo: params.file_memo.clone(),
    })))
}

domain_builder!(
    /// Stages file service operations.
    FileBuilder
);

impl FileBuilder {
    /// # Errors
    ///
    /// See [`create_file`].
    pub fn create_file(&mut self, params: &CreateFileParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| create_file(ctx, params))
    }

    /// # Errors
    ///
    /// See [`append_file`].
    pub fn append_file(&mut self, params: &AppendFileParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| append_file(ctx, params))
    }

    /// # Errors
    ///
    /// See [`update_file`].
    pub fn update_file(&mut self, params: &UpdateFileParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| update_file(ctx, params))
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the other stage methods.
    pub fn delete_file(&mut self, params: &DeleteFileParams) -> Result<&mut Self, BuildError> {
        self.restage(|_| {
            Ok(Staged::new(OperationBody::FileDelete(FileDelete {
                file_id: params.file_id,
            })))
        })
    }
}

/// A classified file tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    CreateFile(CreateFileParams),
    AppendFile(AppendFileParams),
    UpdateFile(UpdateFileParams),
    DeleteFile(DeleteFileParams),
}

impl FileAction {
    pub const TOOLS: &'static [&'static str] =
        &["create_file", "append_file", "update_file", "delete_file"];

    /// Parses `params` for `tool`; `None` when the tool is not a file tool.
    #[must_use]
    pub fn parse(tool: &str, params: serde_json::Value) -> Option<Result<Self, serde_json::Error>> {
        use serde_json::from_value;
        let action = match tool {
            "create_file" => from_value(params).map(Self::CreateFile),
            "append_file" => from_value(params).map(Self::AppendFile),
            "update_file" => from_value(params).map(Self::UpdateFile),
            "delete_file" => from_value(params).map(Self::DeleteFile),
            _ => return None,
        };
        Some(action)
    }

    /// Stages this action on `builder`.
    ///
    /// # Errors
    ///
    /// Propagates the stage function's `BuildError`.
    pub fn stage_into(&self, builder: &mut FileBuilder) -> Result<(), BuildError> {
        let staged = match self {
            Self::CreateFile(p) => builder.create_file(p),
            Self::AppendFile(p) => builder.append_file(p),
            Self::UpdateFile(p) => builder.update_file(p),
            Self::DeleteFile(p) => builder.delete_file(p),
        };
        staged.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use ledgerkit_core::EntityId;

    use super::*;
    use crate::builders::testing::{context, context_with};
    use crate::builders::StageBuilder;
    use crate::config::{AgentConfig, OperatingMode};
    use crate::meta::MetaOptions;
    use crate::resolver::ExecutionError;

    #[test]
    fn file_without_keys_defaults_to_operator() {
        let (_, ctx) = context();
        let mut builder = FileBuilder::new(ctx);
        builder
            .create_file(&CreateFileParams {
                contents: "hello".into(),
                ..CreateFileParams::default()
            })
            .unwrap();
        let OperationBody::FileCreate(create) = &builder.current_operation().unwrap().body else {
            panic!("expected file create");
        };
        assert_eq!(create.keys, vec![KeyValue::OperatorKey]);
        assert_eq!(builder.notes().len(), 1);
    }

    #[test]
    fn update_requires_a_change_and_a_key() {
        let (_, ctx) = context();
        let mut builder = FileBuilder::new(ctx);
        let nothing = UpdateFileParams {
            file_id: EntityId::num(3),
            contents: None,
            keys: None,
            file_memo: None,
        };
        assert!(builder.update_file(&nothing).is_err());
        let no_keys = UpdateFileParams {
            keys: Some(Vec::new()),
            ..nothing
        };
        assert!(matches!(
            builder.update_file(&no_keys),
            Err(BuildError::Invalid { field: "keys", .. })
        ));
    }

    #[test]
    fn large_file_is_refused_as_bytes() {
        let (_, ctx) = context_with(AgentConfig {
            mode: OperatingMode::ReturnBytes,
            file_chunk_size: 16,
            ..AgentConfig::default()
        });
        let mut builder = FileBuilder::new(ctx);
        builder
            .create_file(&CreateFileParams {
                contents: "x".repeat(17),
                ..CreateFileParams::default()
            })
            .unwrap();
        let err = builder.get_bytes(&MetaOptions::default()).unwrap_err();
        assert!(matches!(err, ExecutionError::MultiStepUnsupportedInBytesMode { .. }));
        assert!(err.requires_autonomous());
    }

    #[tokio::test]
    async fn large_file_executes_autonomously() {
        let (_, ctx) = context_with(AgentConfig {
            file_chunk_size: 16,
            ..AgentConfig::default()
        });
        let mut builder = FileBuilder::new(ctx);
        builder
            .create_file(&CreateFileParams {
                contents: "x".repeat(64),
                ..CreateFileParams::default()
            })
            .unwrap();
        let record = builder.execute(&MetaOptions::default()).await.into_record();
        assert!(record.success);
        assert!(record.receipt.unwrap().file_id.is_some());
    }

    #[tokio::test]
    async fn large_file_in_bytes_mode_reports_requires_autonomous() {
        let (_, ctx) = context_with(AgentConfig {
            mode: OperatingMode::ReturnBytes,
            file_chunk_size: 16,
            ..AgentConfig::default()
        });
        let mut builder = FileBuilder::new(ctx);
        builder
            .append_file(&AppendFileParams {
                file_id: EntityId::num(3),
                contents: "y".repeat(32),
            })
            .unwrap();
        let record = builder.execute(&MetaOptions::default()).await.into_record();
        assert!(!record.success);
        assert_eq!(record.requires_autonomous, Some(true));
    }
}
