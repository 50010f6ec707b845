//! Smart-contract operations.

use ledgerkit_core::operation::{
    Bytecode, ContractCreate, ContractDelete, ContractExecute, ContractUpdate,
};
use ledgerkit_core::{
    to_base_units, AccountId, AmountInput, ContractId, FileId, KeyInput, OperationBody,
    HBAR_DECIMALS,
};
use serde::Deserialize;

use super::{staged_with_notes, BuildContext, BuildError};
use crate::stage::Staged;

/// Gas limit for contract creation when none is given.
pub const DEFAULT_CREATE_GAS: u64 = 100_000;
/// Gas limit for contract calls when none is given.
pub const DEFAULT_EXECUTE_GAS: u64 = 75_000;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractParams {
    /// File holding the compiled bytecode.
    pub bytecode_file_id: Option<FileId>,
    /// Hex-encoded bytecode, used when no file is given.
    pub bytecode: Option<String>,
    pub gas: Option<u64>,
    pub admin_key: Option<KeyInput>,
    /// HBAR moved into the contract on creation.
    pub initial_balance: Option<AmountInput>,
    /// Hex-encoded ABI constructor arguments.
    pub constructor_parameters: Option<String>,
    pub contract_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteContractParams {
    pub contract_id: ContractId,
    pub gas: Option<u64>,
    /// HBAR sent with the call.
    pub payable_amount: Option<AmountInput>,
    /// Hex-encoded ABI call data.
    pub function_parameters: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContractParams {
    pub contract_id: ContractId,
    pub admin_key: Option<KeyInput>,
    pub contract_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteContractParams {
    pub contract_id: ContractId,
    pub transfer_account_id: Option<AccountId>,
}

fn decode_hex(field: &'static str, text: &str) -> Result<Vec<u8>, BuildError> {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| BuildError::invalid(field, e.to_string()))
}

fn hbar(field: &'static str, amount: Option<&AmountInput>) -> Result<i64, BuildError> {
    let tinybars = amount
        .map(|a| to_base_units(a, HBAR_DECIMALS))
        .transpose()?
        .unwrap_or(0);
    if tinybars < 0 {
        return Err(BuildError::invalid(field, "must not be negative"));
    }
    Ok(tinybars)
}

fn gas(given: Option<u64>, default: u64, notes: &mut Vec<String>) -> Result<u64, BuildError> {
    match given {
        Some(0) => Err(BuildError::invalid("gas", "must be positive")),
        Some(gas) => Ok(gas),
        None => {
            notes.push(format!("No gas limit was given, so {default} gas is reserved."));
            Ok(default)
        }
    }
}

/// # Errors
///
/// Fails unless exactly one bytecode source is given, on malformed hex or
/// amounts, and when a given admin key cannot be parsed.
pub fn create_contract(
    ctx: &BuildContext,
    params: &CreateContractParams,
) -> Result<Staged, BuildError> {
    let mut notes = Vec::new();
    let bytecode = match (&params.bytecode_file_id, &params.bytecode) {
        (Some(file), None) => Bytecode::File(*file),
        (None, Some(code)) => {
            let code = decode_hex("bytecode", code)?;
            if code.is_empty() {
                return Err(BuildError::invalid("bytecode", "must not be empty"));
            }
            Bytecode::Inline(code)
        }
        (Some(_), Some(_)) => {
            return Err(BuildError::invalid("bytecode", "give either a bytecode file or inline bytecode, not both"));
        }
        (None, None) => {
            return Err(BuildError::invalid("bytecodeFileId", "a bytecode file or inline bytecode is required"));
        }
    };
    let body = OperationBody::ContractCreate(ContractCreate {
        bytecode,
        gas: gas(params.gas, DEFAULT_CREATE_GAS, &mut notes)?,
        admin_key: params.admin_key.as_ref().map(|k| ctx.key(k)).transpose()?,
        initial_balance: hbar("initialBalance", params.initial_balance.as_ref())?,
        constructor_parameters: params
            .constructor_parameters
            .as_deref()
            .map(|p| decode_hex("constructorParameters", p))
            .transpose()?
            .unwrap_or_default(),
        contract_memo: params.contract_memo.clone(),
    });
    Ok(staged_with_notes(body, notes))
}

/// # Errors
///
/// Fails on zero gas and malformed hex or amounts.
pub fn execute_contract(
    _ctx: &BuildContext,
    params: &ExecuteContractParams,
) -> Result<Staged, BuildError> {
    let mut notes = Vec::new();
    let body = OperationBody::ContractExecute(ContractExecute {
        contract_id: params.contract_id,
        gas: gas(params.gas, DEFAULT_EXECUTE_GAS, &mut notes)?,
        payable_amount: hbar("payableAmount", params.payable_amount.as_ref())?,
        function_parameters: params
            .function_parameters
            .as_deref()
            .map(|p| decode_hex("functionParameters", p))
            .transpose()?
            .unwrap_or_default(),
    });
    Ok(staged_with_notes(body, notes))
}

/// # Errors
///
/// Fails when the update changes nothing or the admin key cannot be parsed.
pub fn update_contract(
    ctx: &BuildContext,
    params: &UpdateContractParams,
) -> Result<Staged, BuildError> {
    if params.admin_key.is_none() && params.contract_memo.is_none() {
        return Err(BuildError::invalid("contractId", "nothing to update"));
    }
    Ok(Staged::new(OperationBody::ContractUpdate(ContractUpdate {
        contract_id: params.contract_id,
        admin_key: params.admin_key.as_ref().map(|k| ctx.key(k)).transpose()?,
        contract_memo: params.contract_memo.clone(),
    })))
}

/// # Errors
///
/// Fails when no transfer account is given and no operator is configured.
pub fn delete_contract(
    ctx: &BuildContext,
    params: &DeleteContractParams,
) -> Result<Staged, BuildError> {
    let mut notes = Vec::new();
    let transfer_account_id =
        ctx.account_or_operator("transferAccountId", params.transfer_account_id, &mut notes, |a| {
            format!("No transfer account was given, so the contract's remaining HBAR goes to the operator account {a}.")
        })?;
    let body = OperationBody::ContractDelete(ContractDelete {
        contract_id: params.contract_id,
        transfer_account_id,
    });
    Ok(staged_with_notes(body, notes))
}

domain_builder!(
    /// Stages smart-contract operations.
    ContractBuilder
);

impl ContractBuilder {
    /// # Errors
    ///
    /// See [`create_contract`].
    pub fn create_contract(&mut self, params: &CreateContractParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| create_contract(ctx, params))
    }

    /// # Errors
    ///
    /// See [`execute_contract`].
    pub fn execute_contract(&mut self, params: &ExecuteContractParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| execute_contract(ctx, params))
    }

    /// # Errors
    ///
    /// See [`update_contract`].
    pub fn update_contract(&mut self, params: &UpdateContractParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| update_contract(ctx, params))
    }

    /// # Errors
    ///
    /// See [`delete_contract`].
    pub fn delete_contract(&mut self, params: &DeleteContractParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| delete_contract(ctx, params))
    }
}

/// A classified contract tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractAction {
    CreateContract(CreateContractParams),
    ExecuteContract(ExecuteContractParams),
    UpdateContract(UpdateContractParams),
    DeleteContract(DeleteContractParams),
}

impl ContractAction {
    pub const TOOLS: &'static [&'static str] = &[
        "create_contract",
        "execute_contract",
        "update_contract",
        "delete_contract",
    ];

    /// Parses `params` for `tool`; `None` when the tool is not a contract tool.
    #[must_use]
    pub fn parse(tool: &str, params: serde_json::Value) -> Option<Result<Self, serde_json::Error>> {
        use serde_json::from_value;
        let action = match tool {
            "create_contract" => from_value(params).map(Self::CreateContract),
            "execute_contract" => from_value(params).map(Self::ExecuteContract),
            "update_contract" => from_value(params).map(Self::UpdateContract),
            "delete_contract" => from_value(params).map(Self::DeleteContract),
            _ => return None,
        };
        Some(action)
    }

    /// Stages this action on `builder`.
    ///
    /// # Errors
    ///
    /// Propagates the stage function's `BuildError`.
    pub fn stage_into(&self, builder: &mut ContractBuilder) -> Result<(), BuildError> {
        let staged = match self {
            Self::CreateContract(p) => builder.create_contract(p),
            Self::ExecuteContract(p) => builder.execute_contract(p),
            Self::UpdateContract(p) => builder.update_contract(p),
            Self::DeleteContract(p) => builder.delete_contract(p),
        };
        staged.map(|_| ())
    }
}
