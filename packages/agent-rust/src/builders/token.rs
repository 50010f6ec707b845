//! Token operations: creation of fungible tokens and NFT collections, supply
//! management, association, airdrops, and the administrative toggles.

use ledgerkit_core::operation::{
    TokenAccountTarget, TokenAssociation, TokenBurn, TokenCreate, TokenKeys, TokenMint,
    TokenTarget, TokenTransfer, TokenType, TokenUpdate, TokenWipe, Transfer, SupplyType,
};
use ledgerkit_core::{
    normalize, to_base_units, AccountId, AmountInput, KeyInput, KeyValue, OperationBody, TokenId,
};
use serde::Deserialize;

use super::{staged_with_notes, BuildContext, BuildError};
use crate::stage::Staged;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Optional key inputs shared by token create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenKeyParams {
    pub admin_key: Option<KeyInput>,
    pub kyc_key: Option<KeyInput>,
    pub freeze_key: Option<KeyInput>,
    pub wipe_key: Option<KeyInput>,
    pub supply_key: Option<KeyInput>,
    pub fee_schedule_key: Option<KeyInput>,
    pub pause_key: Option<KeyInput>,
}

impl TokenKeyParams {
    fn resolve(&self, ctx: &BuildContext) -> TokenKeys {
        TokenKeys {
            admin_key: ctx.optional_key("adminKey", self.admin_key.as_ref()),
            kyc_key: ctx.optional_key("kycKey", self.kyc_key.as_ref()),
            freeze_key: ctx.optional_key("freezeKey", self.freeze_key.as_ref()),
            wipe_key: ctx.optional_key("wipeKey", self.wipe_key.as_ref()),
            supply_key: ctx.optional_key("supplyKey", self.supply_key.as_ref()),
            fee_schedule_key: ctx.optional_key("feeScheduleKey", self.fee_schedule_key.as_ref()),
            pause_key: ctx.optional_key("pauseKey", self.pause_key.as_ref()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFungibleTokenParams {
    pub token_name: String,
    pub token_symbol: String,
    #[serde(default)]
    pub decimals: u32,
    /// Initial supply in display units (scaled by `decimals`).
    pub initial_supply: Option<AmountInput>,
    #[serde(default)]
    pub supply_type: SupplyType,
    /// Maximum supply in display units; required for finite supply.
    pub max_supply: Option<AmountInput>,
    pub treasury_account_id: Option<AccountId>,
    #[serde(flatten)]
    pub keys: TokenKeyParams,
    #[serde(default)]
    pub freeze_default: bool,
    pub token_memo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNonFungibleTokenParams {
    pub token_name: String,
    pub token_symbol: String,
    /// Caps the collection size; absent means unbounded.
    pub max_supply: Option<i64>,
    pub treasury_account_id: Option<AccountId>,
    #[serde(flatten)]
    pub keys: TokenKeyParams,
    pub token_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintFungibleTokenParams {
    pub token_id: TokenId,
    /// Amount in base units.
    pub amount: AmountInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintNftParams {
    pub token_id: TokenId,
    /// One metadata URI per minted serial.
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnTokenParams {
    pub token_id: TokenId,
    /// Base units to burn from a fungible token.
    pub amount: Option<AmountInput>,
    /// NFT serials to burn.
    #[serde(default)]
    pub serials: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAssociationParams {
    pub account_id: Option<AccountId>,
    pub token_ids: Vec<TokenId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirdropRecipient {
    pub account_id: AccountId,
    /// Base units delivered to `account_id`.
    pub amount: AmountInput,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirdropTokenParams {
    pub token_id: TokenId,
    pub source_account_id: Option<AccountId>,
    pub recipients: Vec<AirdropRecipient>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTokenParams {
    pub token_id: TokenId,
    pub token_name: Option<String>,
    pub token_symbol: Option<String>,
    pub treasury_account_id: Option<AccountId>,
    #[serde(flatten)]
    pub keys: TokenKeyParams,
    pub token_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenParams {
    pub token_id: TokenId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccountParams {
    pub token_id: TokenId,
    pub account_id: AccountId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WipeTokenParams {
    pub token_id: TokenId,
    pub account_id: AccountId,
    pub amount: Option<AmountInput>,
    #[serde(default)]
    pub serials: Vec<i64>,
}

// ---------------------------------------------------------------------------
// Stage functions
// ---------------------------------------------------------------------------

fn treasury(
    ctx: &BuildContext,
    given: Option<AccountId>,
    notes: &mut Vec<String>,
) -> Result<AccountId, BuildError> {
    ctx.account_or_default("treasuryAccountId", given, notes, |a| {
        format!("No treasury account was given, so {a} holds the token treasury.")
    })
}

/// Amount or serials, never both and never neither.
fn amount_or_serials(
    amount: Option<&AmountInput>,
    serials: &[i64],
) -> Result<(i64, Vec<i64>), BuildError> {
    match (amount, serials.is_empty()) {
        (Some(_), false) => Err(BuildError::invalid("serials", "give either an amount or serials, not both")),
        (None, true) => Err(BuildError::invalid("amount", "an amount or a list of serials is required")),
        (Some(amount), true) => {
            let amount = normalize(Some(amount))?;
            if amount <= 0 {
                return Err(BuildError::invalid("amount", "must be positive"));
            }
            Ok((amount, Vec::new()))
        }
        (None, false) => Ok((0, serials.to_vec())),
    }
}

/// # Errors
///
/// Fails on malformed amounts, a finite supply without a maximum, an initial
/// supply above the maximum, or a missing treasury.
pub fn create_fungible_token(
    ctx: &BuildContext,
    params: &CreateFungibleTokenParams,
) -> Result<Staged, BuildError> {
    let mut notes = Vec::new();
    let initial_supply = params
        .initial_supply
        .as_ref()
        .map(|a| to_base_units(a, params.decimals))
        .transpose()?
        .unwrap_or(0);
    if initial_supply < 0 {
        return Err(BuildError::invalid("initialSupply", "must not be negative"));
    }
    let max_supply = params
        .max_supply
        .as_ref()
        .map(|a| to_base_units(a, params.decimals))
        .transpose()?;
    match (params.supply_type, max_supply) {
        (SupplyType::Finite, None) => {
            return Err(BuildError::invalid("maxSupply", "required when supply is finite"));
        }
        (SupplyType::Finite, Some(max)) if max < initial_supply => {
            return Err(BuildError::invalid("maxSupply", "must be at least the initial supply"));
        }
        _ => {}
    }
    let treasury_account_id = treasury(ctx, params.treasury_account_id, &mut notes)?;
    let body = OperationBody::TokenCreate(TokenCreate {
        name: params.token_name.clone(),
        symbol: params.token_symbol.clone(),
        token_type: TokenType::FungibleCommon,
        decimals: params.decimals,
        initial_supply,
        supply_type: params.supply_type,
        max_supply: max_supply.filter(|_| params.supply_type == SupplyType::Finite),
        treasury_account_id,
        keys: params.keys.resolve(ctx),
        freeze_default: params.freeze_default,
        token_memo: params.token_memo.clone(),
    });
    Ok(staged_with_notes(body, notes))
}

/// # Errors
///
/// Fails on a non-positive maximum supply or a missing treasury.
pub fn create_non_fungible_token(
    ctx: &BuildContext,
    params: &CreateNonFungibleTokenParams,
) -> Result<Staged, BuildError> {
    let mut notes = Vec::new();
    if params.max_supply.is_some_and(|m| m <= 0) {
        return Err(BuildError::invalid("maxSupply", "must be positive"));
    }
    let treasury_account_id = treasury(ctx, params.treasury_account_id, &mut notes)?;
    let mut keys = params.keys.resolve(ctx);
    if keys.supply_key.is_none() {
        notes.push(
            "No supply key was given, so the operator key controls minting for this collection."
                .to_string(),
        );
        keys.supply_key = Some(KeyValue::OperatorKey);
    }
    let body = OperationBody::TokenCreate(TokenCreate {
        name: params.token_name.clone(),
        symbol: params.token_symbol.clone(),
        token_type: TokenType::NonFungibleUnique,
        decimals: 0,
        initial_supply: 0,
        supply_type: if params.max_supply.is_some() {
            SupplyType::Finite
        } else {
            SupplyType::Infinite
        },
        max_supply: params.max_supply,
        treasury_account_id,
        keys,
        freeze_default: false,
        token_memo: params.token_memo.clone(),
    });
    Ok(staged_with_notes(body, notes))
}

/// # Errors
///
/// Fails on a malformed or non-positive amount.
pub fn mint_fungible_token(
    _ctx: &BuildContext,
    params: &MintFungibleTokenParams,
) -> Result<Staged, BuildError> {
    let amount = normalize(Some(&params.amount))?;
    if amount <= 0 {
        return Err(BuildError::invalid("amount", "must be positive"));
    }
    Ok(Staged::new(OperationBody::TokenMint(TokenMint {
        token_id: params.token_id,
        amount,
        metadata: Vec::new(),
    })))
}

/// # Errors
///
/// Fails when no metadata URI is given.
pub fn mint_nft(_ctx: &BuildContext, params: &MintNftParams) -> Result<Staged, BuildError> {
    if params.uris.is_empty() {
        return Err(BuildError::invalid("uris", "at least one metadata URI is required"));
    }
    Ok(Staged::new(OperationBody::TokenMint(TokenMint {
        token_id: params.token_id,
        amount: 0,
        metadata: params.uris.iter().map(|u| u.as_bytes().to_vec()).collect(),
    })))
}

/// # Errors
///
/// Fails unless exactly one of amount and serials is given.
pub fn burn_token(_ctx: &BuildContext, params: &BurnTokenParams) -> Result<Staged, BuildError> {
    let (amount, serials) = amount_or_serials(params.amount.as_ref(), &params.serials)?;
    Ok(Staged::new(OperationBody::TokenBurn(TokenBurn {
        token_id: params.token_id,
        amount,
        serials,
    })))
}

fn association(
    ctx: &BuildContext,
    params: &TokenAssociationParams,
    verb: &str,
) -> Result<(TokenAssociation, Vec<String>), BuildError> {
    if params.token_ids.is_empty() {
        return Err(BuildError::invalid("tokenIds", "at least one token is required"));
    }
    let mut notes = Vec::new();
    let account_id = ctx.account_or_default("accountId", params.account_id, &mut notes, |a| {
        format!("No account was given, so the tokens are {verb} account {a}.")
    })?;
    Ok((
        TokenAssociation {
            account_id,
            token_ids: params.token_ids.clone(),
        },
        notes,
    ))
}

/// # Errors
///
/// Fails on an empty token list or a missing account.
pub fn associate_token(ctx: &BuildContext, params: &TokenAssociationParams) -> Result<Staged, BuildError> {
    let (body, notes) = association(ctx, params, "associated with")?;
    Ok(staged_with_notes(OperationBody::TokenAssociate(body), notes))
}

/// # Errors
///
/// Fails on an empty token list or a missing account.
pub fn dissociate_token(ctx: &BuildContext, params: &TokenAssociationParams) -> Result<Staged, BuildError> {
    let (body, notes) = association(ctx, params, "dissociated from")?;
    Ok(staged_with_notes(OperationBody::TokenDissociate(body), notes))
}

/// # Errors
///
/// Fails on an empty recipient list, non-positive amounts, or a missing
/// source account.
pub fn airdrop_token(ctx: &BuildContext, params: &AirdropTokenParams) -> Result<Staged, BuildError> {
    if params.recipients.is_empty() {
        return Err(BuildError::invalid("recipients", "at least one recipient is required"));
    }
    let mut notes = Vec::new();
    let source = ctx.account_or_default("sourceAccountId", params.source_account_id, &mut notes, |a| {
        format!("No source account was given, so the airdrop is sent from {a}.")
    })?;
    let mut token_transfers = Vec::with_capacity(params.recipients.len() + 1);
    let mut total: i64 = 0;
    for recipient in &params.recipients {
        let amount = normalize(Some(&recipient.amount))?;
        if amount <= 0 {
            return Err(BuildError::invalid("recipients.amount", "must be positive"));
        }
        total = total
            .checked_add(amount)
            .ok_or_else(|| BuildError::invalid("recipients.amount", "total overflows"))?;
        token_transfers.push(TokenTransfer {
            token_id: params.token_id,
            account_id: recipient.account_id,
            amount,
        });
    }
    token_transfers.push(TokenTransfer {
        token_id: params.token_id,
        account_id: source,
        amount: -total,
    });
    let body = OperationBody::TokenAirdrop(Transfer {
        token_transfers,
        ..Transfer::default()
    });
    Ok(staged_with_notes(body, notes))
}

/// # Errors
///
/// Never fails today; keys that do not resolve are dropped with a warning.
pub fn update_token(ctx: &BuildContext, params: &UpdateTokenParams) -> Result<Staged, BuildError> {
    Ok(Staged::new(OperationBody::TokenUpdate(TokenUpdate {
        token_id: params.token_id,
        name: params.token_name.clone(),
        symbol: params.token_symbol.clone(),
        treasury_account_id: params.treasury_account_id,
        keys: params.keys.resolve(ctx),
        token_memo: params.token_memo.clone(),
    })))
}

/// # Errors
///
/// Fails unless exactly one of amount and serials is given.
pub fn wipe_token(_ctx: &BuildContext, params: &WipeTokenParams) -> Result<Staged, BuildError> {
    let (amount, serials) = amount_or_serials(params.amount.as_ref(), &params.serials)?;
    Ok(Staged::new(OperationBody::TokenWipe(TokenWipe {
        token_id: params.token_id,
        account_id: params.account_id,
        amount,
        serials,
    })))
}

fn token_target(params: &TokenParams) -> TokenTarget {
    TokenTarget {
        token_id: params.token_id,
    }
}

fn token_account_target(params: &TokenAccountParams) -> TokenAccountTarget {
    TokenAccountTarget {
        token_id: params.token_id,
        account_id: params.account_id,
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

domain_builder!(
    /// Stages token operations.
    TokenBuilder
);

impl TokenBuilder {
    /// # Errors
    ///
    /// See [`create_fungible_token`].
    pub fn create_fungible_token(
        &mut self,
        params: &CreateFungibleTokenParams,
    ) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| create_fungible_token(ctx, params))
    }

    /// # Errors
    ///
    /// See [`create_non_fungible_token`].
    pub fn create_non_fungible_token(
        &mut self,
        params: &CreateNonFungibleTokenParams,
    ) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| create_non_fungible_token(ctx, params))
    }

    /// # Errors
    ///
    /// See [`mint_fungible_token`].
    pub fn mint_fungible_token(&mut self, params: &MintFungibleTokenParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| mint_fungible_token(ctx, params))
    }

    /// # Errors
    ///
    /// See [`mint_nft`].
    pub fn mint_nft(&mut self, params: &MintNftParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| mint_nft(ctx, params))
    }

    /// # Errors
    ///
    /// See [`burn_token`].
    pub fn burn_token(&mut self, params: &BurnTokenParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| burn_token(ctx, params))
    }

    /// # Errors
    ///
    /// See [`associate_token`].
    pub fn associate_token(&mut self, params: &TokenAssociationParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| associate_token(ctx, params))
    }

    /// # Errors
    ///
    /// See [`dissociate_token`].
    pub fn dissociate_token(&mut self, params: &TokenAssociationParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| dissociate_token(ctx, params))
    }

    /// # Errors
    ///
    /// See [`airdrop_token`].
    pub fn airdrop_token(&mut self, params: &AirdropTokenParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| airdrop_token(ctx, params))
    }

    /// # Errors
    ///
    /// See [`update_token`].
    pub fn update_token(&mut self, params: &UpdateTokenParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| update_token(ctx, params))
    }

    /// # Errors
    ///
    /// See [`wipe_token`].
    pub fn wipe_token(&mut self, params: &WipeTokenParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| wipe_token(ctx, params))
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the other stage methods.
    pub fn pause_token(&mut self, params: &TokenParams) -> Result<&mut Self, BuildError> {
        self.restage(|_| Ok(Staged::new(OperationBody::TokenPause(token_target(params)))))
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the other stage methods.
    pub fn unpause_token(&mut self, params: &TokenParams) -> Result<&mut Self, BuildError> {
        self.restage(|_| Ok(Staged::new(OperationBody::TokenUnpause(token_target(params)))))
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the other stage methods.
    pub fn delete_token(&mut self, params: &TokenParams) -> Result<&mut Self, BuildError> {
        self.restage(|_| Ok(Staged::new(OperationBody::TokenDelete(token_target(params)))))
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the other stage methods.
    pub fn freeze_token(&mut self, params: &TokenAccountParams) -> Result<&mut Self, BuildError> {
        self.restage(|_| Ok(Staged::new(OperationBody::TokenFreeze(token_account_target(params)))))
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the other stage methods.
    pub fn unfreeze_token(&mut self, params: &TokenAccountParams) -> Result<&mut Self, BuildError> {
        self.restage(|_| Ok(Staged::new(OperationBody::TokenUnfreeze(token_account_target(params)))))
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the other stage methods.
    pub fn grant_kyc(&mut self, params: &TokenAccountParams) -> Result<&mut Self, BuildError> {
        self.restage(|_| Ok(Staged::new(OperationBody::TokenGrantKyc(token_account_target(params)))))
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the other stage methods.
    pub fn revoke_kyc(&mut self, params: &TokenAccountParams) -> Result<&mut Self, BuildError> {
        self.restage(|_| Ok(Staged::new(OperationBody::TokenRevokeKyc(token_account_target(params)))))
    }
}

// ---------------------------------------------------------------------------
// Tool actions
// ---------------------------------------------------------------------------

/// A classified token tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenAction {
    CreateFungibleToken(CreateFungibleTokenParams),
    CreateNonFungibleToken(CreateNonFungibleTokenParams),
    MintFungibleToken(MintFungibleTokenParams),
    MintNft(MintNftParams),
    BurnToken(BurnTokenParams),
    AssociateToken(TokenAssociationParams),
    DissociateToken(TokenAssociationParams),
    AirdropToken(AirdropTokenParams),
    UpdateToken(UpdateTokenParams),
    PauseToken(TokenParams),
    UnpauseToken(TokenParams),
    FreezeToken(TokenAccountParams),
    UnfreezeToken(TokenAccountParams),
    GrantKyc(TokenAccountParams),
    RevokeKyc(TokenAccountParams),
    WipeToken(WipeTokenParams),
    DeleteToken(TokenParams),
}

impl TokenAction {
    pub const TOOLS: &'static [&'static str] = &[
        "create_fungible_token",
        "create_non_fungible_token",
        "mint_fungible_token",
        "mint_nft",
        "burn_token",
        "associate_token",
        "dissociate_token",
        "airdrop_token",
        "update_token",
        "pause_token",
        "unpause_token",
        "freeze_token",
        "unfreeze_token",
        "grant_kyc",
        "revoke_kyc",
        "wipe_token",
        "delete_token",
    ];

    /// Parses `params` for `tool`; `None` when the tool is not a token tool.
    #[must_use]
    pub fn parse(tool: &str, params: serde_json::Value) -> Option<Result<Self, serde_json::Error>> {
        use serde_json::from_value;
        let action = match tool {
            "create_fungible_token" => from_value(params).map(Self::CreateFungibleToken),
            "create_non_fungible_token" => from_value(params).map(Self::CreateNonFungibleToken),
            "mint_fungible_token" => from_value(params).map(Self::MintFungibleToken),
            "mint_nft" => from_value(params).map(Self::MintNft),
            "burn_token" => from_value(params).map(Self::BurnToken),
            "associate_token" => from_value(params).map(Self::AssociateToken),
            "dissociate_token" => from_value(params).map(Self::DissociateToken),
            "airdrop_token" => from_value(params).map(Self::AirdropToken),
            "update_token" => from_value(params).map(Self::UpdateToken),
            "pause_token" => from_value(params).map(Self::PauseToken),
            "unpause_token" => from_value(params).map(Self::UnpauseToken),
            "freeze_token" => from_value(params).map(Self::FreezeToken),
            "unfreeze_token" => from_value(params).map(Self::UnfreezeToken),
            "grant_kyc" => from_value(params).map(Self::GrantKyc),
            "revoke_kyc" => from_value(params).map(Self::RevokeKyc),
            "wipe_token" => from_value(params).map(Self::WipeToken),
            "delete_token" => from_value(params).map(Self::DeleteToken),
            _ => return None,
        };
        Some(action)
    }

    /// Stages this action on `builder`.
    ///
    /// # Errors
    ///
    /// Propagates the stage function's `BuildError`.
    pub fn stage_into(&self, builder: &mut TokenBuilder) -> Result<(), BuildError> {
        let staged = match self {
            Self::CreateFungibleToken(p) => builder.create_fungible_token(p),
            Self::CreateNonFungibleToken(p) => builder.create_non_fungible_token(p),
            Self::MintFungibleToken(p) => builder.mint_fungible_token(p),
            Self::MintNft(p) => builder.mint_nft(p),
            Self::BurnToken(p) => builder.burn_token(p),
            Self::AssociateToken(p) => builder.associate_token(p),
            Self::DissociateToken(p) => builder.dissociate_token(p),
            Self::AirdropToken(p) => builder.airdrop_token(p),
            Self::UpdateToken(p) => builder.update_token(p),
            Self::PauseToken(p) => builder.pause_token(p),
            Self::UnpauseToken(p) => builder.unpause_token(p),
            Self::FreezeToken(p) => builder.freeze_token(p),
            Self::UnfreezeToken(p) => builder.unfreeze_token(p),
            Self::GrantKyc(p) => builder.grant_kyc(p),
            Self::RevokeKyc(p) => builder.revoke_kyc(p),
            Self::WipeToken(p) => builder.wipe_token(p),
            Self::DeleteToken(p) => builder.delete_token(p),
        };
        staged.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use ledgerkit_core::EntityId;

    use super::*;
    use crate::builders::testing::{context, context_with, key, OPERATOR};
    use crate::builders::StageBuilder;
    use crate::config::{AgentConfig, OperatingMode};
    use crate::meta::MetaOptions;

    fn fungible() -> CreateFungibleTokenParams {
        CreateFungibleTokenParams {
            token_name: "Gold".into(),
            token_symbol: "GLD".into(),
            decimals: 2,
            initial_supply: Some(AmountInput::from("10.5")),
            ..CreateFungibleTokenParams::default()
        }
    }

    fn token_create(builder: &TokenBuilder) -> TokenCreate {
        match &builder.current_operation().unwrap().body {
            OperationBody::TokenCreate(create) => create.clone(),
            other => panic!("expected token create, got {other:?}"),
        }
    }

    #[test]
    fn fungible_token_scales_supply_and_defaults_treasury() {
        let (_, ctx) = context();
        let mut builder = TokenBuilder::new(ctx);
        builder.create_fungible_token(&fungible()).unwrap();

        let create = token_create(&builder);
        assert_eq!(create.initial_supply, 1050);
        assert_eq!(create.treasury_account_id, EntityId::num(OPERATOR));
        assert_eq!(create.max_supply, None);
        assert_eq!(builder.notes().len(), 1);
        assert!(builder.notes()[0].contains("treasury"));
    }

    #[test]
    fn treasury_prefers_acting_account() {
        let (_, ctx) = context_with(AgentConfig {
            acting_account: Some(EntityId::num(1001)),
            ..AgentConfig::default()
        });
        let mut builder = TokenBuilder::new(ctx);
        builder.create_fungible_token(&fungible()).unwrap();
        assert_eq!(token_create(&builder).treasury_account_id, EntityId::num(1001));
    }

    #[test]
    fn finite_supply_needs_a_sufficient_maximum() {
        let (_, ctx) = context();
        let mut builder = TokenBuilder::new(ctx);
        let mut params = fungible();
        params.supply_type = SupplyType::Finite;
        assert!(matches!(
            builder.create_fungible_token(&params),
            Err(BuildError::Invalid { field: "maxSupply", .. })
        ));

        params.max_supply = Some(AmountInput::Int(5));
        assert!(builder.create_fungible_token(&params).is_err());

        params.max_supply = Some(AmountInput::Int(100));
        builder.create_fungible_token(&params).unwrap();
        assert_eq!(token_create(&builder).max_supply, Some(10_000));
    }

    #[test]
    fn nft_collection_defaults_supply_key_to_operator() {
        let (_, ctx) = context();
        let mut builder = TokenBuilder::new(ctx);
        builder
            .create_non_fungible_token(&CreateNonFungibleTokenParams {
                token_name: "Art".into(),
                token_symbol: "ART".into(),
                max_supply: Some(100),
                ..CreateNonFungibleTokenParams::default()
            })
            .unwrap();

        let create = token_create(&builder);
        assert_eq!(create.token_type, TokenType::NonFungibleUnique);
        assert_eq!(create.supply_type, SupplyType::Finite);
        assert_eq!(create.keys.supply_key, Some(KeyValue::OperatorKey));
        assert_eq!(builder.notes().len(), 2);
    }

    #[test]
    fn invalid_optional_key_is_skipped() {
        let (_, ctx) = context();
        let mut builder = TokenBuilder::new(ctx);
        let mut params = fungible();
        params.keys.admin_key = Some(KeyInput::from("not a key"));
        params.keys.pause_key = Some(KeyInput::current_signer());
        builder.create_fungible_token(&params).unwrap();

        let create = token_create(&builder);
        assert!(create.keys.admin_key.is_none());
        assert_eq!(create.keys.pause_key, Some(KeyValue::OperatorKey));
    }

    #[test]
    fn burn_requires_exactly_one_of_amount_and_serials() {
        let (_, ctx) = context();
        let mut builder = TokenBuilder::new(ctx);
        let both = BurnTokenParams {
            token_id: EntityId::num(5),
            amount: Some(AmountInput::Int(1)),
            serials: vec![1],
        };
        assert!(builder.burn_token(&both).is_err());
        let neither = BurnTokenParams {
            token_id: EntityId::num(5),
            amount: None,
            serials: Vec::new(),
        };
        assert!(builder.burn_token(&neither).is_err());
        let serials = BurnTokenParams {
            token_id: EntityId::num(5),
            amount: None,
            serials: vec![3, 4],
        };
        builder.burn_token(&serials).unwrap();
    }

    #[test]
    fn airdrop_balances_token_legs() {
        let (_, ctx) = context();
        let mut builder = TokenBuilder::new(ctx);
        builder
            .airdrop_token(&AirdropTokenParams {
                token_id: EntityId::num(5),
                source_account_id: None,
                recipients: vec![
                    AirdropRecipient {
                        account_id: EntityId::num(10),
                        amount: AmountInput::Int(3),
                    },
                    AirdropRecipient {
                        account_id: EntityId::num(11),
                        amount: AmountInput::from("4"),
                    },
                ],
            })
            .unwrap();
        let OperationBody::TokenAirdrop(transfer) = &builder.current_operation().unwrap().body else {
            panic!("expected airdrop");
        };
        assert_eq!(transfer.token_transfers.iter().map(|t| t.amount).sum::<i64>(), 0);
        assert_eq!(transfer.token_transfers.last().unwrap().amount, -7);
    }

    #[tokio::test]
    async fn mint_nft_executes_with_serials() {
        let (_, ctx) = context();
        let mut builder = TokenBuilder::new(ctx);
        builder
            .mint_nft(&MintNftParams {
                token_id: EntityId::num(5),
                uris: vec!["ipfs://a".into(), "ipfs://b".into()],
            })
            .unwrap();
        let record = builder.execute(&MetaOptions::default()).await.into_record();
        assert_eq!(record.receipt.unwrap().serial_numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn token_create_bytes_carry_operator_keys() {
        let (ledger, ctx) = context_with(AgentConfig {
            mode: OperatingMode::ReturnBytes,
            ..AgentConfig::default()
        });
        let mut builder = TokenBuilder::new(ctx);
        let mut params = fungible();
        params.keys.supply_key = Some(KeyInput::from("CURRENT_SIGNER"));
        builder.create_fungible_token(&params).unwrap();

        let bytes = builder.get_bytes(&MetaOptions::default()).unwrap();
        use base64::Engine as _;
        let decoded = base64::engine::general_purpose::STANDARD.decode(bytes).unwrap();
        let op = ledgerkit_core::codec::decode(&decoded).unwrap();
        let OperationBody::TokenCreate(create) = op.body else {
            panic!("expected token create");
        };
        assert_eq!(create.keys.supply_key, Some(KeyValue::from(key(1))));
        assert!(ledger.submissions().is_empty());
    }

    #[test]
    fn action_parses_flattened_keys() {
        let action = TokenAction::parse(
            "create_fungible_token",
            serde_json::json!({
                "tokenName": "Gold",
                "tokenSymbol": "GLD",
                "supplyType": "finite",
                "maxSupply": "1000",
                "adminKey": "current_signer"
            }),
        )
        .unwrap()
        .unwrap();
        let TokenAction::CreateFungibleToken(params) = action else {
            panic!("expected fungible create");
        };
        assert_eq!(params.supply_type, SupplyType::Finite);
        assert!(params.keys.admin_key.unwrap().is_current_signer());
    }
    #[test]
    fn update_token_needs_only_a_token_id() {
        let action = TokenAction::parse(
            "update_token",
            serde_json::json!({ "tokenId": "0.0.700", "tokenName": "Silver", "adminKey": "current_signer" }),
        )
        .unwrap()
        .unwrap();
        let TokenAction::UpdateToken(params) = &action else {
            panic!("expected token update");
        };
        assert_eq!(params.token_symbol, None);

        let (_, ctx) = context();
        let mut builder = TokenBuilder::new(ctx);
        action.stage_into(&mut builder).unwrap();
        let OperationBody::TokenUpdate(update) = &builder.current_operation().unwrap().body else {
            panic!("expected token update");
        };
        assert_eq!(update.token_id, EntityId::num(700));
        assert_eq!(update.name.as_deref(), Some("Silver"));
        assert!(update.keys.admin_key.is_some());
        assert!(update.keys.supply_key.is_none());

        assert!(TokenAction::parse("update_token", serde_json::json!({ "tokenName": "Silver" }))
            .unwrap()
            .is_err());
    }
}
