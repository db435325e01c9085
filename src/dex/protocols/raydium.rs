use crate::dex::types::{CompiledIx, DecodedInstruction};

/// Raydium liquidity pool v4 instructions, keyed by their leading tag byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmmOperation {
    Initialize,
    Initialize2,
    MonitorStep,
    Deposit,
    Withdraw,
    MigrateToOpenBook,
    SetParams,
    WithdrawPnl,
    WithdrawSrm,
    SwapIn {
        amount_in: u64,
        min_amount_out: u64,
    },
    PreInitialize,
    SwapOut {
        max_amount_in: u64,
        amount_out: u64,
    },
    SimulateInfo,
    AdminCancelOrders,
    CreateConfigAccount,
    UpdateConfigAccount,
    Unknown(u8),
}

impl AmmOperation {
    pub fn name(&self) -> &'static str {
        match self {
            AmmOperation::Initialize => "initialize",
            AmmOperation::Initialize2 => "initialize2",
            AmmOperation::MonitorStep => "monitorStep",
            AmmOperation::Deposit => "deposit",
            AmmOperation::Withdraw => "withdraw",
            AmmOperation::MigrateToOpenBook => "migrateToOpenBook",
            AmmOperation::SetParams => "setParams",
            AmmOperation::WithdrawPnl => "withdrawPnl",
            AmmOperation::WithdrawSrm => "withdrawSrm",
            AmmOperation::SwapIn { .. } => "swapIn",
            AmmOperation::PreInitialize => "preInitialize",
            AmmOperation::SwapOut { .. } => "swapOut",
            AmmOperation::SimulateInfo => "simulateInfo",
            AmmOperation::AdminCancelOrders => "adminCancelOrders",
            AmmOperation::CreateConfigAccount => "createConfigAccount",
            AmmOperation::UpdateConfigAccount => "updateConfigAccount",
            AmmOperation::Unknown(_) => "unknown",
        }
    }

    pub fn is_swap(&self) -> bool {
        matches!(self, AmmOperation::SwapIn { .. } | AmmOperation::SwapOut { .. })
    }
}

fn read_u64(data: &[u8], offset: usize) -> Option<u64> {
    Some(u64::from_le_bytes(data.get(offset..offset + 8)?.try_into().ok()?))
}

/// Parse instruction data. Truncated swap payloads and empty data yield `None`.
pub fn parse_operation(data: &[u8]) -> Option<AmmOperation> {
    let operation = match *data.first()? {
        0 => AmmOperation::Initialize,
        1 => AmmOperation::Initialize2,
        2 => AmmOperation::MonitorStep,
        3 => AmmOperation::Deposit,
        4 => AmmOperation::Withdraw,
        5 => AmmOperation::MigrateToOpenBook,
        6 => AmmOperation::SetParams,
        7 => AmmOperation::WithdrawPnl,
        8 => AmmOperation::WithdrawSrm,
        // swapBaseIn
        9 => AmmOperation::SwapIn {
            amount_in: read_u64(data, 1)?,
            min_amount_out: read_u64(data, 9)?,
        },
        10 => AmmOperation::PreInitialize,
        // swapBaseOut
        11 => AmmOperation::SwapOut {
            max_amount_in: read_u64(data, 1)?,
            amount_out: read_u64(data, 9)?,
        },
        12 => AmmOperation::SimulateInfo,
        13 => AmmOperation::AdminCancelOrders,
        14 => AmmOperation::CreateConfigAccount,
        15 => AmmOperation::UpdateConfigAccount,
        tag => AmmOperation::Unknown(tag),
    };
    Some(operation)
}

/// Resolve a compiled instruction's account indexes and parse its data.
pub fn decode_instruction(ix: &CompiledIx, account_keys: &[String]) -> Option<DecodedInstruction> {
    let name = parse_operation(&ix.data)?;
    let accounts = ix
        .accounts
        .iter()
        .map(|index| account_keys.get(*index as usize).cloned())
        .collect::<Option<Vec<_>>>()?;

    Some(DecodedInstruction {
        name,
        accounts,
        data: ix.data.clone(),
    })
}
