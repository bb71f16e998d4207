// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::error::AppError;
use crate::infrastructure::network::provider::EndpointPool;
use alloy::primitives::{Address, TxKind, U256};
use alloy::providers::Provider;
use alloy::rpc::types::eth::{TransactionInput, TransactionRequest};
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    #[sol(rpc)]
    interface ApexFlashExecutor {
        function executeFlashArbitrage(
            address tokenIn,
            address tokenOut,
            uint256 amount
        ) external;

        function getContractBalance() external view returns (uint256);
        function withdraw() external;

        error OnlyOwner();
        error LoanNotRepaid(uint256 required, uint256 available);
        error ZeroAmount();
    }
}

pub fn strike_calldata(token_in: Address, token_out: Address, amount: U256) -> Vec<u8> {
    ApexFlashExecutor::executeFlashArbitrageCall {
        tokenIn: token_in,
        tokenOut: token_out,
        amount,
    }
    .abi_encode()
}

pub fn withdraw_calldata() -> Vec<u8> {
    ApexFlashExecutor::withdrawCall {}.abi_encode()
}

/// Read the executor's accumulated balance via `eth_call` through the pool.
pub async fn contract_balance(pool: &EndpointPool, contract: Address) -> Result<U256, AppError> {
    let calldata = ApexFlashExecutor::getContractBalanceCall {}.abi_encode();
    let ret = pool
        .query("get_contract_balance", |provider| {
            let req = TransactionRequest {
                to: Some(TxKind::Call(contract)),
                input: TransactionInput::new(calldata.clone().into()),
                ..Default::default()
            };
            async move { provider.call(req).await }
        })
        .await?;

    if ret.len() != 32 {
        return Err(AppError::Strategy(format!(
            "getContractBalance returned {} bytes, expected 32",
            ret.len()
        )));
    }
    Ok(U256::from_be_slice(ret.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strike_call_roundtrips() {
        let token_in = Address::from([1u8; 20]);
        let token_out = Address::from([2u8; 20]);
        let amount = U256::from(100_000_000_000_000_000_000u128);

        let encoded = strike_calldata(token_in, token_out, amount);
        let decoded = ApexFlashExecutor::executeFlashArbitrageCall::abi_decode(&encoded)
            .expect("decode strike call");

        assert_eq!(decoded.tokenIn, token_in);
        assert_eq!(decoded.tokenOut, token_out);
        assert_eq!(decoded.amount, amount);
    }

    #[test]
    fn strike_selector_is_stable() {
        let encoded = strike_calldata(Address::ZERO, Address::ZERO, U256::ZERO);
        assert_eq!(
            &encoded[..4],
            ApexFlashExecutor::executeFlashArbitrageCall::SELECTOR
        );
        // 4-byte selector plus three static words
        assert_eq!(encoded.len(), 4 + 32 * 3);
    }

    #[test]
    fn withdraw_call_is_selector_only() {
        assert_eq!(withdraw_calldata().len(), 4);
    }
}
