use crate::{
    errors::LedgerError,
    ledger::{BlockHeader, Ledger, Receipt, TxLookup, TxOpts},
};
use async_trait::async_trait;
use ethers::{
    providers::Middleware,
    types::{Address, BlockNumber, H256},
};
use std::sync::Arc;

/// [`Ledger`] backed by an `ethers` middleware stack (provider, signer, gas
/// oracle, ...)
#[derive(Debug)]
pub struct EthersLedger<M> {
    client: Arc<M>,
}

impl<M> Clone for EthersLedger<M> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

impl<M: Middleware> EthersLedger<M> {
    pub fn new(client: Arc<M>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<M> {
        &self.client
    }
}

fn rpc<E: std::fmt::Display>(err: E) -> LedgerError {
    LedgerError::Rpc(err.to_string())
}

#[async_trait]
impl<M> Ledger for EthersLedger<M>
where
    M: Middleware + 'static,
{
    async fn block_number(&self) -> Result<u64, LedgerError> {
        let number = self.client.get_block_number().await.map_err(rpc)?;
        Ok(number.as_u64())
    }

    async fn finalized_block_number(&self) -> Result<u64, LedgerError> {
        let block = self
            .client
            .get_block(BlockNumber::Finalized)
            .await
            .map_err(rpc)?
            .ok_or(LedgerError::MissingField("finalized block"))?;
        let number = block.number.ok_or(LedgerError::MissingField("number"))?;
        Ok(number.as_u64())
    }

    async fn block_header(&self, number: u64) -> Result<Option<BlockHeader>, LedgerError> {
        let block = match self.client.get_block(number).await.map_err(rpc)? {
            Some(block) => block,
            None => return Ok(None),
        };

        Ok(Some(BlockHeader {
            number,
            hash: block.hash.ok_or(LedgerError::MissingField("hash"))?,
        }))
    }

    async fn transaction(&self, hash: H256) -> Result<TxLookup, LedgerError> {
        let tx = match self.client.get_transaction(hash).await.map_err(rpc)? {
            Some(tx) => tx,
            None => return Ok(TxLookup::Unknown),
        };
        if tx.block_number.is_none() {
            return Ok(TxLookup::Pending);
        }

        // the receipt may lag behind the transaction on some nodes
        let receipt = match self
            .client
            .get_transaction_receipt(hash)
            .await
            .map_err(rpc)?
        {
            Some(receipt) => receipt,
            None => return Ok(TxLookup::Pending),
        };

        Ok(TxLookup::Mined(Receipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt
                .block_number
                .ok_or(LedgerError::MissingField("block_number"))?
                .as_u64(),
            block_hash: receipt
                .block_hash
                .ok_or(LedgerError::MissingField("block_hash"))?,
            success: receipt.status.map(|s| s.as_u64() == 1).unwrap_or(false),
            gas_used: receipt.gas_used.unwrap_or_default(),
        }))
    }

    async fn tx_opts(&self, account: Address) -> Result<TxOpts, LedgerError> {
        let (max_fee_per_gas, max_priority_fee_per_gas) = self
            .client
            .estimate_eip1559_fees(None)
            .await
            .map_err(rpc)?;

        Ok(TxOpts {
            from: account,
            max_fee_per_gas,
            max_priority_fee_per_gas,
        })
    }
}
