use async_trait::async_trait;
use cnidarium::{
    StateRead,
    StateWrite,
};
use eyre::{
    OptionExt as _,
    Result,
    WrapErr as _,
};
use futures::StreamExt as _;
use tracing::{
    debug,
    instrument,
    Level,
};

use super::storage::{
    self,
    keys,
};
use crate::{
    address::Address,
    coin::{
        Coin,
        Coins,
    },
    storage::StoredValue,
    utils::anyhow_to_eyre,
};

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error(
        "insufficient {denom} balance in account {address}: {available} available, {required} \
         required"
    )]
    InsufficientFunds {
        address: Address,
        denom: String,
        available: u128,
        required: u128,
    },
    #[error(transparent)]
    Storage(#[from] eyre::Report),
}

#[async_trait]
pub trait StateReadExt: StateRead {
    #[instrument(skip_all, fields(address = %address, denom = %denom), err(level = Level::WARN))]
    async fn get_account_balance(&self, address: &Address, denom: &str) -> Result<u128> {
        let Some(bytes) = self
            .get_raw(&keys::balance(address, denom))
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw account balance from state")?
        else {
            debug!("account balance not found, returning 0");
            return Ok(0);
        };
        StoredValue::deserialize(&bytes)
            .and_then(|value| storage::Balance::try_from(value).map(u128::from))
            .wrap_err("invalid balance bytes")
    }

    #[instrument(skip_all, fields(address = %address), err(level = Level::WARN))]
    async fn get_account_balances(&self, address: &Address) -> Result<Coins> {
        let prefix = keys::balance_prefix(address);
        let mut balances = Vec::new();

        let mut stream = std::pin::pin!(self.prefix_raw(&prefix));
        while let Some(item) = stream.next().await {
            let (key, bytes) = item
                .map_err(anyhow_to_eyre)
                .wrap_err("failed reading account balances from state")?;
            let denom = keys::extract_denom_from_key(&key, address)?;
            let balance = StoredValue::deserialize(&bytes)
                .and_then(|value| storage::Balance::try_from(value).map(u128::from))
                .wrap_err_with(|| format!("invalid balance bytes under key `{key}`"))?;
            balances.push(Coin::new(balance, denom));
        }
        Coins::try_from_coins(balances).wrap_err("account holds an invalid denomination")
    }
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

#[async_trait]
pub trait StateWriteExt: StateWrite {
    #[instrument(skip_all, fields(address = %address, denom = %denom, balance = balance))]
    fn put_account_balance(&mut self, address: &Address, denom: &str, balance: u128) -> Result<()> {
        let bytes = StoredValue::from(storage::Balance::from(balance))
            .serialize()
            .wrap_err("failed to serialize balance")?;
        self.put_raw(keys::balance(address, denom), bytes);
        Ok(())
    }

    #[instrument(skip_all, fields(address = %address, denom = %denom, amount = amount))]
    async fn increase_balance(
        &mut self,
        address: &Address,
        denom: &str,
        amount: u128,
    ) -> Result<()> {
        let balance = self
            .get_account_balance(address, denom)
            .await
            .wrap_err("failed to get account balance")?;
        self.put_account_balance(
            address,
            denom,
            balance
                .checked_add(amount)
                .ok_or_eyre("failed to update account balance due to overflow")?,
        )
        .wrap_err("failed to store updated account balance in database")
    }

    /// Moves `coins` from `from` to `to`.
    ///
    /// Every denomination is checked before any balance is touched, so an insufficient
    /// balance leaves both accounts unchanged.
    #[instrument(skip_all, fields(from = %from, to = %to, coins = %coins))]
    async fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        coins: &Coins,
    ) -> Result<(), TransferError> {
        let mut debits = Vec::new();
        for coin in coins {
            let available = self
                .get_account_balance(from, &coin.denom)
                .await
                .wrap_err("failed to get sender balance")?;
            let Some(remaining) = available.checked_sub(coin.amount) else {
                return Err(TransferError::InsufficientFunds {
                    address: from.clone(),
                    denom: coin.denom.clone(),
                    available,
                    required: coin.amount,
                });
            };
            debits.push((coin, remaining));
        }
        for (coin, remaining) in debits {
            self.put_account_balance(from, &coin.denom, remaining)
                .wrap_err("failed to store debited sender balance")?;
            self.increase_balance(to, &coin.denom, coin.amount)
                .await
                .wrap_err("failed to credit recipient")?;
        }
        Ok(())
    }
}

impl<T: StateWrite> StateWriteExt for T {}
