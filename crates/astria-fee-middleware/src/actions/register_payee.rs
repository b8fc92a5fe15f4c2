use cnidarium::{
    StateRead,
    StateWrite,
};
use tracing::{
    info,
    instrument,
    Level,
};

use super::{
    ensure_fee_enabled_channel,
    ensure_not_escrow_account,
    RegisterCounterpartyPayee,
    RegisterPayee,
};
use crate::{
    address::Address,
    error::{
        FeeError,
        InternalContext as _,
    },
    events,
    payee::StateWriteExt as _,
};

#[derive(Debug)]
pub struct CheckedRegisterPayee {
    action: RegisterPayee,
    relayer: Address,
    payee: Address,
}

impl CheckedRegisterPayee {
    #[instrument(skip_all, err(level = Level::DEBUG))]
    pub(super) async fn new<S: StateRead>(
        action: RegisterPayee,
        state: S,
    ) -> Result<Self, FeeError> {
        let relayer = Address::try_from(action.relayer.clone())?;
        let payee = Address::try_from(action.payee.clone())?;

        let checked_action = Self {
            action,
            relayer,
            payee,
        };
        checked_action.run_mutable_checks(state).await?;

        Ok(checked_action)
    }

    #[instrument(skip_all, err(level = Level::DEBUG))]
    pub(super) async fn run_mutable_checks<S: StateRead>(&self, state: S) -> Result<(), FeeError> {
        ensure_fee_enabled_channel(&state, &self.action.port_id, &self.action.channel_id).await?;
        ensure_not_escrow_account(&state, &self.payee).await
    }

    #[instrument(
        skip_all,
        fields(relayer = %self.relayer, payee = %self.payee),
        err(level = Level::DEBUG),
    )]
    pub(super) async fn execute<S: StateWrite>(&self, mut state: S) -> Result<(), FeeError> {
        self.run_mutable_checks(&state).await?;

        state
            .put_payee(&self.action.channel_id, &self.relayer, &self.payee)
            .internal("failed to write payee")?;
        state.record(events::register_payee(
            &self.action.channel_id,
            &self.relayer,
            &self.payee,
        ));
        info!("registered payee");
        Ok(())
    }

    pub fn action(&self) -> &RegisterPayee {
        &self.action
    }
}

/// Registers the address on the counterparty chain that receives the receive fee when
/// the relayer delivers packets there. The address belongs to the counterparty chain and
/// may equal the relayer.
#[derive(Debug)]
pub struct CheckedRegisterCounterpartyPayee {
    action: RegisterCounterpartyPayee,
    relayer: Address,
    counterparty_payee: Address,
}

impl CheckedRegisterCounterpartyPayee {
    #[instrument(skip_all, err(level = Level::DEBUG))]
    pub(super) async fn new<S: StateRead>(
        action: RegisterCounterpartyPayee,
        state: S,
    ) -> Result<Self, FeeError> {
        let relayer = Address::try_from(action.relayer.clone())?;
        let counterparty_payee = Address::try_from(action.counterparty_payee.clone())?;

        let checked_action = Self {
            action,
            relayer,
            counterparty_payee,
        };
        checked_action.run_mutable_checks(state).await?;

        Ok(checked_action)
    }

    #[instrument(skip_all, err(level = Level::DEBUG))]
    pub(super) async fn run_mutable_checks<S: StateRead>(&self, state: S) -> Result<(), FeeError> {
        ensure_fee_enabled_channel(&state, &self.action.port_id, &self.action.channel_id).await?;
        ensure_not_escrow_account(&state, &self.counterparty_payee).await
    }

    #[instrument(
        skip_all,
        fields(relayer = %self.relayer, counterparty_payee = %self.counterparty_payee),
        err(level = Level::DEBUG),
    )]
    pub(super) async fn execute<S: StateWrite>(&self, mut state: S) -> Result<(), FeeError> {
        self.run_mutable_checks(&state).await?;

        state
            .put_counterparty_payee(
                &self.action.channel_id,
                &self.relayer,
                &self.counterparty_payee,
            )
            .internal("failed to write counterparty payee")?;
        state.record(events::register_counterparty_payee(
            &self.action.channel_id,
            &self.relayer,
            &self.counterparty_payee,
        ));
        info!("registered counterparty payee");
        Ok(())
    }

    pub fn action(&self) -> &RegisterCounterpartyPayee {
        &self.action
    }
}

#[cfg(test)]
mod tests {
    use ibc_types::core::channel::ChannelId;

    use super::*;
    use crate::{
        payee::StateReadExt as _,
        test_utils::{
            address,
            assert_error_contains,
            port_id,
            Fixture,
            ESCROW_ACCOUNT,
        },
    };

    fn register_payee(relayer: &str, payee: &str) -> RegisterPayee {
        RegisterPayee {
            port_id: port_id(),
            channel_id: Fixture::fee_channel(),
            relayer: relayer.to_string(),
            payee: payee.to_string(),
        }
    }

    fn register_counterparty_payee(relayer: &str, payee: &str) -> RegisterCounterpartyPayee {
        RegisterCounterpartyPayee {
            port_id: port_id(),
            channel_id: Fixture::fee_channel(),
            relayer: relayer.to_string(),
            counterparty_payee: payee.to_string(),
        }
    }

    #[tokio::test]
    async fn register_payee_stores_payee_and_emits_event() {
        let mut fixture = Fixture::new().await;

        let checked_action =
            CheckedRegisterPayee::new(register_payee("relayer", "payee"), fixture.state())
                .await
                .unwrap();
        checked_action.execute(fixture.state_mut()).await.unwrap();

        assert_eq!(
            fixture
                .state()
                .get_payee(&Fixture::fee_channel(), &address("relayer"))
                .await
                .unwrap(),
            Some(address("payee"))
        );
        let events = fixture.into_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "fee.register_payee");
    }

    #[tokio::test]
    async fn register_payee_overwrites_previous_registration() {
        let mut fixture = Fixture::new().await;
        fixture.register_payee("relayer", "old-payee");

        let checked_action =
            CheckedRegisterPayee::new(register_payee("relayer", "new-payee"), fixture.state())
                .await
                .unwrap();
        checked_action.execute(fixture.state_mut()).await.unwrap();

        assert_eq!(
            fixture
                .state()
                .resolve_payee(&Fixture::fee_channel(), &address("relayer"))
                .await
                .unwrap(),
            address("new-payee")
        );
    }

    #[tokio::test]
    async fn register_payee_may_name_the_relayer_itself() {
        let mut fixture = Fixture::new().await;
        fixture.register_payee("relayer", "payee");

        let checked_action =
            CheckedRegisterPayee::new(register_payee("relayer", "relayer"), fixture.state())
                .await
                .unwrap();
        checked_action.execute(fixture.state_mut()).await.unwrap();

        assert_eq!(
            fixture
                .state()
                .resolve_payee(&Fixture::fee_channel(), &address("relayer"))
                .await
                .unwrap(),
            address("relayer")
        );
    }

    #[tokio::test]
    async fn register_payee_with_invalid_payee_is_rejected() {
        let fixture = Fixture::new().await;

        let err = CheckedRegisterPayee::new(register_payee("relayer", ""), fixture.state())
            .await
            .unwrap_err();
        assert!(matches!(err, FeeError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn escrow_account_cannot_be_registered_as_payee() {
        let fixture = Fixture::new().await;

        let err = CheckedRegisterPayee::new(
            register_payee("relayer", ESCROW_ACCOUNT),
            fixture.state(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FeeError::EscrowAccountAsRecipient { .. }));

        let err = CheckedRegisterCounterpartyPayee::new(
            register_counterparty_payee("relayer", ESCROW_ACCOUNT),
            fixture.state(),
        )
        .await
        .unwrap_err();
        assert_error_contains(&err, "EscrowAccountAsRecipient");
    }

    #[tokio::test]
    async fn register_payee_on_channel_without_fees_is_rejected() {
        let fixture = Fixture::new().await;
        let action = RegisterPayee {
            channel_id: Fixture::plain_channel(),
            ..register_payee("relayer", "payee")
        };

        let err = CheckedRegisterPayee::new(action, fixture.state())
            .await
            .unwrap_err();
        assert_error_contains(&err, "NoExistingFeeEnabledChannel");
    }

    #[tokio::test]
    async fn register_counterparty_payee_accepts_relayer_itself() {
        let mut fixture = Fixture::new().await;

        let checked_action = CheckedRegisterCounterpartyPayee::new(
            register_counterparty_payee("relayer", "relayer"),
            fixture.state(),
        )
        .await
        .unwrap();
        checked_action.execute(fixture.state_mut()).await.unwrap();

        assert_eq!(
            fixture
                .state()
                .get_counterparty_payee(&Fixture::fee_channel(), &address("relayer"))
                .await
                .unwrap(),
            Some(address("relayer"))
        );
        let events = fixture.into_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "fee.register_counterparty_payee");
    }

    #[tokio::test]
    async fn register_counterparty_payee_on_unknown_channel_is_rejected() {
        let fixture = Fixture::new().await;
        let action = RegisterCounterpartyPayee {
            channel_id: ChannelId::new(9),
            ..register_counterparty_payee("relayer", "payee")
        };

        let err = CheckedRegisterCounterpartyPayee::new(action, fixture.state())
            .await
            .unwrap_err();
        assert_error_contains(&err, "ChannelNotFound");
    }
}
